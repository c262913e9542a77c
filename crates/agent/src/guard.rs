//! Bounded-turn guard: caps oracle calls per run.

use tracing::warn;

/// Counts oracle calls against a fixed budget.
#[derive(Debug, Clone)]
pub struct TurnGuard {
    max_turns: u32,
    used: u32,
}

impl TurnGuard {
    /// A guard allowing `max_turns` oracle calls. Zero is treated as one.
    pub fn new(max_turns: u32) -> Self {
        if max_turns == 0 {
            warn!("max_turns of 0 clamped to 1");
        }
        Self {
            max_turns: max_turns.max(1),
            used: 0,
        }
    }

    /// Claim the next turn. Returns `false` once the budget is spent.
    pub fn begin_turn(&mut self) -> bool {
        if self.is_exhausted() {
            return false;
        }
        self.used += 1;
        true
    }

    pub fn turns_used(&self) -> u32 {
        self.used
    }

    pub fn max_turns(&self) -> u32 {
        self.max_turns
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.max_turns
    }
}
