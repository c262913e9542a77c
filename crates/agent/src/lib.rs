//! The DeepContext agent loop: a bounded ReAct cycle.
//!
//! 1. **Fetch** the tool catalog from the tool server (once per run)
//! 2. **Think**: send the whole transcript plus the catalog to the oracle
//! 3. **Act**: if the reply requests actions, dispatch each one and append
//!    its result, then think again
//! 4. **Answer**: a reply without actions is the final answer
//!
//! The loop stops early with an `Exhausted` outcome once `max_turns` oracle
//! calls have been made.

pub mod catalog;
pub mod dispatcher;
pub mod guard;
pub mod loop_runner;

pub use catalog::adapt;
pub use dispatcher::{ToolDispatcher, decode_arguments};
pub use guard::TurnGuard;
pub use loop_runner::{AgentLoop, LoopOutcome, RunReport};

#[cfg(test)]
pub(crate) mod test_helpers;
