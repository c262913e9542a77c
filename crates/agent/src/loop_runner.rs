//! The agent reasoning loop implementation.
//!
//! One run walks a small state machine:
//!
//! ```text
//! Thinking ──> Deciding ──> Acting ──> Thinking
//!                  │           │
//!                  v           v
//!          Done(Completed)  Done(Exhausted)
//! ```
//!
//! `Thinking` sends the whole transcript to the oracle, `Deciding` inspects the
//! assistant turn it returned, `Acting` dispatches each action request in
//! emitted order. The turn guard is checked after every full `Acting` pass.

use crate::catalog;
use crate::dispatcher::ToolDispatcher;
use crate::guard::TurnGuard;
use chrono::Utc;
use deepcontext_core::agent::AgentConfig;
use deepcontext_core::event::{DomainEvent, EventBus};
use deepcontext_core::message::{ActionRequest, Message, Role, Transcript};
use deepcontext_core::provider::{CatalogEntry, Provider, ProviderRequest};
use deepcontext_core::tool::ToolServer;
use deepcontext_core::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopOutcome {
    /// The model answered without requesting any action.
    Completed { answer: String },

    /// The turn budget ran out while the model was still acting.
    Exhausted { last_text: String },
}

impl LoopOutcome {
    fn label(&self) -> &'static str {
        match self {
            LoopOutcome::Completed { .. } => "completed",
            LoopOutcome::Exhausted { .. } => "exhausted",
        }
    }
}

/// Everything a finished run leaves behind.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: LoopOutcome,

    /// The full turn history, opening turns included.
    pub transcript: Transcript,

    /// Oracle calls made.
    pub oracle_calls: u32,

    /// Action requests answered with a tool turn.
    pub actions_dispatched: usize,
}

impl RunReport {
    /// The final answer, or the last assistant text of an exhausted run.
    pub fn text(&self) -> &str {
        match &self.outcome {
            LoopOutcome::Completed { answer } => answer,
            LoopOutcome::Exhausted { last_text } => last_text,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, LoopOutcome::Completed { .. })
    }
}

#[derive(Debug)]
enum LoopState {
    Thinking,
    Deciding(Message),
    Acting(Vec<ActionRequest>),
    Done(LoopOutcome),
}

/// The core agent loop that orchestrates oracle calls and tool execution.
pub struct AgentLoop {
    /// The model oracle
    provider: Arc<dyn Provider>,

    /// Where the catalog comes from and tool calls go
    tools: Arc<dyn ToolServer>,

    /// Run parameters
    config: AgentConfig,

    /// Event bus for domain events
    event_bus: Arc<EventBus>,
}

impl AgentLoop {
    /// Create a new agent loop.
    pub fn new(
        provider: Arc<dyn Provider>,
        tools: Arc<dyn ToolServer>,
        config: AgentConfig,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            provider,
            tools,
            config,
            event_bus,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Run one session for `query` until the model answers or the turn budget
    /// is spent.
    ///
    /// Only a catalog fetch failure or an oracle failure is returned as an
    /// error; everything that goes wrong inside a tool call ends up in the
    /// transcript instead.
    pub async fn run(&self, query: &str) -> Result<RunReport> {
        let mut transcript = Transcript::opening(self.config.system_prompt.as_deref(), query);
        info!(
            transcript_id = %transcript.id,
            model = %self.config.model,
            max_turns = self.config.max_turns,
            "Starting agent run"
        );

        let descriptors = match self.tools.list_tools().await {
            Ok(descriptors) => descriptors,
            Err(e) => {
                self.report_failure("catalog", &e.to_string());
                return Err(Error::Catalog(e));
            }
        };
        let catalog = catalog::adapt(&descriptors);
        debug!(tools = catalog.len(), "Tool catalog loaded");

        let mut guard = TurnGuard::new(self.config.max_turns);
        let mut dispatcher = ToolDispatcher::new(self.tools.clone(), self.event_bus.clone())
            .with_timeout(self.config.tool_timeout_secs.map(Duration::from_secs));
        let mut actions_dispatched = 0usize;
        let mut last_text = String::new();

        let mut state = LoopState::Thinking;
        let outcome = loop {
            state = match state {
                LoopState::Thinking => {
                    if !guard.begin_turn() {
                        LoopState::Done(LoopOutcome::Exhausted {
                            last_text: last_text.clone(),
                        })
                    } else {
                        let reply = self.think(&mut transcript, &catalog, &guard).await?;
                        LoopState::Deciding(reply)
                    }
                }

                LoopState::Deciding(reply) => {
                    last_text.clone_from(&reply.content);
                    if reply.requests_action() {
                        LoopState::Acting(reply.tool_calls)
                    } else {
                        LoopState::Done(LoopOutcome::Completed {
                            answer: reply.content,
                        })
                    }
                }

                LoopState::Acting(requests) => {
                    debug!(count = requests.len(), "Dispatching action requests");
                    for request in &requests {
                        self.event_bus.publish(DomainEvent::ActionRequested {
                            call_id: request.id.clone(),
                            tool_name: request.name.clone(),
                            arguments: request.arguments.clone(),
                        });
                        let tool_turn = dispatcher.invoke(request).await;
                        transcript.push(tool_turn);
                        actions_dispatched += 1;
                    }

                    if guard.is_exhausted() {
                        LoopState::Done(LoopOutcome::Exhausted {
                            last_text: last_text.clone(),
                        })
                    } else {
                        LoopState::Thinking
                    }
                }

                LoopState::Done(outcome) => break outcome,
            };
        };

        match &outcome {
            LoopOutcome::Completed { .. } => info!(
                transcript_id = %transcript.id,
                turns = guard.turns_used(),
                actions = actions_dispatched,
                "Agent run completed"
            ),
            LoopOutcome::Exhausted { .. } => warn!(
                transcript_id = %transcript.id,
                turns = guard.turns_used(),
                actions = actions_dispatched,
                "Turn budget exhausted before a final answer"
            ),
        }

        self.event_bus.publish(DomainEvent::RunFinished {
            transcript_id: transcript.id.to_string(),
            outcome: outcome.label().into(),
            turns: guard.turns_used(),
            timestamp: Utc::now(),
        });

        Ok(RunReport {
            outcome,
            transcript,
            oracle_calls: guard.turns_used(),
            actions_dispatched,
        })
    }

    /// One oracle call. The reply is appended unconditionally, as an assistant
    /// turn, and returned for the decision step.
    async fn think(
        &self,
        transcript: &mut Transcript,
        catalog: &[CatalogEntry],
        guard: &TurnGuard,
    ) -> Result<Message> {
        debug!(
            transcript_id = %transcript.id,
            turn = guard.turns_used(),
            turns = transcript.len(),
            "Agent loop iteration"
        );
        self.event_bus.publish(DomainEvent::TurnStarted {
            transcript_id: transcript.id.to_string(),
            turn: guard.turns_used(),
            max_turns: guard.max_turns(),
        });

        let request = ProviderRequest {
            model: self.config.model.clone(),
            messages: transcript.turns().to_vec(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            tools: catalog.to_vec(),
        };

        let response = match self.provider.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                self.report_failure("oracle", &e.to_string());
                return Err(Error::Provider(e));
            }
        };

        self.event_bus.publish(DomainEvent::ResponseGenerated {
            transcript_id: transcript.id.to_string(),
            model: response.model.clone(),
            tokens_used: response.usage.as_ref().map_or(0, |u| u.total_tokens),
            timestamp: Utc::now(),
        });

        let mut reply = response.message;
        if reply.role != Role::Assistant {
            warn!(role = ?reply.role, "Oracle reply is not an assistant turn, recording it as one");
            reply.role = Role::Assistant;
        }
        transcript.push(reply.clone());
        Ok(reply)
    }

    fn report_failure(&self, context: &str, message: &str) {
        warn!(context, error = message, "Agent run failed");
        self.event_bus.publish(DomainEvent::ErrorOccurred {
            context: context.into(),
            error_message: message.into(),
            timestamp: Utc::now(),
        });
    }
}
