//! `deepcontext agent`: answer one question and print the result.

use std::sync::Arc;

use deepcontext_agent::{AgentLoop, LoopOutcome};
use deepcontext_config::AppConfig;
use deepcontext_core::event::{DomainEvent, EventBus};
use deepcontext_core::tool::ToolServer;
use deepcontext_mcp::StdioToolClient;
use deepcontext_store::KnowledgeStore;
use deepcontext_tools::default_registry;
use tokio::sync::broadcast::{self, error::RecvError};

pub async fn run(
    query: Option<String>,
    max_turns: Option<u32>,
    in_process: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let Some(provider) = deepcontext_providers::build_from_config(&config) else {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    DEEPCONTEXT_API_KEY=sk-...   (generic)");
        eprintln!("    DEEPSEEK_API_KEY=sk-...      (DeepSeek)");
        eprintln!("    OPENAI_API_KEY=sk-...        (OpenAI)");
        eprintln!();
        eprintln!("  Or add `api_key` to your config file:");
        eprintln!("    {}", AppConfig::config_path().display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    };

    let mut agent_config = config.to_agent_config();
    if let Some(n) = max_turns {
        if n == 0 {
            return Err("--max-turns must be at least 1".into());
        }
        agent_config.max_turns = n;
    }
    let query = query.unwrap_or_else(|| config.agent.default_query.clone());

    let mut client: Option<Arc<StdioToolClient>> = None;
    let tools: Arc<dyn ToolServer> = if in_process {
        let store = KnowledgeStore::open(&config.store.db_path).await?;
        Arc::new(default_registry(Arc::new(store), config.notes_root()))
    } else {
        let (command, args) = server_command(&config)?;
        tracing::debug!(%command, ?args, "Spawning tool server");
        let spawned = Arc::new(StdioToolClient::spawn(&command, &args).await?);
        client = Some(spawned.clone());
        spawned
    };

    let event_bus = Arc::new(EventBus::default());
    let progress = tokio::spawn(render_progress(event_bus.subscribe()));

    let agent = AgentLoop::new(provider, tools, agent_config, event_bus.clone());
    let result = agent.run(&query).await;

    // Closing the bus ends the progress task.
    drop(agent);
    drop(event_bus);
    let _ = progress.await;

    if let Some(client) = client {
        client.shutdown().await;
    }

    let report = result?;
    match report.outcome {
        LoopOutcome::Completed { answer } => println!("{answer}"),
        LoopOutcome::Exhausted { last_text } => {
            eprintln!(
                "⚠️  Stopped after {} turns without a final answer.",
                report.oracle_calls
            );
            if !last_text.is_empty() {
                println!("{last_text}");
            }
        }
    }

    Ok(())
}

/// The tool server to spawn: the configured one, or this binary's `serve`.
fn server_command(config: &AppConfig) -> Result<(String, Vec<String>), Box<dyn std::error::Error>> {
    match &config.server.command {
        Some(command) => Ok((command.clone(), config.server.args.clone())),
        None => {
            let exe = std::env::current_exe()?;
            let args = if config.server.args.is_empty() {
                vec!["serve".to_string()]
            } else {
                config.server.args.clone()
            };
            Ok((exe.to_string_lossy().into_owned(), args))
        }
    }
}

async fn render_progress(mut rx: broadcast::Receiver<Arc<DomainEvent>>) {
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        };

        match event.as_ref() {
            DomainEvent::TurnStarted {
                turn, max_turns, ..
            } => eprintln!("🤔 Thinking (turn {turn}/{max_turns})..."),
            DomainEvent::ActionRequested {
                tool_name,
                arguments,
                ..
            } => eprintln!("🔧 {tool_name} {arguments}"),
            DomainEvent::ToolExecuted {
                tool_name,
                success,
                duration_ms,
                output_preview,
                ..
            } => {
                let mark = if *success { "✅" } else { "❌" };
                eprintln!("   {mark} {tool_name} ({duration_ms} ms): {output_preview}");
            }
            DomainEvent::ErrorOccurred { error_message, .. } => {
                eprintln!("❌ {error_message}");
            }
            DomainEvent::ResponseGenerated { .. } | DomainEvent::RunFinished { .. } => {}
        }
    }
}
