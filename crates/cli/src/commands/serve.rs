//! `deepcontext serve`: the tool server, speaking line-delimited JSON-RPC
//! on stdin/stdout.

use std::sync::Arc;

use deepcontext_config::AppConfig;
use deepcontext_store::KnowledgeStore;
use deepcontext_tools::default_registry;
use tokio::io::BufReader;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let store = KnowledgeStore::open(&config.store.db_path).await?;
    tracing::info!(db = %config.store.db_path, "Knowledge store opened");

    let registry = default_registry(Arc::new(store), config.notes_root());
    deepcontext_mcp::serve(
        &registry,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await?;

    tracing::info!("Client disconnected, tool server exiting");
    Ok(())
}
