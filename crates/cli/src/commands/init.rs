//! `deepcontext init`: first-time setup.

use deepcontext_config::AppConfig;
use deepcontext_store::KnowledgeStore;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = AppConfig::config_path();

    println!("🧠 DeepContext: First-Time Setup");
    println!("=================================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if !config_path.exists() {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config file: {}", config_path.display());
    } else {
        println!("  Config file exists: {}", config_path.display());
    }

    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let store = KnowledgeStore::open(&config.store.db_path).await?;
    let count = store.count().await?;
    println!(
        "✅ Knowledge store ready: {} ({count} triplet(s))",
        config.store.db_path
    );

    println!();
    if config.has_api_key() {
        println!("  Next: deepcontext agent --query \"...\"");
    } else {
        println!("  Next: set DEEPCONTEXT_API_KEY (or add api_key to config.toml),");
        println!("        then run: deepcontext agent --query \"...\"");
    }

    Ok(())
}
