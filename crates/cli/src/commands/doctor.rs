//! `deepcontext doctor`: diagnose system health.

use deepcontext_config::AppConfig;
use deepcontext_store::KnowledgeStore;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 DeepContext Doctor: System Diagnostics");
    println!("=========================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_path();
    if config_path.exists() {
        println!("  ✅ Config file found: {}", config_path.display());
    } else {
        println!("  ⚠️  No config file, using defaults (run `deepcontext init`)");
        issues += 1;
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  Cannot continue without a valid config.");
            return Ok(());
        }
    };

    match deepcontext_providers::build_from_config(&config) {
        Some(provider) => {
            println!("  ✅ API key configured (model: {})", config.model);
            match provider.health_check().await {
                Ok(true) => println!("  ✅ Provider reachable: {}", config.base_url),
                Ok(false) => {
                    println!("  ⚠️  Provider answered with an error: {}", config.base_url);
                    issues += 1;
                }
                Err(e) => {
                    println!("  ❌ Provider unreachable: {e}");
                    issues += 1;
                }
            }
        }
        None => {
            println!("  ⚠️  No API key configured (set DEEPCONTEXT_API_KEY)");
            issues += 1;
        }
    }

    match KnowledgeStore::open(&config.store.db_path).await {
        Ok(store) => match store.count().await {
            Ok(n) => println!("  ✅ Knowledge store opens: {} ({n} triplet(s))", config.store.db_path),
            Err(e) => {
                println!("  ❌ Knowledge store unreadable: {e}");
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ Knowledge store failed to open: {e}");
            issues += 1;
        }
    }

    match config.notes_root() {
        Some(root) if root.is_dir() => println!("  ✅ Notes confined to {}", root.display()),
        Some(root) => {
            println!("  ❌ Notes root is not a directory: {}", root.display());
            issues += 1;
        }
        None => println!("  ⚠️  Notes root unset, note tools can read any path"),
    }

    match &config.server.command {
        Some(command) => println!("  ✅ Tool server command: {command} {}", config.server.args.join(" ")),
        None => println!("  ✅ Tool server: built-in (`deepcontext serve`)"),
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
