//! Model oracle implementations for DeepContext.
//!
//! All providers implement the `deepcontext_core::Provider` trait.

pub mod openai_compat;

use std::sync::Arc;

use deepcontext_config::AppConfig;
use deepcontext_core::Provider;

pub use openai_compat::{DEEPSEEK_BASE_URL, OpenAiCompatProvider};

/// Build the configured oracle.
///
/// Returns `None` when no API key is available.
pub fn build_from_config(config: &AppConfig) -> Option<Arc<dyn Provider>> {
    let api_key = config.api_key.as_ref()?;
    let provider = if config.base_url.trim_end_matches('/') == DEEPSEEK_BASE_URL {
        OpenAiCompatProvider::deepseek(api_key)
    } else {
        OpenAiCompatProvider::new(provider_name(&config.base_url), &config.base_url, api_key)
    };
    Some(Arc::new(provider))
}

/// A short display name derived from the endpoint host.
fn provider_name(base_url: &str) -> &'static str {
    if base_url.contains("deepseek.com") {
        "deepseek"
    } else if base_url.contains("openai.com") {
        "openai"
    } else if base_url.contains("localhost") || base_url.contains("127.0.0.1") {
        "local"
    } else {
        "openai-compatible"
    }
}
