//! # Ollama model sync
//!
//! Registers every model a local Ollama server has pulled as a provider in
//! the catalog, talking to Ollama's native `GET /api/tags` endpoint. New
//! providers point at the server's OpenAI-compatible `/v1` API so the
//! regular LLM path can use them.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::catalog::{Catalog, ProviderConfig};

/// Where Ollama listens unless told otherwise
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

/// What a sync changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Models registered as new providers
    pub added: Vec<String>,
    /// Models that already had an `ollama` provider
    pub skipped: Vec<String>,
    /// Provider activated because none was active before
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activated: Option<i64>,
}

/// List the model names an Ollama server has available.
///
/// # Errors
///
/// Fails if the server is unreachable, answers with an error status, or
/// the body is not a tag listing.
pub fn fetch_models(host: &str, timeout: Duration) -> anyhow::Result<Vec<String>> {
    let url = format!("{}/api/tags", host.trim().trim_end_matches('/'));
    debug!(url = %url, "listing Ollama models");
    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")?;
    let tags: TagsResponse = client
        .get(&url)
        .send()
        .and_then(|response| response.error_for_status())
        .with_context(|| format!("Failed to list Ollama models at {url}"))?
        .json()
        .with_context(|| format!("Invalid model listing from {url}"))?;
    Ok(tags.models.into_iter().map(|m| m.name).collect())
}

/// Add a provider for every model not yet registered.
///
/// A model counts as registered when an `ollama` provider already uses its
/// name. When no provider is active, the first added one is activated.
pub fn merge_models(catalog: &mut Catalog, host: &str, models: &[String]) -> SyncReport {
    let base_url = format!("{}/v1", host.trim().trim_end_matches('/'));
    let mut next_id = catalog.providers.iter().map(|p| p.id).max().unwrap_or(0) + 1;
    let mut needs_active = !catalog.providers.iter().any(|p| p.active);
    let mut report = SyncReport::default();

    for model in models {
        let exists = catalog
            .providers
            .iter()
            .any(|p| p.provider.eq_ignore_ascii_case("ollama") && &p.model_name == model);
        if exists {
            debug!(model = %model, "model already registered");
            report.skipped.push(model.clone());
            continue;
        }

        catalog.providers.push(ProviderConfig {
            id: next_id,
            name: format!("Ollama - {model}"),
            provider: "ollama".to_string(),
            base_url: base_url.clone(),
            api_key: None,
            model_name: model.clone(),
            active: needs_active,
        });
        if needs_active {
            report.activated = Some(next_id);
            needs_active = false;
        }
        info!(model = %model, provider_id = next_id, "registered Ollama model");
        report.added.push(model.clone());
        next_id += 1;
    }
    report
}

/// Fetch the server's models and merge them into `catalog`.
pub fn sync(catalog: &mut Catalog, host: &str, timeout: Duration) -> anyhow::Result<SyncReport> {
    let models = fetch_models(host, timeout)?;
    info!(host, models = models.len(), "found Ollama models");
    Ok(merge_models(catalog, host, &models))
}
