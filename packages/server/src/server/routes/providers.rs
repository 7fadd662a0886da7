use axum::{extract::Extension, Json};
use serde::Serialize;
use tattva::types::{pricing_for, ModelPricing};

use crate::server::app::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    pub id: String,
    pub name: &'static str,
    pub model: String,
    pub is_default: bool,
    /// USD per 1k tokens, when the provider is priced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<ModelPricing>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvidersResponse {
    pub success: bool,
    /// Provider tried first when a request names none.
    pub default_provider: Option<String>,
    pub providers: Vec<ProviderInfo>,
    pub total: usize,
}

fn display_name(provider: &str) -> &'static str {
    match provider {
        "openai" => "OpenAI",
        "anthropic" => "Anthropic Claude",
        _ => "Other",
    }
}

/// GET /api/providers
pub async fn providers_handler(Extension(state): Extension<AppState>) -> Json<ProvidersResponse> {
    let chain = state.engine.chain().providers();

    let default_provider = state
        .engine
        .config()
        .default_provider
        .clone()
        .or_else(|| chain.first().map(|p| p.provider().to_string()));

    let providers: Vec<ProviderInfo> = chain
        .iter()
        .map(|p| ProviderInfo {
            id: p.provider().to_string(),
            name: display_name(p.provider()),
            model: p.model().to_string(),
            is_default: default_provider.as_deref() == Some(p.provider()),
            cost: pricing_for(p.provider()),
        })
        .collect();

    Json(ProvidersResponse {
        success: true,
        default_provider,
        total: providers.len(),
        providers,
    })
}
