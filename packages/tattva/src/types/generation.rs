//! Generation metadata: token usage, cost, provider attribution.

use serde::{Deserialize, Serialize};

use crate::error::ProviderFailure;

/// Tokens consumed by one model call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// USD per 1k tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelPricing {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

impl ModelPricing {
    pub fn cost(&self, usage: TokenUsage) -> f64 {
        (usage.input_tokens as f64 / 1000.0) * self.input_per_1k
            + (usage.output_tokens as f64 / 1000.0) * self.output_per_1k
    }
}

/// Published list prices by provider key.
pub fn pricing_for(provider: &str) -> Option<ModelPricing> {
    let (input_per_1k, output_per_1k) = match provider {
        "openai" => (0.0025, 0.01),
        "anthropic" | "claude" => (0.003, 0.015),
        "gemini" => (0.00125, 0.005),
        _ => return None,
    };
    Some(ModelPricing {
        input_per_1k,
        output_per_1k,
    })
}

/// Cost of a call, zero for unpriced providers.
pub fn cost_usd(provider: &str, usage: TokenUsage) -> f64 {
    pricing_for(provider).map(|p| p.cost(usage)).unwrap_or(0.0)
}

/// A successful chain call, attributed to the provider that produced it.
#[derive(Debug, Clone)]
pub struct Generated<T> {
    pub value: T,
    pub provider: String,
    pub model: String,
    pub usage: TokenUsage,
    pub cost_usd: f64,
    /// Providers tried and failed before this one.
    pub failed_attempts: Vec<ProviderFailure>,
}

impl<T> Generated<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Generated<U> {
        Generated {
            value: f(self.value),
            provider: self.provider,
            model: self.model,
            usage: self.usage,
            cost_usd: self.cost_usd,
            failed_attempts: self.failed_attempts,
        }
    }
}
