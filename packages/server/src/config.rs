use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use tattva::stores::jsonl::DEFAULT_TRACE_LOG;
use tattva::ValidationPolicy;

const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-haiku-20240307";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Where query vectors are searched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VectorBackend {
    /// Hosted Pinecone index.
    Pinecone { api_key: String, host: String },
    /// Exported corpus loaded into memory (local runs).
    File(PathBuf),
}

/// Where traces are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceBackend {
    Jsonl(PathBuf),
    Postgres(String),
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub openai_api_key: String,
    pub anthropic_api_key: Option<String>,
    pub openai_model: String,
    pub anthropic_model: String,
    pub embedding_model: String,
    pub default_provider: Option<String>,
    pub vector_backend: VectorBackend,
    pub trace_backend: TraceBackend,
    pub validation_policy: ValidationPolicy,
    pub query_expansion: bool,
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // Embeddings always go through OpenAI
        let openai_api_key = get("OPENAI_API_KEY")
            .context("OPENAI_API_KEY must be set (required for query embeddings)")?;

        let vector_backend = match (get("PINECONE_API_KEY"), get("PINECONE_INDEX_HOST")) {
            (Some(api_key), Some(host)) => VectorBackend::Pinecone { api_key, host },
            (Some(_), None) => bail!("PINECONE_INDEX_HOST must be set when PINECONE_API_KEY is"),
            _ => match get("CORPUS_INDEX_PATH") {
                Some(path) => VectorBackend::File(path.into()),
                None => bail!("Set PINECONE_API_KEY and PINECONE_INDEX_HOST, or CORPUS_INDEX_PATH"),
            },
        };

        let trace_backend = match get("DATABASE_URL") {
            Some(url) => TraceBackend::Postgres(url),
            None => TraceBackend::Jsonl(
                get("TRACE_LOG_PATH")
                    .unwrap_or_else(|| DEFAULT_TRACE_LOG.to_string())
                    .into(),
            ),
        };

        let default_provider = get("DEFAULT_LLM_PROVIDER").map(|p| p.trim().to_lowercase());
        if let Some(provider) = &default_provider {
            if provider != "openai" && provider != "anthropic" {
                bail!("DEFAULT_LLM_PROVIDER must be openai or anthropic, got {}", provider);
            }
        }

        Ok(Self {
            port: get("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            openai_api_key,
            anthropic_api_key: get("ANTHROPIC_API_KEY"),
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            anthropic_model: get("ANTHROPIC_MODEL")
                .unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string()),
            embedding_model: get("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            default_provider,
            vector_backend,
            trace_backend,
            validation_policy: match get("VALIDATION_POLICY") {
                Some(policy) => policy
                    .parse()
                    .map_err(anyhow::Error::msg)
                    .context("VALIDATION_POLICY must be advisory or retry_once")?,
                None => ValidationPolicy::default(),
            },
            query_expansion: match get("QUERY_EXPANSION") {
                Some(flag) => parse_bool(&flag).context("QUERY_EXPANSION must be true or false")?,
                None => false,
            },
            allowed_origins: get("ALLOWED_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("not a boolean: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[("OPENAI_API_KEY", "sk-test"), ("CORPUS_INDEX_PATH", "data/index.json")]).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.openai_model, "gpt-4o");
        assert_eq!(config.anthropic_model, "claude-3-haiku-20240307");
        assert_eq!(config.embedding_model, "text-embedding-3-small");
        assert_eq!(config.vector_backend, VectorBackend::File("data/index.json".into()));
        assert_eq!(config.trace_backend, TraceBackend::Jsonl("logs/traces.jsonl".into()));
        assert_eq!(config.validation_policy, ValidationPolicy::Advisory);
        assert!(!config.query_expansion);
        assert!(config.anthropic_api_key.is_none());
        assert!(config.allowed_origins.is_empty());
    }

    #[test]
    fn test_openai_key_is_required() {
        let err = config(&[("ANTHROPIC_API_KEY", "sk-ant"), ("CORPUS_INDEX_PATH", "x.json")]).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_pinecone_needs_host() {
        let err = config(&[("OPENAI_API_KEY", "sk-test"), ("PINECONE_API_KEY", "pc")]).unwrap_err();
        assert!(err.to_string().contains("PINECONE_INDEX_HOST"));

        let config = config(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("PINECONE_API_KEY", "pc"),
            ("PINECONE_INDEX_HOST", "https://ramayana.svc.pinecone.io"),
            ("CORPUS_INDEX_PATH", "ignored.json"),
        ])
        .unwrap();
        assert!(matches!(config.vector_backend, VectorBackend::Pinecone { .. }));
    }

    #[test]
    fn test_database_url_selects_postgres_traces() {
        let config = config(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("CORPUS_INDEX_PATH", "x.json"),
            ("DATABASE_URL", "postgres://localhost/tattva"),
            ("TRACE_LOG_PATH", "ignored.jsonl"),
        ])
        .unwrap();
        assert_eq!(config.trace_backend, TraceBackend::Postgres("postgres://localhost/tattva".into()));
    }

    #[test]
    fn test_parses_optional_settings() {
        let config = config(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("CORPUS_INDEX_PATH", "x.json"),
            ("PORT", "3001"),
            ("DEFAULT_LLM_PROVIDER", "Anthropic"),
            ("VALIDATION_POLICY", "retry-once"),
            ("QUERY_EXPANSION", "yes"),
            ("ALLOWED_ORIGINS", "http://localhost:3000, https://tattva.app,"),
        ])
        .unwrap();

        assert_eq!(config.port, 3001);
        assert_eq!(config.default_provider.as_deref(), Some("anthropic"));
        assert_eq!(config.validation_policy, ValidationPolicy::RetryOnce);
        assert!(config.query_expansion);
        assert_eq!(config.allowed_origins, vec!["http://localhost:3000", "https://tattva.app"]);
    }

    #[test]
    fn test_rejects_bad_values() {
        let base = [("OPENAI_API_KEY", "sk-test"), ("CORPUS_INDEX_PATH", "x.json")];

        let mut vars = base.to_vec();
        vars.push(("PORT", "eighty"));
        assert!(config(&vars).is_err());

        let mut vars = base.to_vec();
        vars.push(("DEFAULT_LLM_PROVIDER", "gemini"));
        assert!(config(&vars).is_err());

        let mut vars = base.to_vec();
        vars.push(("VALIDATION_POLICY", "strict"));
        assert!(config(&vars).is_err());
    }
}
