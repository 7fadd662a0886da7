//! Pinecone REST query client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;

use crate::error::{Result, TattvaError};
use crate::traits::{VectorIndex, VectorQuery};
use crate::types::{PassageMetadata, RetrievedPassage, SearchFilter};

const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// A single Pinecone index addressed by its data-plane host.
pub struct PineconeIndex {
    client: reqwest::Client,
    host: String,
    api_key: String,
    namespace: Option<String>,
}

impl PineconeIndex {
    /// `host` is the index host from the console, with or without scheme.
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Self {
        let host = host.into();
        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host
        } else {
            format!("https://{}", host)
        };
        Self {
            client: reqwest::Client::new(),
            host: host.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            namespace: None,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    fn request_body<'a>(&'a self, query: &'a VectorQuery) -> QueryRequest<'a> {
        QueryRequest {
            vector: &query.vector,
            top_k: query.top_k,
            include_metadata: true,
            filter: metadata_filter(&query.filter),
            namespace: self.namespace.as_deref(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<Match>,
}

#[derive(Deserialize)]
struct Match {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<PassageMetadata>,
}

/// Pinecone metadata filter: an implicit AND of equality conditions.
/// `None` when nothing is constrained.
pub fn metadata_filter(filter: &SearchFilter) -> Option<Value> {
    let mut conditions = Map::new();

    if let Some(kanda) = &filter.structural.kanda {
        conditions.insert("kanda".into(), json!({ "$eq": kanda }));
    }
    if let Some(sarga) = filter.structural.sarga {
        conditions.insert("sarga".into(), json!({ "$eq": sarga }));
    }
    if let Some(shloka) = filter.structural.shloka {
        conditions.insert("shloka".into(), json!({ "$eq": shloka }));
    }
    if filter.require_translation {
        conditions.insert("has_translation".into(), json!({ "$eq": true }));
    }
    if filter.require_comments {
        conditions.insert("has_comments".into(), json!({ "$eq": true }));
    }

    if conditions.is_empty() {
        None
    } else {
        Some(Value::Object(conditions))
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn query(&self, query: &VectorQuery) -> Result<Vec<RetrievedPassage>> {
        let url = format!("{}/query", self.host);
        let body = self.request_body(query);

        let resp = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .timeout(QUERY_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| TattvaError::VectorSearch(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(TattvaError::VectorSearch(format!(
                "query failed ({}): {}",
                status.as_u16(),
                message
            )));
        }

        let parsed: QueryResponse = resp
            .json()
            .await
            .map_err(|e| TattvaError::VectorSearch(format!("invalid query response: {}", e)))?;

        debug!(matches = parsed.matches.len(), top_k = query.top_k, "Pinecone query complete");

        Ok(parsed
            .matches
            .into_iter()
            .map(|m| RetrievedPassage {
                id: m.id,
                score: m.score,
                metadata: m.metadata.unwrap_or_default(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StructuralFilter;

    #[test]
    fn test_empty_filter_is_omitted() {
        assert_eq!(metadata_filter(&SearchFilter::default()), None);
    }

    #[test]
    fn test_filter_ands_config_and_structural_conditions() {
        let filter = SearchFilter {
            require_translation: true,
            require_comments: true,
            structural: StructuralFilter {
                kanda: Some("Sundara Kanda".into()),
                sarga: Some(15),
                shloka: None,
            },
        };

        assert_eq!(
            metadata_filter(&filter),
            Some(json!({
                "kanda": {"$eq": "Sundara Kanda"},
                "sarga": {"$eq": 15},
                "has_translation": {"$eq": true},
                "has_comments": {"$eq": true}
            }))
        );
    }

    #[test]
    fn test_request_body_shape() {
        let index = PineconeIndex::new("ramayana-abc.svc.pinecone.io/", "key");
        assert_eq!(index.host, "https://ramayana-abc.svc.pinecone.io");

        let query = VectorQuery {
            vector: vec![0.5, 0.25],
            top_k: 5,
            filter: SearchFilter::default(),
        };
        let body = serde_json::to_value(index.request_body(&query)).unwrap();
        assert_eq!(body, json!({"vector": [0.5, 0.25], "topK": 5, "includeMetadata": true}));

        let index = index.with_namespace("valmiki");
        let body = serde_json::to_value(index.request_body(&query)).unwrap();
        assert_eq!(body["namespace"], "valmiki");
    }

    #[test]
    fn test_match_metadata_parses_float_numbers() {
        let raw = json!({"matches": [{
            "id": "Yuddha Kanda-18-3",
            "score": 0.83,
            "metadata": {"kanda": "Yuddha Kanda", "sarga": 18.0, "shloka": 3.0,
                         "has_translation": true, "translation": "Vibhishana came"}
        }]});
        let parsed: QueryResponse = serde_json::from_value(raw).unwrap();
        let meta = parsed.matches[0].metadata.clone().unwrap();
        assert_eq!(meta.citation(), "Yuddha Kanda 18.3");
    }
}
