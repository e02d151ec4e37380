use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::OnceCell;

use crate::core::config::Settings;
use crate::grading::resolvers::{ResolverError, SimilarityResolver};

/// Similarity from an OpenAI-compatible `/embeddings` endpoint.
///
/// The HTTP client is built on first use so an unconfigured deployment never
/// pays for it.
#[derive(Debug)]
pub(crate) struct EmbeddingSimilarity {
    client: OnceCell<Client>,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl EmbeddingSimilarity {
    pub(crate) fn from_settings(settings: &Settings) -> Self {
        let ai = settings.ai();
        Self {
            client: OnceCell::new(),
            api_key: ai.openai_api_key.clone(),
            base_url: ai.openai_base_url.trim_end_matches('/').to_string(),
            model: ai.embedding_model.clone(),
            timeout: Duration::from_secs(ai.ai_request_timeout),
        }
    }

    pub(crate) fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.base_url.is_empty()
    }

    async fn client(&self) -> Result<&Client, ResolverError> {
        self.client
            .get_or_try_init(|| async {
                Client::builder()
                    .connect_timeout(Duration::from_secs(10))
                    .timeout(self.timeout)
                    .build()
                    .map_err(|err| ResolverError::Request(err.to_string()))
            })
            .await
    }

    async fn embed_pair(
        &self,
        left: &str,
        right: &str,
    ) -> Result<(Vec<f64>, Vec<f64>), ResolverError> {
        if !self.is_configured() {
            return Err(ResolverError::NotConfigured("embedding similarity"));
        }

        let payload = json!({
            "model": self.model,
            "input": [left, right],
        });
        let url = format!("{}/embeddings", self.base_url);

        let response = self
            .client()
            .await?
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| ResolverError::Request(err.to_string()))?;

        let status = response.status();
        let body: Value =
            response.json().await.map_err(|err| ResolverError::InvalidResponse(err.to_string()))?;
        if !status.is_success() {
            return Err(ResolverError::Request(format!("embedding API error {status}: {body}")));
        }

        let mut vectors = parse_embeddings(&body)?;
        if vectors.len() != 2 {
            return Err(ResolverError::InvalidResponse(format!(
                "expected 2 embeddings, got {}",
                vectors.len()
            )));
        }
        let right_vector = vectors.pop().unwrap_or_default();
        let left_vector = vectors.pop().unwrap_or_default();
        Ok((left_vector, right_vector))
    }
}

fn parse_embeddings(body: &Value) -> Result<Vec<Vec<f64>>, ResolverError> {
    let data = body
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| ResolverError::InvalidResponse("missing embedding data".to_string()))?;

    let mut items: Vec<(u64, Vec<f64>)> = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let index = item.get("index").and_then(Value::as_u64).unwrap_or(position as u64);
        let vector = item
            .get("embedding")
            .and_then(Value::as_array)
            .ok_or_else(|| ResolverError::InvalidResponse("missing embedding vector".to_string()))?
            .iter()
            .map(|value| {
                value.as_f64().ok_or_else(|| {
                    ResolverError::InvalidResponse("non-numeric embedding value".to_string())
                })
            })
            .collect::<Result<Vec<f64>, _>>()?;
        items.push((index, vector));
    }
    items.sort_by_key(|(index, _)| *index);
    Ok(items.into_iter().map(|(_, vector)| vector).collect())
}

pub(crate) fn cosine(left: &[f64], right: &[f64]) -> f64 {
    if left.len() != right.len() || left.is_empty() {
        return 0.0;
    }
    let dot: f64 = left.iter().zip(right).map(|(a, b)| a * b).sum();
    let left_norm = left.iter().map(|v| v * v).sum::<f64>().sqrt();
    let right_norm = right.iter().map(|v| v * v).sum::<f64>().sqrt();
    if left_norm == 0.0 || right_norm == 0.0 {
        return 0.0;
    }
    (dot / (left_norm * right_norm)).clamp(0.0, 1.0)
}

#[async_trait]
impl SimilarityResolver for EmbeddingSimilarity {
    async fn similarity(&self, left: &str, right: &str) -> Result<f64, ResolverError> {
        if left.trim().is_empty() || right.trim().is_empty() {
            return Ok(0.0);
        }
        let (left_vector, right_vector) = self.embed_pair(left, right).await?;
        Ok(cosine(&left_vector, &right_vector))
    }
}

/// Tries the primary resolver and falls back on any error.
pub(crate) struct FallbackSimilarity {
    name: &'static str,
    primary: Arc<dyn SimilarityResolver>,
    fallback: Arc<dyn SimilarityResolver>,
}

impl FallbackSimilarity {
    pub(crate) fn new(
        name: &'static str,
        primary: Arc<dyn SimilarityResolver>,
        fallback: Arc<dyn SimilarityResolver>,
    ) -> Self {
        Self { name, primary, fallback }
    }
}

#[async_trait]
impl SimilarityResolver for FallbackSimilarity {
    async fn similarity(&self, left: &str, right: &str) -> Result<f64, ResolverError> {
        match self.primary.similarity(left, right).await {
            Ok(value) => Ok(value),
            Err(err) => {
                tracing::warn!(
                    resolver = self.name,
                    error = %err,
                    "Similarity resolver failed; using fallback"
                );
                metrics::counter!("resolver_fallbacks_total", "resolver" => self.name).increment(1);
                self.fallback.similarity(left, right).await
            }
        }
    }
}
