use lazy_regex::regex_replace_all;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const COHERE_EMBED_URL: &str = "https://api.cohere.ai/v1/embed";
const COHERE_MODEL: &str = "embed-english-v3.0";
const MIN_TEXT_LEN: usize = 3;
const DEFAULT_CHUNK_SIZE: usize = 500;

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
enum InputType {
    SearchQuery,
    SearchDocument,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [String],
    model: &'a str,
    input_type: InputType,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Text embeddings for lyrics search, backed by the Cohere embed API.
/// Without an API key every generation call yields `None`.
#[derive(Clone)]
pub struct VectorService {
    client: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
}

impl VectorService {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        if api_key.is_none() {
            tracing::warn!("Cohere API key not found. Vector search will be disabled.");
        }
        Self {
            client,
            api_key,
            endpoint: COHERE_EMBED_URL.to_string(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    /// Query-side embedding. `None` when unavailable, text too short, or the API failed.
    pub async fn generate_embedding(&self, text: &str) -> Option<Vec<f32>> {
        let cleaned = clean_text(text);
        if cleaned.chars().count() < MIN_TEXT_LEN {
            tracing::warn!("Text too short for embedding generation");
            return None;
        }

        match self.embed(&[cleaned], InputType::SearchQuery).await {
            Ok(mut embeddings) => {
                let embedding = embeddings.pop().filter(|e| !e.is_empty());
                if let Some(e) = &embedding {
                    tracing::debug!("Generated embedding with {} dimensions", e.len());
                }
                embedding
            }
            Err(e) => {
                tracing::error!("Error generating embedding: {:?}", e);
                None
            }
        }
    }

    /// Document-side embeddings, aligned with `texts`. Entries whose cleaned
    /// text is too short stay `None`, as does everything when the call fails.
    pub async fn generate_embeddings(&self, texts: &[String]) -> Vec<Option<Vec<f32>>> {
        let cleaned: Vec<String> = texts.iter().map(|t| clean_text(t)).collect();
        let usable: Vec<String> = cleaned
            .iter()
            .filter(|t| t.chars().count() >= MIN_TEXT_LEN)
            .cloned()
            .collect();

        if usable.is_empty() {
            return vec![None; texts.len()];
        }

        let embeddings = match self.embed(&usable, InputType::SearchDocument).await {
            Ok(embeddings) => embeddings,
            Err(e) => {
                tracing::error!("Error generating embeddings: {:?}", e);
                return vec![None; texts.len()];
            }
        };

        let mut produced = embeddings.into_iter();
        cleaned
            .iter()
            .map(|t| {
                if t.chars().count() < MIN_TEXT_LEN {
                    None
                } else {
                    produced.next()
                }
            })
            .collect()
    }

    /// Embedding for long documents such as lyrics: sentence-aligned chunks
    /// are embedded together and mean-pooled into one vector.
    pub async fn generate_document_embedding(&self, text: &str) -> Option<Vec<f32>> {
        let chunks = chunk_text(text, DEFAULT_CHUNK_SIZE);
        let embeddings: Vec<Vec<f32>> = self
            .generate_embeddings(&chunks)
            .await
            .into_iter()
            .flatten()
            .collect();
        mean_vector(&embeddings)
    }

    async fn embed(&self, texts: &[String], input_type: InputType) -> Result<Vec<Vec<f32>>> {
        let api_key = self.api_key.as_deref().ok_or_else(|| Error::ExternalService {
            service: "cohere".to_string(),
            message: "embedding service not configured".to_string(),
        })?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&EmbedRequest {
                texts,
                model: COHERE_MODEL,
                input_type,
            })
            .send()
            .await?
            .error_for_status()?;

        let body: EmbedResponse = response.json().await?;
        Ok(body.embeddings)
    }
}

/// Cosine similarity of two equally sized vectors; 0 when either has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(Error::InvalidInput {
            reason: "Vectors must have the same length".to_string(),
        });
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let (norm_a, norm_b) = (norm_a.sqrt(), norm_b.sqrt());
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (norm_a * norm_b))
}

/// Element-wise mean; `None` for no vectors or mismatched lengths.
pub fn mean_vector(vectors: &[Vec<f32>]) -> Option<Vec<f32>> {
    let dim = vectors.first()?.len();
    if dim == 0 || vectors.iter().any(|v| v.len() != dim) {
        return None;
    }
    let mut mean = vec![0.0f32; dim];
    for v in vectors {
        for (m, x) in mean.iter_mut().zip(v) {
            *m += x;
        }
    }
    let n = vectors.len() as f32;
    mean.iter_mut().for_each(|m| *m /= n);
    Some(mean)
}

/// Trims, collapses whitespace, drops everything but word characters,
/// whitespace and `-.,!?`, then lowercases.
pub fn clean_text(text: &str) -> String {
    let collapsed = regex_replace_all!(r"\s+", text.trim(), " ");
    let filtered = regex_replace_all!(r"[^A-Za-z0-9_\s\-.,!?]", &collapsed, "");
    filtered.to_lowercase()
}

/// Splits cleaned text into sentence-aligned chunks of at most `max_chunk_size`.
pub fn chunk_text(text: &str, max_chunk_size: usize) -> Vec<String> {
    let cleaned = clean_text(text);
    if cleaned.len() <= max_chunk_size {
        return vec![cleaned];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in cleaned
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        if current.len() + sentence.len() <= max_chunk_size {
            if !current.is_empty() {
                current.push_str(". ");
            }
            current.push_str(sentence);
        } else {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            current = sentence.to_string();
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    if chunks.is_empty() {
        chunks.push(cleaned.chars().take(max_chunk_size).collect());
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]).unwrap() - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap().abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 1.0], &[-1.0, -1.0]).unwrap() + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]).unwrap(), 0.0);
        assert!(cosine_similarity(&[1.0], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  Hello,\n\n   World!  "), "hello, world!");
        assert_eq!(clean_text("Love & 'peace' ♥"), "love  peace ");
        assert_eq!(clean_text("well-known?"), "well-known?");
    }

    #[test]
    fn test_chunk_text_short_input_is_single_chunk() {
        assert_eq!(chunk_text("One line.", 500), vec!["one line."]);
    }

    #[test]
    fn test_chunk_text_splits_on_sentences() {
        let text = "aaaa bbbb. cccc dddd. eeee ffff.";
        let chunks = chunk_text(text, 12);
        assert_eq!(chunks, vec!["aaaa bbbb", "cccc dddd", "eeee ffff"]);
        assert!(chunks.iter().all(|c| c.len() <= 12));

        let merged = chunk_text(text, 25);
        assert_eq!(merged, vec!["aaaa bbbb. cccc dddd", "eeee ffff"]);
    }

    #[test]
    fn test_mean_vector() {
        let pooled = mean_vector(&[vec![1.0, 3.0], vec![3.0, 5.0]]).unwrap();
        assert_eq!(pooled, vec![2.0, 4.0]);
        assert!(mean_vector(&[]).is_none());
        assert!(mean_vector(&[vec![1.0], vec![1.0, 2.0]]).is_none());
    }

    #[tokio::test]
    async fn test_unavailable_service_yields_none() {
        let service = VectorService::new(reqwest::Client::new(), None);
        assert!(!service.is_available());
        assert!(service.generate_embedding("some lyrics here").await.is_none());

        let texts = vec!["first song".to_string(), "x".to_string()];
        assert_eq!(service.generate_embeddings(&texts).await, vec![None, None]);
        assert!(service
            .generate_document_embedding("A verse. Another verse.")
            .await
            .is_none());
    }
}
