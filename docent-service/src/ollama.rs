use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::OllamaConfig;
use crate::error::{EmbeddingError, OllamaError, ServiceError, ServiceResult};
use crate::rag::{EmbeddingProvider, LanguageModel};

/// Ollama API client
pub struct OllamaClient {
    client: Client,
    config: OllamaConfig,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(config: OllamaConfig) -> ServiceResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                ServiceError::Ollama(OllamaError::Connection {
                    url: config.base_url.clone(),
                    source: e,
                })
            })?;

        Ok(Self { client, config })
    }

    /// Check if Ollama is available
    pub async fn health_check(&self) -> ServiceResult<bool> {
        let url = format!("{}/api/tags", self.config.base_url);

        match self.client.get(&url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(e) => {
                warn!(error = %e, "Ollama health check failed");
                Ok(false)
            }
        }
    }

    /// Generate an embedding for text
    pub async fn embed_text(&self, text: &str) -> ServiceResult<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.config.base_url);

        let request = OllamaEmbeddingRequest {
            model: &self.config.embedding_model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| OllamaError::Connection {
                url: url.clone(),
                source: e,
            })?;

        let response = check_status(response, &self.config.embedding_model).await?;

        let embedding_response: OllamaEmbeddingResponse = response.json().await.map_err(|e| {
            ServiceError::Embedding(EmbeddingError::Generation {
                message: e.to_string(),
            })
        })?;

        if embedding_response.embedding.is_empty() {
            return Err(ServiceError::Embedding(EmbeddingError::Generation {
                message: format!(
                    "model {} returned an empty embedding",
                    self.config.embedding_model
                ),
            }));
        }

        Ok(embedding_response.embedding)
    }

    /// Generate a non-streaming completion for a prompt
    pub async fn generate(&self, prompt: &str) -> ServiceResult<String> {
        let url = format!("{}/api/generate", self.config.base_url);

        let request = OllamaGenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
            },
        };

        debug!(
            model = %self.config.model,
            prompt_length = prompt.len(),
            "Submitting prompt to Ollama"
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| OllamaError::Connection {
                url: url.clone(),
                source: e,
            })?;

        let response = check_status(response, &self.config.model).await?;

        let generate_response: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|e| OllamaError::InvalidResponse { source: e })?;

        Ok(generate_response.response)
    }
}

/// Map a non-success Ollama response to an error
async fn check_status(response: reqwest::Response, model: &str) -> ServiceResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();

    if message.contains("model")
        && (message.contains("not found") || message.contains("does not exist"))
    {
        return Err(ServiceError::Ollama(OllamaError::ModelNotFound {
            model: model.to_string(),
        }));
    }

    Err(ServiceError::Ollama(OllamaError::Generation { status, message }))
}

#[async_trait]
impl EmbeddingProvider for OllamaClient {
    async fn embed(&self, text: &str) -> ServiceResult<Vec<f32>> {
        self.embed_text(text).await
    }

    fn name(&self) -> &str {
        &self.config.embedding_model
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    async fn complete(&self, prompt: &str) -> ServiceResult<String> {
        self.generate(prompt).await
    }

    async fn health_check(&self) -> ServiceResult<bool> {
        OllamaClient::health_check(self).await
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}

// Internal Ollama API types

#[derive(Debug, Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    #[serde(default)]
    response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_request_shape() {
        let request = OllamaGenerateRequest {
            model: "mistral",
            prompt: "Question?",
            stream: false,
            options: OllamaOptions { temperature: 0.0 },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "mistral",
                "prompt": "Question?",
                "stream": false,
                "options": { "temperature": 0.0 },
            })
        );
    }

    #[test]
    fn test_generate_response_parsing() {
        let body = r#"{"model":"mistral","response":"The sky is blue.","done":true}"#;
        let parsed: OllamaGenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.response, "The sky is blue.");
    }

    #[test]
    fn test_embedding_response_parsing() {
        let body = r#"{"embedding":[0.5,-0.25,1.0]}"#;
        let parsed: OllamaEmbeddingResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.embedding, vec![0.5, -0.25, 1.0]);
    }
}
