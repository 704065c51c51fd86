// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible adapters for the Cairn memory engine.
//!
//! [`OpenAiCompatProvider`] implements [`ProviderAdapter`] over
//! `/chat/completions` and is what the archivist calls for extraction.
//! [`OpenAiCompatEmbedder`] implements [`EmbeddingAdapter`] over
//! `/embeddings`. Both work against local servers such as Ollama.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use cairn_config::model::{ArchivistConfig, EmbeddingConfig};
use cairn_core::error::CairnError;
use cairn_core::traits::{EmbeddingAdapter, PluginAdapter, ProviderAdapter};
use cairn_core::types::{
    AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus, ProviderRequest,
    ProviderResponse, TokenUsage,
};
use tracing::{debug, info};

use crate::client::OpenAiClient;
use crate::types::{
    ChatMessage, ChatRequest, ChatResponse, EmbeddingRequest, EmbeddingResponse, ResponseFormat,
};

/// Chat-completion provider for any OpenAI-compatible server.
pub struct OpenAiCompatProvider {
    client: OpenAiClient,
}

impl OpenAiCompatProvider {
    /// Creates a provider from the archivist section.
    pub fn new(config: &ArchivistConfig) -> Result<Self, CairnError> {
        let client = OpenAiClient::new(
            &config.base_url,
            config.api_key.as_deref(),
            Duration::from_secs(config.timeout_secs),
        )?;
        info!(base_url = %client.base_url(), model = %config.model, "chat provider initialized");
        Ok(Self { client })
    }

    /// Creates a provider with an existing client.
    pub fn with_client(client: OpenAiClient) -> Self {
        Self { client }
    }

    fn to_chat_request(request: &ProviderRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = &request.system_prompt {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: Some(system.clone()),
            });
        }
        messages.extend(request.messages.iter().map(|m| ChatMessage {
            role: m.role.clone(),
            content: Some(m.content.clone()),
        }));

        ChatRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
            response_format: request.json_output.then(ResponseFormat::json_object),
        }
    }
}

#[async_trait]
impl PluginAdapter for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai-compat-chat"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, CairnError> {
        // Avoid spending tokens: only confirm the client exists.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CairnError> {
        debug!("chat provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiCompatProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, CairnError> {
        let chat = Self::to_chat_request(&request);
        let response: ChatResponse = self.client.post_json("chat/completions", &chat).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CairnError::Provider {
                message: "response contained no choices".into(),
                source: None,
            })?;
        let usage = response.usage.unwrap_or_default();

        Ok(ProviderResponse {
            id: response.id,
            content: choice.message.content.unwrap_or_default(),
            model: response.model,
            usage: TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            },
        })
    }
}

/// Embedding adapter for any OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAiCompatEmbedder {
    client: OpenAiClient,
    model: String,
    dimensions: usize,
}

impl OpenAiCompatEmbedder {
    /// Creates an embedder from the embedding section.
    pub fn new(config: &EmbeddingConfig) -> Result<Self, CairnError> {
        let client = OpenAiClient::new(
            &config.base_url,
            config.api_key.as_deref(),
            Duration::from_secs(config.timeout_secs),
        )?;
        info!(
            base_url = %client.base_url(),
            model = %config.model,
            dimensions = config.dimensions,
            "embedder initialized"
        );
        Ok(Self::with_client(client, config.model.clone(), config.dimensions))
    }

    /// Creates an embedder with an existing client.
    pub fn with_client(client: OpenAiClient, model: String, dimensions: usize) -> Self {
        Self {
            client,
            model,
            dimensions,
        }
    }
}

#[async_trait]
impl PluginAdapter for OpenAiCompatEmbedder {
    fn name(&self) -> &str {
        "openai-compat-embedding"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, CairnError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CairnError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for OpenAiCompatEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, CairnError> {
        if input.texts.is_empty() {
            return Ok(EmbeddingOutput {
                embeddings: vec![],
                dimensions: self.dimensions,
            });
        }
        let expected = input.texts.len();
        let request = EmbeddingRequest {
            model: self.model.clone(),
            input: input.texts,
        };
        let response: EmbeddingResponse =
            self.client
                .post_json("embeddings", &request)
                .await
                .map_err(|e| match e {
                    CairnError::Provider { message, source } => {
                        CairnError::Embedding { message, source }
                    }
                    other => other,
                })?;

        let mut data = response.data;
        if data.len() != expected {
            return Err(CairnError::Embedding {
                message: format!("expected {expected} embeddings, got {}", data.len()),
                source: None,
            });
        }
        data.sort_by_key(|d| d.index);

        let embeddings: Vec<Vec<f32>> = data.into_iter().map(|d| d.embedding).collect();
        if let Some(bad) = embeddings.iter().find(|e| e.len() != self.dimensions) {
            return Err(CairnError::DimensionMismatch {
                expected: self.dimensions,
                actual: bad.len(),
                context: format!("embedding model {}", self.model),
            });
        }

        Ok(EmbeddingOutput {
            embeddings,
            dimensions: self.dimensions,
        })
    }
}
