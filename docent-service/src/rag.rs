//! Retrieval-augmented question answering over a single document.
//!
//! For every question the document is chunked, embedded into a fresh
//! [`VectorIndex`], the closest chunks are retrieved, and the generative
//! model answers from a fixed prompt template. Nothing is cached between
//! calls.

mod chunking;
mod index;
mod prompt;

pub use chunking::chunk_text;
pub use index::VectorIndex;
pub use prompt::{build_qa_prompt, format_context};

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::config::RetrievalConfig;
use crate::error::ServiceResult;

/// Produces embedding vectors for text
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text
    async fn embed(&self, text: &str) -> ServiceResult<Vec<f32>>;

    /// Model name for logging
    fn name(&self) -> &str;
}

/// Generative model that completes a prompt
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete `prompt` and return the generated text
    async fn complete(&self, prompt: &str) -> ServiceResult<String>;

    /// Check whether the model service is reachable
    async fn health_check(&self) -> ServiceResult<bool>;

    /// Model name for logging
    fn name(&self) -> &str;
}

/// The document QA pipeline
pub struct RagPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LanguageModel>,
    config: RetrievalConfig,
}

impl RagPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LanguageModel>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            llm,
            config,
        }
    }

    /// Answer `question` using only `document_text` as context
    pub async fn answer(&self, document_text: &str, question: &str) -> ServiceResult<String> {
        let chunks = chunk_text(
            document_text,
            self.config.chunk_size,
            self.config.chunk_overlap,
        );

        let index = VectorIndex::from_texts(self.embedder.as_ref(), chunks).await?;

        let retrieved = if index.is_empty() {
            Vec::new()
        } else {
            let query_embedding = self.embedder.embed(question).await?;
            index.search(&query_embedding, self.config.top_k)?
        };

        debug!(
            chunks = index.len(),
            retrieved = retrieved.len(),
            embedding_model = %self.embedder.name(),
            model = %self.llm.name(),
            "Retrieved context for question"
        );

        let context = format_context(&retrieved);
        let prompt = build_qa_prompt(&context, question);

        self.llm.complete(&prompt).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Deterministic stand-ins for the model services.

    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::{EmbeddingProvider, LanguageModel};
    use crate::error::{OllamaError, ServiceResult};

    /// Embeds text as its 26 letter frequencies
    pub struct LetterEmbedder;

    #[async_trait]
    impl EmbeddingProvider for LetterEmbedder {
        async fn embed(&self, text: &str) -> ServiceResult<Vec<f32>> {
            let mut counts = vec![0.0; 26];
            for c in text.chars().filter(char::is_ascii_alphabetic) {
                counts[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
            }
            Ok(counts)
        }

        fn name(&self) -> &str {
            "letters"
        }
    }

    /// Answers with the prompt it was given, recording every prompt
    #[derive(Default)]
    pub struct EchoModel {
        pub prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LanguageModel for EchoModel {
        async fn complete(&self, prompt: &str) -> ServiceResult<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(prompt.to_string())
        }

        async fn health_check(&self) -> ServiceResult<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    /// Always fails as if the model service were down
    pub struct UnavailableModel;

    #[async_trait]
    impl LanguageModel for UnavailableModel {
        async fn complete(&self, _prompt: &str) -> ServiceResult<String> {
            Err(OllamaError::Generation {
                status: 503,
                message: "model unavailable".to_string(),
            }
            .into())
        }

        async fn health_check(&self) -> ServiceResult<bool> {
            Ok(false)
        }

        fn name(&self) -> &str {
            "unavailable"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{EchoModel, LetterEmbedder, UnavailableModel};
    use super::*;

    fn retrieval(chunk_size: usize, chunk_overlap: usize, top_k: usize) -> RetrievalConfig {
        RetrievalConfig {
            chunk_size,
            chunk_overlap,
            top_k,
        }
    }

    #[tokio::test]
    async fn test_answer_uses_document_as_context() {
        let llm = Arc::new(EchoModel::default());
        let pipeline = RagPipeline::new(Arc::new(LetterEmbedder), llm.clone(), retrieval(512, 64, 4));

        let answer = pipeline
            .answer("The sky is blue.", "What color is the sky?")
            .await
            .unwrap();

        assert!(answer.contains("blue"));
        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Context:\nThe sky is blue.\n"));
        assert!(prompts[0].contains("Question:\nWhat color is the sky?\n"));
    }

    #[tokio::test]
    async fn test_only_top_chunks_reach_the_prompt() {
        let llm = Arc::new(EchoModel::default());
        let pipeline = RagPipeline::new(Arc::new(LetterEmbedder), llm.clone(), retrieval(3, 0, 1));

        let document = "zzz zzz zzz the sky blue qqq qqq qqq";
        pipeline.answer(document, "sky blue the").await.unwrap();

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("the sky blue"));
        assert!(!prompts[0].contains("zzz"));
        assert!(!prompts[0].contains("qqq"));
    }

    #[tokio::test]
    async fn test_empty_document_still_asks_model() {
        let llm = Arc::new(EchoModel::default());
        let pipeline = RagPipeline::new(Arc::new(LetterEmbedder), llm.clone(), retrieval(512, 64, 4));

        pipeline.answer("", "Anything?").await.unwrap();

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("Context:\n\n\nQuestion:\nAnything?"));
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let pipeline = RagPipeline::new(
            Arc::new(LetterEmbedder),
            Arc::new(UnavailableModel),
            retrieval(512, 64, 4),
        );

        let result = pipeline.answer("The sky is blue.", "What color?").await;
        assert!(result.is_err());
    }
}
