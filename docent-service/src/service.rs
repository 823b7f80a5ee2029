//! Service coordinator.
//!
//! [`DocentService`] owns the database, the model clients and the QA graph,
//! and exposes the operations the HTTP layer calls. Operations are grouped
//! by domain in the submodules.

mod accounts;
mod documents;
mod qa;

pub use accounts::IssuedToken;
pub use documents::DocumentInput;

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::db::Database;
use crate::error::ServiceResult;
use crate::flow::QaGraph;
use crate::i18n::I18n;
use crate::ollama::OllamaClient;
use crate::rag::{EmbeddingProvider, LanguageModel, RagPipeline};

/// Main service coordinator
pub struct DocentService {
    pub config: Arc<AppConfig>,
    pub db: Arc<Database>,
    pub llm: Arc<dyn LanguageModel>,
    pub qa_graph: QaGraph,
    pub i18n: Arc<I18n>,
}

impl DocentService {
    /// Create a service backed by the configured Ollama instance
    pub async fn new(db: Arc<Database>, config: Arc<AppConfig>) -> ServiceResult<Self> {
        info!("Initializing Docent service");

        let ollama = Arc::new(OllamaClient::new(config.ollama.clone())?);

        // Check Ollama availability
        if ollama.health_check().await? {
            info!(url = %config.ollama.base_url, "Ollama is available");
        } else {
            warn!(url = %config.ollama.base_url, "Ollama is not available");
        }

        Self::with_models(db, config, ollama.clone(), ollama)
    }

    /// Create a service with explicit model implementations
    pub fn with_models(
        db: Arc<Database>,
        config: Arc<AppConfig>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LanguageModel>,
    ) -> ServiceResult<Self> {
        let pipeline = Arc::new(RagPipeline::new(
            embedder,
            llm.clone(),
            config.retrieval.clone(),
        ));
        let qa_graph = QaGraph::single_node(pipeline)?;

        Ok(Self {
            config,
            db,
            llm,
            qa_graph,
            i18n: Arc::new(I18n::new()),
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use tempfile::TempDir;

    use super::DocentService;
    use crate::config::AppConfig;
    use crate::db::Database;
    use crate::rag::LanguageModel;
    use crate::rag::testing::{EchoModel, LetterEmbedder};

    /// Service over a temporary database and deterministic fake models
    pub fn test_service() -> (TempDir, DocentService) {
        test_service_with_llm(Arc::new(EchoModel::default()))
    }

    pub fn test_service_with_llm(llm: Arc<dyn LanguageModel>) -> (TempDir, DocentService) {
        build(AppConfig::default(), llm)
    }

    pub fn test_service_with_config(config: AppConfig) -> (TempDir, DocentService) {
        build(config, Arc::new(EchoModel::default()))
    }

    fn build(config: AppConfig, llm: Arc<dyn LanguageModel>) -> (TempDir, DocentService) {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(Database::open(&dir.path().join("test.db")).unwrap());
        let service =
            DocentService::with_models(db, Arc::new(config), Arc::new(LetterEmbedder), llm)
                .unwrap();
        (dir, service)
    }
}
