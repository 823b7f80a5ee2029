//! Question answering over a user's own document.

use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{info, warn};

use crate::error::ServiceResult;
use crate::flow::QaState;

use super::DocentService;

impl DocentService {
    /// Answer `question` about document `document_id`, which must belong to `owner_id`
    pub async fn ask(&self, owner_id: i64, document_id: i64, question: &str) -> ServiceResult<String> {
        let document = self.get_document(owner_id, document_id)?;

        let started = Instant::now();
        let result = self
            .qa_graph
            .invoke(QaState::new(document.content, question))
            .await;
        histogram!("docent_ask_duration_seconds").record(started.elapsed().as_secs_f64());

        match result {
            Ok(state) => {
                counter!("docent_asks_total", "outcome" => "answered").increment(1);
                info!(
                    user_id = owner_id,
                    document_id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Answered question"
                );
                Ok(state.answer.unwrap_or_default())
            }
            Err(e) => {
                counter!("docent_asks_total", "outcome" => "failed").increment(1);
                warn!(user_id = owner_id, document_id, error = %e, "Question answering failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::error::ServiceError;
    use crate::rag::testing::UnavailableModel;
    use crate::service::test_support::{test_service, test_service_with_llm};
    use crate::service::DocumentInput;

    fn sky_document(service: &crate::service::DocentService) -> (i64, i64) {
        let owner = service
            .db
            .insert_user("alice", "$argon2id$fake")
            .unwrap()
            .unwrap()
            .id;
        let doc = service
            .create_document(
                owner,
                DocumentInput {
                    title: Some("Sky".to_string()),
                    content: Some("The sky is blue.".to_string()),
                },
            )
            .unwrap();
        (owner, doc.id)
    }

    #[tokio::test]
    async fn test_ask_answers_from_document() {
        let (_dir, service) = test_service();
        let (owner, doc_id) = sky_document(&service);

        let answer = service
            .ask(owner, doc_id, "What color is the sky?")
            .await
            .unwrap();
        assert!(answer.contains("blue"));
    }

    #[tokio::test]
    async fn test_ask_foreign_document_is_not_found() {
        let (_dir, service) = test_service();
        let (_owner, doc_id) = sky_document(&service);
        let bob = service
            .db
            .insert_user("bob_", "$argon2id$fake")
            .unwrap()
            .unwrap()
            .id;

        let err = service
            .ask(bob, doc_id, "What color is the sky?")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::DocumentNotFound { .. }));
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let (_dir, service) = test_service_with_llm(Arc::new(UnavailableModel));
        let (owner, doc_id) = sky_document(&service);

        let err = service.ask(owner, doc_id, "Anything?").await.unwrap_err();
        assert!(matches!(err, ServiceError::Ollama(_)));
        assert_eq!(err.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
