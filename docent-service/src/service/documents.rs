//! Owner-scoped document operations.

use serde::Deserialize;
use tracing::info;

use crate::db::{Document, DocumentChanges};
use crate::error::{ServiceError, ServiceResult, ValidationErrors, ValidationIssue};

use super::DocentService;

/// Document fields as submitted by a client.
///
/// Unknown fields, including any `owner`, are dropped during
/// deserialization; the owner always comes from the authenticated user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentInput {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl DocumentInput {
    /// Check the fields, treating absent ones as errors only when `complete`
    fn check(&self, max_title_length: usize, complete: bool) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        match self.title.as_deref() {
            None if complete => errors.add("title", ValidationIssue::Required),
            None => {}
            Some(title) if title.trim().is_empty() => {
                errors.add("title", ValidationIssue::Blank)
            }
            Some(title) if title.chars().count() > max_title_length => errors.add(
                "title",
                ValidationIssue::TooLong {
                    max: max_title_length,
                },
            ),
            Some(_) => {}
        }

        match self.content.as_deref() {
            None if complete => errors.add("content", ValidationIssue::Required),
            None => {}
            Some(content) if content.trim().is_empty() => {
                errors.add("content", ValidationIssue::Blank)
            }
            Some(_) => {}
        }

        errors
    }

    /// Validate a full document, returning its title and content
    fn into_complete(self, max_title_length: usize) -> ServiceResult<(String, String)> {
        let errors = self.check(max_title_length, true);
        match (self.title, self.content) {
            (Some(title), Some(content)) if errors.is_empty() => Ok((title, content)),
            _ => Err(ServiceError::Validation(errors)),
        }
    }

    /// Validate a partial update
    fn into_changes(self, max_title_length: usize) -> ServiceResult<DocumentChanges> {
        self.check(max_title_length, false).into_result()?;
        Ok(DocumentChanges {
            title: self.title,
            content: self.content,
        })
    }
}

fn not_found(id: i64) -> ServiceError {
    ServiceError::DocumentNotFound {
        document_id: id.to_string(),
    }
}

impl DocentService {
    pub fn list_documents(&self, owner_id: i64) -> ServiceResult<Vec<Document>> {
        self.db.list_documents(owner_id)
    }

    /// Create a document owned by `owner_id`
    pub fn create_document(&self, owner_id: i64, input: DocumentInput) -> ServiceResult<Document> {
        let (title, content) = input.into_complete(self.config.limits.max_title_length)?;

        let document = self.db.insert_document(owner_id, &title, &content)?;
        info!(
            user_id = owner_id,
            document_id = document.id,
            content_length = document.content.len(),
            "Created document"
        );

        Ok(document)
    }

    /// Fetch a document, failing with not-found unless `owner_id` owns it
    pub fn get_document(&self, owner_id: i64, id: i64) -> ServiceResult<Document> {
        self.db.get_document(owner_id, id)?.ok_or_else(|| not_found(id))
    }

    /// Replace both title and content
    pub fn replace_document(
        &self,
        owner_id: i64,
        id: i64,
        input: DocumentInput,
    ) -> ServiceResult<Document> {
        // Ownership is checked first so a foreign id never leaks validation details
        self.get_document(owner_id, id)?;
        let (title, content) = input.into_complete(self.config.limits.max_title_length)?;
        let changes = DocumentChanges {
            title: Some(title),
            content: Some(content),
        };
        self.apply_changes(owner_id, id, changes)
    }

    /// Update whichever fields are present
    pub fn patch_document(
        &self,
        owner_id: i64,
        id: i64,
        input: DocumentInput,
    ) -> ServiceResult<Document> {
        self.get_document(owner_id, id)?;
        let changes = input.into_changes(self.config.limits.max_title_length)?;
        self.apply_changes(owner_id, id, changes)
    }

    pub fn delete_document(&self, owner_id: i64, id: i64) -> ServiceResult<()> {
        if !self.db.delete_document(owner_id, id)? {
            return Err(not_found(id));
        }

        info!(user_id = owner_id, document_id = id, "Deleted document");
        Ok(())
    }

    fn apply_changes(
        &self,
        owner_id: i64,
        id: i64,
        changes: DocumentChanges,
    ) -> ServiceResult<Document> {
        let document = self
            .db
            .update_document(owner_id, id, &changes)?
            .ok_or_else(|| not_found(id))?;

        info!(user_id = owner_id, document_id = id, "Updated document");
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::DocumentInput;
    use crate::error::{ServiceError, ValidationIssue};
    use crate::service::test_support::test_service;

    fn input(title: Option<&str>, content: Option<&str>) -> DocumentInput {
        DocumentInput {
            title: title.map(str::to_string),
            content: content.map(str::to_string),
        }
    }

    fn user(service: &crate::service::DocentService, name: &str) -> i64 {
        service.db.insert_user(name, "$argon2id$fake").unwrap().unwrap().id
    }

    #[test]
    fn test_create_and_list_are_owner_scoped() {
        let (_dir, service) = test_service();
        let alice = user(&service, "alice");
        let bob = user(&service, "bob_");

        let doc = service
            .create_document(alice, input(Some("Sky"), Some("The sky is blue.")))
            .unwrap();
        assert_eq!(doc.owner, alice);

        assert_eq!(service.list_documents(alice).unwrap().len(), 1);
        assert!(service.list_documents(bob).unwrap().is_empty());
        assert!(matches!(
            service.get_document(bob, doc.id),
            Err(ServiceError::DocumentNotFound { .. })
        ));
    }

    #[test]
    fn test_create_validates_fields() {
        let (_dir, service) = test_service();
        let alice = user(&service, "alice");

        let err = service
            .create_document(alice, input(None, Some("   ")))
            .unwrap_err();
        match err {
            ServiceError::Validation(errors) => {
                assert_eq!(errors.issues("title"), &[ValidationIssue::Required]);
                assert_eq!(errors.issues("content"), &[ValidationIssue::Blank]);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let long_title = "t".repeat(256);
        let err = service
            .create_document(alice, input(Some(&long_title), Some("body")))
            .unwrap_err();
        match err {
            ServiceError::Validation(errors) => {
                assert_eq!(errors.issues("title"), &[ValidationIssue::TooLong { max: 255 }]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_replace_and_patch() {
        let (_dir, service) = test_service();
        let alice = user(&service, "alice");
        let doc = service
            .create_document(alice, input(Some("Sky"), Some("The sky is blue.")))
            .unwrap();

        // PUT needs both fields
        assert!(matches!(
            service.replace_document(alice, doc.id, input(Some("Only title"), None)),
            Err(ServiceError::Validation(_))
        ));

        let patched = service
            .patch_document(alice, doc.id, input(Some("Weather"), None))
            .unwrap();
        assert_eq!(patched.title, "Weather");
        assert_eq!(patched.content, "The sky is blue.");

        let replaced = service
            .replace_document(alice, doc.id, input(Some("Grass"), Some("Grass is green.")))
            .unwrap();
        assert_eq!(replaced.title, "Grass");
        assert_eq!(replaced.content, "Grass is green.");
    }

    #[test]
    fn test_other_owner_cannot_modify() {
        let (_dir, service) = test_service();
        let alice = user(&service, "alice");
        let bob = user(&service, "bob_");
        let doc = service
            .create_document(alice, input(Some("Sky"), Some("The sky is blue.")))
            .unwrap();

        assert!(matches!(
            service.patch_document(bob, doc.id, input(Some("Mine now"), None)),
            Err(ServiceError::DocumentNotFound { .. })
        ));
        assert!(matches!(
            service.delete_document(bob, doc.id),
            Err(ServiceError::DocumentNotFound { .. })
        ));

        let unchanged = service.get_document(alice, doc.id).unwrap();
        assert_eq!(unchanged.title, "Sky");

        service.delete_document(alice, doc.id).unwrap();
        assert!(service.list_documents(alice).unwrap().is_empty());
    }
}
