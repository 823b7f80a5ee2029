//! Document CRUD operations.
//!
//! Every statement here filters on `owner_id`. A document owned by another
//! user is indistinguishable from one that does not exist.

use chrono::Utc;
use rusqlite::{OptionalExtension, params};

use super::models::Document;
use super::{Database, format_timestamp};
use crate::error::{DatabaseError, ServiceResult};

const DOCUMENT_COLUMNS: &str = "id, owner_id, title, content, created_at, updated_at";

/// Field changes for an update; `None` leaves the stored value untouched
#[derive(Debug, Clone, Default)]
pub struct DocumentChanges {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl Database {
    /// Insert a new document owned by `owner_id`
    pub fn insert_document(
        &self,
        owner_id: i64,
        title: &str,
        content: &str,
    ) -> ServiceResult<Document> {
        let conn = self.conn.lock().unwrap();
        let now = format_timestamp(Utc::now());

        conn.execute(
            "INSERT INTO documents (owner_id, title, content, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
            params![owner_id, title, content, now],
        )
        .map_err(DatabaseError::Query)?;

        let id = conn.last_insert_rowid();
        conn.query_row(
            &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?1"),
            params![id],
            Document::from_row,
        )
        .map_err(|e| DatabaseError::Query(e).into())
    }

    /// List the documents owned by `owner_id`
    pub fn list_documents(&self, owner_id: i64) -> ServiceResult<Vec<Document>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE owner_id = ?1 ORDER BY id"
            ))
            .map_err(DatabaseError::Query)?;

        let rows = stmt
            .query_map(params![owner_id], Document::from_row)
            .map_err(DatabaseError::Query)?;

        let mut docs = Vec::new();
        for row in rows {
            docs.push(row.map_err(DatabaseError::Query)?);
        }

        Ok(docs)
    }

    /// Get a document by ID, only if owned by `owner_id`
    pub fn get_document(&self, owner_id: i64, id: i64) -> ServiceResult<Option<Document>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?1 AND owner_id = ?2"),
            params![id, owner_id],
            Document::from_row,
        )
        .optional()
        .map_err(|e| DatabaseError::Query(e).into())
    }

    /// Apply changes to a document owned by `owner_id`.
    ///
    /// Returns the updated document, or `None` if no owned document matched.
    pub fn update_document(
        &self,
        owner_id: i64,
        id: i64,
        changes: &DocumentChanges,
    ) -> ServiceResult<Option<Document>> {
        let conn = self.conn.lock().unwrap();

        let rows = conn
            .execute(
                "UPDATE documents SET title = COALESCE(?1, title), content = COALESCE(?2, content), updated_at = ?3 \
                 WHERE id = ?4 AND owner_id = ?5",
                params![
                    changes.title,
                    changes.content,
                    format_timestamp(Utc::now()),
                    id,
                    owner_id,
                ],
            )
            .map_err(DatabaseError::Query)?;

        if rows == 0 {
            return Ok(None);
        }

        conn.query_row(
            &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?1 AND owner_id = ?2"),
            params![id, owner_id],
            Document::from_row,
        )
        .optional()
        .map_err(|e| DatabaseError::Query(e).into())
    }

    /// Delete a document owned by `owner_id`
    pub fn delete_document(&self, owner_id: i64, id: i64) -> ServiceResult<bool> {
        let conn = self.conn.lock().unwrap();

        let rows = conn
            .execute(
                "DELETE FROM documents WHERE id = ?1 AND owner_id = ?2",
                params![id, owner_id],
            )
            .map_err(DatabaseError::Query)?;

        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::DocumentChanges;
    use crate::db::test_support::temp_database;

    #[test]
    fn test_documents_are_scoped_by_owner() {
        let (_dir, db) = temp_database();
        let alice = db.insert_user("alice", "hash").unwrap().unwrap();
        let bob = db.insert_user("bob_", "hash").unwrap().unwrap();

        let doc = db
            .insert_document(alice.id, "Sky", "The sky is blue.")
            .unwrap();
        assert_eq!(doc.owner, alice.id);

        assert_eq!(db.list_documents(alice.id).unwrap().len(), 1);
        assert!(db.list_documents(bob.id).unwrap().is_empty());

        assert!(db.get_document(alice.id, doc.id).unwrap().is_some());
        assert!(db.get_document(bob.id, doc.id).unwrap().is_none());
    }

    #[test]
    fn test_update_and_delete_require_ownership() {
        let (_dir, db) = temp_database();
        let alice = db.insert_user("alice", "hash").unwrap().unwrap();
        let bob = db.insert_user("bob_", "hash").unwrap().unwrap();
        let doc = db.insert_document(alice.id, "Sky", "The sky is blue.").unwrap();

        let changes = DocumentChanges {
            title: Some("Stolen".to_string()),
            content: None,
        };
        assert!(db.update_document(bob.id, doc.id, &changes).unwrap().is_none());
        assert!(!db.delete_document(bob.id, doc.id).unwrap());

        let unchanged = db.get_document(alice.id, doc.id).unwrap().unwrap();
        assert_eq!(unchanged.title, "Sky");

        let updated = db
            .update_document(alice.id, doc.id, &changes)
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "Stolen");
        assert_eq!(updated.content, "The sky is blue.");

        assert!(db.delete_document(alice.id, doc.id).unwrap());
        assert!(db.get_document(alice.id, doc.id).unwrap().is_none());
    }
}
