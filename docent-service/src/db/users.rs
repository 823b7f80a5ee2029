//! User account operations.

use chrono::Utc;
use rusqlite::{OptionalExtension, params};

use super::models::User;
use super::{Database, format_timestamp, is_constraint_violation};
use crate::error::{DatabaseError, ServiceResult};

impl Database {
    /// Insert a new user.
    ///
    /// Returns `None` when the username is already taken, including when a
    /// concurrent registration won the race for the UNIQUE constraint.
    pub fn insert_user(&self, username: &str, password_hash: &str) -> ServiceResult<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let created_at = Utc::now();

        let result = conn.execute(
            "INSERT INTO users (username, password_hash, created_at) VALUES (?1, ?2, ?3)",
            params![username, password_hash, format_timestamp(created_at)],
        );

        match result {
            Ok(_) => {}
            Err(e) if is_constraint_violation(&e) => return Ok(None),
            Err(e) => return Err(DatabaseError::Query(e).into()),
        }

        let id = conn.last_insert_rowid();
        conn.query_row(
            "SELECT id, username, password_hash, created_at FROM users WHERE id = ?1",
            params![id],
            User::from_row,
        )
        .map(Some)
        .map_err(|e| DatabaseError::Query(e).into())
    }

    /// Get a user by exact (case-sensitive) username
    pub fn get_user_by_username(&self, username: &str) -> ServiceResult<Option<User>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = ?1",
            params![username],
            User::from_row,
        )
        .optional()
        .map_err(|e| DatabaseError::Query(e).into())
    }

    /// Check whether a username is already registered
    pub fn username_exists(&self, username: &str) -> ServiceResult<bool> {
        let conn = self.conn.lock().unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM users WHERE username = ?1",
                params![username],
                |row| row.get(0),
            )
            .map_err(DatabaseError::Query)?;

        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::test_support::temp_database;

    #[test]
    fn test_insert_and_lookup_user() {
        let (_dir, db) = temp_database();

        let user = db.insert_user("alice", "hash").unwrap().unwrap();
        assert_eq!(user.username, "alice");

        let found = db.get_user_by_username("alice").unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.password_hash, "hash");

        assert!(db.username_exists("alice").unwrap());
        assert!(!db.username_exists("Alice").unwrap());
    }

    #[test]
    fn test_duplicate_username_returns_none() {
        let (_dir, db) = temp_database();

        assert!(db.insert_user("alice", "hash").unwrap().is_some());
        assert!(db.insert_user("alice", "other").unwrap().is_none());
    }
}
