//! Bearer-token session storage.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};

use super::models::Session;
use super::{Database, format_timestamp, parse_timestamp};
use crate::error::{DatabaseError, ServiceResult};

impl Database {
    /// Store a session keyed by the digest of its token
    pub fn insert_session(
        &self,
        token_hash: &str,
        user_id: i64,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> ServiceResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                token_hash,
                user_id,
                format_timestamp(created_at),
                format_timestamp(expires_at),
            ],
        )
        .map_err(DatabaseError::Query)?;

        Ok(())
    }

    /// Look up a session by token digest (expired sessions are returned too)
    pub fn get_session(&self, token_hash: &str) -> ServiceResult<Option<Session>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT user_id, expires_at FROM sessions WHERE token_hash = ?1",
            params![token_hash],
            |row| {
                let expires_at_str: String = row.get(1)?;
                Ok(Session {
                    user_id: row.get(0)?,
                    expires_at: parse_timestamp(1, &expires_at_str)?,
                })
            },
        )
        .optional()
        .map_err(|e| DatabaseError::Query(e).into())
    }

    /// Revoke a session
    pub fn delete_session(&self, token_hash: &str) -> ServiceResult<bool> {
        let conn = self.conn.lock().unwrap();

        let rows = conn
            .execute(
                "DELETE FROM sessions WHERE token_hash = ?1",
                params![token_hash],
            )
            .map_err(DatabaseError::Query)?;

        Ok(rows > 0)
    }

    /// Delete every session that expired at or before `now`
    pub fn delete_expired_sessions(&self, now: DateTime<Utc>) -> ServiceResult<usize> {
        let conn = self.conn.lock().unwrap();

        let rows = conn
            .execute(
                "DELETE FROM sessions WHERE expires_at <= ?1",
                params![format_timestamp(now)],
            )
            .map_err(DatabaseError::Query)?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use crate::db::test_support::temp_database;

    #[test]
    fn test_session_lifecycle() {
        let (_dir, db) = temp_database();
        let user = db.insert_user("alice", "hash").unwrap().unwrap();
        let now = Utc::now();

        db.insert_session("digest", user.id, now, now + Duration::hours(1))
            .unwrap();

        let session = db.get_session("digest").unwrap().unwrap();
        assert_eq!(session.user_id, user.id);
        assert!(!session.is_expired(now));

        assert!(db.delete_session("digest").unwrap());
        assert!(db.get_session("digest").unwrap().is_none());
        assert!(!db.delete_session("digest").unwrap());
    }

    #[test]
    fn test_delete_expired_sessions() {
        let (_dir, db) = temp_database();
        let user = db.insert_user("alice", "hash").unwrap().unwrap();
        let now = Utc::now();

        db.insert_session("old", user.id, now - Duration::hours(2), now - Duration::hours(1))
            .unwrap();
        db.insert_session("fresh", user.id, now, now + Duration::hours(1))
            .unwrap();

        assert_eq!(db.delete_expired_sessions(now).unwrap(), 1);
        assert!(db.get_session("old").unwrap().is_none());
        assert!(db.get_session("fresh").unwrap().is_some());
    }
}
