//! Persistence for the auth session (token + minimal profile).

use chrono::{DateTime, Utc};
use rusqlite::params;

use zaika_shared::{UserId, UserProfile};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::AuthSession;

impl Database {
    /// Persist the session, replacing any previous one.
    pub fn save_auth_session(&self, session: &AuthSession) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO auth_session
                 (id, token, user_id, name, phone, email, saved_at)
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                session.token,
                session.user.id.0,
                session.user.name,
                session.user.phone,
                session.user.email,
                session.saved_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Load the persisted session, if any.
    pub fn load_auth_session(&self) -> Result<Option<AuthSession>> {
        let result = self.conn().query_row(
            "SELECT token, user_id, name, phone, email, saved_at
             FROM auth_session WHERE id = 1",
            [],
            row_to_session,
        );

        match result {
            Ok(session) => Ok(Some(session)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    /// Drop the persisted session. Local state is authoritative for
    /// "am I logged out", so this succeeds regardless of server reachability.
    pub fn clear_auth_session(&self) -> Result<()> {
        self.conn().execute("DELETE FROM auth_session", [])?;
        Ok(())
    }
}

fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuthSession> {
    let token: String = row.get(0)?;
    let user_id: String = row.get(1)?;
    let name: String = row.get(2)?;
    let phone: Option<String> = row.get(3)?;
    let email: Option<String> = row.get(4)?;
    let saved_str: String = row.get(5)?;

    let saved_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&saved_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(AuthSession {
        token,
        user: UserProfile {
            id: UserId(user_id),
            name,
            phone,
            email,
        },
        saved_at,
    })
}
