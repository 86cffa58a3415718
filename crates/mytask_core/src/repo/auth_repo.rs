//! Identity and profile persistence for the SQLite backend.
//!
//! # Invariants
//! - Emails are compared after trim + lowercase.
//! - Passwords are stored as salted SHA-256 digests, never in clear text.
//! - Profile rows (`users`) are written separately from identities and may be
//!   missing for an identity that exists.

use crate::model::user::{AuthIdentity, SignUpProfile, User};
use crate::model::validation::{validate_email, validate_password};
use crate::repo::sqlite_backend::{from_epoch_ms, new_row_id, to_epoch_ms, SqliteBackend};
use crate::repo::{AuthError, AuthGateway, RepoResult, UserRepository};
use chrono::Utc;
use log::info;
use rusqlite::{params, OptionalExtension, Row};
use sha2::{Digest, Sha256};

impl AuthGateway for SqliteBackend {
    fn sign_up(
        &self,
        email: &str,
        password: &str,
        _profile: &SignUpProfile,
    ) -> Result<AuthIdentity, AuthError> {
        validate_email(email)?;
        validate_password(password)?;
        let email = normalize_email(email);

        let identity = self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let exists = tx
                .query_row(
                    "SELECT 1 FROM auth_identities WHERE email = ?1;",
                    [email.as_str()],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if exists {
                return Ok(None);
            }

            let user_id = new_row_id();
            let salt = new_row_id();
            tx.execute(
                "INSERT INTO auth_identities (user_id, email, password_salt, password_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    user_id,
                    email,
                    salt,
                    hash_password(&salt, password),
                    to_epoch_ms(Utc::now()),
                ],
            )?;
            tx.commit()?;
            Ok(Some(AuthIdentity {
                user_id,
                email: email.clone(),
            }))
        })?;

        let identity = identity.ok_or_else(|| AuthError::EmailAlreadyRegistered(email.clone()))?;
        self.start_session(&identity.user_id)?;
        info!("event=auth_sign_up module=sqlite_backend status=ok");
        Ok(identity)
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<AuthIdentity, AuthError> {
        let email = normalize_email(email);
        let stored = self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT user_id, password_salt, password_hash
                     FROM auth_identities WHERE email = ?1;",
                    [email.as_str()],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                        ))
                    },
                )
                .optional()?;
            Ok(row)
        })?;

        let Some((user_id, salt, expected_hash)) = stored else {
            return Err(AuthError::InvalidCredentials);
        };
        if hash_password(&salt, password) != expected_hash {
            return Err(AuthError::InvalidCredentials);
        }

        self.start_session(&user_id)?;
        Ok(AuthIdentity { user_id, email })
    }

    fn sign_out(&self) -> Result<(), AuthError> {
        let token = self.token_slot().take();
        if let Some(token) = token {
            self.with_conn(|conn| {
                conn.execute("DELETE FROM auth_sessions WHERE token = ?1;", [token])?;
                Ok(())
            })?;
        }
        Ok(())
    }

    fn current_identity(&self) -> Result<AuthIdentity, AuthError> {
        let token = self.session_token().ok_or(AuthError::SessionMissing)?;
        let identity = self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT i.user_id, i.email
                     FROM auth_sessions s
                     JOIN auth_identities i ON i.user_id = s.user_id
                     WHERE s.token = ?1;",
                    [token.as_str()],
                    |row| {
                        Ok(AuthIdentity {
                            user_id: row.get(0)?,
                            email: row.get(1)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })?;

        match identity {
            Some(identity) => Ok(identity),
            None => {
                self.token_slot().take();
                Err(AuthError::SessionMissing)
            }
        }
    }
}

impl SqliteBackend {
    fn start_session(&self, user_id: &str) -> RepoResult<()> {
        let token = new_row_id();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO auth_sessions (token, user_id, created_at) VALUES (?1, ?2, ?3);",
                params![token, user_id, to_epoch_ms(Utc::now())],
            )?;
            Ok(())
        })?;
        *self.token_slot() = Some(token);
        Ok(())
    }
}

impl UserRepository for SqliteBackend {
    fn get_user(&self, id: &str) -> RepoResult<Option<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, email, phone_number, created_at FROM users WHERE id = ?1;",
            )?;
            let mut rows = stmt.query([id])?;
            match rows.next()? {
                Some(row) => Ok(Some(parse_user_row(row)?)),
                None => Ok(None),
            }
        })
    }

    fn insert_user(&self, user: &User) -> RepoResult<User> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, email, phone_number, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    user.id,
                    user.name,
                    user.email,
                    user.phone_number,
                    to_epoch_ms(user.created_at),
                ],
            )?;
            Ok(())
        })?;
        Ok(user.clone())
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    Ok(User {
        id: row.get("id")?,
        name: row.get("name")?,
        email: row.get("email")?,
        phone_number: row.get("phone_number")?,
        created_at: from_epoch_ms(row.get("created_at")?, "users.created_at")?,
    })
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}
