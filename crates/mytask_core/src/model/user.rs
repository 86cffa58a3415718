//! User profile model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque identity id assigned by the backend auth service.
pub type UserId = String;

/// Application profile for an authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Builds an in-memory profile when the backend row is unavailable.
    pub fn synthesized(
        id: impl Into<UserId>,
        name: impl Into<String>,
        email: impl Into<String>,
        phone_number: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            phone_number,
            created_at: now,
        }
    }
}

/// Identity resolved by the auth service, before the profile row is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthIdentity {
    pub user_id: UserId,
    pub email: String,
}

/// Profile metadata attached to a sign-up request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignUpProfile {
    pub name: String,
    pub phone_number: Option<String>,
}

/// Derives a display name from the local part of an email address.
///
/// Falls back to `"User"` when the local part is empty.
pub fn display_name_from_email(email: &str) -> String {
    match email.split('@').next().map(str::trim) {
        Some(local) if !local.is_empty() => local.to_string(),
        _ => "User".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::display_name_from_email;

    #[test]
    fn display_name_uses_email_local_part() {
        assert_eq!(display_name_from_email("ann@example.com"), "ann");
        assert_eq!(display_name_from_email("@example.com"), "User");
        assert_eq!(display_name_from_email(""), "User");
    }
}
