//! Auth endpoints and the `users` profile table.

use crate::model::user::{AuthIdentity, SignUpProfile, User};
use crate::model::validation::{normalize_phone_number, validate_email, validate_password};
use crate::remote::wire::{AuthUserBody, SessionBody};
use crate::remote::{decode_json, execute, RestBackend, RestSession, TableQuery};
use crate::repo::{AuthError, AuthGateway, RepoError, RepoResult, UserRepository};
use log::info;
use serde_json::json;

impl RestBackend {
    fn store_session(&self, access_token: String, user: &AuthUserBody, fallback_email: &str) -> AuthIdentity {
        let email = user
            .email
            .clone()
            .unwrap_or_else(|| fallback_email.to_string());
        *self.session_slot() = Some(RestSession {
            access_token,
            user_id: user.id.clone(),
            email: email.clone(),
        });
        AuthIdentity {
            user_id: user.id.clone(),
            email,
        }
    }
}

impl AuthGateway for RestBackend {
    fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile: &SignUpProfile,
    ) -> Result<AuthIdentity, AuthError> {
        let email = email.trim();
        validate_email(email)?;
        validate_password(password)?;
        let phone_number = profile
            .phone_number
            .as_deref()
            .map(normalize_phone_number)
            .transpose()?;

        let body = json!({
            "email": email,
            "password": password,
            "data": { "name": profile.name, "phone_number": phone_number },
        });
        let url = self.auth_url("signup");
        let response = execute("auth", "sign_up", self.request("POST", &url).send_json(body))
            .map_err(|err| classify_sign_up_error(err, email))?;
        let session: SessionBody = decode_json(response)?;
        let user = session
            .user()
            .ok_or_else(|| RepoError::InvalidData("sign-up response carried no user".to_string()))?;

        let identity = match session.access_token {
            Some(token) => self.store_session(token, &user, email),
            // Email confirmation pending: identity exists, no session yet.
            None => AuthIdentity {
                user_id: user.id,
                email: user.email.unwrap_or_else(|| email.to_string()),
            },
        };
        info!("event=sign_up module=remote status=ok");
        Ok(identity)
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<AuthIdentity, AuthError> {
        let email = email.trim();
        let url = self.auth_url("token");
        let request = self.request("POST", &url).query("grant_type", "password");
        let response = execute(
            "auth",
            "sign_in",
            request.send_json(json!({ "email": email, "password": password })),
        )
        .map_err(|err| match err {
            RepoError::Status { code: 400, .. } => AuthError::InvalidCredentials,
            other => AuthError::from(other),
        })?;
        let session: SessionBody = decode_json(response)?;
        let (Some(token), Some(user)) = (session.access_token.clone(), session.user()) else {
            return Err(RepoError::InvalidData("token response carried no session".to_string()).into());
        };
        Ok(self.store_session(token, &user, email))
    }

    fn sign_out(&self) -> Result<(), AuthError> {
        let Some(session) = self.session_slot().take() else {
            return Ok(());
        };
        let url = self.auth_url("logout");
        let request = self
            .agent
            .request("POST", &url)
            .set("apikey", &self.anon_key)
            .set("Authorization", &format!("Bearer {}", session.access_token));
        // The local session is already cleared; an expired token is not a failure.
        match execute("auth", "sign_out", request.call()) {
            Ok(_) | Err(RepoError::Unauthorized) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn current_identity(&self) -> Result<AuthIdentity, AuthError> {
        if self.session_slot().is_none() {
            return Err(AuthError::SessionMissing);
        }
        let url = self.auth_url("user");
        match execute("auth", "current_user", self.request("GET", &url).call()) {
            Ok(response) => {
                let user: AuthUserBody = decode_json(response)?;
                Ok(AuthIdentity {
                    user_id: user.id,
                    email: user.email.unwrap_or_default(),
                })
            }
            Err(RepoError::Unauthorized) => {
                self.session_slot().take();
                Err(AuthError::SessionMissing)
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn classify_sign_up_error(err: RepoError, email: &str) -> AuthError {
    match &err {
        RepoError::Status { code: 400 | 422, message }
            if message.to_ascii_lowercase().contains("already registered") =>
        {
            AuthError::EmailAlreadyRegistered(email.to_string())
        }
        _ => AuthError::from(err),
    }
}

impl UserRepository for RestBackend {
    fn get_user(&self, id: &str) -> RepoResult<Option<User>> {
        let rows: Vec<User> = self.select("users", &TableQuery::select_all().eq("id", id))?;
        Ok(rows.into_iter().next())
    }

    fn insert_user(&self, user: &User) -> RepoResult<User> {
        let rows: Vec<User> = self.insert("users", user)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| RepoError::InvalidData("insert into users returned no row".to_string()))
    }
}
