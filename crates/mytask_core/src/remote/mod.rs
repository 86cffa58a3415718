//! Hosted backend-as-a-service adapter.
//!
//! # Responsibility
//! - Implement the backend contracts against a hosted service exposing auth
//!   endpoints under `/auth/v1` and PostgREST-style table endpoints under
//!   `/rest/v1/<table>`.
//! - Hold the access token of the active session and attach it to every
//!   table request.
//!
//! # Invariants
//! - Every request carries the anonymous key in the `apikey` header.
//! - Non-2xx responses map to `RepoError::Status` (or `Unauthorized` for
//!   401/403); network failures map to `RepoError::Transport`.
//! - Request bodies are never logged.

mod auth;
mod tables;
mod wire;

pub use wire::TableQuery;

use crate::repo::{RepoError, RepoResult};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use ureq::{Agent, AgentBuilder, Request};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Access token plus the identity it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RestSession {
    pub(crate) access_token: String,
    pub(crate) user_id: String,
    pub(crate) email: String,
}

/// Backend implementation over HTTPS.
pub struct RestBackend {
    agent: Agent,
    base_url: String,
    anon_key: String,
    session: Mutex<Option<RestSession>>,
}

/// Preferred response shape of a table write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Returning {
    Representation,
    Minimal,
}

impl Returning {
    fn header_value(self) -> &'static str {
        match self {
            Self::Representation => "return=representation",
            Self::Minimal => "return=minimal",
        }
    }
}

impl RestBackend {
    /// Creates a client for `base_url` authenticated with `anon_key`.
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        let agent = AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Self::with_agent(agent, base_url, anon_key)
    }

    /// Uses a caller-configured agent (proxy, custom timeouts).
    pub fn with_agent(agent: Agent, base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            session: Mutex::new(None),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the access token of the active session, if any.
    pub fn access_token(&self) -> Option<String> {
        self.session_slot()
            .as_ref()
            .map(|session| session.access_token.clone())
    }

    pub(crate) fn session_slot(&self) -> MutexGuard<'_, Option<RestSession>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub(crate) fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Builds a request with the key headers, bearer falling back to the
    /// anonymous key when no session is active.
    pub(crate) fn request(&self, method: &str, url: &str) -> Request {
        let bearer = self
            .access_token()
            .unwrap_or_else(|| self.anon_key.clone());
        self.agent
            .request(method, url)
            .set("apikey", &self.anon_key)
            .set("Authorization", &format!("Bearer {bearer}"))
            .set("Accept", "application/json")
    }

    pub(crate) fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &TableQuery,
    ) -> RepoResult<Vec<T>> {
        let url = self.table_url(table);
        let request = query.apply(self.request("GET", &url));
        decode_json(execute(table, "select", request.call())?)
    }

    pub(crate) fn insert<B: Serialize, T: DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
    ) -> RepoResult<Vec<T>> {
        let url = self.table_url(table);
        let request = self
            .request("POST", &url)
            .set("Prefer", Returning::Representation.header_value());
        decode_json(execute(table, "insert", request.send_json(to_json(body)?))?)
    }

    pub(crate) fn insert_minimal<B: Serialize>(&self, table: &str, body: &B) -> RepoResult<()> {
        let url = self.table_url(table);
        let request = self
            .request("POST", &url)
            .set("Prefer", Returning::Minimal.header_value());
        execute(table, "insert", request.send_json(to_json(body)?))?;
        Ok(())
    }

    pub(crate) fn update<B: Serialize, T: DeserializeOwned>(
        &self,
        table: &str,
        query: &TableQuery,
        body: &B,
    ) -> RepoResult<Vec<T>> {
        let url = self.table_url(table);
        let request = query.apply(
            self.request("PATCH", &url)
                .set("Prefer", Returning::Representation.header_value()),
        );
        decode_json(execute(table, "update", request.send_json(to_json(body)?))?)
    }

    pub(crate) fn delete<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &TableQuery,
    ) -> RepoResult<Vec<T>> {
        let url = self.table_url(table);
        let request = query.apply(
            self.request("DELETE", &url)
                .set("Prefer", Returning::Representation.header_value()),
        );
        decode_json(execute(table, "delete", request.call())?)
    }
}

fn to_json<B: Serialize>(body: &B) -> RepoResult<serde_json::Value> {
    serde_json::to_value(body)
        .map_err(|err| RepoError::InvalidData(format!("failed to encode request body: {err}")))
}

pub(crate) fn decode_json<T: DeserializeOwned>(response: ureq::Response) -> RepoResult<T> {
    response
        .into_json::<T>()
        .map_err(|err| RepoError::InvalidData(format!("failed to decode response body: {err}")))
}

/// Maps a ureq outcome onto the repository error vocabulary.
pub(crate) fn execute(
    resource: &str,
    action: &str,
    outcome: Result<ureq::Response, ureq::Error>,
) -> RepoResult<ureq::Response> {
    match outcome {
        Ok(response) => {
            debug!(
                "event=rest_call module=remote status=ok resource={} action={} code={}",
                resource,
                action,
                response.status()
            );
            Ok(response)
        }
        Err(ureq::Error::Status(code, response)) => {
            let body = response.into_string().unwrap_or_default();
            warn!(
                "event=rest_call module=remote status=error resource={} action={} code={}",
                resource, action, code
            );
            Err(wire::status_error(code, &body))
        }
        Err(ureq::Error::Transport(transport)) => {
            warn!(
                "event=rest_call module=remote status=error resource={} action={} transport_kind={:?}",
                resource,
                action,
                transport.kind()
            );
            Err(RepoError::Transport(transport.to_string()))
        }
    }
}
