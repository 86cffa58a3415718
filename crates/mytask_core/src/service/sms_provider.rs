//! Outbound SMS provider seam and the Twilio-compatible HTTPS provider.
//!
//! # Invariants
//! - Credentials never appear in logs or error values.
//! - A successful send always yields a provider message id.

use crate::config::SmsConfig;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{debug, warn};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use ureq::{Agent, AgentBuilder};

const SEND_TIMEOUT: Duration = Duration::from_secs(20);

/// Provider-side failure of a single send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmsError {
    /// Account credentials or the sending number are missing.
    NotConfigured,
    /// No recipient number could be resolved.
    MissingRecipient,
    /// The provider answered with an error.
    Rejected { code: Option<i64>, message: String },
    Transport(String),
    InvalidResponse(String),
}

impl Display for SmsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConfigured => write!(f, "SMS delivery is not configured"),
            Self::MissingRecipient => write!(f, "no phone number available for this user"),
            Self::Rejected {
                code: Some(code),
                message,
            } => write!(f, "SMS provider rejected the message ({code}): {message}"),
            Self::Rejected { code: None, message } => {
                write!(f, "SMS provider rejected the message: {message}")
            }
            Self::Transport(message) => write!(f, "SMS provider unreachable: {message}"),
            Self::InvalidResponse(message) => {
                write!(f, "unexpected SMS provider response: {message}")
            }
        }
    }
}

impl Error for SmsError {}

/// Provider acknowledgement of an accepted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub message_id: String,
}

/// Anything that can hand a text message to a carrier.
pub trait SmsProvider: Send + Sync {
    fn send(&self, to: &str, body: &str) -> Result<SentMessage, SmsError>;
}

/// Messages API client authenticated with account SID and auth token.
pub struct TwilioProvider {
    agent: Agent,
    api_base: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl TwilioProvider {
    pub fn new(
        api_base: impl Into<String>,
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from_number: impl Into<String>,
    ) -> Self {
        Self {
            agent: AgentBuilder::new().timeout(SEND_TIMEOUT).build(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            from_number: from_number.into(),
        }
    }

    /// Builds a provider from configuration, or `None` when incomplete.
    pub fn from_config(config: &SmsConfig) -> Option<Self> {
        if !config.is_complete() {
            return None;
        }
        Some(Self::new(
            config.api_base.clone(),
            config.account_sid.clone()?,
            config.auth_token.clone()?,
            config.from_number.clone()?,
        ))
    }

    fn messages_url(&self) -> String {
        messages_url(&self.api_base, &self.account_sid)
    }
}

impl SmsProvider for TwilioProvider {
    fn send(&self, to: &str, body: &str) -> Result<SentMessage, SmsError> {
        let outcome = self
            .agent
            .post(&self.messages_url())
            .set(
                "Authorization",
                &basic_auth_header(&self.account_sid, &self.auth_token),
            )
            .send_form(&[("To", to), ("From", self.from_number.as_str()), ("Body", body)]);

        match outcome {
            Ok(response) => {
                let text = response
                    .into_string()
                    .map_err(|err| SmsError::InvalidResponse(err.to_string()))?;
                let sent = parse_send_response(&text)?;
                debug!("event=sms_provider_send module=sms status=ok");
                Ok(sent)
            }
            Err(ureq::Error::Status(code, response)) => {
                let text = response.into_string().unwrap_or_default();
                warn!(
                    "event=sms_provider_send module=sms status=error http_status={}",
                    code
                );
                Err(parse_error_body(&text))
            }
            Err(ureq::Error::Transport(transport)) => {
                Err(SmsError::Transport(transport.to_string()))
            }
        }
    }
}

fn messages_url(api_base: &str, account_sid: &str) -> String {
    format!("{api_base}/2010-04-01/Accounts/{account_sid}/Messages.json")
}

fn basic_auth_header(account_sid: &str, auth_token: &str) -> String {
    format!(
        "Basic {}",
        STANDARD.encode(format!("{account_sid}:{auth_token}"))
    )
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    sid: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

fn parse_send_response(text: &str) -> Result<SentMessage, SmsError> {
    let parsed: SendResponse =
        serde_json::from_str(text).map_err(|err| SmsError::InvalidResponse(err.to_string()))?;
    match parsed.sid {
        Some(sid) if !sid.is_empty() => Ok(SentMessage { message_id: sid }),
        _ => Err(SmsError::InvalidResponse(
            "response carried no message sid".to_string(),
        )),
    }
}

fn parse_error_body(text: &str) -> SmsError {
    let parsed: ErrorResponse = serde_json::from_str(text).unwrap_or_default();
    SmsError::Rejected {
        code: parsed.code,
        message: parsed
            .message
            .unwrap_or_else(|| text.trim().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        basic_auth_header, messages_url, parse_error_body, parse_send_response, SmsError,
        TwilioProvider,
    };
    use crate::config::SmsConfig;

    #[test]
    fn basic_auth_encodes_sid_and_token() {
        assert_eq!(basic_auth_header("AC1", "tok"), "Basic QUMxOnRvaw==");
    }

    #[test]
    fn messages_url_targets_account() {
        assert_eq!(
            messages_url("https://api.twilio.com", "AC1"),
            "https://api.twilio.com/2010-04-01/Accounts/AC1/Messages.json"
        );
    }

    #[test]
    fn send_response_requires_sid() {
        assert_eq!(
            parse_send_response(r#"{"sid":"SM123","status":"queued"}"#)
                .expect("sid present")
                .message_id,
            "SM123"
        );
        assert!(matches!(
            parse_send_response(r#"{"status":"queued"}"#),
            Err(SmsError::InvalidResponse(_))
        ));
    }

    #[test]
    fn error_body_keeps_code_and_message() {
        let err = parse_error_body(
            r#"{"code":21608,"message":"The number +15005550001 is unverified.","status":400}"#,
        );
        assert_eq!(
            err,
            SmsError::Rejected {
                code: Some(21608),
                message: "The number +15005550001 is unverified.".to_string()
            }
        );
    }

    #[test]
    fn incomplete_config_builds_no_provider() {
        assert!(TwilioProvider::from_config(&SmsConfig::default()).is_none());
    }
}
