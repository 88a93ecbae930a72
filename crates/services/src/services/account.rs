//! `/api/account/*` calls and the signed-in user's session state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;
use store::models::user::{UserInfo, UserState};
use strum_macros::{Display, EnumString};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::admin_api::{ApiReply, ApiRequest, ApiTransport, TransportError};

const ACCOUNT_PATH: &str = "/api/account";

/// Application error codes returned by the account endpoints in the envelope `code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AccountErrorCode {
    #[strum(to_string = "invalid phone number")]
    InvalidPhone = 1001,
    #[strum(to_string = "invalid email")]
    InvalidEmail = 1002,
    #[strum(to_string = "invalid phone number or email")]
    InvalidIdentity = 1003,
    #[strum(to_string = "wrong verification code")]
    InvalidVerifyCode = 1004,
    #[strum(to_string = "phone number already registered")]
    PhoneExists = 1005,
    #[strum(to_string = "email already registered")]
    EmailExists = 1006,
    #[strum(to_string = "too many requests, try again later")]
    RateExceeded = 1007,
}

impl AccountErrorCode {
    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            1001 => Self::InvalidPhone,
            1002 => Self::InvalidEmail,
            1003 => Self::InvalidIdentity,
            1004 => Self::InvalidVerifyCode,
            1005 => Self::PhoneExists,
            1006 => Self::EmailExists,
            1007 => Self::RateExceeded,
            _ => return None,
        })
    }

    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn message(self) -> String {
        self.to_string()
    }
}

/// Whether `code` is one of the account application errors.
pub fn is_application_error(code: i64) -> bool {
    AccountErrorCode::from_code(code).is_some()
}

/// What a verification code will be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum CodeUsage {
    Register,
    ResetPassword,
    Login,
}

/// Body shared by login, send-code, verify-code, reset-password and register.
///
/// Identify the user by `username`, `phone`, `email` or `identity` (phone or email, detected
/// by the backend), and authenticate with `password` or a verification `code`.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountForm {
    pub username: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub identity: Option<String>,
    pub password: Option<String>,
    pub code: Option<String>,
    pub new_password: Option<String>,
    pub usage: Option<CodeUsage>,
    /// Only users holding this role may sign in.
    pub role: Option<String>,
}

impl AccountForm {
    pub fn password_login(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            role: Some("admin".to_string()),
            ..Default::default()
        }
    }

    pub fn code_request(identity: impl Into<String>, usage: CodeUsage) -> Self {
        Self {
            identity: Some(identity.into()),
            usage: Some(usage),
            ..Default::default()
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    fn to_body(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Default::default()))
    }
}

fn account_url(endpoint: &str) -> String {
    format!("{ACCOUNT_PATH}/{endpoint}")
}

pub fn login_request(form: &AccountForm) -> ApiRequest {
    ApiRequest::post(account_url("login"), form.to_body())
}

pub fn info_request() -> ApiRequest {
    ApiRequest::get(account_url("info"))
}

pub fn logout_request() -> ApiRequest {
    ApiRequest::post(account_url("logout"), Value::Object(Default::default()))
}

pub fn send_code_request(form: &AccountForm) -> ApiRequest {
    ApiRequest::post(account_url("send-code"), form.to_body())
}

pub fn verify_code_request(form: &AccountForm) -> ApiRequest {
    ApiRequest::post(account_url("verify-code"), form.to_body())
}

pub fn reset_password_request(form: &AccountForm) -> ApiRequest {
    ApiRequest::post(account_url("reset-password"), form.to_body())
}

pub fn register_request(form: &AccountForm) -> ApiRequest {
    ApiRequest::post(account_url("register"), form.to_body())
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("request rejected with status {status} (code {code}): {message}")]
    Rejected {
        status: u16,
        code: i64,
        message: String,
    },
    #[error("invalid user info: {0}")]
    InvalidUserInfo(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl SessionError {
    /// HTTP status of a rejected call; `None` when no reply was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            SessionError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    pub fn account_error(&self) -> Option<AccountErrorCode> {
        match self {
            SessionError::Rejected { code, .. } => AccountErrorCode::from_code(*code),
            _ => None,
        }
    }

    fn rejected(reply: ApiReply) -> Self {
        SessionError::Rejected {
            status: reply.status,
            code: reply.body.code,
            message: reply.body.message,
        }
    }
}

/// Signed-in user, kept in memory only; the session itself is the transport's cookie.
pub struct UserSession {
    transport: Arc<dyn ApiTransport>,
    state: RwLock<UserState>,
}

impl UserSession {
    pub fn new(transport: Arc<dyn ApiTransport>) -> Self {
        Self {
            transport,
            state: RwLock::new(UserState::default()),
        }
    }

    pub async fn user(&self) -> UserState {
        self.state.read().await.clone()
    }

    pub async fn roles(&self) -> Vec<String> {
        self.state.read().await.roles().to_vec()
    }

    pub async fn authenticated(&self) -> bool {
        self.state.read().await.authenticated()
    }

    pub async fn login(&self, form: &AccountForm) -> Result<UserInfo, SessionError> {
        let reply = self.transport.send(login_request(form)).await?;
        if !reply.is_ok() {
            warn!(status = reply.status, code = reply.body.code, "login rejected");
            return Err(SessionError::rejected(reply));
        }
        let info = decode_user_info(reply)?;
        info!(username = %info.username, "signed in");
        self.state.write().await.set_user(info.clone());
        Ok(info)
    }

    /// Refresh the user from `GET /api/account/info`.
    ///
    /// Any non-200 reply clears the user. A transport failure leaves the state untouched.
    pub async fn get_user_info(&self) -> Result<UserInfo, SessionError> {
        let reply = self.transport.send(info_request()).await?;
        if !reply.is_ok() {
            debug!(status = reply.status, "user info unavailable, clearing session");
            self.state.write().await.clear();
            return Err(SessionError::rejected(reply));
        }
        match decode_user_info(reply) {
            Ok(info) => {
                self.state.write().await.set_user(info.clone());
                Ok(info)
            }
            Err(e) => {
                self.state.write().await.clear();
                Err(e)
            }
        }
    }

    /// Ends the session. The local user is cleared whatever the backend answers.
    pub async fn logout(&self) -> Result<(), SessionError> {
        let result = self.transport.send(logout_request()).await;
        self.state.write().await.clear();
        let reply = result?;
        if !reply.is_ok() {
            warn!(status = reply.status, "logout rejected");
        }
        Ok(())
    }
}

fn decode_user_info(reply: ApiReply) -> Result<UserInfo, SessionError> {
    let data = reply
        .into_data()
        .ok_or_else(|| SessionError::InvalidUserInfo("missing data".to_string()))?;
    serde_json::from_value(data).map_err(|e| SessionError::InvalidUserInfo(e.to_string()))
}
