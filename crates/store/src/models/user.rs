use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Payload of `GET /api/account/info` and of a successful login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct UserInfo {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub roles: Option<Vec<String>>,
}

/// Who is signed in, as far as this process knows.
///
/// There is no persisted token: the session lives in a cookie, and `roles` being `None` is the
/// only signal that user info has not been loaded (or was cleared after a 401).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserState {
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    roles: Option<Vec<String>>,
}

impl UserState {
    pub fn set_user(&mut self, info: UserInfo) {
        self.display_name = info
            .display_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| info.username.clone());
        self.username = info.username;
        self.email = info.email.unwrap_or_default();
        self.avatar_url = info.avatar_url.filter(|url| !url.is_empty());
        self.roles = info.roles;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Always a slice, empty when nothing is known.
    pub fn roles(&self) -> &[String] {
        self.roles.as_deref().unwrap_or(&[])
    }

    pub fn authenticated(&self) -> bool {
        self.roles.is_some()
    }
}
