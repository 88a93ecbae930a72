//! The `{code, message, data, ...}` envelope every admin endpoint answers with.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;
use ts_rs::TS;

/// Application code carried by successful responses.
pub const CODE_OK: i64 = 0;

/// Pagination block attached to listing responses.
///
/// Clients only rely on `page` and `total`; the remaining fields are filled in by servers that
/// know them.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct PageInfo {
    pub total: u64,
    pub page: u64,
    #[serde(default)]
    pub page_size: Option<u64>,
    #[serde(default)]
    pub last_page: Option<u64>,
    #[serde(default)]
    pub from: Option<u64>,
    #[serde(default)]
    pub to: Option<u64>,
}

impl PageInfo {
    /// Compute the pagination block for `total` items, clamping `page` into `1..=last_page`.
    pub fn compute(total: u64, page: u64, page_size: u64) -> Self {
        let page_size = page_size.max(1);
        let last_page = total.div_ceil(page_size).max(1);
        let page = page.clamp(1, last_page);
        let (from, to) = if total == 0 {
            (0, 0)
        } else {
            let from = (page - 1) * page_size + 1;
            (from, (page * page_size).min(total))
        };
        Self {
            total,
            page,
            page_size: Some(page_size),
            last_page: Some(last_page),
            from: Some(from),
            to: Some(to),
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
    pub pagination: Option<PageInfo>,
    pub form_errors: Option<Value>,
    pub login_url: Option<String>,
}

impl<T> Default for ApiResponse<T> {
    fn default() -> Self {
        Self {
            code: CODE_OK,
            message: String::new(),
            data: None,
            pagination: None,
            form_errors: None,
            login_url: None,
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            message: "ok".to_string(),
            data: Some(data),
            ..Default::default()
        }
    }

    pub fn success_page(data: T, pagination: PageInfo) -> Self {
        Self {
            pagination: Some(pagination),
            ..Self::success(data)
        }
    }

    pub fn error(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_form_errors(mut self, form_errors: Value) -> Self {
        self.form_errors = Some(form_errors);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.code == CODE_OK
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }
}
