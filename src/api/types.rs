use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::{AppError, AppResult};
use crate::storage::{page_limit, Page};

/// Largest page size a client may ask for.
pub use crate::storage::MAX_PAGE_SIZE;

/// JSON envelope of every successful response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T = Value> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, message: None, data: Some(data) }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self { success: true, message: Some(message.into()), data: Some(data) }
    }
}

impl ApiResponse<Value> {
    pub fn message(message: impl Into<String>) -> Self {
        Self { success: true, message: Some(message.into()), data: None }
    }
}

/// `{current, pages, total}` as the clients expect it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current: u64,
    pub pages: u64,
    pub total: u64,
}

impl<T> From<&Page<T>> for Pagination {
    fn from(page: &Page<T>) -> Self {
        Self { current: page.page, pages: page.pages, total: page.total }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl PageQuery {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self, default: u64) -> u64 {
        page_limit(self.limit, default)
    }
}

/// Serialize `value` as JSON.
pub fn to_json<T: Serialize>(value: &T) -> AppResult<Value> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(format!("serialization failed: {e}")))
}

/// `{ <key>: value }`
pub fn keyed<T: Serialize>(key: &str, value: &T) -> AppResult<Value> {
    let mut map = Map::new();
    map.insert(key.to_string(), to_json(value)?);
    Ok(Value::Object(map))
}

/// `{ <key>: [...items], pagination: {...} }`
pub fn paged<T: Serialize>(key: &str, page: Page<T>) -> AppResult<Value> {
    let pagination = Pagination::from(&page);
    let mut map = Map::new();
    map.insert(key.to_string(), to_json(&page.items)?);
    map.insert("pagination".to_string(), to_json(&pagination)?);
    Ok(Value::Object(map))
}
