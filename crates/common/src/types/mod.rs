use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct Health {
    pub status: &'static str,
}

/// Response envelope shared by every JSON endpoint.
///
/// `data` is present on success; `error` (and optionally `message`) on failure.
#[derive(Serialize, Debug, Clone)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None, message: None }
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self { success: true, data: Some(data), error: None, message: Some(message.into()) }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(error.into()), message: None }
    }
}

impl ApiResponse<()> {
    /// Success without payload, e.g. after a delete.
    pub fn message(message: impl Into<String>) -> Self {
        Self { success: true, data: None, error: None, message: Some(message.into()) }
    }
}
