//! 客户端错误类型
//!
//! 统一承载传输失败、HTTP 4xx/5xx 与会话过期：
//! - kind：错误分类（决定是否提示、是否跳转）
//! - message：面向用户的消息
//! - status/code：原始 HTTP 状态与后端错误码（如有）

use serde_json::Value;

/// 错误分类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 传输失败或超时。
    Network,
    /// 400/409/422 等校验类错误。
    Validation,
    PermissionDenied,
    NotFound,
    /// 401，由 HTTP 层全局处理。
    SessionExpired,
    Server,
    /// 响应体无法解析。
    Decode,
    Unexpected,
}

impl ErrorKind {
    /// 按 HTTP 状态码分类。
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ErrorKind::SessionExpired,
            403 => ErrorKind::PermissionDenied,
            404 => ErrorKind::NotFound,
            400..=499 => ErrorKind::Validation,
            500..=599 => ErrorKind::Server,
            _ => ErrorKind::Unexpected,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Validation => "validation",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::NotFound => "not_found",
            ErrorKind::SessionExpired => "session_expired",
            ErrorKind::Server => "server",
            ErrorKind::Decode => "decode",
            ErrorKind::Unexpected => "unexpected",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 结构化的请求错误。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    pub status: Option<u16>,
    pub code: Option<String>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            code: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Decode, message)
    }

    pub fn session_expired() -> Self {
        Self {
            kind: ErrorKind::SessionExpired,
            message: "session expired".to_string(),
            status: Some(401),
            code: None,
        }
    }

    /// 根据 HTTP 状态码与响应体构造错误。
    ///
    /// 消息优先级：`error.message` > 顶层 `message`/`detail` > `fallback`。
    pub fn from_status(status: u16, body: Option<&Value>, fallback: &str) -> Self {
        let kind = ErrorKind::from_status(status);
        let code = body
            .and_then(|body| body.get("error"))
            .and_then(|error| error.get("code"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let message = body
            .and_then(message_from_body)
            .unwrap_or_else(|| fallback.to_string());
        Self {
            kind,
            message,
            status: Some(status),
            code,
        }
    }

    pub fn is_session_expired(&self) -> bool {
        self.kind == ErrorKind::SessionExpired
    }
}

/// 从后端响应体中提取错误消息。
pub(crate) fn message_from_body(body: &Value) -> Option<String> {
    if let Some(message) = body
        .get("error")
        .and_then(|error| match error {
            Value::String(message) => Some(message.as_str()),
            other => other.get("message").and_then(Value::as_str),
        })
    {
        return Some(message.to_string());
    }
    ["message", "detail"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}
