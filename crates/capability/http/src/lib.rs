//! REST 客户端
//!
//! 所有业务数据来自 `/api/{version}/{module}/...`：
//! - 有 token 时附带 `Authorization: Bearer`
//! - 附带租户/公司头与 request_id/trace_id
//! - 401 全局处理：清空会话并广播跳转登录，不走调用方的错误处理
//! - 不做重试，每次失败即终止

mod auth;
mod client;

pub use auth::AuthApi;
pub use client::HttpClient;
pub use reqwest::Method;

use api_contract::{ApiError, ApiModule};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// 一次后端调用。
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub module: ApiModule,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// 401 不触发全局会话过期（登录、刷新接口）。
    pub auth_exempt: bool,
}

impl ApiRequest {
    pub fn new(method: Method, module: ApiModule, path: impl Into<String>) -> Self {
        Self {
            method,
            module,
            path: path.into(),
            query: Vec::new(),
            body: None,
            auth_exempt: false,
        }
    }

    pub fn get(module: ApiModule, path: impl Into<String>) -> Self {
        Self::new(Method::GET, module, path)
    }

    pub fn post(module: ApiModule, path: impl Into<String>) -> Self {
        Self::new(Method::POST, module, path)
    }

    pub fn put(module: ApiModule, path: impl Into<String>) -> Self {
        Self::new(Method::PUT, module, path)
    }

    pub fn delete(module: ApiModule, path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, module, path)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn auth_exempt(mut self) -> Self {
        self.auth_exempt = true;
        self
    }
}

/// 传输接口，便于替换实现与测试。
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// 发送请求并返回解包后的载荷（信封中的 `data`，或裸响应体）。
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError>;
}

/// 将载荷反序列化为目标类型。
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|err| ApiError::decode(err.to_string()))
}

/// 解包后端信封：`{success:false}` 即使是 2xx 也视为失败。
pub fn unwrap_envelope(value: Value) -> Result<Value, ApiError> {
    let Value::Object(mut map) = value else {
        return Ok(value);
    };
    match map.get("success").and_then(Value::as_bool) {
        Some(true) => Ok(map.remove("data").unwrap_or(Value::Null)),
        Some(false) => {
            let body = Value::Object(map);
            let mut err = ApiError::from_status(422, Some(&body), "request rejected");
            err.status = None;
            Err(err)
        }
        None => Ok(Value::Object(map)),
    }
}
