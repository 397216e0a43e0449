//! 客户端运行配置加载。

use std::env;
use std::time::Duration;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 客户端运行配置。
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub api_version: String,
    pub request_timeout_ms: u64,
    pub cache_ttl_ms: u64,
    pub toast_duration_ms: u64,
    pub error_toast_duration_ms: u64,
    pub tenant_header: String,
    pub company_header: String,
    pub login_route: String,
    pub company_select_route: String,
    pub unauthorized_route: String,
}

impl ClientConfig {
    /// 以默认值构造配置（仅需后端地址）。
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: normalize_base_url(&api_base_url.into()),
            api_version: "v1".to_string(),
            request_timeout_ms: 30_000,
            cache_ttl_ms: 300_000,
            toast_duration_ms: 3_000,
            error_toast_duration_ms: 5_000,
            tenant_header: "X-Tenant-ID".to_string(),
            company_header: "X-Company-ID".to_string(),
            login_route: "/auth/login".to_string(),
            company_select_route: "/company-select".to_string(),
            unauthorized_route: "/unauthorized".to_string(),
        }
    }

    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_base_url = env::var("ERP_API_BASE_URL")
            .map_err(|_| ConfigError::Missing("ERP_API_BASE_URL".to_string()))?;
        if api_base_url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "ERP_API_BASE_URL".to_string(),
                api_base_url,
            ));
        }
        let defaults = Self::new(api_base_url);

        let api_version = read_string_with_default("ERP_API_VERSION", &defaults.api_version);
        let request_timeout_ms =
            read_u64_with_default("ERP_REQUEST_TIMEOUT_MS", defaults.request_timeout_ms)?;
        let cache_ttl_ms = read_u64_with_default("ERP_CACHE_TTL_MS", defaults.cache_ttl_ms)?;
        let toast_duration_ms =
            read_u64_with_default("ERP_TOAST_DURATION_MS", defaults.toast_duration_ms)?;
        let error_toast_duration_ms = read_u64_with_default(
            "ERP_ERROR_TOAST_DURATION_MS",
            defaults.error_toast_duration_ms,
        )?;
        let tenant_header = read_string_with_default("ERP_TENANT_HEADER", &defaults.tenant_header);
        let company_header =
            read_string_with_default("ERP_COMPANY_HEADER", &defaults.company_header);
        let login_route = read_route("ERP_LOGIN_ROUTE", &defaults.login_route)?;
        let company_select_route =
            read_route("ERP_COMPANY_SELECT_ROUTE", &defaults.company_select_route)?;
        let unauthorized_route = read_route("ERP_UNAUTHORIZED_ROUTE", &defaults.unauthorized_route)?;

        Ok(Self {
            api_base_url: defaults.api_base_url,
            api_version,
            request_timeout_ms,
            cache_ttl_ms,
            toast_duration_ms,
            error_toast_duration_ms,
            tenant_header,
            company_header,
            login_route,
            company_select_route,
            unauthorized_route,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}

fn normalize_base_url(value: &str) -> String {
    value.trim().trim_end_matches('/').to_string()
}

fn read_string_with_default(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => default.to_string(),
    }
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

/// 路由必须以 `/` 开头。
fn read_route(key: &str, default: &str) -> Result<String, ConfigError> {
    let value = read_string_with_default(key, default);
    if !value.starts_with('/') {
        return Err(ConfigError::Invalid(key.to_string(), value));
    }
    Ok(value)
}
