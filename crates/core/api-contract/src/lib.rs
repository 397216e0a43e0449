//! 稳定的 DTO、后端路径与客户端错误契约。

mod error;

pub use error::{ApiError, ErrorKind};

use domain::Company;
use serde::{Deserialize, Serialize};

/// 后端标准响应封装。
///
/// 部分接口直接返回裸载荷，因此 `success` 与 `error` 都是可选的。
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<ErrorBody>,
}

/// 失败响应的错误体。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: Some(true),
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: Some(false),
            data: None,
            error: Some(ErrorBody {
                code: Some(code.into()),
                message: message.into(),
            }),
        }
    }
}

/// 后端业务模块（决定版本化路径前缀）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiModule {
    GeneralLedger,
    AccountsPayable,
    AccountsReceivable,
    Cash,
    Tax,
    Hr,
    Reporting,
    SuperAdmin,
    Auth,
    Tenant,
}

impl ApiModule {
    pub const ALL: [ApiModule; 10] = [
        ApiModule::GeneralLedger,
        ApiModule::AccountsPayable,
        ApiModule::AccountsReceivable,
        ApiModule::Cash,
        ApiModule::Tax,
        ApiModule::Hr,
        ApiModule::Reporting,
        ApiModule::SuperAdmin,
        ApiModule::Auth,
        ApiModule::Tenant,
    ];

    /// 模块路径段。
    pub fn segment(&self) -> &'static str {
        match self {
            ApiModule::GeneralLedger => "gl",
            ApiModule::AccountsPayable => "ap",
            ApiModule::AccountsReceivable => "ar",
            ApiModule::Cash => "cash",
            ApiModule::Tax => "tax",
            ApiModule::Hr => "hr",
            ApiModule::Reporting => "reports",
            ApiModule::SuperAdmin => "super-admin",
            ApiModule::Auth => "auth",
            ApiModule::Tenant => "tenant",
        }
    }

    /// 按路径段解析模块（CLI 使用）。
    pub fn from_segment(segment: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|module| module.segment() == segment)
    }
}

/// 构造 `/api/{version}/{module}/{path}`。
pub fn api_path(version: &str, module: ApiModule, path: &str) -> String {
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        format!("/api/{}/{}", version, module.segment())
    } else {
        format!("/api/{}/{}/{}", version, module.segment(), path)
    }
}

/// 登录请求体。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// 登录响应体。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// 过期时间（毫秒时间戳）。
    #[serde(default)]
    pub expires: Option<u64>,
    pub tenant_id: String,
    #[serde(default)]
    pub companies: Vec<CompanyDto>,
    #[serde(default)]
    pub features: Vec<String>,
}

/// 刷新 token 请求体。
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    #[serde(alias = "refresh_token")]
    pub refresh_token: String,
}

/// 刷新 token 响应体。
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires: Option<u64>,
}

/// 公司返回结构。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyDto {
    #[serde(alias = "id")]
    pub company_id: String,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
}

impl From<CompanyDto> for Company {
    fn from(dto: CompanyDto) -> Self {
        Company {
            company_id: dto.company_id,
            name: dto.name,
            code: dto.code,
        }
    }
}

/// 租户已开通功能。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantFeaturesDto {
    pub tenant_id: String,
    #[serde(alias = "enabledFeatures")]
    pub features: Vec<String>,
}
