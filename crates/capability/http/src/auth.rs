//! 会话相关接口：登录、刷新、登出、租户功能与公司列表。

use crate::{ApiRequest, ApiTransport, decode};
use api_contract::{
    ApiError, ApiModule, CompanyDto, LoginRequest, LoginResponse, RefreshTokenRequest,
    RefreshTokenResponse, TenantFeaturesDto,
};
use domain::Company;
use erp_session::SessionStore;
use std::sync::Arc;
use tracing::warn;

/// 会话接口，调用成功后同步写入 `SessionStore`。
#[derive(Clone)]
pub struct AuthApi {
    transport: Arc<dyn ApiTransport>,
    session: SessionStore,
}

impl AuthApi {
    pub fn new(transport: Arc<dyn ApiTransport>, session: SessionStore) -> Self {
        Self { transport, session }
    }

    /// 登录并建立会话。凭据错误返回 Validation 类错误，不触发全局过期。
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let body = serde_json::to_value(LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        })
        .map_err(|err| ApiError::decode(err.to_string()))?;
        let request = ApiRequest::post(ApiModule::Auth, "login")
            .with_body(body)
            .auth_exempt();
        let response: LoginResponse = decode(self.transport.send(request).await?)?;
        self.session.sign_in(response.clone());
        Ok(response)
    }

    /// 使用 refresh token 换取新 token（不自动重放失败的请求）。
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let refresh_token = self
            .session
            .refresh_token()
            .ok_or_else(ApiError::session_expired)?;
        let body = serde_json::to_value(RefreshTokenRequest { refresh_token })
            .map_err(|err| ApiError::decode(err.to_string()))?;
        let request = ApiRequest::post(ApiModule::Auth, "refresh-token")
            .with_body(body)
            .auth_exempt();
        let response: RefreshTokenResponse = decode(self.transport.send(request).await?)?;
        self.session
            .set_tokens(response.access_token, response.refresh_token, response.expires);
        Ok(())
    }

    /// 登出：后端失败也会清空本地会话。
    pub async fn logout(&self) -> Result<(), ApiError> {
        let result = self
            .transport
            .send(ApiRequest::post(ApiModule::Auth, "logout").auth_exempt())
            .await;
        self.session.sign_out();
        if let Err(err) = &result {
            warn!(target: "erp.http", error = %err, "logout_request_failed");
        }
        result.map(|_| ())
    }

    /// 拉取租户已开通功能并写入会话。
    pub async fn fetch_features(&self) -> Result<Vec<String>, ApiError> {
        let dto: TenantFeaturesDto = decode(
            self.transport
                .send(ApiRequest::get(ApiModule::Tenant, "features"))
                .await?,
        )?;
        self.session.set_features(dto.features.iter().cloned());
        Ok(dto.features)
    }

    /// 拉取可选公司列表并写入会话。
    pub async fn fetch_companies(&self) -> Result<Vec<Company>, ApiError> {
        let companies: Vec<CompanyDto> = decode(
            self.transport
                .send(ApiRequest::get(ApiModule::Tenant, "companies"))
                .await?,
        )?;
        let companies: Vec<Company> = companies.into_iter().map(Company::from).collect();
        self.session.set_companies(companies.clone());
        Ok(companies)
    }
}
