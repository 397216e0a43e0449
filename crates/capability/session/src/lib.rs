//! 会话与租户状态：token、公司选择、功能开关。
//!
//! `SessionStore` 是租户上下文的唯一写入方；路由守卫与 HTTP 层只读快照。
//! 状态变化通过 broadcast 通道通知订阅方（缓存失效、跳转登录等）。

mod jwt;

pub use jwt::{TokenClaims, decode_claims};

use api_contract::LoginResponse;
use domain::{Company, TenantContext};
use erp_telemetry::record_session_expired;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// 会话相关错误。
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("unknown company: {0}")]
    UnknownCompany(String),
    #[error("token invalid: {0}")]
    TokenInvalid(String),
}

/// 会话事件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn { tenant_id: String },
    CompanyChanged { company_id: String },
    FeaturesChanged,
    /// 401 触发的全局过期，调用方应跳转到 `redirect_to`。
    Expired { redirect_to: String },
    SignedOut { redirect_to: String },
}

#[derive(Debug, Default)]
struct SessionState {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at_ms: Option<u64>,
    tenant: TenantContext,
    companies: Vec<Company>,
}

struct SessionInner {
    state: RwLock<SessionState>,
    events: broadcast::Sender<SessionEvent>,
    login_route: String,
}

/// 会话存储（可克隆句柄）。
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

impl SessionStore {
    /// 创建会话存储，`login_route` 为过期/登出后的跳转目标。
    pub fn new(login_route: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            inner: Arc::new(SessionInner {
                state: RwLock::new(SessionState::default()),
                events,
                login_route: login_route.into(),
            }),
        }
    }

    pub fn login_route(&self) -> &str {
        &self.inner.login_route
    }

    /// 订阅会话事件。
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// 以登录响应建立会话。
    ///
    /// 仅有一家公司时自动选中。
    pub fn sign_in(&self, response: LoginResponse) {
        let tenant_id = if response.tenant_id.is_empty() {
            decode_claims(&response.access_token)
                .ok()
                .and_then(|claims| claims.tenant_id)
                .unwrap_or_default()
        } else {
            response.tenant_id
        };
        let companies: Vec<Company> = response.companies.into_iter().map(Company::from).collect();
        let current_company_id = match companies.as_slice() {
            [only] => Some(only.company_id.clone()),
            _ => None,
        };
        {
            let mut state = self.write();
            state.access_token = Some(response.access_token);
            state.refresh_token = response.refresh_token;
            state.expires_at_ms = response.expires;
            state.tenant = TenantContext::new(tenant_id.clone(), current_company_id, response.features);
            state.companies = companies;
        }
        info!(target: "erp.session", tenant_id = %tenant_id, "session_signed_in");
        self.emit(SessionEvent::SignedIn { tenant_id });
    }

    /// 更新 token（刷新后调用），不改变租户状态。
    pub fn set_tokens(
        &self,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_at_ms: Option<u64>,
    ) {
        let mut state = self.write();
        state.access_token = Some(access_token.into());
        if refresh_token.is_some() {
            state.refresh_token = refresh_token;
        }
        state.expires_at_ms = expires_at_ms;
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().refresh_token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().access_token.is_some()
    }

    /// 本地判断 access token 是否已过期（以服务端 expires 或 JWT exp 为准）。
    pub fn is_token_expired(&self) -> bool {
        let state = self.read();
        let Some(token) = state.access_token.as_deref() else {
            return true;
        };
        if let Some(expires_at_ms) = state.expires_at_ms {
            return expires_at_ms / 1000 <= jwt::now_epoch_seconds();
        }
        decode_claims(token).is_ok_and(|claims| claims.is_expired())
    }

    /// 租户上下文快照。
    pub fn tenant_context(&self) -> TenantContext {
        self.read().tenant.clone()
    }

    pub fn companies(&self) -> Vec<Company> {
        self.read().companies.clone()
    }

    /// 替换可选公司列表（公司选择页刷新时）。
    pub fn set_companies(&self, companies: Vec<Company>) {
        self.write().companies = companies;
    }

    /// 直接设置租户（超管切换租户时使用）。
    pub fn set_tenant(&self, tenant: TenantContext) {
        self.write().tenant = tenant;
    }

    /// 选择当前公司；已知公司列表非空时必须在列表内。
    pub fn select_company(&self, company_id: &str) -> Result<(), SessionError> {
        {
            let mut state = self.write();
            if state.access_token.is_none() {
                return Err(SessionError::NotAuthenticated);
            }
            if !state.companies.is_empty()
                && !state
                    .companies
                    .iter()
                    .any(|company| company.company_id == company_id)
            {
                return Err(SessionError::UnknownCompany(company_id.to_string()));
            }
            state.tenant.current_company_id = Some(company_id.to_string());
        }
        info!(target: "erp.session", company_id = %company_id, "company_selected");
        self.emit(SessionEvent::CompanyChanged {
            company_id: company_id.to_string(),
        });
        Ok(())
    }

    /// 替换租户已开通功能。
    pub fn set_features<I, S>(&self, features: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.write().tenant.enabled_features = features.into_iter().map(Into::into).collect();
        self.emit(SessionEvent::FeaturesChanged);
    }

    /// 会话过期（HTTP 401）：清空 token 与租户状态并广播跳转。
    ///
    /// 只有持有 token 的会话才会广播 `Expired`，并发的多个 401 只通知一次；
    /// 返回本次调用是否真正结束了会话。
    pub fn expire_session(&self) -> bool {
        let had_token = {
            let mut state = self.write();
            let had_token = state.access_token.is_some();
            *state = SessionState::default();
            had_token
        };
        if !had_token {
            debug!(target: "erp.session", "session_expire_ignored");
            return false;
        }
        record_session_expired();
        warn!(target: "erp.session", "session_expired");
        self.emit(SessionEvent::Expired {
            redirect_to: self.inner.login_route.clone(),
        });
        true
    }

    /// 主动登出。
    pub fn sign_out(&self) {
        *self.write() = SessionState::default();
        info!(target: "erp.session", "session_signed_out");
        self.emit(SessionEvent::SignedOut {
            redirect_to: self.inner.login_route.clone(),
        });
    }

    fn emit(&self, event: SessionEvent) {
        // 没有订阅方时发送失败可忽略。
        let _ = self.inner.events.send(event);
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
