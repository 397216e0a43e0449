//! 应用服务装配
//!
//! 所有共享服务在启动时显式构造一次，通过 `AppServices` 注入调用方，
//! 关闭时统一销毁：
//! - cache / loading / toasts：请求状态基础设施
//! - session / guard：租户状态与路由守卫
//! - http / auth：后端访问
//!
//! 会话监听任务在公司切换、登出、过期时清空缓存，过期时额外提示一次。

use api_contract::{ApiError, ApiModule, ErrorKind, LoginResponse};
use erp_cache::CacheManager;
use erp_config::ClientConfig;
use erp_http::{AuthApi, HttpClient};
use erp_loading::LoadingTracker;
use erp_notify::{ToastDefaults, ToastQueue};
use erp_request::ApiCall;
use erp_routing::{GuardOutcome, GuardRoutes, RouteTable, TenantGuard};
use erp_session::{SessionEvent, SessionStore};
use serde_json::Value;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// 服务装配错误。
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("tokio runtime not available")]
    NoRuntime,
    #[error(transparent)]
    Http(#[from] ApiError),
}

pub struct AppServices {
    pub cache: CacheManager<Value>,
    pub loading: LoadingTracker,
    pub toasts: ToastQueue,
    pub session: SessionStore,
    pub guard: TenantGuard,
    pub http: HttpClient,
    pub auth: AuthApi,
    session_listener: JoinHandle<()>,
}

impl AppServices {
    /// 构造全部服务。不在 tokio 运行时内时返回 `ServiceError::NoRuntime`。
    pub fn start(config: ClientConfig) -> Result<Self, ServiceError> {
        let runtime = Handle::try_current().map_err(|_| ServiceError::NoRuntime)?;
        let cache = CacheManager::with_default_ttl(config.cache_ttl());
        let loading = LoadingTracker::new();
        let toasts = ToastQueue::new(ToastDefaults {
            duration_ms: config.toast_duration_ms,
            error_duration_ms: config.error_toast_duration_ms,
        });
        let session = SessionStore::new(config.login_route.clone());
        let guard = TenantGuard::new(
            GuardRoutes {
                auth_prefix: auth_prefix(&config.login_route),
                company_select: config.company_select_route.clone(),
                unauthorized: config.unauthorized_route.clone(),
            },
            RouteTable::erp_defaults(),
        );
        let http = HttpClient::new(&config, session.clone())?;
        let auth = AuthApi::new(Arc::new(http.clone()), session.clone());
        let session_listener =
            spawn_session_listener(&runtime, &session, cache.clone(), toasts.clone());

        info!(
            target: "erp.shell",
            api_base_url = %config.api_base_url,
            api_version = %config.api_version,
            "services_started"
        );
        Ok(Self {
            cache,
            loading,
            toasts,
            session,
            guard,
            http,
            auth,
            session_listener,
        })
    }

    /// 新的调用状态，共享通知队列；`key` 为该调用点独占的命名加载槽位，
    /// 全局加载指示用 `loading.any_loading()`。
    pub fn api_call<T: Clone>(&self, key: &str) -> ApiCall<T> {
        ApiCall::new(self.toasts.clone()).with_loading(self.loading.clone(), Some(key))
    }

    /// 登录并建立会话；`company_id` 给定时随后选择该公司。
    pub async fn sign_in(
        &self,
        username: &str,
        password: &str,
        company_id: Option<&str>,
    ) -> Result<LoginResponse, ApiError> {
        let response = self.auth.login(username, password).await?;
        if let Some(company_id) = company_id {
            self.session
                .select_company(company_id)
                .map_err(|err| ApiError::new(ErrorKind::Validation, err.to_string()))?;
        }
        Ok(response)
    }

    /// 按当前租户上下文判定导航。
    pub fn navigate(&self, path: &str) -> GuardOutcome {
        self.guard.check(path, &self.session.tenant_context())
    }

    /// 经缓存的 GET，缓存键按租户与公司隔离。
    pub async fn get_cached(
        &self,
        call: &ApiCall<Value>,
        module: ApiModule,
        path: &str,
    ) -> Result<Value, ApiError> {
        let key = self.cache_key(module, path);
        let call = call.clone().with_cache(self.cache.clone());
        let http = self.http.clone();
        let path = path.to_string();
        call.execute_cached(&key, self.cache.default_ttl(), || async move {
            http.get_json::<Value>(module, &path).await
        })
        .await
    }

    pub fn cache_key(&self, module: ApiModule, path: &str) -> String {
        let tenant = self.session.tenant_context();
        format!(
            "{}:{}:{}:{}",
            tenant.tenant_id,
            tenant.current_company_id.unwrap_or_default(),
            module.segment(),
            path.trim_start_matches('/')
        )
    }

    /// 关闭：停止监听、取消通知定时器、清空缓存与会话。
    pub fn shutdown(self) {
        self.session_listener.abort();
        self.toasts.shutdown();
        self.cache.clear();
        self.session.sign_out();
        info!(target: "erp.shell", "services_stopped");
    }
}

/// 登录路由所在的一级路径作为认证前缀（`/auth/login` → `/auth`）。
fn auth_prefix(login_route: &str) -> String {
    let trimmed = login_route.trim_start_matches('/');
    match trimmed.split('/').next() {
        Some(first) if !first.is_empty() => format!("/{}", first),
        _ => "/auth".to_string(),
    }
}

fn spawn_session_listener(
    runtime: &Handle,
    session: &SessionStore,
    cache: CacheManager<Value>,
    toasts: ToastQueue,
) -> JoinHandle<()> {
    let mut events = session.subscribe();
    runtime.spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::CompanyChanged { company_id }) => {
                    cache.clear();
                    info!(target: "erp.shell", company_id = %company_id, "cache_cleared_on_company_change");
                }
                Ok(SessionEvent::SignedOut { redirect_to }) => {
                    cache.clear();
                    info!(target: "erp.shell", redirect_to = %redirect_to, "redirect_after_sign_out");
                }
                Ok(SessionEvent::Expired { redirect_to }) => {
                    cache.clear();
                    toasts.warning("Session expired, please sign in again");
                    warn!(target: "erp.shell", redirect_to = %redirect_to, "redirect_after_session_expired");
                }
                Ok(SessionEvent::SignedIn { .. } | SessionEvent::FeaturesChanged) => {}
                Err(RecvError::Lagged(skipped)) => {
                    cache.clear();
                    warn!(target: "erp.shell", skipped, "session_events_lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
