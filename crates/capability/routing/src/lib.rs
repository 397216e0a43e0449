//! 租户路由守卫
//!
//! 每次导航前做一次纯同步判定（不重试、不排队）：
//! 1. 认证路由（`/auth` 下）与公司选择页直接放行
//! 2. 未选择公司 → 跳转公司选择页
//! 3. 路由声明了租户未开通的功能 → 跳转无权限页
//! 4. 其余放行

mod table;

pub use table::{RouteDefinition, RouteTable};

use domain::TenantContext;
use erp_telemetry::record_navigation_redirect;
use tracing::{debug, info};

/// 单次导航的判定阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Unchecked,
    CompanySelected,
    FeatureGranted,
    Denied,
}

/// 重定向原因。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectReason {
    NoCompany,
    MissingFeature(String),
}

/// 导航判定结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationDecision {
    Allow,
    Redirect { to: String, reason: RedirectReason },
}

impl NavigationDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, NavigationDecision::Allow)
    }

    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            NavigationDecision::Allow => None,
            NavigationDecision::Redirect { to, .. } => Some(to),
        }
    }
}

/// 判定结果与到达的阶段。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardOutcome {
    pub decision: NavigationDecision,
    pub state: GuardState,
}

/// 守卫使用的固定路由。
#[derive(Debug, Clone)]
pub struct GuardRoutes {
    pub auth_prefix: String,
    pub company_select: String,
    pub unauthorized: String,
}

impl Default for GuardRoutes {
    fn default() -> Self {
        Self {
            auth_prefix: "/auth".to_string(),
            company_select: "/company-select".to_string(),
            unauthorized: "/unauthorized".to_string(),
        }
    }
}

/// 租户路由守卫。
#[derive(Debug, Clone)]
pub struct TenantGuard {
    routes: GuardRoutes,
    table: RouteTable,
}

impl TenantGuard {
    pub fn new(routes: GuardRoutes, table: RouteTable) -> Self {
        Self { routes, table }
    }

    pub fn routes(&self) -> &GuardRoutes {
        &self.routes
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// 对一次导航做判定；`tenant` 只读。
    pub fn check(&self, target_path: &str, tenant: &TenantContext) -> GuardOutcome {
        let path = normalize(target_path);
        if self.is_bypass(path) {
            debug!(target: "erp.routing", path = %path, "navigation_bypass");
            return GuardOutcome {
                decision: NavigationDecision::Allow,
                state: GuardState::Unchecked,
            };
        }

        if !tenant.has_company() {
            return self.redirect(
                path,
                self.routes.company_select.clone(),
                RedirectReason::NoCompany,
            );
        }

        let required = self
            .table
            .resolve(path)
            .and_then(|route| route.required_feature.as_deref());
        match required {
            Some(feature) if !tenant.has_feature(feature) => self.redirect(
                path,
                self.routes.unauthorized.clone(),
                RedirectReason::MissingFeature(feature.to_string()),
            ),
            Some(_) => GuardOutcome {
                decision: NavigationDecision::Allow,
                state: GuardState::FeatureGranted,
            },
            None => GuardOutcome {
                decision: NavigationDecision::Allow,
                state: GuardState::CompanySelected,
            },
        }
    }

    /// 只有认证路由与公司选择页不受守卫约束。
    fn is_bypass(&self, path: &str) -> bool {
        let auth = self.routes.auth_prefix.trim_end_matches('/');
        path == auth
            || path
                .strip_prefix(auth)
                .is_some_and(|rest| rest.starts_with('/'))
            || path == trim_trailing_slash(&self.routes.company_select)
    }

    fn redirect(&self, path: &str, to: String, reason: RedirectReason) -> GuardOutcome {
        record_navigation_redirect();
        info!(
            target: "erp.routing",
            path = %path,
            redirect_to = %to,
            reason = ?reason,
            "navigation_redirect"
        );
        GuardOutcome {
            decision: NavigationDecision::Redirect { to, reason },
            state: GuardState::Denied,
        }
    }
}

/// 去掉查询串、片段与末尾斜杠（根路径除外）。
fn normalize(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    trim_trailing_slash(&path[..end])
}

fn trim_trailing_slash(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/"
    } else {
        trimmed
    }
}
