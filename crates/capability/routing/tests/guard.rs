use domain::TenantContext;
use erp_routing::{
    GuardRoutes, GuardState, NavigationDecision, RedirectReason, RouteDefinition, RouteTable,
    TenantGuard,
};

fn guard() -> TenantGuard {
    TenantGuard::new(GuardRoutes::default(), RouteTable::erp_defaults())
}

fn tenant(company: Option<&str>, features: &[&str]) -> TenantContext {
    TenantContext::new(
        "tenant-1",
        company.map(str::to_string),
        features.iter().copied(),
    )
}

#[test]
fn auth_routes_always_allowed() {
    let guard = guard();
    for ctx in [TenantContext::default(), tenant(Some("c-1"), &[])] {
        let outcome = guard.check("/auth/login", &ctx);
        assert_eq!(outcome.decision, NavigationDecision::Allow);
        assert_eq!(outcome.state, GuardState::Unchecked);
    }
    assert!(guard.check("/auth", &TenantContext::default()).decision.is_allowed());
    assert!(
        guard
            .check("/company-select", &TenantContext::default())
            .decision
            .is_allowed()
    );
}

#[test]
fn auth_prefix_requires_segment_boundary() {
    let outcome = guard().check("/authorizations", &TenantContext::default());
    assert_eq!(outcome.decision.redirect_target(), Some("/company-select"));
}

#[test]
fn missing_company_redirects_to_selection() {
    let outcome = guard().check("/gl/journal-entries", &tenant(None, &["budgets"]));
    assert_eq!(
        outcome.decision,
        NavigationDecision::Redirect {
            to: "/company-select".to_string(),
            reason: RedirectReason::NoCompany,
        }
    );
    assert_eq!(outcome.state, GuardState::Denied);
}

#[test]
fn missing_feature_redirects_to_unauthorized() {
    let outcome = guard().check("/hr/payroll/runs", &tenant(Some("c-1"), &["budgets"]));
    assert_eq!(
        outcome.decision,
        NavigationDecision::Redirect {
            to: "/unauthorized".to_string(),
            reason: RedirectReason::MissingFeature("payroll".to_string()),
        }
    );
}

#[test]
fn granted_feature_allows() {
    let outcome = guard().check("/hr/payroll?period=2024-01", &tenant(Some("c-1"), &["payroll"]));
    assert!(outcome.decision.is_allowed());
    assert_eq!(outcome.state, GuardState::FeatureGranted);
}

#[test]
fn route_without_feature_allows_with_company() {
    let outcome = guard().check("/ap/bills/42", &tenant(Some("c-1"), &[]));
    assert!(outcome.decision.is_allowed());
    assert_eq!(outcome.state, GuardState::CompanySelected);

    let outcome = guard().check("/not-in-table", &tenant(Some("c-1"), &[]));
    assert_eq!(outcome.state, GuardState::CompanySelected);
}

#[test]
fn unauthorized_page_requires_company() {
    let outcome = guard().check("/unauthorized", &TenantContext::default());
    assert_eq!(outcome.decision.redirect_target(), Some("/company-select"));
    assert_eq!(outcome.state, GuardState::Denied);

    let outcome = guard().check("/unauthorized", &tenant(Some("c-1"), &[]));
    assert!(outcome.decision.is_allowed());
    assert_eq!(outcome.state, GuardState::CompanySelected);
}

#[test]
fn trailing_slash_matches_bypass_routes() {
    let guard = guard();
    for path in ["/company-select/", "/company-select/?next=/gl", "/auth/"] {
        let outcome = guard.check(path, &TenantContext::default());
        assert_eq!(outcome.decision, NavigationDecision::Allow, "{path}");
        assert_eq!(outcome.state, GuardState::Unchecked);
    }
    let outcome = guard.check("/hr/payroll/", &tenant(Some("c-1"), &["budgets"]));
    assert_eq!(outcome.decision.redirect_target(), Some("/unauthorized"));
}

#[test]
fn table_prefers_exact_then_longest_prefix() {
    let table = RouteTable::new(vec![
        RouteDefinition::new("/gl/*", "gl"),
        RouteDefinition::new("/gl/budgets/*", "budgets").requires("budgets"),
        RouteDefinition::new("/gl/budgets/help", "budget-help"),
    ]);
    assert_eq!(table.resolve("/gl/budgets/2024").map(|r| r.name.as_str()), Some("budgets"));
    assert_eq!(table.resolve("/gl/budgets/help").map(|r| r.name.as_str()), Some("budget-help"));
    assert_eq!(table.resolve("/gl/accounts/").map(|r| r.name.as_str()), Some("gl"));
    assert_eq!(table.resolve("/glx"), None);
    assert_eq!(table.len(), 3);
}
