use domain::{Company, TenantContext, ToastMessage, ToastSeverity};

#[test]
fn tenant_context_builds() {
    let ctx = TenantContext::new(
        "tenant-1",
        Some("company-1".to_string()),
        ["budgets", "payroll"],
    );

    assert_eq!(ctx.tenant_id, "tenant-1");
    assert!(ctx.has_company());
    assert!(ctx.has_feature("payroll"));
    assert!(!ctx.has_feature("consolidation"));
    assert_eq!(ctx.enabled_features.len(), 2);
}

#[test]
fn empty_company_id_is_not_selected() {
    let ctx = TenantContext::new("tenant-1", Some(String::new()), Vec::<String>::new());
    assert!(!ctx.has_company());
    assert!(!TenantContext::default().has_company());
}

#[test]
fn tenant_context_is_camel_case() {
    let ctx = TenantContext::new("tenant-1", Some("company-1".to_string()), ["budgets"]);
    let value = serde_json::to_value(&ctx).expect("serialize");
    assert_eq!(value["tenantId"], "tenant-1");
    assert_eq!(value["currentCompanyId"], "company-1");
    assert_eq!(value["enabledFeatures"][0], "budgets");
}

#[test]
fn toast_persistence_and_severity() {
    let toast = ToastMessage {
        id: "t-1".to_string(),
        text: "saved".to_string(),
        severity: ToastSeverity::Success,
        duration_ms: 0,
    };
    assert!(toast.is_persistent());
    assert_eq!(ToastSeverity::Warning.to_string(), "warning");
    let value = serde_json::to_value(&toast).expect("serialize");
    assert_eq!(value["severity"], "success");
    assert_eq!(value["durationMs"], 0);
}

#[test]
fn company_code_is_optional() {
    let company: Company =
        serde_json::from_str(r#"{"companyId":"c-1","name":"Acme"}"#).expect("parse");
    assert_eq!(company.company_id, "c-1");
    assert!(company.code.is_none());
}
