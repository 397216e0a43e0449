use api_contract::{ApiError, ApiModule, ErrorKind};
use async_trait::async_trait;
use erp_http::{ApiRequest, ApiTransport, AuthApi, Method};
use erp_session::SessionStore;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

/// 按 (模块, 路径) 返回预设响应，并记录收到的请求。
struct FakeTransport {
    responses: Vec<(ApiModule, &'static str, Result<Value, ApiError>)>,
    seen: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    fn new(responses: Vec<(ApiModule, &'static str, Result<Value, ApiError>)>) -> Arc<Self> {
        Arc::new(Self {
            responses,
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ApiTransport for FakeTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let response = self
            .responses
            .iter()
            .find(|(module, path, _)| *module == request.module && *path == request.path)
            .map(|(_, _, response)| response.clone())
            .unwrap_or_else(|| Err(ApiError::new(ErrorKind::NotFound, "no fake response")));
        self.seen.lock().unwrap().push(request);
        response
    }
}

fn login_payload() -> Value {
    json!({
        "accessToken": "token-1",
        "refreshToken": "refresh-1",
        "tenantId": "tenant-1",
        "companies": [{"companyId": "c-1", "name": "Acme"}],
        "features": ["budgets"]
    })
}

#[tokio::test]
async fn login_signs_in_session() {
    let transport = FakeTransport::new(vec![(ApiModule::Auth, "login", Ok(login_payload()))]);
    let session = SessionStore::new("/auth/login");
    let auth = AuthApi::new(transport.clone(), session.clone());

    let response = auth.login("alice", "secret").await.expect("login");
    assert_eq!(response.tenant_id, "tenant-1");
    assert_eq!(session.access_token().as_deref(), Some("token-1"));
    assert_eq!(
        session.tenant_context().current_company_id.as_deref(),
        Some("c-1")
    );

    let seen = transport.seen.lock().unwrap();
    assert_eq!(seen[0].method, Method::POST);
    assert!(seen[0].auth_exempt);
    assert_eq!(seen[0].body.as_ref().expect("body")["username"], "alice");
}

#[tokio::test]
async fn refresh_updates_tokens() {
    let transport = FakeTransport::new(vec![
        (ApiModule::Auth, "login", Ok(login_payload())),
        (
            ApiModule::Auth,
            "refresh-token",
            Ok(json!({"accessToken": "token-2"})),
        ),
    ]);
    let session = SessionStore::new("/auth/login");
    let auth = AuthApi::new(transport, session.clone());
    auth.login("alice", "secret").await.expect("login");

    auth.refresh().await.expect("refresh");
    assert_eq!(session.access_token().as_deref(), Some("token-2"));
    assert_eq!(session.refresh_token().as_deref(), Some("refresh-1"));
}

#[tokio::test]
async fn refresh_without_token_is_session_expired() {
    let auth = AuthApi::new(FakeTransport::new(vec![]), SessionStore::new("/auth/login"));
    let err = auth.refresh().await.expect_err("no refresh token");
    assert_eq!(err.kind, ErrorKind::SessionExpired);
}

#[tokio::test]
async fn logout_clears_session_even_on_failure() {
    let transport = FakeTransport::new(vec![
        (ApiModule::Auth, "login", Ok(login_payload())),
        (
            ApiModule::Auth,
            "logout",
            Err(ApiError::network("connection reset")),
        ),
    ]);
    let session = SessionStore::new("/auth/login");
    let auth = AuthApi::new(transport, session.clone());
    auth.login("alice", "secret").await.expect("login");

    let err = auth.logout().await.expect_err("logout failed");
    assert_eq!(err.kind, ErrorKind::Network);
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn fetch_features_and_companies_update_session() {
    let transport = FakeTransport::new(vec![
        (ApiModule::Auth, "login", Ok(login_payload())),
        (
            ApiModule::Tenant,
            "features",
            Ok(json!({"tenantId": "tenant-1", "features": ["payroll", "tax"]})),
        ),
        (
            ApiModule::Tenant,
            "companies",
            Ok(json!([{"companyId": "c-1", "name": "Acme"}, {"id": "c-2", "name": "Beta"}])),
        ),
    ]);
    let session = SessionStore::new("/auth/login");
    let auth = AuthApi::new(transport, session.clone());
    auth.login("alice", "secret").await.expect("login");

    let features = auth.fetch_features().await.expect("features");
    assert_eq!(features, vec!["payroll".to_string(), "tax".to_string()]);
    let ctx = session.tenant_context();
    assert!(ctx.has_feature("payroll"));
    assert!(!ctx.has_feature("budgets"));

    let companies = auth.fetch_companies().await.expect("companies");
    assert_eq!(companies.len(), 2);
    session.select_company("c-2").expect("select");
}
