use crate::{ApiRequest, ApiTransport, decode, unwrap_envelope};
use api_contract::{ApiError, ApiModule, ErrorKind, api_path};
use async_trait::async_trait;
use erp_config::ClientConfig;
use erp_session::SessionStore;
use erp_telemetry::{
    RequestIds, new_request_ids, record_request_failed, record_request_issued, record_request_latency_ms,
    record_request_succeeded,
};
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Instant;
use tracing::{Instrument, info, info_span, warn};

/// 基于 reqwest 的后端客户端。
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    api_version: String,
    tenant_header: String,
    company_header: String,
    session: SessionStore,
}

impl HttpClient {
    pub fn new(config: &ClientConfig, session: SessionStore) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|err| ApiError::network(err.to_string()))?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            tenant_header: config.tenant_header.clone(),
            company_header: config.company_header.clone(),
            session,
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// 完整 URL。
    pub fn url_for(&self, module: ApiModule, path: &str) -> String {
        format!(
            "{}{}",
            self.base_url,
            api_path(&self.api_version, module, path)
        )
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        module: ApiModule,
        path: &str,
    ) -> Result<T, ApiError> {
        decode(self.send(ApiRequest::get(module, path)).await?)
    }

    pub async fn get_json_with_query<T: DeserializeOwned>(
        &self,
        module: ApiModule,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let request = query
            .iter()
            .fold(ApiRequest::get(module, path), |request, (key, value)| {
                request.with_query(*key, *value)
            });
        decode(self.send(request).await?)
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        module: ApiModule,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body).map_err(|err| ApiError::decode(err.to_string()))?;
        decode(self.send(ApiRequest::post(module, path).with_body(body)).await?)
    }

    pub async fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        module: ApiModule,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body).map_err(|err| ApiError::decode(err.to_string()))?;
        decode(self.send(ApiRequest::put(module, path).with_body(body)).await?)
    }

    pub async fn delete(&self, module: ApiModule, path: &str) -> Result<(), ApiError> {
        self.send(ApiRequest::delete(module, path)).await?;
        Ok(())
    }

    async fn execute(&self, request: ApiRequest, ids: RequestIds) -> Result<Value, ApiError> {
        let url = self.url_for(request.module, &request.path);
        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .header("x-request-id", ids.request_id.as_str())
            .header("x-trace-id", ids.trace_id.as_str());

        if let Some(token) = self.session.access_token() {
            builder = builder.bearer_auth(token);
        }
        let tenant = self.session.tenant_context();
        if !tenant.tenant_id.is_empty() {
            builder = builder.header(self.tenant_header.as_str(), tenant.tenant_id.as_str());
        }
        if let Some(company_id) = tenant.current_company_id.as_deref().filter(|id| !id.is_empty()) {
            builder = builder.header(self.company_header.as_str(), company_id);
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        record_request_issued();
        let started = Instant::now();
        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(transport_error)?;
        record_request_latency_ms(started.elapsed().as_millis() as u64);

        let body: Option<Value> = if bytes.is_empty() {
            None
        } else {
            serde_json::from_slice(&bytes).ok()
        };

        if status == StatusCode::UNAUTHORIZED && !request.auth_exempt {
            self.session.expire_session();
            return Err(ApiError::session_expired());
        }
        if !status.is_success() {
            let mut err = ApiError::from_status(
                status.as_u16(),
                body.as_ref(),
                status.canonical_reason().unwrap_or("request failed"),
            );
            if status == StatusCode::UNAUTHORIZED {
                // 登录/刷新失败属于凭据错误，由调用方处理。
                err.kind = ErrorKind::Validation;
            }
            return Err(err);
        }

        match body {
            Some(body) => unwrap_envelope(body),
            None if bytes.is_empty() => Ok(Value::Null),
            None => Err(ApiError::decode("response body is not valid JSON")),
        }
    }
}

#[async_trait]
impl ApiTransport for HttpClient {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let ids = new_request_ids();
        let span = info_span!(
            "api_request",
            request_id = %ids.request_id,
            trace_id = %ids.trace_id,
            method = %request.method,
            module = request.module.segment(),
            path = %request.path,
        );
        async {
            let result = self.execute(request, ids).await;
            match &result {
                Ok(_) => {
                    record_request_succeeded();
                    info!(target: "erp.http", "request_succeeded");
                }
                Err(err) => {
                    record_request_failed();
                    warn!(
                        target: "erp.http",
                        kind = %err.kind,
                        status = ?err.status,
                        error = %err.message,
                        "request_failed"
                    );
                }
            }
            result
        }
        .instrument(span)
        .await
    }
}

fn transport_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::network("request timed out")
    } else {
        ApiError::network(err.to_string())
    }
}
