use crate::SessionError;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// access token 中客户端关心的 claims。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub exp: Option<u64>,
}

impl TokenClaims {
    /// 按秒级时间戳判断是否过期；没有 exp 视为不过期。
    pub fn is_expired_at(&self, now_epoch_seconds: u64) -> bool {
        self.exp.is_some_and(|exp| exp <= now_epoch_seconds)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_epoch_seconds())
    }
}

/// 读取 token 的 claims。
///
/// 客户端不持有签名密钥，签名由后端校验；这里只解析载荷。
pub fn decode_claims(token: &str) -> Result<TokenClaims, SessionError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    jsonwebtoken::decode::<TokenClaims>(token, &DecodingKey::from_secret(b""), &validation)
        .map(|data| data.claims)
        .map_err(|err| SessionError::TokenInvalid(err.to_string()))
}

/// 当前时间戳（秒）。
pub(crate) fn now_epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
