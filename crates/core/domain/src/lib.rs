pub mod toast;

pub use toast::{ToastMessage, ToastSeverity};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 租户上下文：当前租户、所选公司与已开通功能。
///
/// 由会话存储持有并修改；路由守卫只读取快照。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantContext {
    pub tenant_id: String,
    pub current_company_id: Option<String>,
    pub enabled_features: BTreeSet<String>,
}

impl TenantContext {
    /// 构造显式租户、公司与功能集合的上下文。
    pub fn new<I, S>(
        tenant_id: impl Into<String>,
        current_company_id: Option<String>,
        enabled_features: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tenant_id: tenant_id.into(),
            current_company_id,
            enabled_features: enabled_features.into_iter().map(Into::into).collect(),
        }
    }

    /// 是否已选择公司（空字符串视为未选择）。
    pub fn has_company(&self) -> bool {
        self.current_company_id
            .as_deref()
            .is_some_and(|id| !id.is_empty())
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.enabled_features.contains(feature)
    }
}

/// 公司摘要（公司选择页使用）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub company_id: String,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
}
