use serde::{Deserialize, Serialize};

/// 通知级别。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastSeverity {
    Success,
    Error,
    Warning,
    Info,
}

impl ToastSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToastSeverity::Success => "success",
            ToastSeverity::Error => "error",
            ToastSeverity::Warning => "warning",
            ToastSeverity::Info => "info",
        }
    }
}

impl std::fmt::Display for ToastSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 面向用户的短暂通知。
///
/// `duration_ms == 0` 表示常驻，只能手动移除。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToastMessage {
    pub id: String,
    pub text: String,
    pub severity: ToastSeverity,
    pub duration_ms: u64,
}

impl ToastMessage {
    pub fn is_persistent(&self) -> bool {
        self.duration_ms == 0
    }
}
