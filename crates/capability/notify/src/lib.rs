//! Toast 通知队列
//!
//! - show：追加消息并返回 id；`duration_ms > 0` 时启动定时器自动移除
//! - remove：立即移除（幂等），同时取消该消息的定时器
//! - 仅保证插入顺序，不做去重

use domain::{ToastMessage, ToastSeverity};
use erp_telemetry::record_toast_shown;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

/// 各级别的默认展示时长。
#[derive(Debug, Clone, Copy)]
pub struct ToastDefaults {
    pub duration_ms: u64,
    pub error_duration_ms: u64,
}

impl Default for ToastDefaults {
    fn default() -> Self {
        Self {
            duration_ms: 3_000,
            error_duration_ms: 5_000,
        }
    }
}

#[derive(Default)]
struct ToastState {
    messages: Vec<ToastMessage>,
    timers: HashMap<String, JoinHandle<()>>,
}

/// 通知队列（可克隆句柄）。
#[derive(Clone)]
pub struct ToastQueue {
    state: Arc<Mutex<ToastState>>,
    defaults: ToastDefaults,
}

impl ToastQueue {
    pub fn new(defaults: ToastDefaults) -> Self {
        Self {
            state: Arc::new(Mutex::new(ToastState::default())),
            defaults,
        }
    }

    /// 追加一条消息并返回其 id。
    ///
    /// 不在 tokio 运行时内调用时无法启动定时器，消息保留到手动移除。
    pub fn show(&self, text: impl Into<String>, severity: ToastSeverity, duration_ms: u64) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let message = ToastMessage {
            id: id.clone(),
            text: text.into(),
            severity,
            duration_ms,
        };
        debug!(
            target: "erp.notify",
            toast_id = %id,
            severity = %severity,
            duration_ms,
            "toast_show"
        );

        let mut state = lock(&self.state);
        state.messages.push(message);
        record_toast_shown();

        if duration_ms > 0 {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let deadline = Instant::now() + Duration::from_millis(duration_ms);
                    let timer =
                        handle.spawn(dismiss_at(Arc::downgrade(&self.state), id.clone(), deadline));
                    state.timers.insert(id.clone(), timer);
                }
                Err(_) => {
                    warn!(target: "erp.notify", toast_id = %id, "toast_timer_unavailable");
                }
            }
        }
        id
    }

    pub fn success(&self, text: impl Into<String>) -> String {
        self.show(text, ToastSeverity::Success, self.defaults.duration_ms)
    }

    pub fn error(&self, text: impl Into<String>) -> String {
        self.show(text, ToastSeverity::Error, self.defaults.error_duration_ms)
    }

    pub fn warning(&self, text: impl Into<String>) -> String {
        self.show(text, ToastSeverity::Warning, self.defaults.duration_ms)
    }

    pub fn info(&self, text: impl Into<String>) -> String {
        self.show(text, ToastSeverity::Info, self.defaults.duration_ms)
    }

    /// 立即移除；已移除的 id 返回 false。
    pub fn remove(&self, id: &str) -> bool {
        let mut state = lock(&self.state);
        if let Some(timer) = state.timers.remove(id) {
            timer.abort();
        }
        remove_message(&mut state, id)
    }

    /// 当前消息快照（插入顺序）。
    pub fn messages(&self) -> Vec<ToastMessage> {
        lock(&self.state).messages.clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.state).messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 清空所有消息并取消全部定时器。
    pub fn clear(&self) {
        let mut state = lock(&self.state);
        for (_, timer) in state.timers.drain() {
            timer.abort();
        }
        state.messages.clear();
    }

    /// 应用关闭时调用。
    pub fn shutdown(&self) {
        self.clear();
        debug!(target: "erp.notify", "toast_queue_shutdown");
    }
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::new(ToastDefaults::default())
    }
}

/// 截止时间在 show 时确定，与定时任务何时被首次调度无关。
async fn dismiss_at(state: Weak<Mutex<ToastState>>, id: String, deadline: Instant) {
    tokio::time::sleep_until(deadline).await;
    let Some(shared) = state.upgrade() else {
        return;
    };
    let mut state = lock(&shared);
    state.timers.remove(&id);
    if remove_message(&mut state, &id) {
        debug!(target: "erp.notify", toast_id = %id, "toast_dismissed");
    }
}

fn remove_message(state: &mut ToastState, id: &str) -> bool {
    let before = state.messages.len();
    state.messages.retain(|message| message.id != id);
    before != state.messages.len()
}

fn lock(state: &Mutex<ToastState>) -> MutexGuard<'_, ToastState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
