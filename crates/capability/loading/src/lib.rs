//! 加载状态跟踪
//!
//! 同时支持一个全局（未命名）槽位与任意多个命名槽位（如表格每一行一个）。
//! 槽位由 `LoadingGuard` 持有，guard 释放时复位，因此成功、出错、提前返回
//! 以及 future 被丢弃时都能保证复位。同一槽位的重叠操作按引用计数处理。

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::trace;

#[derive(Default)]
struct LoadingState {
    global: usize,
    named: HashMap<String, usize>,
}

impl LoadingState {
    fn any(&self) -> bool {
        self.global > 0 || !self.named.is_empty()
    }
}

struct LoadingInner {
    state: Mutex<LoadingState>,
    any_tx: watch::Sender<bool>,
}

/// 加载状态跟踪器（可克隆句柄）。
#[derive(Clone)]
pub struct LoadingTracker {
    inner: Arc<LoadingInner>,
}

/// 槽位占用凭证，drop 时释放。
#[must_use = "the loading flag is released as soon as the guard is dropped"]
pub struct LoadingGuard {
    tracker: LoadingTracker,
    key: Option<String>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.tracker.release(self.key.as_deref());
    }
}

impl LoadingTracker {
    pub fn new() -> Self {
        let (any_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(LoadingInner {
                state: Mutex::new(LoadingState::default()),
                any_tx,
            }),
        }
    }

    /// 占用槽位（`None` 为全局槽位）。
    pub fn start(&self, key: Option<&str>) -> LoadingGuard {
        {
            let mut state = self.lock();
            match key {
                Some(key) => *state.named.entry(key.to_string()).or_insert(0) += 1,
                None => state.global += 1,
            }
            self.publish(&state);
        }
        trace!(target: "erp.loading", key = key.unwrap_or("<global>"), "loading_start");
        LoadingGuard {
            tracker: self.clone(),
            key: key.map(str::to_string),
        }
    }

    /// 在槽位占用期间执行 `operation`，任何退出路径都会复位。
    pub async fn with_loading<F, T>(&self, key: Option<&str>, operation: F) -> T
    where
        F: Future<Output = T>,
    {
        let _guard = self.start(key);
        operation.await
    }

    pub fn is_loading(&self, key: Option<&str>) -> bool {
        let state = self.lock();
        match key {
            Some(key) => state.named.contains_key(key),
            None => state.global > 0,
        }
    }

    /// 任一槽位处于加载中。
    pub fn any_loading(&self) -> bool {
        self.lock().any()
    }

    /// 当前加载中的命名槽位（已排序）。
    pub fn active_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().named.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// 订阅"是否有任一加载中"的变化。
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.any_tx.subscribe()
    }

    fn release(&self, key: Option<&str>) {
        let mut state = self.lock();
        match key {
            Some(key) => {
                if let Some(count) = state.named.get_mut(key) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        state.named.remove(key);
                    }
                }
            }
            None => state.global = state.global.saturating_sub(1),
        }
        self.publish(&state);
        trace!(target: "erp.loading", key = key.unwrap_or("<global>"), "loading_end");
    }

    fn publish(&self, state: &LoadingState) {
        let any = state.any();
        self.inner.any_tx.send_if_modified(|current| {
            if *current == any {
                false
            } else {
                *current = any;
                true
            }
        });
    }

    fn lock(&self) -> MutexGuard<'_, LoadingState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for LoadingTracker {
    fn default() -> Self {
        Self::new()
    }
}
