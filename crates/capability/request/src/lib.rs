//! API 组合层
//!
//! 把一次后端调用包装成可观察的状态：
//! - loading：调用期间为 true，任何退出路径都会复位
//! - error：失败时写入，同时弹出一条错误通知，并把错误返回给调用方
//! - data：成功结果
//!
//! 会话过期（401）由 HTTP 层全局处理，这里只记录错误、不弹通知。
//! 每次 execute 领取一个代号，较早发起的调用晚返回时不会覆盖较新的状态。

use api_contract::ApiError;
use erp_cache::CacheManager;
use erp_loading::LoadingTracker;
use erp_notify::ToastQueue;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

struct CallState<T> {
    data: Option<T>,
    error: Option<ApiError>,
    latest_generation: u64,
}

/// 单个调用点的请求状态（可克隆句柄）。
pub struct ApiCall<T> {
    state: Arc<Mutex<CallState<T>>>,
    loading: LoadingTracker,
    loading_key: Option<String>,
    toasts: ToastQueue,
    cache: Option<CacheManager<T>>,
}

impl<T> Clone for ApiCall<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            loading: self.loading.clone(),
            loading_key: self.loading_key.clone(),
            toasts: self.toasts.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<T: Clone> ApiCall<T> {
    /// 使用独立的加载状态创建。
    pub fn new(toasts: ToastQueue) -> Self {
        Self {
            state: Arc::new(Mutex::new(CallState {
                data: None,
                error: None,
                latest_generation: 0,
            })),
            loading: LoadingTracker::new(),
            loading_key: None,
            toasts,
            cache: None,
        }
    }

    /// 共享外部加载跟踪器，`key` 为 None 时占用全局槽位。
    pub fn with_loading(mut self, tracker: LoadingTracker, key: Option<&str>) -> Self {
        self.loading = tracker;
        self.loading_key = key.map(str::to_string);
        self
    }

    pub fn with_cache(mut self, cache: CacheManager<T>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// 执行一次调用。
    pub async fn execute<F, Fut>(&self, operation: F) -> Result<T, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let generation = {
            let mut state = self.lock();
            state.latest_generation += 1;
            state.error = None;
            state.latest_generation
        };
        let result = self
            .loading
            .with_loading(self.loading_key.as_deref(), operation())
            .await;
        self.settle(generation, result)
    }

    /// 经缓存执行：命中时不调用 `operation`。未配置缓存时等同于 execute。
    pub async fn execute_cached<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        operation: F,
    ) -> Result<T, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        match self.cache.clone() {
            Some(cache) => {
                self.execute(|| async move { cache.get_or_fetch(key, operation, ttl).await })
                    .await
            }
            None => self.execute(operation).await,
        }
    }

    pub fn loading(&self) -> bool {
        self.loading.is_loading(self.loading_key.as_deref())
    }

    pub fn data(&self) -> Option<T> {
        self.lock().data.clone()
    }

    pub fn error(&self) -> Option<ApiError> {
        self.lock().error.clone()
    }

    pub fn error_message(&self) -> Option<String> {
        self.lock().error.as_ref().map(|err| err.message.clone())
    }

    /// 清空 data/error；进行中的调用结果将被丢弃。
    pub fn reset(&self) {
        let mut state = self.lock();
        state.latest_generation += 1;
        state.data = None;
        state.error = None;
    }

    fn settle(&self, generation: u64, result: Result<T, ApiError>) -> Result<T, ApiError> {
        let mut state = self.lock();
        let current = state.latest_generation == generation;
        match result {
            Ok(data) => {
                if current {
                    state.data = Some(data.clone());
                } else {
                    debug!(target: "erp.request", generation, "stale_response_discarded");
                }
                Ok(data)
            }
            Err(err) => {
                if current {
                    state.error = Some(err.clone());
                }
                drop(state);
                if !err.is_session_expired() {
                    self.toasts.error(err.message.clone());
                }
                debug!(
                    target: "erp.request",
                    generation,
                    kind = %err.kind,
                    error = %err.message,
                    "request_error"
                );
                Err(err)
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, CallState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
