//! 追踪、请求 ID 生成与客户端计数器。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 计数器快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_expired: u64,
    pub cache_stale_discarded: u64,
    pub requests_issued: u64,
    pub requests_succeeded: u64,
    pub requests_failed: u64,
    pub request_latency_ms_total: u64,
    pub request_latency_ms_count: u64,
    pub sessions_expired: u64,
    pub toasts_shown: u64,
    pub navigation_redirects: u64,
}

/// 客户端计数器。
pub struct TelemetryMetrics {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    cache_expired: AtomicU64,
    cache_stale_discarded: AtomicU64,
    requests_issued: AtomicU64,
    requests_succeeded: AtomicU64,
    requests_failed: AtomicU64,
    request_latency_ms_total: AtomicU64,
    request_latency_ms_count: AtomicU64,
    sessions_expired: AtomicU64,
    toasts_shown: AtomicU64,
    navigation_redirects: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            cache_expired: AtomicU64::new(0),
            cache_stale_discarded: AtomicU64::new(0),
            requests_issued: AtomicU64::new(0),
            requests_succeeded: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            request_latency_ms_total: AtomicU64::new(0),
            request_latency_ms_count: AtomicU64::new(0),
            sessions_expired: AtomicU64::new(0),
            toasts_shown: AtomicU64::new(0),
            navigation_redirects: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cache_expired: self.cache_expired.load(Ordering::Relaxed),
            cache_stale_discarded: self.cache_stale_discarded.load(Ordering::Relaxed),
            requests_issued: self.requests_issued.load(Ordering::Relaxed),
            requests_succeeded: self.requests_succeeded.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            request_latency_ms_total: self.request_latency_ms_total.load(Ordering::Relaxed),
            request_latency_ms_count: self.request_latency_ms_count.load(Ordering::Relaxed),
            sessions_expired: self.sessions_expired.load(Ordering::Relaxed),
            toasts_shown: self.toasts_shown.load(Ordering::Relaxed),
            navigation_redirects: self.navigation_redirects.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局计数器实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 记录缓存命中次数。
pub fn record_cache_hit() {
    metrics().cache_hits.fetch_add(1, Ordering::Relaxed);
}

/// 记录缓存未命中次数。
pub fn record_cache_miss() {
    metrics().cache_misses.fetch_add(1, Ordering::Relaxed);
}

/// 记录读取时惰性淘汰的过期条目数。
pub fn record_cache_expired() {
    metrics().cache_expired.fetch_add(1, Ordering::Relaxed);
}

/// 记录因代际落后被丢弃的写入次数。
pub fn record_cache_stale_discarded() {
    metrics()
        .cache_stale_discarded
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录发出的 HTTP 请求次数。
pub fn record_request_issued() {
    metrics().requests_issued.fetch_add(1, Ordering::Relaxed);
}

pub fn record_request_succeeded() {
    metrics().requests_succeeded.fetch_add(1, Ordering::Relaxed);
}

pub fn record_request_failed() {
    metrics().requests_failed.fetch_add(1, Ordering::Relaxed);
}

/// 记录请求耗时（毫秒）。
pub fn record_request_latency_ms(latency_ms: u64) {
    let metrics = metrics();
    metrics
        .request_latency_ms_total
        .fetch_add(latency_ms, Ordering::Relaxed);
    metrics
        .request_latency_ms_count
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录会话过期（401）次数。
pub fn record_session_expired() {
    metrics().sessions_expired.fetch_add(1, Ordering::Relaxed);
}

pub fn record_toast_shown() {
    metrics().toasts_shown.fetch_add(1, Ordering::Relaxed);
}

/// 记录路由守卫重定向次数。
pub fn record_navigation_redirect() {
    metrics()
        .navigation_redirects
        .fetch_add(1, Ordering::Relaxed);
}
