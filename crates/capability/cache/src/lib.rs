//! 内存 TTL 缓存
//!
//! 提供键值缓存与 fetch-or-populate 语义：
//! - set/get：按条目 TTL 判定有效性，过期条目在下次读取时惰性删除
//! - get_or_fetch：命中直接返回，未命中调用生产者一次并写回
//! - 代际栅栏：每次拉取领取该键的代号，写回时代号已落后则丢弃
//!
//! 同一键的并发 get_or_fetch 不做合并，每个调用方各自调用生产者。

use erp_telemetry::{
    record_cache_expired, record_cache_hit, record_cache_miss, record_cache_stale_discarded,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// 缓存条目。
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub key: String,
    pub value: V,
    pub stored_at: Instant,
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    /// `now - stored_at < ttl` 时有效。
    pub fn is_valid_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) < self.ttl
    }
}

struct CacheState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    /// 每个键最近一次写入/拉取领取的代号。
    ///
    /// 仅在条目存在或有拉取持有最新代号时保留；条目存在时不可能有持最新代号的拉取
    /// （拉取只在未命中时开始，之后的 set 会领新代号），所以删除条目时可一并删除代号。
    generations: HashMap<String, u64>,
    next_generation: u64,
}

impl<V> CacheState<V> {
    fn issue_generation(&mut self, key: &str) -> u64 {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.generations.insert(key.to_string(), generation);
        generation
    }

    fn is_current(&self, key: &str, generation: u64) -> bool {
        self.generations.get(key) == Some(&generation)
    }

    fn evict(&mut self, key: &str) {
        self.entries.remove(key);
        self.generations.remove(key);
    }
}

/// 一次拉取持有的代号；结束（成功、失败或被取消）时若未写入条目则归还代号。
struct FetchTicket<'a, V> {
    state: &'a Mutex<CacheState<V>>,
    key: &'a str,
    generation: u64,
}

impl<V> Drop for FetchTicket<'_, V> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.is_current(self.key, self.generation) && !state.entries.contains_key(self.key) {
            state.generations.remove(self.key);
        }
    }
}

/// 缓存管理器（可克隆句柄，克隆共享同一份存储）。
pub struct CacheManager<V> {
    state: Arc<Mutex<CacheState<V>>>,
    default_ttl: Duration,
}

impl<V> Clone for CacheManager<V> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            default_ttl: self.default_ttl,
        }
    }
}

impl<V: Clone> CacheManager<V> {
    /// 创建缓存，默认 TTL 为 5 分钟。
    pub fn new() -> Self {
        Self::with_default_ttl(Duration::from_secs(300))
    }

    pub fn with_default_ttl(default_ttl: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState {
                entries: HashMap::new(),
                generations: HashMap::new(),
                next_generation: 0,
            })),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// 写入值；同时使该键上进行中的拉取失效。
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let mut state = self.lock();
        state.issue_generation(&key);
        state.entries.insert(
            key.clone(),
            CacheEntry {
                key,
                value,
                stored_at: Instant::now(),
                ttl,
            },
        );
    }

    /// 读取有效值；未命中返回 None，过期条目在此删除。
    pub fn get(&self, key: &str) -> Option<V> {
        let mut state = self.lock();
        let now = Instant::now();
        let valid = state.entries.get(key).map(|entry| entry.is_valid_at(now));
        match valid {
            Some(true) => {
                record_cache_hit();
                state.entries.get(key).map(|entry| entry.value.clone())
            }
            Some(false) => {
                state.evict(key);
                record_cache_expired();
                record_cache_miss();
                debug!(target: "erp.cache", key = %key, "cache_expired");
                None
            }
            None => {
                record_cache_miss();
                None
            }
        }
    }

    /// 命中直接返回，否则调用 `producer` 一次并写回成功结果。
    ///
    /// 生产者失败时不写入缓存，错误原样返回。
    pub async fn get_or_fetch<F, Fut, E>(
        &self,
        key: &str,
        producer: F,
        ttl: Duration,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        let generation = self.lock().issue_generation(key);
        let _ticket = FetchTicket {
            state: self.state.as_ref(),
            key,
            generation,
        };
        debug!(target: "erp.cache", key = %key, generation, "cache_fetch_start");

        let value = producer().await?;

        {
            let mut state = self.lock();
            if state.is_current(key, generation) {
                state.entries.insert(
                    key.to_string(),
                    CacheEntry {
                        key: key.to_string(),
                        value: value.clone(),
                        stored_at: Instant::now(),
                        ttl,
                    },
                );
            } else {
                record_cache_stale_discarded();
                debug!(target: "erp.cache", key = %key, generation, "cache_stale_write_discarded");
            }
        }
        Ok(value)
    }

    /// 使用默认 TTL 的 get_or_fetch。
    pub async fn get_or_fetch_default<F, Fut, E>(&self, key: &str, producer: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        self.get_or_fetch(key, producer, self.default_ttl).await
    }

    /// 删除指定键并丢弃其进行中的拉取结果。
    pub fn invalidate(&self, key: &str) -> bool {
        let mut state = self.lock();
        state.generations.remove(key);
        state.entries.remove(key).is_some()
    }

    /// 删除所有以 `prefix` 开头的键，返回删除条目数。
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut state = self.lock();
        state.generations.retain(|key, _| !key.starts_with(prefix));
        let before = state.entries.len();
        state.entries.retain(|key, _| !key.starts_with(prefix));
        before - state.entries.len()
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.generations.clear();
    }

    /// 主动清理过期条目（由调用方触发，不做后台扫描）。
    pub fn purge_expired(&self) -> usize {
        let mut state = self.lock();
        let now = Instant::now();
        let expired: Vec<String> = state
            .entries
            .values()
            .filter(|entry| !entry.is_valid_at(now))
            .map(|entry| entry.key.clone())
            .collect();
        for key in &expired {
            state.evict(key);
        }
        expired.len()
    }

    /// 当前条目数（含尚未被惰性删除的过期条目）。
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 仍保留代号的键数（诊断用）。
    pub fn tracked_generations(&self) -> usize {
        self.lock().generations.len()
    }

    fn lock(&self) -> MutexGuard<'_, CacheState<V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V: Clone> Default for CacheManager<V> {
    fn default() -> Self {
        Self::new()
    }
}
