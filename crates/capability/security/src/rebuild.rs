//! 重建闸门与重试策略。
//!
//! `RebuildGate` 使用两个代数计数器：`requested` 在每次失效时递增，
//! `completed` 记录最近一次成功重建开始时观察到的 `requested`。
//! 重建在异步互斥锁内串行执行；拿到锁时若目标代数已被覆盖，则直接合并返回。

use crate::error::SecurityError;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// 派生结构重建配置。
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// 存储读取失败时的最大重试次数。
    pub rebuild_max_retries: u64,
    /// 线性退避基数（毫秒），第 n 次重试等待 n * backoff。
    pub rebuild_backoff_ms: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            rebuild_max_retries: 2,
            rebuild_backoff_ms: 200,
        }
    }
}

/// 单飞重建闸门。
#[derive(Debug)]
pub struct RebuildGate {
    name: &'static str,
    requested: AtomicU64,
    completed: AtomicU64,
    lock: Mutex<()>,
}

impl RebuildGate {
    /// 新闸门处于过期状态：首次 `run` 必然执行重建。
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            requested: AtomicU64::new(1),
            completed: AtomicU64::new(0),
            lock: Mutex::new(()),
        }
    }

    /// 标记过期，返回新的目标代数。
    pub fn mark_stale(&self) -> u64 {
        self.requested.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_stale(&self) -> bool {
        self.completed.load(Ordering::SeqCst) < self.requested.load(Ordering::SeqCst)
    }

    pub fn generation(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    /// 执行重建；若调用时的目标代数已被其他重建覆盖，返回 `Ok(false)`。
    pub async fn run<F, Fut>(&self, rebuild: F) -> Result<bool, SecurityError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), SecurityError>>,
    {
        let target = self.requested.load(Ordering::SeqCst);
        let _guard = self.lock.lock().await;
        if self.completed.load(Ordering::SeqCst) >= target {
            debug!(target: "warden.security", gate = self.name, target, "rebuild coalesced");
            warden_telemetry::record_cache_rebuild_coalesced();
            return Ok(false);
        }
        let observed = self.requested.load(Ordering::SeqCst);
        let started = Instant::now();
        match rebuild().await {
            Ok(()) => {
                self.completed.fetch_max(observed, Ordering::SeqCst);
                let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                warden_telemetry::record_cache_rebuild(elapsed);
                debug!(target: "warden.security", gate = self.name, generation = observed, elapsed_ms = elapsed, "rebuild published");
                Ok(true)
            }
            Err(err) => {
                warden_telemetry::record_cache_rebuild_failure();
                warn!(target: "warden.security", gate = self.name, "rebuild failed, keeping last snapshot: {}", err);
                Err(err)
            }
        }
    }
}

/// 按配置重试存储读取；仅重试可恢复错误。
pub(crate) async fn with_retry<T, F, Fut>(
    config: &SecurityConfig,
    what: &'static str,
    mut op: F,
) -> Result<T, SecurityError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SecurityError>>,
{
    let mut attempt = 0u64;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < config.rebuild_max_retries => {
                attempt += 1;
                warn!(target: "warden.security", what, attempt, "transient store failure, retrying: {}", err);
                let backoff = config.rebuild_backoff_ms.saturating_mul(attempt);
                if backoff > 0 {
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
            }
            Err(err) => return Err(err),
        }
    }
}
