//! 追踪、请求 ID 生成与进程内计数器。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 指标快照。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub authorizations_granted: u64,
    pub authorizations_denied: u64,
    pub unknown_function_denials: u64,
    pub cache_rebuilds: u64,
    pub cache_rebuilds_coalesced: u64,
    pub cache_rebuild_failures: u64,
    pub cache_rebuild_latency_ms_total: u64,
    pub scopes_created: u64,
    pub scopes_disposed: u64,
    pub scope_dispose_failures: u64,
}

/// 进程级计数器。
pub struct TelemetryMetrics {
    authorizations_granted: AtomicU64,
    authorizations_denied: AtomicU64,
    unknown_function_denials: AtomicU64,
    cache_rebuilds: AtomicU64,
    cache_rebuilds_coalesced: AtomicU64,
    cache_rebuild_failures: AtomicU64,
    cache_rebuild_latency_ms_total: AtomicU64,
    scopes_created: AtomicU64,
    scopes_disposed: AtomicU64,
    scope_dispose_failures: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            authorizations_granted: AtomicU64::new(0),
            authorizations_denied: AtomicU64::new(0),
            unknown_function_denials: AtomicU64::new(0),
            cache_rebuilds: AtomicU64::new(0),
            cache_rebuilds_coalesced: AtomicU64::new(0),
            cache_rebuild_failures: AtomicU64::new(0),
            cache_rebuild_latency_ms_total: AtomicU64::new(0),
            scopes_created: AtomicU64::new(0),
            scopes_disposed: AtomicU64::new(0),
            scope_dispose_failures: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            authorizations_granted: self.authorizations_granted.load(Ordering::Relaxed),
            authorizations_denied: self.authorizations_denied.load(Ordering::Relaxed),
            unknown_function_denials: self.unknown_function_denials.load(Ordering::Relaxed),
            cache_rebuilds: self.cache_rebuilds.load(Ordering::Relaxed),
            cache_rebuilds_coalesced: self.cache_rebuilds_coalesced.load(Ordering::Relaxed),
            cache_rebuild_failures: self.cache_rebuild_failures.load(Ordering::Relaxed),
            cache_rebuild_latency_ms_total: self
                .cache_rebuild_latency_ms_total
                .load(Ordering::Relaxed),
            scopes_created: self.scopes_created.load(Ordering::Relaxed),
            scopes_disposed: self.scopes_disposed.load(Ordering::Relaxed),
            scope_dispose_failures: self.scope_dispose_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
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

/// 记录授权结果。
pub fn record_authorization(granted: bool) {
    let counter = if granted {
        &metrics().authorizations_granted
    } else {
        &metrics().authorizations_denied
    };
    counter.fetch_add(1, Ordering::Relaxed);
}

/// 记录未知功能拒绝次数（同时计入拒绝总数）。
pub fn record_unknown_function() {
    let metrics = metrics();
    metrics
        .unknown_function_denials
        .fetch_add(1, Ordering::Relaxed);
    metrics.authorizations_denied.fetch_add(1, Ordering::Relaxed);
}

/// 记录一次成功的缓存重建及其耗时（毫秒）。
pub fn record_cache_rebuild(latency_ms: u64) {
    let metrics = metrics();
    metrics.cache_rebuilds.fetch_add(1, Ordering::Relaxed);
    metrics
        .cache_rebuild_latency_ms_total
        .fetch_add(latency_ms, Ordering::Relaxed);
}

/// 记录被合并到进行中重建的请求次数。
pub fn record_cache_rebuild_coalesced() {
    metrics()
        .cache_rebuilds_coalesced
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录重建失败次数（重试耗尽后）。
pub fn record_cache_rebuild_failure() {
    metrics()
        .cache_rebuild_failures
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录作用域创建次数。
pub fn record_scope_created() {
    metrics().scopes_created.fetch_add(1, Ordering::Relaxed);
}

/// 记录作用域释放次数。
pub fn record_scope_disposed() {
    metrics().scopes_disposed.fetch_add(1, Ordering::Relaxed);
}

/// 记录作用域释放钩子失败次数。
pub fn record_scope_dispose_failure() {
    metrics()
        .scope_dispose_failures
        .fetch_add(1, Ordering::Relaxed);
}
