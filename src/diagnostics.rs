//! 定义 xlog 日志框架的内部诊断与计数器。
//!
//! 计数器在进程范围内共享，只增不减（`reset` 除外）。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

/// 内部诊断计数器，使用 relaxed 原子操作更新。
#[derive(Debug, Default)]
pub struct Diagnostics {
    /// 创建时间
    start_time: Option<Instant>,

    /// 已投递到 Sink 队列的消息数（每个接收 Sink 计一次）
    messages_dispatched: AtomicU64,

    /// Sink 成功渲染的消息数
    messages_rendered: AtomicU64,

    /// 转发到错误通道的渲染失败次数
    render_errors: AtomicU64,

    /// 由错误报告任务或最终排空打印的渲染失败次数
    errors_reported: AtomicU64,

    sinks_started: AtomicU64,

    sinks_destroyed: AtomicU64,
}

/// [`Diagnostics`] 的时间点快照。
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticsSnapshot {
    pub uptime: Option<Duration>,
    pub messages_dispatched: u64,
    pub messages_rendered: u64,
    pub render_errors: u64,
    pub errors_reported: u64,
    pub sinks_started: u64,
    pub sinks_destroyed: u64,
    /// 渲染成功率（百分比）
    pub success_rate_percent: f64,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub fn increment_messages_dispatched(&self) {
        self.messages_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_messages_rendered(&self) {
        self.messages_rendered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_render_errors(&self) {
        self.render_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_errors_reported(&self) {
        self.errors_reported.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_sinks_started(&self) {
        self.sinks_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_sinks_destroyed(&self) {
        self.sinks_destroyed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        let messages_rendered = self.messages_rendered.load(Ordering::Relaxed);
        let render_errors = self.render_errors.load(Ordering::Relaxed);

        let success_rate_percent = if messages_rendered + render_errors > 0 {
            (messages_rendered as f64 / (messages_rendered + render_errors) as f64) * 100.0
        } else {
            100.0
        };

        DiagnosticsSnapshot {
            uptime: self.start_time.map(|start| start.elapsed()),
            messages_dispatched: self.messages_dispatched.load(Ordering::Relaxed),
            messages_rendered,
            render_errors,
            errors_reported: self.errors_reported.load(Ordering::Relaxed),
            sinks_started: self.sinks_started.load(Ordering::Relaxed),
            sinks_destroyed: self.sinks_destroyed.load(Ordering::Relaxed),
            success_rate_percent,
        }
    }

    /// 重置所有计数器（主要用于测试）
    pub fn reset(&self) {
        self.messages_dispatched.store(0, Ordering::Relaxed);
        self.messages_rendered.store(0, Ordering::Relaxed);
        self.render_errors.store(0, Ordering::Relaxed);
        self.errors_reported.store(0, Ordering::Relaxed);
        self.sinks_started.store(0, Ordering::Relaxed);
        self.sinks_destroyed.store(0, Ordering::Relaxed);
    }
}

static GLOBAL_DIAGNOSTICS: OnceLock<Arc<Diagnostics>> = OnceLock::new();

/// 获取全局诊断实例，首次使用时创建。
pub fn get_diagnostics() -> Arc<Diagnostics> {
    GLOBAL_DIAGNOSTICS
        .get_or_init(|| Arc::new(Diagnostics::new()))
        .clone()
}

/// 获取全局诊断快照
pub fn diagnostics_snapshot() -> DiagnosticsSnapshot {
    get_diagnostics().snapshot()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let diagnostics = Diagnostics::new();
        diagnostics.increment_messages_dispatched();
        diagnostics.increment_messages_dispatched();
        diagnostics.increment_messages_rendered();
        diagnostics.increment_render_errors();
        diagnostics.increment_errors_reported();

        let snapshot = diagnostics.snapshot();
        assert_eq!(snapshot.messages_dispatched, 2);
        assert_eq!(snapshot.messages_rendered, 1);
        assert_eq!(snapshot.render_errors, 1);
        assert_eq!(snapshot.errors_reported, 1);
        assert_eq!(snapshot.success_rate_percent, 50.0);
        assert!(snapshot.uptime.is_some());
    }

    #[test]
    fn test_empty_success_rate() {
        assert_eq!(Diagnostics::new().snapshot().success_rate_percent, 100.0);
    }

    #[test]
    fn test_reset() {
        let diagnostics = Diagnostics::new();
        diagnostics.increment_sinks_started();
        diagnostics.increment_sinks_destroyed();
        diagnostics.reset();
        let snapshot = diagnostics.snapshot();
        assert_eq!(snapshot.sinks_started, 0);
        assert_eq!(snapshot.sinks_destroyed, 0);
    }

    #[test]
    fn test_global_instance_is_shared() {
        let a = get_diagnostics();
        let b = get_diagnostics();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
