//! 进度跟踪
//!
//! 只做观察：记录已覆盖的编码数，定期输出吞吐量和预计剩余时间，
//! 不会阻塞或影响获取流程。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::info;

/// 还没有实际数据时假设的速度（编码/分钟）
pub const ESTIMATED_CODES_PER_MINUTE: f64 = 600.0;

/// 默认的日志间隔
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(15);

/// 进度接收方
///
/// `covered` 是累计已处理（成功或失败）的编码数
pub trait ProgressSink: Send + Sync {
    fn report(&self, covered: usize, total: usize);
}

impl<F> ProgressSink for F
where
    F: Fn(usize, usize) + Send + Sync,
{
    fn report(&self, covered: usize, total: usize) {
        self(covered, total)
    }
}

/// 不关心进度时使用
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _covered: usize, _total: usize) {}
}

/// 某一时刻的进度
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub processed: usize,
    pub total: usize,
    pub elapsed: Duration,
    /// 编码/分钟
    pub rate_per_minute: f64,
    pub eta: Duration,
}

impl ProgressSnapshot {
    /// 根据已处理数和耗时计算速度与剩余时间
    pub fn compute(processed: usize, total: usize, elapsed: Duration) -> Self {
        let processed = processed.min(total);
        let minutes = elapsed.as_secs_f64() / 60.0;
        let rate_per_minute = if processed > 0 && elapsed.as_secs() > 0 {
            processed as f64 / minutes
        } else {
            ESTIMATED_CODES_PER_MINUTE
        };
        let remaining = (total - processed) as f64;
        let eta = Duration::from_secs_f64(remaining / rate_per_minute * 60.0);

        Self {
            processed,
            total,
            elapsed,
            rate_per_minute,
            eta,
        }
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.processed as f64 * 100.0 / self.total as f64
        }
    }

    pub fn is_complete(&self) -> bool {
        self.processed >= self.total
    }
}

/// 进度跟踪器
pub struct ProgressTracker {
    total: usize,
    processed: AtomicUsize,
    started: Instant,
    interval: Duration,
    last_logged: Mutex<Option<Instant>>,
}

impl ProgressTracker {
    pub fn new(total: usize, interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            total,
            processed: AtomicUsize::new(0),
            started: Instant::now(),
            interval,
            last_logged: Mutex::new(None),
        })
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot::compute(
            self.processed.load(Ordering::Relaxed),
            self.total,
            self.started.elapsed(),
        )
    }

    /// 记录最新进度；距上次日志超过间隔或 `force` 时输出日志
    pub fn update(&self, processed: usize, force: bool) {
        self.processed.store(processed, Ordering::Relaxed);

        let Ok(mut last) = self.last_logged.lock() else {
            return;
        };
        let due = last.map_or(true, |t| t.elapsed() >= self.interval);
        if force || due {
            *last = Some(Instant::now());
            log_snapshot(&self.snapshot());
        }
    }

    /// 在独立任务中定期输出进度，全部完成后自动结束
    pub fn spawn_reporter(self: &Arc<Self>) -> JoinHandle<()> {
        let tracker = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tracker.interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let snapshot = tracker.snapshot();
                if snapshot.is_complete() {
                    break;
                }
                tracker.update(snapshot.processed, false);
            }
        })
    }
}

impl ProgressSink for ProgressTracker {
    fn report(&self, covered: usize, total: usize) {
        self.update(covered, covered >= total);
    }
}

fn log_snapshot(snapshot: &ProgressSnapshot) {
    info!(
        "📊 进度: {}/{} ({:.1}%) | 速度 {:.0} 个/分钟 | 预计剩余 {}",
        snapshot.processed,
        snapshot.total,
        snapshot.percent(),
        snapshot.rate_per_minute,
        format_duration(snapshot.eta)
    );
}

/// 01:05:09 / 05:09
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{:02}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}
