//! 批量获取编排器 - 编排层
//!
//! ## 职责
//!
//! 1. **分批**：按配置的批次大小切分编码
//! 2. **调度**：每批交给一个全新的会话；默认顺序执行，可选小窗口并发
//! 3. **取消**：批次之间检查停止信号
//! 4. **进度**：每批结束后向进度接收方报告累计覆盖的编码数
//! 5. **校验**：结束后检查文件是否仍存在、内容是否互不相同
//!
//! 不处理单个会话的细节，全部委托给 `SessionLauncher`

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::{join_all, BoxFuture};
use tracing::{error, info, warn};

use crate::config::{Config, MAX_PARALLEL_SESSIONS_CAP};
use crate::error::{AppError, InputError, Result, SessionFailure};
use crate::models::{plan, AcquiredFile, Batch};
use crate::progress::ProgressSink;
use crate::services::{audit_uniqueness, DuplicatePair};
use crate::utils::logging::{log_batch_complete, log_batch_start};
use crate::workflow::{SessionConfig, SessionCtx, SessionRunner, SessionState};

/// 协作式停止信号，只在批次之间检查
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 运行单个批次会话的能力
///
/// 真实实现启动浏览器；测试中替换为假的实现
pub trait SessionLauncher: Send + Sync {
    fn run_batch(&self, batch: Batch, ctx: SessionCtx) -> BoxFuture<'_, std::result::Result<AcquiredFile, SessionFailure>>;
}

/// 每批启动一个独立浏览器的会话启动器
pub struct BrowserSessionLauncher {
    config: Arc<SessionConfig>,
}

impl BrowserSessionLauncher {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl SessionLauncher for BrowserSessionLauncher {
    fn run_batch(&self, batch: Batch, ctx: SessionCtx) -> BoxFuture<'_, std::result::Result<AcquiredFile, SessionFailure>> {
        let runner = SessionRunner::new(Arc::clone(&self.config), batch, ctx);
        Box::pin(runner.run())
    }
}

/// 编排器配置
#[derive(Debug, Clone, Copy)]
pub struct AcquisitionConfig {
    /// 同时运行的会话数，1 为严格顺序
    pub max_parallel_sessions: usize,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            max_parallel_sessions: 1,
        }
    }
}

impl From<&Config> for AcquisitionConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_parallel_sessions: config.max_parallel_sessions,
        }
    }
}

/// 失败的批次
#[derive(Debug, Clone)]
pub struct FailedBatch {
    pub batch_index: usize,
    /// 失败前到达的最后状态
    pub state: SessionState,
    pub reason: String,
}

impl From<SessionFailure> for FailedBatch {
    fn from(failure: SessionFailure) -> Self {
        Self {
            batch_index: failure.batch_index,
            state: failure.state,
            reason: failure.error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionStatus {
    Completed,
    Cancelled {
        completed_batches: usize,
        total_batches: usize,
    },
}

/// 一次获取的结果
#[derive(Debug, Clone)]
pub struct AcquisitionReport {
    pub files: Vec<AcquiredFile>,
    pub status: AcquisitionStatus,
    pub failed_batches: Vec<FailedBatch>,
    pub duplicates: Vec<DuplicatePair>,
    pub codes_total: usize,
    pub codes_covered: usize,
}

impl AcquisitionReport {
    pub fn is_cancelled(&self) -> bool {
        matches!(self.status, AcquisitionStatus::Cancelled { .. })
    }

    /// 实际尝试过的批次数
    pub fn attempted_batches(&self) -> usize {
        self.files.len() + self.failed_batches.len()
    }
}

/// 批量获取编排器
pub struct AcquisitionOrchestrator<L = BrowserSessionLauncher> {
    config: AcquisitionConfig,
    launcher: L,
}

impl AcquisitionOrchestrator<BrowserSessionLauncher> {
    /// 使用真实浏览器会话
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            AcquisitionConfig::from(config),
            BrowserSessionLauncher::new(SessionConfig::from(config)),
        )
    }
}

impl<L: SessionLauncher> AcquisitionOrchestrator<L> {
    pub fn new(config: AcquisitionConfig, launcher: L) -> Self {
        Self { config, launcher }
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// 获取所有编码的报告文件
    ///
    /// 单个批次失败不会中断整体；只有全部批次都失败（且未被取消）才返回错误
    pub async fn acquire(
        &self,
        codes: &[String],
        batch_size: usize,
        stop: &StopSignal,
        progress: &dyn ProgressSink,
    ) -> Result<AcquisitionReport> {
        if codes.is_empty() {
            return Err(InputError::NoCodes.into());
        }

        let batch_size = batch_size.max(1);
        let batches = plan(codes, batch_size);
        let total_batches = batches.len();
        let window = self.config.max_parallel_sessions.clamp(1, MAX_PARALLEL_SESSIONS_CAP);
        info!(
            "📋 共 {} 个编码，分为 {} 批 (每批最多 {} 个，窗口 {})",
            codes.len(),
            total_batches,
            batch_size,
            window
        );

        let mut files = Vec::new();
        let mut failed_batches = Vec::new();
        let mut codes_covered = 0;
        let mut completed_batches = 0;
        let mut status = AcquisitionStatus::Completed;

        for window_batches in batches.chunks(window) {
            if stop.is_set() {
                warn!(
                    "🛑 收到停止信号，已完成 {}/{} 批",
                    completed_batches, total_batches
                );
                status = AcquisitionStatus::Cancelled {
                    completed_batches,
                    total_batches,
                };
                break;
            }

            let runs = window_batches.iter().map(|batch| {
                let start = (batch.index - 1) * batch_size + 1;
                log_batch_start(
                    batch.index,
                    total_batches,
                    start,
                    start + batch.len() - 1,
                    codes.len(),
                );
                let ctx = SessionCtx::new(batch.index, total_batches, batch.len());
                self.launcher.run_batch(batch.clone(), ctx)
            });
            let outcomes = join_all(runs).await;

            for (batch, outcome) in window_batches.iter().zip(outcomes) {
                completed_batches += 1;
                codes_covered += batch.len();
                log_batch_complete(batch.index, outcome.is_ok());
                match outcome {
                    Ok(file) => files.push(file),
                    Err(failure) => {
                        error!("[批次 {}] ❌ {}", batch.index, failure);
                        failed_batches.push(FailedBatch::from(failure));
                    }
                }
                progress.report(codes_covered, codes.len());
            }
        }

        let succeeded = files.len();
        files.retain(|file: &AcquiredFile| {
            let exists = file.exists();
            if !exists {
                warn!("⚠️ 批次 {} 的文件已不存在: {}", file.batch_index, file.path.display());
            }
            exists
        });

        let duplicates = audit_uniqueness(&files);

        let attempted = succeeded + failed_batches.len();
        if status == AcquisitionStatus::Completed && attempted > 0 && succeeded == 0 {
            return Err(AppError::AllBatchesFailed { attempted });
        }

        info!(
            "📦 获取结束: 成功 {} 批，失败 {} 批，重复 {} 对",
            succeeded,
            failed_batches.len(),
            duplicates.len()
        );

        Ok(AcquisitionReport {
            files,
            status,
            failed_batches,
            duplicates,
            codes_total: codes.len(),
            codes_covered,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_signal_is_shared() {
        let stop = StopSignal::new();
        let clone = stop.clone();
        assert!(!stop.is_set());
        clone.trigger();
        assert!(stop.is_set());
    }

    #[test]
    fn test_attempted_batches() {
        let report = AcquisitionReport {
            files: vec![AcquiredFile::new(1, "a.xlsx", 1)],
            status: AcquisitionStatus::Completed,
            failed_batches: vec![FailedBatch {
                batch_index: 2,
                state: SessionState::LoggedIn,
                reason: "timeout".into(),
            }],
            duplicates: Vec::new(),
            codes_total: 10,
            codes_covered: 10,
        };
        assert_eq!(report.attempted_batches(), 2);
        assert!(!report.is_cancelled());
    }
}
