//! 下载监视服务 - 业务能力层
//!
//! 门户导出的文件名固定，每个会话使用独立的暂存目录，
//! 文件出现且大小稳定后再改名为批次专属文件名。

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::fs;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::config::Timings;
use crate::error::SessionError;

/// 批次文件名: report_batch_007_20250101_120000.xlsx
pub fn batch_file_name(batch_index: usize, at: DateTime<Local>) -> String {
    format!(
        "report_batch_{:03}_{}.xlsx",
        batch_index,
        at.format("%Y%m%d_%H%M%S")
    )
}

/// 下载监视器
#[derive(Debug, Clone)]
pub struct DownloadWatcher {
    staging_dir: PathBuf,
    file_name: String,
    poll: Duration,
    timeout: Duration,
    settle: Duration,
}

impl DownloadWatcher {
    pub fn new(staging_dir: impl Into<PathBuf>, file_name: impl Into<String>, timings: &Timings) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            file_name: file_name.into(),
            poll: timings.download_poll,
            timeout: timings.download_timeout,
            settle: timings.download_settle,
        }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// 预期的下载文件路径
    pub fn expected_path(&self) -> PathBuf {
        self.staging_dir.join(&self.file_name)
    }

    /// 确保暂存目录存在，并删除上一次遗留的同名文件
    pub async fn prepare(&self) -> Result<(), SessionError> {
        fs::create_dir_all(&self.staging_dir)
            .await
            .map_err(|e| SessionError::io(&self.staging_dir, e))?;

        let stale = self.expected_path();
        if fs::try_exists(&stale).await.unwrap_or(false) {
            fs::remove_file(&stale)
                .await
                .map_err(|e| SessionError::io(&stale, e))?;
            info!("🗑️ 已删除遗留的下载文件: {}", stale.display());
        }
        Ok(())
    }

    /// 轮询等待下载完成
    ///
    /// 文件存在且两次间隔 settle 的读取大小一致（且非空）才算完成
    pub async fn wait(&self) -> Result<(PathBuf, u64), SessionError> {
        let target = self.expected_path();
        let started = Instant::now();

        while started.elapsed() < self.timeout {
            sleep(self.poll).await;

            let Some(first) = file_size(&target).await else {
                debug!(
                    "等待下载... ({:.0}s)",
                    started.elapsed().as_secs_f64()
                );
                continue;
            };

            sleep(self.settle).await;
            let Some(second) = file_size(&target).await else {
                continue;
            };

            if first == second && second > 0 {
                info!("📥 下载完成: {} ({} 字节)", target.display(), second);
                return Ok((target, second));
            }
            debug!("文件仍在写入: {} -> {} 字节", first, second);
        }

        warn!("❌ 下载超时: {}", target.display());
        Err(SessionError::DownloadTimeout {
            secs: self.timeout.as_secs(),
        })
    }

    /// 把下载好的文件移动到目标目录并改名
    pub async fn rename_for_batch(
        &self,
        downloaded: &Path,
        target_dir: &Path,
        batch_index: usize,
    ) -> Result<PathBuf, SessionError> {
        fs::create_dir_all(target_dir)
            .await
            .map_err(|e| SessionError::io(target_dir, e))?;

        let target = target_dir.join(batch_file_name(batch_index, Local::now()));
        if fs::try_exists(&target).await.unwrap_or(false) {
            fs::remove_file(&target)
                .await
                .map_err(|e| SessionError::io(&target, e))?;
        }

        if let Err(e) = fs::rename(downloaded, &target).await {
            // 跨文件系统时 rename 会失败，退回到复制
            debug!("rename 失败 ({}), 改为复制", e);
            fs::copy(downloaded, &target)
                .await
                .map_err(|e| SessionError::io(&target, e))?;
            fs::remove_file(downloaded)
                .await
                .map_err(|e| SessionError::io(downloaded, e))?;
        }

        info!("✓ 已保存为: {}", target.display());
        Ok(target)
    }
}

async fn file_size(path: &Path) -> Option<u64> {
    fs::metadata(path).await.ok().map(|m| m.len())
}
