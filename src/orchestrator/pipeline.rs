//! 端到端流程 - 编排层
//!
//! 校验供应商文件 → 获取报告 → 合并 → 写出结果表

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{info, warn};

use crate::config::{Config, MergeConfig};
use crate::error::{AppError, InputError, Result};
use crate::merge::{supplier_columns, DatasetMerger};
use crate::models::{load_table, normalize_cell};
use crate::orchestrator::acquisition::{AcquisitionOrchestrator, AcquisitionReport, SessionLauncher, StopSignal};
use crate::progress::{ProgressSink, ProgressTracker, DEFAULT_REPORT_INTERVAL};
use crate::report::{RenderMode, ReportLayout, SpreadsheetWriter};
use crate::utils::logging::print_final_stats;

/// 一次完整运行的摘要
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub output: PathBuf,
    pub merged_rows: usize,
    pub render_mode: RenderMode,
    pub acquisition: AcquisitionReport,
}

/// 运行结果
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// 所有批次成功
    Success(RunSummary),
    /// 有结果文件，但被取消、有批次失败或没有匹配行
    Partial { summary: RunSummary, reason: String },
    /// 在获取到任何文件之前被取消
    Cancelled {
        reason: String,
        acquisition: AcquisitionReport,
    },
    /// 没有可用的数据
    Failure { reason: String },
}

impl RunOutcome {
    pub fn output(&self) -> Option<&Path> {
        match self {
            RunOutcome::Success(summary) | RunOutcome::Partial { summary, .. } => Some(&summary.output),
            RunOutcome::Cancelled { .. } | RunOutcome::Failure { .. } => None,
        }
    }
}

/// 读取并校验供应商文件，返回去重后的规范化编码（保持原顺序）
///
/// 缺少编码列或价格列、没有任何有效编码时返回错误，此时不会启动任何会话
pub fn validate_supplier(path: &Path, merge: &MergeConfig) -> Result<Vec<String>> {
    let table = load_table(path)?;
    if table.headers.is_empty() {
        return Err(InputError::EmptyFile {
            path: path.to_path_buf(),
        }
        .into());
    }
    let columns = supplier_columns(&table, &merge.price_column)?;

    let mut seen = HashSet::new();
    let codes: Vec<String> = table
        .column_values(columns.code)
        .filter_map(normalize_cell)
        .filter(|code| seen.insert(code.clone()))
        .collect();

    if codes.is_empty() {
        return Err(InputError::NoCodes.into());
    }
    info!(
        "✓ 供应商文件有效: {} 行, {} 个不同的编码",
        table.len(),
        codes.len()
    );
    Ok(codes)
}

/// 结果文件名: {stem}_result_{YYYYmmdd_HHMMSS}.xlsx
pub fn output_file_name(supplier_path: &Path, at: chrono::DateTime<Local>) -> String {
    let stem = supplier_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "supplier".to_string());
    format!("{}_result_{}.xlsx", stem, at.format("%Y%m%d_%H%M%S"))
}

/// 端到端流程
pub struct Pipeline<L> {
    config: Config,
    orchestrator: AcquisitionOrchestrator<L>,
    keep_downloads: bool,
}

impl Pipeline<crate::orchestrator::acquisition::BrowserSessionLauncher> {
    pub fn from_config(config: Config) -> Self {
        let orchestrator = AcquisitionOrchestrator::from_config(&config);
        Self::new(config, orchestrator)
    }
}

impl<L: SessionLauncher> Pipeline<L> {
    pub fn new(config: Config, orchestrator: AcquisitionOrchestrator<L>) -> Self {
        Self {
            config,
            orchestrator,
            keep_downloads: false,
        }
    }

    /// 合并后保留下载的批次文件
    pub fn keep_downloads(mut self, keep: bool) -> Self {
        self.keep_downloads = keep;
        self
    }

    pub async fn run(&self, supplier_path: &Path, stop: &StopSignal, progress: &dyn ProgressSink) -> Result<RunOutcome> {
        let codes = validate_supplier(supplier_path, &self.config.merge)?;
        let layout = ReportLayout::load(self.config.report_layout_file.as_deref())?;

        let tracker = ProgressTracker::new(codes.len(), DEFAULT_REPORT_INTERVAL);
        let reporter = tracker.spawn_reporter();
        let sink = |covered: usize, total: usize| {
            tracker.report(covered, total);
            progress.report(covered, total);
        };

        let acquired = self
            .orchestrator
            .acquire(&codes, self.config.batch_size, stop, &sink)
            .await;
        reporter.abort();

        let report = match acquired {
            Ok(report) => report,
            Err(AppError::AllBatchesFailed { attempted }) => {
                let reason = format!("全部 {} 个批次均失败，没有可用的数据", attempted);
                print_final_stats(0, attempted, attempted, None);
                return Ok(RunOutcome::Failure { reason });
            }
            Err(e) => return Err(e),
        };

        if report.files.is_empty() && report.is_cancelled() {
            let reason = format!(
                "已取消: 覆盖 {}/{} 个编码，没有获取到报告文件",
                report.codes_covered, report.codes_total
            );
            warn!("🛑 {}", reason);
            print_final_stats(0, report.failed_batches.len(), report.attempted_batches(), None);
            return Ok(RunOutcome::Cancelled {
                reason,
                acquisition: report,
            });
        }

        if report.files.is_empty() {
            print_final_stats(0, report.failed_batches.len(), report.attempted_batches(), None);
            return Ok(RunOutcome::Failure {
                reason: "没有获取到任何报告文件，没有可用的数据".to_string(),
            });
        }

        let merger = DatasetMerger::new(self.config.merge.clone());
        let dataset = merger.merge_files(supplier_path, &report.files)?;

        std::fs::create_dir_all(&self.config.output_dir)
            .map_err(|e| AppError::file(&self.config.output_dir, e))?;
        let output = self
            .config
            .output_dir
            .join(output_file_name(supplier_path, Local::now()));
        let render_mode = SpreadsheetWriter::new(layout).write(&dataset.table, &output)?;

        if !self.keep_downloads {
            for file in &report.files {
                file.remove();
            }
        }

        print_final_stats(
            report.files.len(),
            report.failed_batches.len(),
            report.attempted_batches(),
            Some(output.display().to_string().as_str()),
        );

        let summary = RunSummary {
            output,
            merged_rows: dataset.len(),
            render_mode,
            acquisition: report,
        };
        Ok(classify(summary))
    }
}

fn classify(summary: RunSummary) -> RunOutcome {
    let report = &summary.acquisition;
    let reason = if report.is_cancelled() {
        Some(format!(
            "已取消: 覆盖 {}/{} 个编码",
            report.codes_covered, report.codes_total
        ))
    } else if !report.failed_batches.is_empty() {
        let failed: Vec<String> = report
            .failed_batches
            .iter()
            .map(|f| f.batch_index.to_string())
            .collect();
        Some(format!("失败的批次: {}", failed.join(", ")))
    } else if summary.merged_rows == 0 {
        Some("没有匹配的编码".to_string())
    } else {
        None
    };

    match reason {
        Some(reason) => {
            warn!("⚠️ 部分完成: {}", reason);
            RunOutcome::Partial { summary, reason }
        }
        None => RunOutcome::Success(summary),
    }
}

/// 使用真实浏览器会话运行完整流程
pub async fn process_supplier_file(
    config: Config,
    supplier_path: &Path,
    stop: &StopSignal,
    progress: &dyn ProgressSink,
) -> Result<RunOutcome> {
    Pipeline::from_config(config)
        .run(supplier_path, stop, progress)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn write_csv(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_validate_supplier_dedupes_and_normalizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "supplier.csv",
            "EAN,Price\n123,1.0\n0000000000123,2.0\nabc,3.0\n456,4.0\n",
        );
        let codes = validate_supplier(&path, &MergeConfig::default()).unwrap();
        assert_eq!(codes, vec!["0000000000123", "0000000000456"]);
    }

    #[test]
    fn test_validate_supplier_requires_price() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "supplier.csv", "EAN,Cost\n123,1.0\n");
        let err = validate_supplier(&path, &MergeConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            AppError::Input(InputError::MissingPriceColumn { .. })
        ));
    }

    #[test]
    fn test_validate_supplier_without_codes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "supplier.csv", "GTIN,Price\nn/a,1.0\n");
        let err = validate_supplier(&path, &MergeConfig::default()).unwrap_err();
        assert!(matches!(err, AppError::Input(InputError::NoCodes)));
    }

    #[test]
    fn test_output_file_name() {
        let at = Local.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            output_file_name(Path::new("/data/hurt_lista.xlsx"), at),
            "hurt_lista_result_20250102_030405.xlsx"
        );
    }
}
