use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use ean_report::config::MAX_PARALLEL_SESSIONS_CAP;
use ean_report::progress::NoProgress;
use ean_report::utils::logging;
use ean_report::{Config, Pipeline, RunOutcome, StopSignal};
use tracing::{error, info, warn};

/// 批量获取价格报告并与供应商表格合并
#[derive(Parser, Debug)]
#[command(name = "ean_report", version)]
struct Args {
    /// 供应商表格（xlsx / xls / ods / csv）
    supplier_file: PathBuf,

    /// 每批编码数（覆盖 BATCH_SIZE）
    #[arg(long)]
    batch_size: Option<usize>,

    /// 同时运行的会话数（覆盖 MAX_PARALLEL_SESSIONS）
    #[arg(long)]
    parallel: Option<usize>,

    /// 显示浏览器窗口
    #[arg(long)]
    headed: bool,

    /// 结果表输出目录（覆盖 OUTPUT_DIR）
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// 合并后保留下载的批次文件
    #[arg(long)]
    keep_downloads: bool,

    /// 输出调试日志
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 加载配置
    let mut config = Config::from_env();
    if let Some(size) = args.batch_size.filter(|n| *n > 0) {
        config.batch_size = size;
    }
    if let Some(parallel) = args.parallel {
        config.max_parallel_sessions = parallel.clamp(1, MAX_PARALLEL_SESSIONS_CAP);
    }
    if args.headed {
        config.headless = false;
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    config.verbose_logging |= args.verbose;

    // 初始化日志
    logging::init(config.verbose_logging);
    logging::log_startup(
        &args.supplier_file.display().to_string(),
        config.batch_size,
        config.max_parallel_sessions,
    );

    // Ctrl-C 只设置停止信号，当前批次会正常结束
    let stop = StopSignal::new();
    let ctrl_c = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 收到 Ctrl-C，当前批次结束后停止");
            ctrl_c.trigger();
        }
    });

    let outcome = Pipeline::from_config(config)
        .keep_downloads(args.keep_downloads)
        .run(&args.supplier_file, &stop, &NoProgress)
        .await
        .with_context(|| format!("处理 {} 失败", args.supplier_file.display()))?;

    match outcome {
        RunOutcome::Success(summary) => {
            info!(
                "✅ 完成: {} 行 -> {}",
                summary.merged_rows,
                summary.output.display()
            );
        }
        RunOutcome::Partial { summary, reason } => {
            warn!(
                "⚠️ 部分完成 ({}): {} 行 -> {}",
                reason,
                summary.merged_rows,
                summary.output.display()
            );
        }
        RunOutcome::Cancelled { reason, .. } => {
            warn!("🛑 {}", reason);
        }
        RunOutcome::Failure { reason } => {
            error!("❌ {}", reason);
            bail!(reason);
        }
    }

    Ok(())
}
