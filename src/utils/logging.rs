/// 日志工具模块
///
/// 提供日志初始化和格式化输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化 tracing
///
/// RUST_LOG 优先；否则 verbose 时为 debug，默认为 info
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // 测试中可能被多次调用，忽略重复初始化
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `input`: 供应商文件
/// - `batch_size`: 每批编码数
/// - `parallel`: 同时运行的会话数
pub fn log_startup(input: &str, batch_size: usize, parallel: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量报告获取模式");
    info!("📄 输入文件: {}", input);
    info!("📦 每批编码数: {}", batch_size);
    info!("📊 同时运行的会话数: {}", parallel);
    info!("{}", "=".repeat(60));
}

/// 记录批次开始信息
///
/// # 参数
/// - `batch_num`: 批次编号
/// - `total_batches`: 批次总数
/// - `start`: 起始编码序号
/// - `end`: 结束编码序号
/// - `total`: 编码总数
pub fn log_batch_start(batch_num: usize, total_batches: usize, start: usize, end: usize, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 批", batch_num, total_batches);
    info!("📄 本批编码: {}-{} / 共 {} 个", start, end, total);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
pub fn log_batch_complete(batch_num: usize, success: bool) {
    info!("\n{}", "─".repeat(60));
    if success {
        info!("✓ 第 {} 批完成", batch_num);
    } else {
        info!("❌ 第 {} 批失败", batch_num);
    }
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `success`: 成功批次数
/// - `failed`: 失败批次数
/// - `total`: 批次总数
/// - `output`: 结果文件（没有时为 None）
pub fn print_final_stats(success: usize, failed: usize, total: usize, output: Option<&str>) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, total);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
    if let Some(path) = output {
        info!("\n结果已保存至: {}", path);
    }
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("短文本", 10), "短文本");
        assert_eq!(truncate_text("0123456789abc", 10), "0123456789...");
    }
}
