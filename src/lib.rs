//! # EAN Report
//!
//! 批量获取商品编码的价格报告，并与供应商表格合并成带公式的结果表
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `browser/` - 每个批次启动一个独立的浏览器（临时 profile + 独立下载目录）
//! - `infrastructure/` - `JsExecutor` 持有唯一的 Page，只暴露 eval / 导航 / 等待元素能力
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，不认识批次
//! - `PortalLogin` - 登录
//! - `FieldInput` - 输入框清空 / 写入 / 校验
//! - `ExportTrigger` - 触发导出
//! - `DownloadWatcher` - 等待下载并改名
//! - `uniqueness` - 结果文件内容去重检查
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个批次"的完整处理流程
//! - `SessionCtx` - 上下文封装（批次编号 + 编码数）
//! - `SessionRunner` - 状态机（登录 → 写入 → 导出 → 下载 → 改名）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/acquisition` - 分批调度、停止信号、进度、唯一性检查
//! - `orchestrator/pipeline` - 校验 → 获取 → 合并 → 写出
//!
//! 另外：
//! - `models/` - 编码规范化、批次划分、表格读取
//! - `merge/` - 按规范化编码内连接
//! - `report/` - 带格式的 xlsx 输出
//! - `progress` - 吞吐量 / 预计剩余时间
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod merge;
pub mod models;
pub mod orchestrator;
pub mod progress;
pub mod report;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, InputError, Result, SessionError, SessionFailure};
pub use infrastructure::JsExecutor;
pub use merge::{DatasetMerger, MergedDataset};
pub use models::{normalize, plan, AcquiredFile, Batch, CellValue, Table};
pub use orchestrator::{
    process_supplier_file, AcquisitionOrchestrator, AcquisitionReport, AcquisitionStatus, Pipeline, RunOutcome,
    SessionLauncher, StopSignal,
};
pub use progress::{ProgressSink, ProgressTracker};
pub use report::{RenderMode, ReportLayout, SpreadsheetWriter};
pub use workflow::{SessionCtx, SessionRunner, SessionState};
