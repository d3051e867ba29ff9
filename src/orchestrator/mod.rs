//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `acquisition` - 批量获取编排器
//! - 把编码切分成批次，每批交给一个全新的会话
//! - 批次之间检查停止信号
//! - 汇报进度，收集结果文件并做唯一性检查
//!
//! ### `pipeline` - 端到端流程
//! - 校验供应商文件
//! - 获取 → 合并 → 写出
//! - 给出结构化的运行结果
//!
//! ## 层次关系
//!
//! ```text
//! pipeline (供应商文件)
//!     ↓
//! acquisition (Vec<Batch>)
//!     ↓
//! workflow::SessionRunner (单个 Batch)
//!     ↓
//! services (能力层：login / field / export / download)
//!     ↓
//! infrastructure (基础设施：JsExecutor)
//! ```

pub mod acquisition;
pub mod pipeline;

pub use acquisition::{
    AcquisitionConfig, AcquisitionOrchestrator, AcquisitionReport, AcquisitionStatus, BrowserSessionLauncher,
    FailedBatch, SessionLauncher, StopSignal,
};
pub use pipeline::{process_supplier_file, validate_supplier, Pipeline, RunOutcome, RunSummary};
