use std::path::PathBuf;

use thiserror::Error;

use crate::workflow::SessionState;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 输入文件错误（在任何采集开始前报告）
    #[error("输入错误: {0}")]
    Input(#[from] InputError),
    /// 单批次会话错误
    #[error("会话错误: {0}")]
    Session(#[from] SessionError),
    /// 文件操作错误
    #[error("文件错误 ({}): {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 表格读取错误
    #[error("表格读取失败 ({}): {reason}", path.display())]
    Read { path: PathBuf, reason: String },
    /// 表格写入错误
    #[error("表格写入失败: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),
    /// 所有批次都失败
    #[error("全部 {attempted} 个批次均失败，没有获取到任何数据")]
    AllBatchesFailed { attempted: usize },
}

/// 输入校验错误
#[derive(Debug, Error)]
pub enum InputError {
    /// 缺少编码列
    #[error("文件中没有编码列 (可接受的列名: {})", accepted.join(", "))]
    MissingCodeColumn { accepted: Vec<String> },
    /// 缺少价格列
    #[error("文件中没有价格列 '{expected}'")]
    MissingPriceColumn { expected: String },
    /// 编码列表为空
    #[error("没有可处理的编码")]
    NoCodes,
    /// 不支持的文件格式
    #[error("不支持的文件格式: {}", path.display())]
    UnsupportedFormat { path: PathBuf },
    /// 文件为空（没有表头）
    #[error("文件为空: {}", path.display())]
    EmptyFile { path: PathBuf },
}

/// 单个会话（一个批次）内的错误
#[derive(Debug, Error)]
pub enum SessionError {
    /// 浏览器启动失败
    #[error("浏览器启动失败: {0}")]
    Launch(String),
    /// 浏览器协议错误
    #[error("浏览器操作失败: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),
    /// 执行脚本返回了无法解析的结果
    #[error("脚本结果解析失败: {0}")]
    Script(#[from] serde_json::Error),
    /// 登录后仍停留在登录页
    #[error("登录失败，仍停留在登录页: {url}")]
    LoginRejected { url: String },
    /// 元素在限定时间内未出现
    #[error("等待元素超时: {selector}")]
    ElementNotFound { selector: String },
    /// 新会话中输入框不为空
    #[error("新会话中输入框不为空: '{residual}'")]
    FieldNotEmpty { residual: String },
    /// 多次清空后输入框仍有内容
    #[error("无法清空输入框，残留内容: '{residual}'")]
    FieldClearFailed { residual: String },
    /// 批次内没有有效编码
    #[error("批次中没有有效编码")]
    NoValidCodes,
    /// 写入的编码不足一半
    #[error("编码写入失败: 仅 {present}/{expected} 个被读回")]
    InsertionRejected { present: usize, expected: usize },
    /// 所有导出点击方式都失败
    #[error("所有导出点击方式均失败")]
    ExportNotActivated,
    /// 下载超时
    #[error("等待下载超时 ({secs} 秒)")]
    DownloadTimeout { secs: u64 },
    /// 文件系统错误
    #[error("文件操作失败 ({}): {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SessionError {
    /// 包装带路径的 IO 错误
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SessionError::Io {
            path: path.into(),
            source,
        }
    }
}

/// 会话失败：记录失败的批次和失败时所处的状态
#[derive(Debug, Error)]
#[error("批次 {batch_index} 在「{state}」之后失败: {error}")]
pub struct SessionFailure {
    pub batch_index: usize,
    pub state: SessionState,
    #[source]
    pub error: SessionError,
}

impl AppError {
    /// 创建文件错误
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::File {
            path: path.into(),
            source,
        }
    }

    /// 创建表格读取错误
    pub fn read(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        AppError::Read {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

/// 应用程序结果类型
pub type Result<T, E = AppError> = std::result::Result<T, E>;
