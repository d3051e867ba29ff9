use std::path::{Path, PathBuf};

use tracing::{info, warn};

/// 一次成功导出的文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquiredFile {
    /// 产生该文件的批次编号
    pub batch_index: usize,
    pub path: PathBuf,
    pub byte_size: u64,
}

impl AcquiredFile {
    pub fn new(batch_index: usize, path: impl Into<PathBuf>, byte_size: u64) -> Self {
        Self {
            batch_index,
            path: path.into(),
            byte_size,
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }

    /// 文件是否仍在磁盘上
    pub fn exists(&self) -> bool {
        Path::new(&self.path).is_file()
    }

    /// 合并完成后由调用方删除
    pub fn remove(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(_) => info!("🗑️ 已删除: {}", self.file_name()),
            Err(e) => warn!("⚠️ 无法删除 {}: {}", self.path.display(), e),
        }
    }
}
