//! 文件唯一性检查
//!
//! 每个批次的结果文件应当内容不同；若两个文件的 SHA-256 相同，
//! 说明某个会话复用了上一批的页面状态。

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::models::AcquiredFile;

/// 内容完全相同的一对文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicatePair {
    pub first: PathBuf,
    pub duplicate: PathBuf,
    pub digest: String,
}

/// 计算文件内容的 SHA-256（十六进制）
pub fn content_digest(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// 检查获取到的文件两两之间是否重复
///
/// 读取失败的文件跳过（只记日志），不影响其他文件
pub fn audit_uniqueness(files: &[AcquiredFile]) -> Vec<DuplicatePair> {
    let mut seen: HashMap<String, &Path> = HashMap::new();
    let mut duplicates = Vec::new();

    for file in files {
        let digest = match content_digest(&file.path) {
            Ok(d) => d,
            Err(e) => {
                warn!("⚠️ 无法计算 {} 的摘要: {}", file.path.display(), e);
                continue;
            }
        };

        match seen.get(&digest) {
            Some(first) => {
                warn!(
                    "🔒 发现内容相同的文件: {} == {}",
                    first.display(),
                    file.path.display()
                );
                duplicates.push(DuplicatePair {
                    first: first.to_path_buf(),
                    duplicate: file.path.clone(),
                    digest,
                });
            }
            None => {
                seen.insert(digest, &file.path);
            }
        }
    }

    if duplicates.is_empty() {
        info!("✓ {} 个结果文件内容互不相同", files.len());
    }
    duplicates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acquired(dir: &Path, index: usize, content: &[u8]) -> AcquiredFile {
        let path = dir.join(format!("batch_{}.xlsx", index));
        std::fs::write(&path, content).unwrap();
        AcquiredFile::new(index, path, content.len() as u64)
    }

    #[test]
    fn test_distinct_files_have_no_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            acquired(dir.path(), 1, b"one"),
            acquired(dir.path(), 2, b"two"),
        ];
        assert!(audit_uniqueness(&files).is_empty());
    }

    #[test]
    fn test_identical_files_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            acquired(dir.path(), 1, b"same"),
            acquired(dir.path(), 2, b"other"),
            acquired(dir.path(), 3, b"same"),
        ];
        let pairs = audit_uniqueness(&files);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].first, files[0].path);
        assert_eq!(pairs[0].duplicate, files[2].path);
        assert_eq!(pairs[0].digest.len(), 64);
    }

    #[test]
    fn test_missing_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![AcquiredFile::new(1, dir.path().join("missing.xlsx"), 0)];
        assert!(audit_uniqueness(&files).is_empty());
    }
}
