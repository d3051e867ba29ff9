//! 会话上下文
//!
//! 封装"我正在处理第几批、这批有多少编码"这一信息

use std::fmt::Display;

/// 会话上下文（仅用于日志和结果归属）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCtx {
    /// 批次编号（从1开始）
    pub batch_index: usize,
    pub total_batches: usize,
    pub code_count: usize,
}

impl SessionCtx {
    pub fn new(batch_index: usize, total_batches: usize, code_count: usize) -> Self {
        Self {
            batch_index,
            total_batches,
            code_count,
        }
    }
}

impl Display for SessionCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[批次 {}/{}]", self.batch_index, self.total_batches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefix() {
        let ctx = SessionCtx::new(3, 7, 450);
        assert_eq!(ctx.to_string(), "[批次 3/7]");
    }
}
