//! 批次划分

/// 一个批次：在同一个浏览器会话中一次提交的编码
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// 批次编号（从 1 开始）
    pub index: usize,
    /// 原始编码（未规范化）
    pub codes: Vec<String>,
}

impl Batch {
    pub fn new(index: usize, codes: Vec<String>) -> Self {
        Self { index, codes }
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// 按固定大小划分批次，保持输入顺序
///
/// `batch_size` 由配置决定，这里只负责切分
pub fn plan(codes: &[String], batch_size: usize) -> Vec<Batch> {
    let size = batch_size.max(1);
    codes
        .chunks(size)
        .enumerate()
        .map(|(i, chunk)| Batch {
            index: i + 1,
            codes: chunk.to_vec(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{:013}", i)).collect()
    }

    #[test]
    fn test_plan_reconstructs_input() {
        for (n, size) in [(0, 3), (1, 3), (3, 3), (7, 3), (10, 1), (449, 450), (901, 450)] {
            let input = codes(n);
            let batches = plan(&input, size);

            let rebuilt: Vec<String> = batches.iter().flat_map(|b| b.codes.clone()).collect();
            assert_eq!(rebuilt, input);
            assert_eq!(batches.len(), n.div_ceil(size));
            for batch in &batches {
                assert!(!batch.is_empty());
                assert!(batch.len() <= size);
            }
        }
    }

    #[test]
    fn test_short_list_is_one_batch() {
        let batches = plan(&codes(5), 50);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].index, 1);
        assert_eq!(batches[0].len(), 5);
    }

    #[test]
    fn test_batch_indexes_are_sequential() {
        let batches = plan(&codes(10), 4);
        let indexes: Vec<usize> = batches.iter().map(|b| b.index).collect();
        assert_eq!(indexes, vec![1, 2, 3]);
        assert_eq!(batches[2].codes, codes(10)[8..].to_vec());
    }

    #[test]
    fn test_zero_batch_size_is_guarded() {
        let batches = plan(&codes(3), 0);
        assert_eq!(batches.len(), 3);
    }
}
