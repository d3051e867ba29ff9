//! 合并层
//!
//! 供应商数据 + 获取到的报告 → 单张结果表

pub mod links;
pub mod merger;

pub use links::{product_link, LinkBuilder};
pub use merger::{supplier_columns, DatasetMerger, MergedDataset, SupplierColumns, CODE_HEADERS};
