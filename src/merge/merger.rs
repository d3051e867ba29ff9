//! 数据合并
//!
//! 供应商表与获取到的报告表按规范化编码做内连接，
//! 补充派生列后按固定列顺序输出。

use std::collections::HashMap;
use std::path::Path;

use phf::phf_ordered_set;
use tracing::{info, warn};

use crate::config::MergeConfig;
use crate::error::{AppError, InputError, Result};
use crate::merge::links::{product_link, LinkBuilder};
use crate::models::{load_table, normalize_cell, AcquiredFile, CellValue, Table};

/// 供应商文件可接受的编码列名，按优先级排列
pub static CODE_HEADERS: phf::OrderedSet<&'static str> = phf_ordered_set! {
    "GTIN",
    "EAN",
    "ean",
    "gtin",
    "EAN13",
    "EAN-13",
};

pub const PRICE_PL_COLUMN: &str = "Price PL";
pub const PROFIT_COLUMN: &str = "Profit";
pub const ROI_COLUMN: &str = "ROI";
pub const LINK_COLUMN: &str = "Link";
pub const PRODUCT_LINK_COLUMN: &str = "Product Link";

/// 供应商表中编码列和价格列的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupplierColumns {
    pub code: usize,
    pub price: usize,
}

/// 检查供应商表是否有编码列和价格列
pub fn supplier_columns(supplier: &Table, price_column: &str) -> std::result::Result<SupplierColumns, InputError> {
    let (code, _) = supplier
        .first_column(CODE_HEADERS.iter().copied())
        .ok_or_else(|| InputError::MissingCodeColumn {
            accepted: CODE_HEADERS.iter().map(|h| h.to_string()).collect(),
        })?;
    let price = supplier
        .column(price_column)
        .ok_or_else(|| InputError::MissingPriceColumn {
            expected: price_column.to_string(),
        })?;
    Ok(SupplierColumns { code, price })
}

/// 合并结果
#[derive(Debug, Clone)]
pub struct MergedDataset {
    pub table: Table,
    /// 被跳过的获取文件（没有编码列或无法读取）
    pub skipped_sources: Vec<String>,
}

impl MergedDataset {
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// 数据合并器
pub struct DatasetMerger {
    config: MergeConfig,
}

impl DatasetMerger {
    pub fn new(config: MergeConfig) -> Self {
        Self { config }
    }

    /// 合并内存中的表
    ///
    /// `acquired` 为 (来源名, 表)，按文件顺序、行顺序输出
    pub fn merge(&self, supplier: &Table, acquired: &[(String, Table)]) -> Result<MergedDataset> {
        let columns = supplier_columns(supplier, &self.config.price_column)?;
        let key_header = self.config.acquired_code_column.as_str();
        let price_header = supplier.headers[columns.price].trim();

        // 规范化编码 -> 供应商行
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (row, cell) in supplier.column_values(columns.code).enumerate() {
            if let Some(code) = normalize_cell(cell) {
                index.entry(code).or_default().push(row);
            }
        }

        let mut table = Table::new(vec![key_header.to_string()]);
        let mut skipped_sources = Vec::new();

        for (source, acquired_table) in acquired {
            let Some(acquired_code) = acquired_table.column(key_header) else {
                warn!("⚠️ {} 中没有 '{}' 列，跳过", source, key_header);
                skipped_sources.push(source.clone());
                continue;
            };

            // 价格列始终取自供应商行，其余同名列以报告为准
            let acquired_cols: Vec<(usize, usize)> = acquired_table
                .headers
                .iter()
                .enumerate()
                .filter(|(idx, header)| *idx != acquired_code && header.trim() != price_header)
                .map(|(idx, header)| (idx, table.ensure_column(header.trim())))
                .collect();
            let supplier_cols: Vec<(usize, usize)> = supplier
                .headers
                .iter()
                .enumerate()
                .filter(|(idx, header)| {
                    *idx != columns.code
                        && (*idx == columns.price || !acquired_table.has_column(header.trim()))
                })
                .map(|(idx, header)| (idx, table.ensure_column(header.trim())))
                .collect();

            let before = table.len();
            for row in 0..acquired_table.len() {
                let Some(code) = normalize_cell(acquired_table.cell(row, acquired_code)) else {
                    continue;
                };
                let Some(supplier_rows) = index.get(&code) else {
                    continue;
                };
                for &supplier_row in supplier_rows {
                    let mut merged = vec![CellValue::Empty; table.headers.len()];
                    merged[0] = CellValue::Text(code.clone());
                    for &(src, dst) in &acquired_cols {
                        merged[dst] = acquired_table.cell(row, src).clone();
                    }
                    for &(src, dst) in &supplier_cols {
                        merged[dst] = supplier.cell(supplier_row, src).clone();
                    }
                    table.push_row(merged);
                }
            }
            info!("✓ {}: 匹配 {} 行", source, table.len() - before);
        }

        self.add_derived_columns(&mut table, supplier)?;

        let table = table.select_columns(&self.config.column_order);
        info!("📊 合并完成: {} 行, {} 列", table.len(), table.headers.len());
        Ok(MergedDataset {
            table,
            skipped_sources,
        })
    }

    /// 从磁盘读取供应商文件和获取到的文件后合并
    ///
    /// 无法读取的获取文件会被跳过
    pub fn merge_files(&self, supplier_path: &Path, files: &[AcquiredFile]) -> Result<MergedDataset> {
        let supplier = load_table(supplier_path)?;

        let mut acquired = Vec::with_capacity(files.len());
        let mut unreadable = Vec::new();
        for file in files {
            match load_table(&file.path) {
                Ok(table) => acquired.push((file.file_name(), table)),
                Err(e) => {
                    warn!("⚠️ 无法读取 {}: {}", file.path.display(), e);
                    unreadable.push(file.file_name());
                }
            }
        }

        let mut dataset = self.merge(&supplier, &acquired)?;
        dataset.skipped_sources.extend(unreadable);
        Ok(dataset)
    }

    fn add_derived_columns(&self, table: &mut Table, supplier: &Table) -> Result<()> {
        for name in [PRICE_PL_COLUMN, PROFIT_COLUMN, ROI_COLUMN] {
            table.ensure_column(name);
        }

        let link_source = table
            .first_column(self.config.link_number_columns.iter().map(String::as_str))
            .map(|(idx, _)| idx);
        if let Some(source) = link_source {
            let builder = LinkBuilder::new(self.config.link_base_url.as_str())
                .map_err(|e| AppError::Config(e.to_string()))?;
            let links: Vec<CellValue> = table
                .column_values(source)
                .map(|value| builder.offer_link(value).map(CellValue::Text).unwrap_or_default())
                .collect();
            let target = table.ensure_column(LINK_COLUMN);
            for (row, link) in table.rows.iter_mut().zip(links) {
                row[target] = link;
            }
        }

        if supplier.has_column(PRODUCT_LINK_COLUMN) {
            let target = table.ensure_column(PRODUCT_LINK_COLUMN);
            let base = self.config.product_link_base_url.as_str();
            for row in table.rows.iter_mut() {
                if let CellValue::Text(code) = &row[0] {
                    let link = product_link(base, code);
                    row[target] = CellValue::Text(link);
                }
            }
        }
        Ok(())
    }
}
