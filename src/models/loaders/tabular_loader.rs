use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use tracing::{debug, info};

use crate::error::{AppError, InputError, Result};
use crate::models::table::{CellValue, Table};

/// 支持的表格扩展名
const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// 加载表格文件（第一个工作表）为 Table
///
/// 第一行视为表头。根据扩展名选择 Excel 或 CSV 读取方式
pub fn load_table(path: &Path) -> Result<Table> {
    if !path.is_file() {
        return Err(AppError::read(path, "文件不存在"));
    }

    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
        .unwrap_or_default();

    let table = if SPREADSHEET_EXTENSIONS.contains(&extension.as_str()) {
        load_spreadsheet(path)?
    } else if extension == "csv" {
        load_csv(path)?
    } else {
        return Err(InputError::UnsupportedFormat {
            path: path.to_path_buf(),
        }
        .into());
    };

    info!(
        "✓ 已加载 {}: {} 行, {} 列",
        path.file_name().unwrap_or_default().to_string_lossy(),
        table.len(),
        table.headers.len()
    );
    Ok(table)
}

fn load_spreadsheet(path: &Path) -> Result<Table> {
    let mut workbook = open_workbook_auto(path).map_err(|e| AppError::read(path, e))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| InputError::EmptyFile {
            path: path.to_path_buf(),
        })?
        .map_err(|e| AppError::read(path, e))?;

    let mut rows = range.rows();
    let header_row = rows.next().ok_or_else(|| InputError::EmptyFile {
        path: path.to_path_buf(),
    })?;

    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| cell_from_data(cell).to_string().trim().to_string())
        .collect();
    debug!("表头: {:?}", headers);

    let mut table = Table::new(headers);
    for row in rows {
        let values: Vec<CellValue> = row.iter().map(cell_from_data).collect();
        if values.iter().all(CellValue::is_empty) {
            continue;
        }
        table.push_row(values);
    }
    Ok(table)
}

fn load_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|e| AppError::read(path, e))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::read(path, e))?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if headers.is_empty() {
        return Err(InputError::EmptyFile {
            path: path.to_path_buf(),
        }
        .into());
    }

    let mut table = Table::new(headers);
    for record in reader.records() {
        let record = record.map_err(|e| AppError::read(path, e))?;
        let values: Vec<CellValue> = record.iter().map(CellValue::infer).collect();
        if values.iter().all(CellValue::is_empty) {
            continue;
        }
        table.push_row(values);
    }
    Ok(table)
}

fn cell_from_data(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => {
            if s.trim().is_empty() {
                CellValue::Empty
            } else {
                CellValue::Text(s.clone())
            }
        }
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) => CellValue::Empty,
    }
}
