//! 结果表写出
//!
//! 带格式、公式和超链接的 xlsx；格式化失败时退回到只写值的简单表格

use std::path::Path;

use chrono::{DateTime, Local};
use rust_xlsxwriter::{
    Color, ConditionalFormat3ColorScale, ConditionalFormatType, Format, FormatAlign, FormatBorder,
    FormatUnderline, Url, Workbook, Worksheet, XlsxError,
};
use tracing::{info, warn};

use crate::error::Result;
use crate::models::{CellValue, Table};
use crate::report::layout::ReportLayout;

/// 实际采用的写出方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Styled,
    Plain,
}

/// 0 -> A, 25 -> Z, 26 -> AA
pub fn column_letter(col: u16) -> String {
    let mut n = col as u32 + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// "G1" -> (0, 6)
pub fn parse_cell_ref(cell: &str) -> Option<(u32, u16)> {
    let cell = cell.trim().replace('$', "");
    let split = cell.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = cell.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let mut col: u32 = 0;
    for c in letters.to_ascii_uppercase().chars() {
        col = col * 26 + (c as u32 - 'A' as u32 + 1);
    }
    let row: u32 = digits.parse().ok()?;
    if row == 0 || col == 0 || col > u16::MAX as u32 {
        return None;
    }
    Some((row - 1, (col - 1) as u16))
}

/// "G1" -> "$G$1"
pub fn absolute_ref(cell: &str) -> Option<String> {
    let (row, col) = parse_cell_ref(cell)?;
    Some(format!("${}${}", column_letter(col), row + 1))
}

/// 数据行上的公式（row 为 Excel 中从 1 开始的行号）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFormulas {
    pub price_pl: Option<String>,
    pub profit: Option<String>,
    pub roi: Option<String>,
}

/// 公式所需的列位置
#[derive(Debug, Clone, Copy, Default)]
struct FormulaColumns {
    price: Option<u16>,
    min_price: Option<u16>,
    price_pl: Option<u16>,
    profit: Option<u16>,
    roi: Option<u16>,
}

impl FormulaColumns {
    fn locate(table: &Table, layout: &ReportLayout) -> Self {
        let find = |name: &str| table.column(name).map(|i| i as u16);
        Self {
            price: find(&layout.price_column),
            min_price: find(&layout.min_price_column),
            price_pl: find(&layout.price_pl_column),
            profit: find(&layout.profit_column),
            roi: find(&layout.roi_column),
        }
    }

    /// 只有引用到的列都存在时才生成对应公式
    fn formulas(&self, layout: &ReportLayout, row: u32) -> RowFormulas {
        let anchor = |cell: &str| absolute_ref(cell).unwrap_or_else(|| cell.to_string());
        let rate = anchor(&layout.exchange_rate.value_cell);
        let shipping = anchor(&layout.shipping_cost.value_cell);
        let prep = anchor(&layout.prep_center_cost.value_cell);
        let commission = anchor(&layout.commission_percent.value_cell);
        let at = |col: u16| format!("{}{}", column_letter(col), row);

        let price_pl = match (self.price, self.price_pl) {
            (Some(p), Some(_)) => Some(format!("={}*{}", at(p), rate)),
            _ => None,
        };
        let profit = match (self.min_price, self.price_pl, self.profit) {
            (Some(c), Some(ppl), Some(_)) => Some(format!(
                "=({c}/1.23)-(({c}*{commission}/100)/1.23)-{ppl}-{shipping}-{prep}",
                c = at(c),
                ppl = at(ppl),
                commission = commission,
                shipping = shipping,
                prep = prep,
            )),
            _ => None,
        };
        let roi = match (self.min_price, self.profit, self.roi) {
            (Some(c), Some(p), Some(_)) => Some(format!(
                "=IF({c}<>0,{p}/{c},0)",
                c = at(c),
                p = at(p)
            )),
            _ => None,
        };

        RowFormulas {
            price_pl,
            profit,
            roi,
        }
    }
}

/// 结果表写出器
pub struct SpreadsheetWriter {
    layout: ReportLayout,
}

impl SpreadsheetWriter {
    pub fn new(layout: ReportLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ReportLayout {
        &self.layout
    }

    /// 写出结果表
    ///
    /// 格式化过程中任何错误都会退回到简单表格；只有简单表格也失败时才返回错误
    pub fn write(&self, table: &Table, path: &Path) -> Result<RenderMode> {
        match self.write_styled(table, path, Local::now()) {
            Ok(()) => {
                info!("✓ 结果已写出 ({} 行): {}", table.len(), path.display());
                Ok(RenderMode::Styled)
            }
            Err(e) => {
                warn!("⚠️ 格式化写出失败，改为简单表格: {}", e);
                write_plain(table, path)?;
                info!("✓ 结果已写出 (简单表格, {} 行): {}", table.len(), path.display());
                Ok(RenderMode::Plain)
            }
        }
    }

    fn write_styled(&self, table: &Table, path: &Path, now: DateTime<Local>) -> std::result::Result<(), XlsxError> {
        let layout = &self.layout;
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();

        self.write_title_block(sheet, now)?;
        self.write_header(sheet, table)?;
        self.write_rows(sheet, table)?;

        let last_col = table.headers.len().saturating_sub(1) as u16;
        let last_row = layout.header_row + table.len() as u32;
        if !table.headers.is_empty() {
            sheet.autofilter(layout.header_row, 0, last_row, last_col)?;
        }
        sheet.set_freeze_panes(layout.data_row(), 0)?;

        if !table.is_empty() {
            for scale in &layout.color_scales {
                let Some(col) = table.column(&scale.column) else {
                    continue;
                };
                let col = col as u16;
                let rule = ConditionalFormat3ColorScale::new()
                    .set_minimum(ConditionalFormatType::Number, scale.min_value)
                    .set_midpoint(ConditionalFormatType::Number, scale.mid_value)
                    .set_maximum(ConditionalFormatType::Number, scale.max_value)
                    .set_minimum_color(Color::RGB(scale.min_color))
                    .set_midpoint_color(Color::RGB(scale.mid_color))
                    .set_maximum_color(Color::RGB(scale.max_color));
                sheet.add_conditional_format(layout.data_row(), col, last_row, col, &rule)?;
            }
        }

        workbook.save(path)?;
        Ok(())
    }

    /// A1 日期、A3 帮助链接、参数单元格
    fn write_title_block(&self, sheet: &mut Worksheet, now: DateTime<Local>) -> std::result::Result<(), XlsxError> {
        let layout = &self.layout;
        let title = self.font().set_bold();
        let label = title.clone().set_font_color(Color::RGB(layout.label_color));
        let value = title.clone().set_font_color(Color::RGB(layout.value_color));
        let help = title
            .clone()
            .set_font_color(Color::Blue)
            .set_underline(FormatUnderline::Single);

        sheet.write_string_with_format(0, 0, &layout.date_label, &title)?;
        sheet.write_string_with_format(0, 1, now.format("%d.%m.%Y").to_string(), &title)?;
        let help_link = Url::new(layout.help_url.as_str()).set_text(layout.help_text.as_str());
        sheet.write_url_with_format(2, 0, help_link, &help)?;

        for anchor in layout.anchors() {
            let (label_row, label_col) = cell_or_invalid(&anchor.label_cell)?;
            let (value_row, value_col) = cell_or_invalid(&anchor.value_cell)?;
            sheet.write_string_with_format(label_row, label_col, &anchor.label, &label)?;
            sheet.write_number_with_format(value_row, value_col, anchor.value, &value)?;
        }
        Ok(())
    }

    fn write_header(&self, sheet: &mut Worksheet, table: &Table) -> std::result::Result<(), XlsxError> {
        let layout = &self.layout;
        let header = self
            .font()
            .set_bold()
            .set_font_color(Color::RGB(layout.header_font_color))
            .set_background_color(Color::RGB(layout.header_fill))
            .set_border(FormatBorder::Thin)
            .set_text_wrap()
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter);

        sheet.set_row_height(layout.header_row, layout.header_height)?;
        for (col, name) in table.headers.iter().enumerate() {
            let col = col as u16;
            sheet.write_string_with_format(layout.header_row, col, name, &header)?;
            sheet.set_column_width(col, layout.width_of(name))?;
        }
        Ok(())
    }

    fn write_rows(&self, sheet: &mut Worksheet, table: &Table) -> std::result::Result<(), XlsxError> {
        let layout = &self.layout;
        let formulas = FormulaColumns::locate(table, layout);
        let column_formats: Vec<Format> = table
            .headers
            .iter()
            .map(|name| self.data_format(name))
            .collect();
        let link_format = self
            .font()
            .set_font_color(Color::Blue)
            .set_underline(FormatUnderline::Single)
            .set_align(FormatAlign::Center);

        for r in 0..table.len() {
            let row = layout.data_row() + r as u32;
            for (c, name) in table.headers.iter().enumerate() {
                let col = c as u16;
                let value = table.cell(r, c);
                let format = &column_formats[c];

                if *name == layout.link_column || *name == layout.product_link_column {
                    let text = if *name == layout.link_column {
                        &layout.link_text
                    } else {
                        &layout.product_link_text
                    };
                    match value.as_text() {
                        Some(url) if url.starts_with("http") => {
                            let link = Url::new(url).set_text(text.as_str());
                            sheet.write_url_with_format(row, col, link, &link_format)?;
                        }
                        _ => write_cell(sheet, row, col, value, format)?,
                    }
                    continue;
                }
                write_cell(sheet, row, col, value, format)?;
            }

            let excel_row = row + 1;
            let row_formulas = formulas.formulas(layout, excel_row);
            let cells = [
                (formulas.price_pl, row_formulas.price_pl),
                (formulas.profit, row_formulas.profit),
                (formulas.roi, row_formulas.roi),
            ];
            for (col, formula) in cells {
                if let (Some(col), Some(formula)) = (col, formula) {
                    sheet.write_formula_with_format(row, col, formula.as_str(), &column_formats[col as usize])?;
                }
            }
        }
        Ok(())
    }

    fn font(&self) -> Format {
        Format::new()
            .set_font_name(self.layout.font_name.as_str())
            .set_font_size(self.layout.font_size)
    }

    fn data_format(&self, column: &str) -> Format {
        let mut format = self.font().set_align(FormatAlign::VerticalCenter);
        if let Some(num) = self.layout.number_formats.get(column) {
            format = format.set_num_format(num.as_str());
        }
        if self.layout.right_aligned.iter().any(|c| c == column) {
            format = format.set_align(FormatAlign::Right);
        }
        format
    }
}

/// 只写表头和值
pub fn write_plain(table: &Table, path: &Path) -> std::result::Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let format = Format::new();

    for (col, name) in table.headers.iter().enumerate() {
        sheet.write_string(0, col as u16, name)?;
    }
    for r in 0..table.len() {
        for c in 0..table.headers.len() {
            write_cell(sheet, r as u32 + 1, c as u16, table.cell(r, c), &format)?;
        }
    }
    workbook.save(path)?;
    Ok(())
}

fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, value: &CellValue, format: &Format) -> std::result::Result<(), XlsxError> {
    match value {
        CellValue::Empty => {}
        CellValue::Text(s) => {
            sheet.write_string_with_format(row, col, s, format)?;
        }
        CellValue::Number(n) => {
            sheet.write_number_with_format(row, col, *n, format)?;
        }
        CellValue::Bool(b) => {
            sheet.write_boolean_with_format(row, col, *b, format)?;
        }
    }
    Ok(())
}

fn cell_or_invalid(cell: &str) -> std::result::Result<(u32, u16), XlsxError> {
    parse_cell_ref(cell).ok_or_else(|| XlsxError::ParameterError(format!("invalid cell reference '{}'", cell)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook, Data, Reader, Xlsx};

    fn merged_table() -> Table {
        let mut t = Table::new(
            ["Lp", "EAN", "Price", "Price PL", "Cena min.", "Profit", "ROI", "Link"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        t.push_row(vec![
            1.0.into(),
            "0000000000123".into(),
            10.0.into(),
            CellValue::Empty,
            49.99.into(),
            CellValue::Empty,
            CellValue::Empty,
            "https://allegro.pl/oferta/1".into(),
        ]);
        t
    }

    #[test]
    fn test_column_letter() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }

    #[test]
    fn test_parse_cell_ref() {
        assert_eq!(parse_cell_ref("A1"), Some((0, 0)));
        assert_eq!(parse_cell_ref("G1"), Some((0, 6)));
        assert_eq!(parse_cell_ref("$M$1"), Some((0, 12)));
        assert_eq!(parse_cell_ref("AA10"), Some((9, 26)));
        assert_eq!(parse_cell_ref("A0"), None);
        assert_eq!(parse_cell_ref("12"), None);
        assert_eq!(absolute_ref("G2").as_deref(), Some("$G$2"));
    }

    #[test]
    fn test_row_formulas() {
        let layout = ReportLayout::default();
        let columns = FormulaColumns::locate(&merged_table(), &layout);
        let f = columns.formulas(&layout, 5);
        assert_eq!(f.price_pl.as_deref(), Some("=C5*$G$1"));
        assert_eq!(
            f.profit.as_deref(),
            Some("=(E5/1.23)-((E5*$M$1/100)/1.23)-D5-$G$2-$G$3")
        );
        assert_eq!(f.roi.as_deref(), Some("=IF(E5<>0,F5/E5,0)"));
    }

    #[test]
    fn test_formulas_skipped_without_columns() {
        let layout = ReportLayout::default();
        let table = Table::new(vec!["EAN".into(), "Price".into(), "Profit".into()]);
        let f = FormulaColumns::locate(&table, &layout).formulas(&layout, 5);
        assert_eq!(f.price_pl, None);
        assert_eq!(f.profit, None);
        assert_eq!(f.roi, None);
    }

    #[test]
    fn test_styled_output_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.xlsx");
        let writer = SpreadsheetWriter::new(ReportLayout::default());

        let mode = writer.write(&merged_table(), &path).unwrap();
        assert_eq!(mode, RenderMode::Styled);

        let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
        let range = workbook.worksheet_range_at(0).unwrap().unwrap();
        assert_eq!(range.get_value((0, 0)), Some(&Data::String("Date:".into())));
        assert_eq!(range.get_value((3, 1)), Some(&Data::String("EAN".into())));
        assert_eq!(range.get_value((4, 2)), Some(&Data::Float(10.0)));
        assert_eq!(range.get_value((4, 7)), Some(&Data::String("Link".into())));
        assert_eq!(range.get_value((0, 6)), Some(&Data::Float(4.3)));

        let formulas = workbook.worksheet_formula("Sheet1").unwrap();
        let price_pl = formulas.get_value((4, 3)).cloned().unwrap_or_default();
        assert_eq!(price_pl.trim_start_matches('='), "C5*$G$1");
    }

    #[test]
    fn test_falls_back_to_plain_when_rows_overflow() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.xlsx");
        let layout = ReportLayout {
            header_row: 1_048_575,
            ..ReportLayout::default()
        };

        let mode = SpreadsheetWriter::new(layout)
            .write(&merged_table(), &path)
            .unwrap();
        assert_eq!(mode, RenderMode::Plain);

        let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
        let range = workbook.worksheet_range_at(0).unwrap().unwrap();
        assert_eq!(range.get_value((0, 0)), Some(&Data::String("Lp".into())));
        assert_eq!(
            range.get_value((1, 1)),
            Some(&Data::String("0000000000123".into()))
        );
    }
}
