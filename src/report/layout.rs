//! 结果表布局
//!
//! 默认值即门户报告的固定格式，可通过 REPORT_LAYOUT_FILE 指向的 TOML 覆盖

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::{AppError, Result};

/// 表头上方的参数单元格：标签 + 数值
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Anchor {
    pub label_cell: String,
    pub label: String,
    pub value_cell: String,
    pub value: f64,
}

impl Anchor {
    fn new(label_cell: &str, label: &str, value_cell: &str, value: f64) -> Self {
        Self {
            label_cell: label_cell.to_string(),
            label: label.to_string(),
            value_cell: value_cell.to_string(),
            value,
        }
    }
}

/// 三色刻度
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ColorScale {
    pub column: String,
    pub min_value: f64,
    pub mid_value: f64,
    pub max_value: f64,
    pub min_color: u32,
    pub mid_color: u32,
    pub max_color: u32,
}

impl ColorScale {
    fn red_yellow_green(column: &str, min_value: f64, mid_value: f64, max_value: f64) -> Self {
        Self {
            column: column.to_string(),
            min_value,
            mid_value,
            max_value,
            min_color: 0xF8696B,
            mid_color: 0xFFEB84,
            max_color: 0x63BE7B,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportLayout {
    /// 表头所在行（从 0 开始）
    pub header_row: u32,
    pub header_height: f64,
    pub header_fill: u32,
    pub header_font_color: u32,
    pub font_name: String,
    pub font_size: f64,
    pub label_color: u32,
    pub value_color: u32,

    pub date_label: String,
    pub help_text: String,
    pub help_url: String,

    pub exchange_rate: Anchor,
    pub shipping_cost: Anchor,
    pub prep_center_cost: Anchor,
    pub commission_percent: Anchor,

    pub default_width: f64,
    pub column_widths: BTreeMap<String, f64>,
    pub number_formats: BTreeMap<String, String>,
    pub right_aligned: Vec<String>,
    pub color_scales: Vec<ColorScale>,

    pub link_text: String,
    pub product_link_text: String,

    /// 公式用到的列
    pub price_column: String,
    pub min_price_column: String,
    pub price_pl_column: String,
    pub profit_column: String,
    pub roi_column: String,
    pub link_column: String,
    pub product_link_column: String,
}

impl Default for ReportLayout {
    fn default() -> Self {
        let widths = [
            ("Lp", 6.0),
            ("EAN", 16.0),
            ("Price", 10.0),
            ("Price PL", 10.0),
            ("Cena min.", 11.0),
            ("Profit", 10.0),
            ("ROI", 9.0),
            ("Link", 8.0),
            ("Top oferta", 11.0),
            ("Transakcje (30 dni)", 13.0),
            ("Product Link", 14.0),
        ];
        let formats = [
            ("Price", "0.00"),
            ("Price PL", "0.00"),
            ("Cena min.", "0.00"),
            ("Profit", "0.00"),
            ("ROI", "0.00%"),
            ("EAN", "0"),
        ];

        Self {
            header_row: 3,
            header_height: 32.0,
            header_fill: 0x4F81BD,
            header_font_color: 0xFFFFFF,
            font_name: "Arial".to_string(),
            font_size: 10.0,
            label_color: 0x1F497D,
            value_color: 0xC00000,

            date_label: "Date:".to_string(),
            help_text: "Help".to_string(),
            help_url: "https://tradewatch.pl/".to_string(),

            exchange_rate: Anchor::new("D1", "Kurs EUR/PLN", "G1", 4.3),
            shipping_cost: Anchor::new("D2", "Dostawa", "G2", 0.0),
            prep_center_cost: Anchor::new("D3", "Prep Center", "G3", 0.0),
            commission_percent: Anchor::new("I1", "Prowizja %", "M1", 10.0),

            default_width: 12.0,
            column_widths: widths.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            number_formats: formats.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            right_aligned: ["Price", "Price PL", "Cena min.", "Profit", "ROI"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            color_scales: vec![
                ColorScale::red_yellow_green("ROI", 0.0, 0.2, 0.5),
                ColorScale::red_yellow_green("Profit", 0.0, 10.0, 50.0),
            ],

            link_text: "Link".to_string(),
            product_link_text: "View Product".to_string(),

            price_column: "Price".to_string(),
            min_price_column: "Cena min.".to_string(),
            price_pl_column: "Price PL".to_string(),
            profit_column: "Profit".to_string(),
            roi_column: "ROI".to_string(),
            link_column: "Link".to_string(),
            product_link_column: "Product Link".to_string(),
        }
    }
}

impl ReportLayout {
    /// 从 TOML 文件读取，未写出的字段使用默认值
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| AppError::file(path, e))?;
        let layout: ReportLayout = toml::from_str(&content)?;
        info!("✓ 已加载报告布局: {}", path.display());
        Ok(layout)
    }

    /// 有覆盖文件时读取，否则使用默认布局
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    /// 数据起始行（从 0 开始）
    pub fn data_row(&self) -> u32 {
        self.header_row + 1
    }

    pub fn width_of(&self, column: &str) -> f64 {
        self.column_widths
            .get(column)
            .copied()
            .unwrap_or(self.default_width)
    }

    pub fn anchors(&self) -> [&Anchor; 4] {
        [
            &self.exchange_rate,
            &self.shipping_cost,
            &self.prep_center_cost,
            &self.commission_percent,
        ]
    }
}
