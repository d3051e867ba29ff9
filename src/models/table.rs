//! 内存中的表格数据

use std::fmt;

/// 单元格值
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => s.trim().replace(',', ".").parse().ok(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// 从文本推断：能解析为数字的视为数字（用于 CSV）
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }
        match trimmed.parse::<f64>() {
            // 科学计数法和超长数字保持文本，交给编码规范化处理
            Ok(n) if n.is_finite() && !trimmed.contains(['e', 'E']) && trimmed.len() < 16 => {
                CellValue::Number(n)
            }
            _ => CellValue::Text(trimmed.to_string()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{:.0}", n),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

/// 表格：有序表头 + 行
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 查找列索引（精确匹配，忽略首尾空白）
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    /// 按候选列表顺序查找第一个存在的列
    pub fn first_column<'a, I>(&self, candidates: I) -> Option<(usize, &'a str)>
    where
        I: IntoIterator<Item = &'a str>,
    {
        candidates
            .into_iter()
            .find_map(|name| self.column(name).map(|idx| (idx, name)))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// 取单元格，越界时返回 Empty
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    /// 取某列的全部值
    pub fn column_values(&self, col: usize) -> impl Iterator<Item = &CellValue> + '_ {
        (0..self.rows.len()).map(move |r| self.cell(r, col))
    }

    /// 追加一行，长度自动补齐到表头宽度
    pub fn push_row(&mut self, mut row: Vec<CellValue>) {
        row.resize(self.headers.len(), CellValue::Empty);
        self.rows.push(row);
    }

    /// 若列不存在则追加（值全部为空），返回列索引
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column(name) {
            return idx;
        }
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(CellValue::Empty);
        }
        self.headers.len() - 1
    }

    /// 只保留并按顺序排列给定的列，不存在的列被跳过
    pub fn select_columns(&self, order: &[String]) -> Table {
        let picks: Vec<(usize, String)> = order
            .iter()
            .filter_map(|name| self.column(name).map(|idx| (idx, name.clone())))
            .collect();

        let mut table = Table::new(picks.iter().map(|(_, n)| n.clone()).collect());
        for r in 0..self.rows.len() {
            let row = picks.iter().map(|(idx, _)| self.cell(r, *idx).clone()).collect();
            table.rows.push(row);
        }
        table
    }
}
