//! 商品编码规范化
//!
//! 把各种形态的 GTIN/EAN（科学计数法、带分隔符、长度不一）统一为 13 位数字字符串

use crate::models::table::CellValue;

/// 规范化编码的固定长度
pub const CODE_WIDTH: usize = 13;

/// 规范化单个编码
///
/// 1. 去掉首尾空白
/// 2. 含指数标记时先按浮点数解析再转为整数文本（恢复被表格软件存成浮点的编码）
/// 3. 去掉所有非数字字符
/// 4. 超过 13 位时保留最后 13 位，不足时左侧补 0
///
/// 没有任何数字时返回 `None`
pub fn normalize(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let expanded = expand_scientific(trimmed);
    let digits: String = expanded.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }

    let kept = if digits.len() > CODE_WIDTH {
        &digits[digits.len() - CODE_WIDTH..]
    } else {
        digits.as_str()
    };

    Some(format!("{:0>width$}", kept, width = CODE_WIDTH))
}

/// 规范化表格单元格中的编码
///
/// 数字单元格先转为整数文本，避免 `5901234123457.0` 中的小数部分混入
pub fn normalize_cell(cell: &CellValue) -> Option<String> {
    match cell {
        CellValue::Empty | CellValue::Bool(_) => None,
        CellValue::Number(n) => {
            if !n.is_finite() {
                return None;
            }
            normalize(&format!("{:.0}", n.trunc()))
        }
        CellValue::Text(s) => normalize(s),
    }
}

/// 批量规范化，丢弃无效编码
pub fn normalize_all<'a, I>(codes: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    codes.into_iter().filter_map(|c| normalize(c)).collect()
}

/// 检查是否已经是规范形式
pub fn is_normalized(code: &str) -> bool {
    code.len() == CODE_WIDTH && code.chars().all(|c| c.is_ascii_digit())
}

fn expand_scientific(text: &str) -> String {
    if !text.contains(['e', 'E']) {
        return text.to_string();
    }
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => format!("{:.0}", value.trunc()),
        _ => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_pads_short_codes() {
        assert_eq!(normalize("123").as_deref(), Some("0000000000123"));
        assert_eq!(normalize("  5901234123457 ").as_deref(), Some("5901234123457"));
    }

    #[test]
    fn test_normalize_keeps_last_13_digits() {
        assert_eq!(normalize("12345678901234").as_deref(), Some("2345678901234"));
    }

    #[test]
    fn test_normalize_scientific_notation() {
        assert_eq!(normalize("1.23E+5").as_deref(), Some("0000000123000"));
        assert_eq!(normalize("1.234E+10").as_deref(), Some("0012340000000"));
        assert_eq!(normalize("5.901234123457e12").as_deref(), Some("5901234123457"));
    }

    #[test]
    fn test_normalize_rejects_values_without_digits() {
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("   "), None);
        assert_eq!(normalize("abc"), None);
        assert_eq!(normalize("e"), None);
    }

    #[test]
    fn test_normalize_strips_separators() {
        assert_eq!(normalize("590-1234-123457").as_deref(), Some("5901234123457"));
        assert_eq!(normalize("EAN: 4006381333931").as_deref(), Some("4006381333931"));
    }

    #[test]
    fn test_unparseable_exponent_falls_back_to_digits() {
        // "1e400" 溢出为无穷大，按原文本提取数字
        assert_eq!(normalize("1e400").as_deref(), Some("0000000001400"));
        assert_eq!(normalize("12E3x").as_deref(), Some("0000000000123"));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "123",
            "12345678901234",
            "1.23E+5",
            "abc",
            "",
            "0000000000000",
            "4006381333931",
            "-1.5e3",
            "99999999999999999999",
        ];
        for raw in samples {
            let once = normalize(raw);
            if let Some(code) = &once {
                assert!(is_normalized(code), "{} -> {}", raw, code);
            }
            let twice = once.as_deref().and_then(normalize);
            assert_eq!(once, twice, "not idempotent for {:?}", raw);
        }
    }

    #[test]
    fn test_normalize_cell_number() {
        assert_eq!(
            normalize_cell(&CellValue::Number(5901234123457.0)).as_deref(),
            Some("5901234123457")
        );
        assert_eq!(normalize_cell(&CellValue::Number(f64::NAN)), None);
        assert_eq!(normalize_cell(&CellValue::Empty), None);
    }

    #[test]
    fn test_normalize_all_drops_invalid() {
        let codes = vec!["1".to_string(), "n/a".to_string(), "2".to_string()];
        assert_eq!(
            normalize_all(&codes),
            vec!["0000000000001".to_string(), "0000000000002".to_string()]
        );
    }
}
