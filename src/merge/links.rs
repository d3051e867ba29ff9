//! 链接列计算

use regex::Regex;

use crate::models::CellValue;

/// 由链接编号列生成报价链接
///
/// 编号列可能是完整 URL（取最后一段路径）或数字编号
pub struct LinkBuilder {
    base_url: String,
    trailing_segment: Regex,
}

impl LinkBuilder {
    pub fn new(base_url: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            base_url: base_url.into(),
            trailing_segment: Regex::new(r"([^/?#]+)/?(?:[?#].*)?$")?,
        })
    }

    /// 从单元格中取出报价编号
    pub fn offer_id(&self, value: &CellValue) -> Option<String> {
        match value {
            CellValue::Number(n) if n.is_finite() => Some(format!("{:.0}", n.trunc())),
            CellValue::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return None;
                }
                if text.starts_with("http") {
                    let segment = self
                        .trailing_segment
                        .captures(text)
                        .and_then(|c| c.get(1))
                        .map(|m| m.as_str())?;
                    return Some(strip_float_suffix(segment).to_string());
                }
                match text.parse::<f64>() {
                    Ok(n) if n.is_finite() => Some(format!("{:.0}", n.trunc())),
                    _ => Some(strip_float_suffix(text).to_string()),
                }
            }
            _ => None,
        }
    }

    /// 完整的报价链接
    pub fn offer_link(&self, value: &CellValue) -> Option<String> {
        self.offer_id(value)
            .map(|id| format!("{}{}", self.base_url, id))
    }
}

/// 商品页链接: {base}{ean}/
pub fn product_link(base_url: &str, code: &str) -> String {
    format!("{}{}/", base_url, code)
}

fn strip_float_suffix(text: &str) -> &str {
    text.strip_suffix(".0").unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> LinkBuilder {
        LinkBuilder::new("https://allegro.pl/oferta/").unwrap()
    }

    #[test]
    fn test_numeric_offer_id() {
        let b = builder();
        assert_eq!(
            b.offer_link(&CellValue::Number(12345678901.0)).as_deref(),
            Some("https://allegro.pl/oferta/12345678901")
        );
        assert_eq!(b.offer_id(&CellValue::Text("987.0".into())).as_deref(), Some("987"));
    }

    #[test]
    fn test_url_uses_trailing_segment() {
        let b = builder();
        let url = CellValue::Text("https://allegro.pl/oferta/some-product-123456".into());
        assert_eq!(b.offer_id(&url).as_deref(), Some("some-product-123456"));

        let with_query = CellValue::Text("https://allegro.pl/oferta/555/?utm=x".into());
        assert_eq!(b.offer_id(&with_query).as_deref(), Some("555"));

        let float_tail = CellValue::Text("http://x.pl/a/777.0".into());
        assert_eq!(b.offer_id(&float_tail).as_deref(), Some("777"));
    }

    #[test]
    fn test_empty_values_have_no_link() {
        let b = builder();
        assert_eq!(b.offer_link(&CellValue::Empty), None);
        assert_eq!(b.offer_link(&CellValue::Text("  ".into())), None);
    }

    #[test]
    fn test_product_link() {
        assert_eq!(
            product_link("https://api.qogita.com/variants/link/", "0000000000123"),
            "https://api.qogita.com/variants/link/0000000000123/"
        );
    }
}
