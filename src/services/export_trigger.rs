//! 导出触发服务 - 业务能力层
//!
//! 导出按钮经常被遮罩层挡住或不在视口内，按顺序尝试多种触发方式，
//! 第一个成功的即视为已触发。

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{PortalConfig, Timings};
use crate::error::SessionError;
use crate::infrastructure::JsExecutor;

/// 导出触发方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStrategy {
    /// 通过元素句柄点击
    NativeClick,
    /// 页面内直接调用 click()
    DirectInvoke,
    /// 先隐藏遮罩层再点击
    DismissOverlays,
    /// 滚动到可见位置再点击
    ScrollIntoView,
}

impl ExportStrategy {
    pub const ORDER: [ExportStrategy; 4] = [
        ExportStrategy::NativeClick,
        ExportStrategy::DirectInvoke,
        ExportStrategy::DismissOverlays,
        ExportStrategy::ScrollIntoView,
    ];

    /// 页面内执行的脚本；NativeClick 不需要脚本
    ///
    /// 脚本返回 true 表示找到并点击了导出控件
    pub fn script(&self, portal: &PortalConfig) -> Result<Option<String>, serde_json::Error> {
        let locate = locate_export_fn(portal)?;
        let body = match self {
            ExportStrategy::NativeClick => return Ok(None),
            ExportStrategy::DirectInvoke => "const el = findExport(); if (!el) return false; el.click(); return true;".to_string(),
            ExportStrategy::DismissOverlays => format!(
                "document.querySelectorAll({}).forEach(o => {{ o.style.display = 'none'; }}); \
                 const el = findExport(); if (!el) return false; el.click(); return true;",
                serde_json::to_string(&portal.overlay_selector)?
            ),
            ExportStrategy::ScrollIntoView => "const el = findExport(); if (!el) return false; \
                 el.scrollIntoView({ block: 'center' }); el.click(); return true;"
                .to_string(),
        };
        Ok(Some(format!("(() => {{ {} {} }})()", locate, body)))
    }
}

/// 在页面中定位导出控件的 JS 函数：先按链接文本，再按选择器
fn locate_export_fn(portal: &PortalConfig) -> Result<String, serde_json::Error> {
    Ok(format!(
        r#"const findExport = () => {{
            const text = {};
            const byText = Array.from(document.querySelectorAll('a, button'))
                .find(el => (el.textContent || '').trim().includes(text));
            if (byText) return byText;
            for (const sel of {}) {{
                const el = document.querySelector(sel);
                if (el) return el;
            }}
            return null;
        }};"#,
        serde_json::to_string(&portal.export_link_text)?,
        serde_json::to_string(&portal.export_selectors)?
    ))
}

/// 导出触发服务
pub struct ExportTrigger<'a> {
    portal: &'a PortalConfig,
    timings: &'a Timings,
}

impl<'a> ExportTrigger<'a> {
    pub fn new(portal: &'a PortalConfig, timings: &'a Timings) -> Self {
        Self { portal, timings }
    }

    /// 依次尝试每种方式，返回第一个成功的方式
    pub async fn trigger(&self, executor: &JsExecutor) -> Result<ExportStrategy, SessionError> {
        for strategy in ExportStrategy::ORDER {
            match self.attempt(executor, strategy).await {
                Ok(true) => {
                    info!("✓ 已触发导出 ({:?})", strategy);
                    return Ok(strategy);
                }
                Ok(false) => debug!("导出方式 {:?} 未找到控件", strategy),
                Err(e) => warn!("导出方式 {:?} 失败: {}", strategy, e),
            }
            sleep(self.timings.action_pause).await;
        }
        Err(SessionError::ExportNotActivated)
    }

    async fn attempt(&self, executor: &JsExecutor, strategy: ExportStrategy) -> Result<bool, SessionError> {
        match strategy.script(self.portal)? {
            Some(script) => executor.eval_as::<bool>(script).await,
            None => self.native_click(executor).await,
        }
    }

    async fn native_click(&self, executor: &JsExecutor) -> Result<bool, SessionError> {
        let xpath = format!(
            "//a[contains(normalize-space(.), {})]",
            xpath_literal(&self.portal.export_link_text)
        );
        if let Ok(element) = executor.page().find_xpath(xpath).await {
            element.click().await?;
            return Ok(true);
        }
        for selector in &self.portal.export_selectors {
            if let Ok(element) = executor.find(selector).await {
                element.click().await?;
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn xpath_literal(text: &str) -> String {
    if text.contains('\'') {
        format!("\"{}\"", text)
    } else {
        format!("'{}'", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_click_has_no_script() {
        let portal = PortalConfig::default();
        assert!(ExportStrategy::NativeClick.script(&portal).unwrap().is_none());
    }

    #[test]
    fn test_only_overlay_strategy_hides_overlays() {
        let portal = PortalConfig::default();
        for strategy in ExportStrategy::ORDER.iter().skip(1) {
            let script = strategy.script(&portal).unwrap().unwrap();
            assert!(script.contains("Eksport do XLS"));
            assert!(script.contains("a.icon-excel"));
            assert_eq!(
                script.contains(".ui-widget-overlay"),
                *strategy == ExportStrategy::DismissOverlays
            );
        }
        let scroll = ExportStrategy::ScrollIntoView.script(&portal).unwrap().unwrap();
        assert!(scroll.contains("scrollIntoView"));
    }

    #[test]
    fn test_xpath_literal_quoting() {
        assert_eq!(xpath_literal("Eksport do XLS"), "'Eksport do XLS'");
        assert_eq!(xpath_literal("it's"), "\"it's\"");
    }
}
