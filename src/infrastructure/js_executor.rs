//! 页面执行器 - 基础设施层
//!
//! 持有当前会话唯一的 page 资源，只暴露"执行 JS / 导航 / 等待元素"的能力

use std::time::Duration;

use chromiumoxide::element::Element;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::error::SessionError;

/// 元素等待的轮询间隔
const ELEMENT_POLL: Duration = Duration::from_millis(250);

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露 eval() / 导航 / 元素查找能力
/// - 不认识批次和编码
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 获取 page 的引用（用于其他操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 执行 JS 代码并返回 JSON 结果
    ///
    /// 脚本必须返回一个可序列化的值（不能是 undefined）
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue, SessionError> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(
        &self,
        js_code: impl Into<String>,
    ) -> Result<T, SessionError> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 导航到指定 URL
    pub async fn goto(&self, url: &str) -> Result<(), SessionError> {
        debug!("导航到: {}", url);
        self.page.goto(url).await?;
        Ok(())
    }

    /// 重新加载当前页面
    pub async fn reload(&self) -> Result<(), SessionError> {
        self.page.reload().await?;
        Ok(())
    }

    /// 当前 URL（未知时返回空字符串）
    pub async fn current_url(&self) -> Result<String, SessionError> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    /// 立即查找元素
    pub async fn find(&self, selector: &str) -> Result<Element, SessionError> {
        Ok(self.page.find_element(selector).await?)
    }

    /// 在限定时间内等待元素出现
    pub async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<Element, SessionError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(element) = self.page.find_element(selector).await {
                return Ok(element);
            }
            if Instant::now() >= deadline {
                return Err(SessionError::ElementNotFound {
                    selector: selector.to_string(),
                });
            }
            sleep(ELEMENT_POLL).await;
        }
    }

    /// 读取输入框当前的值（元素不存在时返回空字符串）
    pub async fn read_value(&self, selector: &str) -> Result<String, SessionError> {
        let js_code = format!(
            r#"
            (() => {{
                const el = document.querySelector({});
                return el ? (el.value || '') : '';
            }})()
            "#,
            serde_json::to_string(selector)?
        );
        self.eval_as(js_code).await
    }
}
