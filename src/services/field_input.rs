//! 编码输入框服务 - 业务能力层
//!
//! 只负责"清空 / 写入 / 校验"输入框。目标控件对单一清空方式不可靠，
//! 因此每种操作都是一组按顺序尝试的策略，每次操作后重新读取控件值验证。

use std::collections::HashSet;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::Timings;
use crate::error::SessionError;
use crate::infrastructure::JsExecutor;

/// 清空策略，按升级顺序排列
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearStrategy {
    /// 通过元素句柄直接清空
    NativeClear,
    /// 全选后按 Delete
    SelectAllDelete,
    /// 直接赋值并派发 input/change 事件
    AssignWithEvents,
}

impl ClearStrategy {
    pub const ESCALATION: [ClearStrategy; 3] = [
        ClearStrategy::NativeClear,
        ClearStrategy::SelectAllDelete,
        ClearStrategy::AssignWithEvents,
    ];
}

/// 清空结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    /// 某个清空策略生效
    Cleared(ClearStrategy),
    /// 所有策略都失败，重新加载页面后为空
    Reloaded,
}

impl ClearOutcome {
    /// 生效的策略；重新加载时为 `None`
    pub fn strategy(&self) -> Option<ClearStrategy> {
        match self {
            ClearOutcome::Cleared(strategy) => Some(*strategy),
            ClearOutcome::Reloaded => None,
        }
    }
}

impl std::fmt::Display for ClearOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClearOutcome::Cleared(strategy) => write!(f, "{:?}", strategy),
            ClearOutcome::Reloaded => write!(f, "重新加载页面"),
        }
    }
}

/// 写入策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertStrategy {
    /// 直接赋值并派发事件（速度快）
    AssignWithEvents,
    /// 逐字符键入
    NativeTyping,
}

impl InsertStrategy {
    pub const ORDER: [InsertStrategy; 2] = [InsertStrategy::AssignWithEvents, InsertStrategy::NativeTyping];
}

/// 写入校验结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionCheck {
    /// 读回的编码集合与写入完全一致
    Exact,
    /// 部分缺失或多出，但至少一半写入成功
    Partial { present: usize, expected: usize },
    /// 不足一半
    Insufficient { present: usize, expected: usize },
}

impl InsertionCheck {
    pub fn is_acceptable(&self) -> bool {
        !matches!(self, InsertionCheck::Insufficient { .. })
    }
}

/// 比较写入与读回的编码集合
pub fn check_insertion(expected: &[String], read_back: &str) -> InsertionCheck {
    let expected_set: HashSet<&str> = expected.iter().map(String::as_str).collect();
    let read_set: HashSet<&str> = read_back.split_whitespace().collect();

    if expected_set == read_set {
        return InsertionCheck::Exact;
    }

    let present = expected_set.intersection(&read_set).count();
    let expected = expected_set.len();
    if present * 2 < expected {
        InsertionCheck::Insufficient { present, expected }
    } else {
        InsertionCheck::Partial { present, expected }
    }
}

/// 输入框服务
pub struct FieldInput<'a> {
    selector: &'a str,
    timings: &'a Timings,
}

impl<'a> FieldInput<'a> {
    pub fn new(selector: &'a str, timings: &'a Timings) -> Self {
        Self { selector, timings }
    }

    /// 等待输入框出现，并确认为空
    ///
    /// 新会话中输入框有残留内容说明会话被复用，直接中止
    pub async fn ensure_pristine(&self, executor: &JsExecutor) -> Result<(), SessionError> {
        executor
            .wait_for(self.selector, self.timings.element_timeout)
            .await?;
        let residual = executor.read_value(self.selector).await?;
        if !residual.trim().is_empty() {
            return Err(SessionError::FieldNotEmpty {
                residual: preview(&residual),
            });
        }
        debug!("✓ 输入框初始为空");
        Ok(())
    }

    /// 逐级清空输入框，每次后重新读取验证
    ///
    /// 三种策略都失败后重新加载页面，再验证一次
    pub async fn clear(&self, executor: &JsExecutor) -> Result<ClearOutcome, SessionError> {
        for (attempt, strategy) in ClearStrategy::ESCALATION.iter().enumerate() {
            if let Err(e) = self.apply_clear(executor, *strategy).await {
                warn!("清空方式 {:?} 执行出错: {}", strategy, e);
            }
            sleep(self.timings.action_pause).await;

            let residual = executor.read_value(self.selector).await?;
            if residual.trim().is_empty() {
                debug!("✓ 输入框已清空 (第 {} 次, {:?})", attempt + 1, strategy);
                return Ok(ClearOutcome::Cleared(*strategy));
            }
            warn!(
                "❌ 第 {} 次清空后仍有内容: '{}'",
                attempt + 1,
                preview(&residual)
            );
        }

        warn!("🔥 所有清空方式均失败，重新加载页面");
        executor.reload().await?;
        sleep(self.timings.page_settle).await;
        executor
            .wait_for(self.selector, self.timings.element_timeout)
            .await?;

        let residual = executor.read_value(self.selector).await?;
        if residual.trim().is_empty() {
            info!("✓ 重新加载后输入框为空");
            Ok(ClearOutcome::Reloaded)
        } else {
            Err(SessionError::FieldClearFailed {
                residual: preview(&residual),
            })
        }
    }

    /// 写入编码并校验
    ///
    /// 读回不足一半时换下一种写入方式；全部方式都不足一半时失败
    pub async fn insert(&self, executor: &JsExecutor, codes: &[String]) -> Result<InsertionCheck, SessionError> {
        if codes.is_empty() {
            return Err(SessionError::NoValidCodes);
        }
        let text = codes.join(" ");
        let mut last = InsertionCheck::Insufficient {
            present: 0,
            expected: codes.len(),
        };

        for (attempt, strategy) in InsertStrategy::ORDER.iter().enumerate() {
            if attempt > 0 {
                // 上一次可能留下了部分内容
                self.apply_clear(executor, ClearStrategy::AssignWithEvents).await?;
            }
            if let Err(e) = self.apply_insert(executor, *strategy, &text).await {
                warn!("写入方式 {:?} 执行出错: {}", strategy, e);
                continue;
            }
            sleep(self.timings.action_pause).await;

            let read_back = executor.read_value(self.selector).await?;
            last = check_insertion(codes, &read_back);
            match last {
                InsertionCheck::Exact => {
                    info!("✅ 已写入 {} 个编码", codes.len());
                    return Ok(last);
                }
                InsertionCheck::Partial { present, expected } => {
                    warn!(
                        "⚠️ 写入的编码与预期不完全一致: {}/{}，继续处理",
                        present, expected
                    );
                    return Ok(last);
                }
                InsertionCheck::Insufficient { present, expected } => {
                    warn!(
                        "❌ {:?} 仅写入 {}/{} 个编码",
                        strategy, present, expected
                    );
                }
            }
        }

        match last {
            InsertionCheck::Insufficient { present, expected } => {
                Err(SessionError::InsertionRejected { present, expected })
            }
            _ => Ok(last),
        }
    }

    async fn apply_clear(&self, executor: &JsExecutor, strategy: ClearStrategy) -> Result<(), SessionError> {
        match strategy {
            ClearStrategy::NativeClear => {
                let element = executor.find(self.selector).await?;
                element.click().await?;
                element
                    .call_js_fn("function() { this.value = ''; }", false)
                    .await?;
            }
            ClearStrategy::SelectAllDelete => {
                let element = executor.find(self.selector).await?;
                element.focus().await?;
                executor.eval(select_all_script(self.selector)?).await?;
                element.press_key("Delete").await?;
            }
            ClearStrategy::AssignWithEvents => {
                executor.eval(assign_script(self.selector, "")?).await?;
            }
        }
        Ok(())
    }

    async fn apply_insert(&self, executor: &JsExecutor, strategy: InsertStrategy, text: &str) -> Result<(), SessionError> {
        match strategy {
            InsertStrategy::AssignWithEvents => {
                executor.eval(assign_script(self.selector, text)?).await?;
            }
            InsertStrategy::NativeTyping => {
                let element = executor.find(self.selector).await?;
                element.click().await?;
                element.type_str(text).await?;
            }
        }
        Ok(())
    }
}

/// 直接赋值并派发事件的脚本
pub fn assign_script(selector: &str, value: &str) -> Result<String, serde_json::Error> {
    Ok(format!(
        r#"
        (() => {{
            const el = document.querySelector({});
            if (!el) return false;
            el.focus();
            el.value = {};
            if (el.value === '') el.removeAttribute('value');
            el.dispatchEvent(new Event('input', {{ bubbles: true }}));
            el.dispatchEvent(new Event('change', {{ bubbles: true }}));
            return true;
        }})()
        "#,
        serde_json::to_string(selector)?,
        serde_json::to_string(value)?
    ))
}

fn select_all_script(selector: &str) -> Result<String, serde_json::Error> {
    Ok(format!(
        r#"
        (() => {{
            const el = document.querySelector({});
            if (!el) return false;
            el.focus();
            el.select();
            return true;
        }})()
        "#,
        serde_json::to_string(selector)?
    ))
}

fn preview(text: &str) -> String {
    crate::utils::logging::truncate_text(text.trim(), 60)
}
