//! 登录服务 - 业务能力层
//!
//! 只负责"用固定表单登录"能力

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{Credentials, PortalConfig, Timings};
use crate::error::SessionError;
use crate::infrastructure::JsExecutor;

/// 登录服务
pub struct PortalLogin<'a> {
    portal: &'a PortalConfig,
    credentials: &'a Credentials,
    timings: &'a Timings,
}

impl<'a> PortalLogin<'a> {
    pub fn new(portal: &'a PortalConfig, credentials: &'a Credentials, timings: &'a Timings) -> Self {
        Self {
            portal,
            credentials,
            timings,
        }
    }

    /// 打开登录页、填写凭据并提交
    ///
    /// 提交后若 URL 仍指向登录页，视为登录失败
    pub async fn login(&self, executor: &JsExecutor) -> Result<(), SessionError> {
        if self.credentials.username.is_empty() || self.credentials.password.is_empty() {
            warn!("⚠️ 登录凭据为空，登录很可能失败");
        }

        executor.goto(&self.portal.login_url).await?;

        let username = executor
            .wait_for(&self.portal.username_selector, self.timings.element_timeout)
            .await?;
        username.click().await?;
        username.type_str(&self.credentials.username).await?;

        let password = executor.find(&self.portal.password_selector).await?;
        password.click().await?;
        password.type_str(&self.credentials.password).await?;

        executor
            .find(&self.portal.login_button_selector)
            .await?
            .click()
            .await?;
        debug!("登录表单已提交");

        sleep(self.timings.login_settle).await;

        let url = executor.current_url().await?;
        if is_login_page(&url, &self.portal.login_marker) {
            return Err(SessionError::LoginRejected { url });
        }

        info!("✓ 登录成功");
        Ok(())
    }
}

/// URL 是否仍是登录页
pub fn is_login_page(url: &str, marker: &str) -> bool {
    url.is_empty() || url.contains(marker)
}
