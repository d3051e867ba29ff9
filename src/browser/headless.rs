use std::path::{Path, PathBuf};

use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::error::SessionError;

/// 启动参数
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub chrome_executable: Option<PathBuf>,
    /// 下载文件存放的目录（每个会话独立）
    pub download_dir: PathBuf,
    /// 日志中显示的批次编号
    pub label: usize,
}

/// 一个完全隔离的浏览器实例
///
/// 持有：
/// - 独立的临时用户目录（会话结束时删除）
/// - 浏览器进程与事件处理任务
///
/// 必须调用 `shutdown()` 关闭；遗漏时 Drop 会中止事件任务并删除临时目录
pub struct IsolatedBrowser {
    browser: Browser,
    handler_task: JoinHandle<()>,
    profile_dir: Option<TempDir>,
    label: usize,
}

impl IsolatedBrowser {
    /// 启动新的浏览器（全新用户目录，禁用缓存）
    pub async fn launch(options: &LaunchOptions) -> Result<Self, SessionError> {
        info!("[批次 {}] 🚀 启动全新浏览器会话...", options.label);

        let profile_dir = tempfile::Builder::new()
            .prefix(&format!("ean-profile-{}-", options.label))
            .tempdir()
            .map_err(|e| SessionError::io(std::env::temp_dir(), e))?;
        debug!("[批次 {}] 用户目录: {}", options.label, profile_dir.path().display());

        let config = build_config(options, profile_dir.path())?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
            error!("[批次 {}] 启动浏览器失败: {}", options.label, e);
            SessionError::Launch(e.to_string())
        })?;

        // 在后台处理浏览器事件
        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        let isolated = Self {
            browser,
            handler_task,
            profile_dir: Some(profile_dir),
            label: options.label,
        };

        // 等待浏览器状态同步
        sleep(tokio::time::Duration::from_millis(300)).await;

        isolated.allow_downloads(&options.download_dir).await?;
        Ok(isolated)
    }

    /// 打开新页面
    pub async fn new_page(&self, url: &str) -> Result<Page, SessionError> {
        let page = self.browser.new_page(url).await.map_err(|e| {
            error!("[批次 {}] 创建页面失败: {}", self.label, e);
            e
        })?;
        debug!("[批次 {}] 页面已打开: {}", self.label, url);
        Ok(page)
    }

    /// 把下载重定向到会话自己的目录
    async fn allow_downloads(&self, download_dir: &Path) -> Result<(), SessionError> {
        let absolute = std::path::absolute(download_dir)
            .map_err(|e| SessionError::io(download_dir, e))?;
        let params = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::Allow)
            .download_path(absolute.to_string_lossy().to_string())
            .build()
            .map_err(SessionError::Launch)?;
        self.browser.execute(params).await?;
        debug!("[批次 {}] 下载目录: {}", self.label, absolute.display());
        Ok(())
    }

    /// 关闭浏览器并清理临时目录
    pub async fn shutdown(mut self) {
        info!("[批次 {}] 🔒 关闭浏览器会话", self.label);
        if let Err(e) = self.browser.close().await {
            warn!("[批次 {}] 关闭浏览器失败: {}", self.label, e);
        }
        if let Err(e) = self.browser.wait().await {
            debug!("[批次 {}] 等待浏览器进程退出失败: {}", self.label, e);
        }
        self.handler_task.abort();
        if let Some(dir) = self.profile_dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!("[批次 {}] 删除临时目录 {} 失败: {}", self.label, path.display(), e);
            }
        }
    }
}

impl Drop for IsolatedBrowser {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

fn build_config(options: &LaunchOptions, profile_dir: &Path) -> Result<BrowserConfig, SessionError> {
    let mut builder = BrowserConfig::builder()
        .user_data_dir(profile_dir)
        .window_size(1920, 1080)
        .args(vec![
            "--no-sandbox",             // 禁用沙盒，防止容器内权限问题导致的崩溃
            "--disable-dev-shm-usage",  // 防止共享内存不足
            "--disable-gpu",
            "--disable-extensions",
            "--disable-application-cache",
            "--disable-background-networking",
            "--disable-sync",
            "--disable-default-apps",
            "--no-first-run",
            "--disable-features=TranslateUI",
        ]);

    builder = if options.headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };

    if let Some(executable) = &options.chrome_executable {
        builder = builder.chrome_executable(executable);
    }

    builder.build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        SessionError::Launch(e)
    })
}
