//! 单批次会话流程 - 流程层
//!
//! 核心职责：定义"一个批次"的完整处理流程
//!
//! 流程顺序：
//! 1. 启动全新的浏览器（独立 profile + 独立下载暂存目录）
//! 2. 登录 → 打开查询页 → 确认输入框为空
//! 3. 清空 → 写入编码 → 生成报告
//! 4. 导出 → 等待下载 → 改名
//! 5. 无论成功失败都关闭浏览器并删除临时目录

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::browser::{IsolatedBrowser, LaunchOptions};
use crate::config::{Config, Credentials, PortalConfig, Timings};
use crate::error::{SessionError, SessionFailure};
use crate::infrastructure::JsExecutor;
use crate::models::{normalize_all, AcquiredFile, Batch};
use crate::services::{DownloadWatcher, ExportTrigger, FieldInput, PortalLogin};
use crate::workflow::{SessionCtx, SessionState};

/// 会话所需的配置
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub headless: bool,
    pub chrome_executable: Option<PathBuf>,
    /// 改名后的文件存放目录，暂存目录也建在这里
    pub download_dir: PathBuf,
    pub credentials: Credentials,
    pub portal: PortalConfig,
    pub timings: Timings,
}

impl From<&Config> for SessionConfig {
    fn from(config: &Config) -> Self {
        Self {
            headless: config.headless,
            chrome_executable: config.chrome_executable.clone(),
            download_dir: config.download_dir.clone(),
            credentials: config.credentials.clone(),
            portal: config.portal.clone(),
            timings: config.timings.clone(),
        }
    }
}

/// 单批次会话
///
/// - 每个批次一个实例，`run` 消费自身，保证不会被复用
/// - 持有浏览器的整个生命周期
/// - 失败时报告最后到达的状态
pub struct SessionRunner {
    config: Arc<SessionConfig>,
    batch: Batch,
    ctx: SessionCtx,
    state: SessionState,
}

impl SessionRunner {
    pub fn new(config: Arc<SessionConfig>, batch: Batch, ctx: SessionCtx) -> Self {
        Self {
            config,
            batch,
            ctx,
            state: SessionState::Init,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// 运行整个会话
    pub async fn run(mut self) -> Result<AcquiredFile, SessionFailure> {
        let ctx = self.ctx;
        info!("{} 🚀 启动独立会话 ({} 个编码)", ctx, ctx.code_count);

        let codes = normalize_all(&self.batch.codes);
        if codes.is_empty() {
            return Err(self.fail(SessionError::NoValidCodes));
        }
        if codes.len() < self.batch.len() {
            warn!(
                "{} ⚠️ {} 个编码无法规范化，已忽略",
                ctx,
                self.batch.len() - codes.len()
            );
        }

        let staging = match self.create_staging_dir() {
            Ok(dir) => dir,
            Err(e) => return Err(self.fail(e)),
        };

        let options = LaunchOptions {
            headless: self.config.headless,
            chrome_executable: self.config.chrome_executable.clone(),
            download_dir: staging.path().to_path_buf(),
            label: ctx.batch_index,
        };
        let browser = match IsolatedBrowser::launch(&options).await {
            Ok(browser) => browser,
            Err(e) => return Err(self.fail(e)),
        };

        let result = self.drive(&browser, staging.path(), &codes).await;

        browser.shutdown().await;
        if let Err(e) = staging.close() {
            warn!("{} ⚠️ 无法删除暂存目录: {}", ctx, e);
        }

        match result {
            Ok(file) => {
                self.state = SessionState::Done;
                info!("{} ✅ 会话完成: {}", ctx, file.file_name());
                Ok(file)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn drive(
        &mut self,
        browser: &IsolatedBrowser,
        staging_dir: &Path,
        codes: &[String],
    ) -> Result<AcquiredFile, SessionError> {
        let config = Arc::clone(&self.config);
        let ctx = self.ctx;
        let timings = &config.timings;
        let portal = &config.portal;

        let page = browser.new_page("about:blank").await?;
        let executor = JsExecutor::new(page);

        // ========== 登录 ==========
        PortalLogin::new(portal, &config.credentials, timings)
            .login(&executor)
            .await?;
        self.advance();

        // ========== 查询页 ==========
        executor.goto(&portal.report_url).await?;
        sleep(timings.page_settle).await;
        let field = FieldInput::new(&portal.code_field_selector, timings);
        field.ensure_pristine(&executor).await?;
        self.advance();

        // ========== 清空并写入 ==========
        let cleared = field.clear(&executor).await?;
        debug!("{} 清空方式: {}", ctx, cleared);
        self.advance();

        field.insert(&executor, codes).await?;
        self.advance();

        // ========== 生成报告 ==========
        executor
            .wait_for(&portal.generate_button_selector, timings.element_timeout)
            .await?
            .click()
            .await?;
        self.advance();
        info!("{} ⏳ 等待报告生成...", ctx);
        sleep(timings.generation_settle).await;
        self.advance();

        // ========== 导出并下载 ==========
        let watcher = DownloadWatcher::new(staging_dir, &portal.export_file_name, timings);
        watcher.prepare().await?;
        ExportTrigger::new(portal, timings).trigger(&executor).await?;
        self.advance();

        let (downloaded, byte_size) = watcher.wait().await?;
        self.advance();

        let renamed = watcher
            .rename_for_batch(&downloaded, &config.download_dir, ctx.batch_index)
            .await?;
        self.advance();

        Ok(AcquiredFile::new(ctx.batch_index, renamed, byte_size))
    }

    fn create_staging_dir(&self) -> Result<tempfile::TempDir, SessionError> {
        let root = &self.config.download_dir;
        std::fs::create_dir_all(root).map_err(|e| SessionError::io(root, e))?;
        tempfile::Builder::new()
            .prefix(&format!("session_{:03}_", self.ctx.batch_index))
            .tempdir_in(root)
            .map_err(|e| SessionError::io(root, e))
    }

    fn advance(&mut self) {
        self.state = self.state.next();
        debug!("{} → {}", self.ctx, self.state);
    }

    fn fail(&mut self, error: SessionError) -> SessionFailure {
        let reached = self.state;
        self.state = SessionState::Failed;
        error!(
            "{} ❌ 会话在「{}」之后失败: {}",
            self.ctx, reached, error
        );
        SessionFailure {
            batch_index: self.ctx.batch_index,
            state: reached,
            error,
        }
    }
}
