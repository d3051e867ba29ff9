use std::sync::Arc;

use ean_report::browser::{IsolatedBrowser, LaunchOptions};
use ean_report::config::Config;
use ean_report::infrastructure::JsExecutor;
use ean_report::models::Batch;
use ean_report::services::{FieldInput, PortalLogin};
use ean_report::utils::logging;
use ean_report::workflow::{SessionConfig, SessionCtx, SessionRunner};

#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_launch_isolated_browser() {
    // 初始化日志
    logging::init(true);

    let config = Config::from_env();
    let downloads = tempfile::tempdir().expect("创建下载目录失败");
    let options = LaunchOptions {
        headless: config.headless,
        chrome_executable: config.chrome_executable.clone(),
        download_dir: downloads.path().to_path_buf(),
        label: 1,
    };

    let browser = IsolatedBrowser::launch(&options).await.expect("启动浏览器失败");
    let page = browser.new_page("about:blank").await.expect("打开页面失败");
    let executor = JsExecutor::new(page);

    let value: i64 = executor.eval_as("1 + 1").await.expect("执行 JS 失败");
    assert_eq!(value, 2);

    browser.shutdown().await;
}

#[tokio::test]
#[ignore]
async fn test_login_and_field_is_pristine() {
    logging::init(true);

    // 需要 PORTAL_USERNAME / PORTAL_PASSWORD
    let config = Config::from_env();
    let downloads = tempfile::tempdir().expect("创建下载目录失败");
    let options = LaunchOptions {
        headless: config.headless,
        chrome_executable: config.chrome_executable.clone(),
        download_dir: downloads.path().to_path_buf(),
        label: 1,
    };

    let browser = IsolatedBrowser::launch(&options).await.expect("启动浏览器失败");
    let executor = JsExecutor::new(browser.new_page("about:blank").await.expect("打开页面失败"));

    PortalLogin::new(&config.portal, &config.credentials, &config.timings)
        .login(&executor)
        .await
        .expect("登录失败");

    executor.goto(&config.portal.report_url).await.expect("打开查询页失败");
    FieldInput::new(&config.portal.code_field_selector, &config.timings)
        .ensure_pristine(&executor)
        .await
        .expect("输入框应当为空");

    browser.shutdown().await;
}

#[tokio::test]
#[ignore]
async fn test_single_batch_session() {
    logging::init(true);

    let mut config = Config::from_env();
    let downloads = tempfile::tempdir().expect("创建下载目录失败");
    config.download_dir = downloads.path().to_path_buf();

    let batch = Batch::new(1, vec!["5901234123457".to_string(), "4006381333931".to_string()]);
    let ctx = SessionCtx::new(1, 1, batch.len());
    let runner = SessionRunner::new(Arc::new(SessionConfig::from(&config)), batch, ctx);

    let file = runner.run().await.expect("会话失败");
    assert!(file.exists());
    assert!(file.file_name().starts_with("report_batch_001_"));
}
