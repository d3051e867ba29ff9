use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// 受限环境（如云端容器）下的批次大小
pub const CONSTRAINED_BATCH_SIZE: usize = 50;
/// 默认批次大小
pub const DEFAULT_BATCH_SIZE: usize = 450;
/// 并行会话数的硬上限
pub const MAX_PARALLEL_SESSIONS_CAP: usize = 4;

/// 根据运行环境选择批次大小
pub fn batch_size_for_environment(constrained: bool) -> usize {
    if constrained {
        CONSTRAINED_BATCH_SIZE
    } else {
        DEFAULT_BATCH_SIZE
    }
}

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 每个浏览器会话处理的编码数量
    pub batch_size: usize,
    /// 同时运行的浏览器会话数（1 = 严格顺序）
    pub max_parallel_sessions: usize,
    /// 是否无头运行浏览器（false 仅用于本地调试）
    pub headless: bool,
    /// 浏览器可执行文件路径，None 时自动查找
    pub chrome_executable: Option<PathBuf>,
    /// 下载文件存放目录
    pub download_dir: PathBuf,
    /// 结果文件存放目录
    pub output_dir: PathBuf,
    /// 报表样式覆盖文件（TOML）
    pub report_layout_file: Option<PathBuf>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- 数据源 ---
    pub credentials: Credentials,
    pub portal: PortalConfig,
    pub timings: Timings,
    // --- 合并 ---
    pub merge: MergeConfig,
}

/// 数据源登录凭据
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// 数据源页面地址与选择器
#[derive(Clone, Debug)]
pub struct PortalConfig {
    pub login_url: String,
    /// 登录失败时 URL 中仍包含的片段
    pub login_marker: String,
    pub report_url: String,
    pub username_selector: String,
    pub password_selector: String,
    pub login_button_selector: String,
    pub code_field_selector: String,
    pub generate_button_selector: String,
    /// 导出按钮的候选选择器，按顺序尝试
    pub export_selectors: Vec<String>,
    /// 导出按钮的链接文本
    pub export_link_text: String,
    pub overlay_selector: String,
    /// 每次导出下载的固定文件名
    pub export_file_name: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            login_url: "https://tradewatch.pl/login.jsf".to_string(),
            login_marker: "login.jsf".to_string(),
            report_url: "https://tradewatch.pl/report/ean-price-report.jsf".to_string(),
            username_selector: "input[name='j_username']".to_string(),
            password_selector: "input[name='j_password']".to_string(),
            login_button_selector: "[name='btnLogin']".to_string(),
            code_field_selector: "#eansPhrase".to_string(),
            generate_button_selector: "#j_idt703".to_string(),
            export_selectors: vec![
                "a.icon-excel".to_string(),
                "a[onclick*='j_idt133']".to_string(),
            ],
            export_link_text: "Eksport do XLS".to_string(),
            overlay_selector: ".ui-widget-overlay".to_string(),
            export_file_name: "TradeWatch - raport konkurencji.xlsx".to_string(),
        }
    }
}

/// 各轮询等待的间隔与上限
#[derive(Clone, Debug)]
pub struct Timings {
    /// 提交登录后的等待
    pub login_settle: Duration,
    /// 页面跳转后的等待
    pub page_settle: Duration,
    /// 等待元素出现的上限
    pub element_timeout: Duration,
    /// 每个交互步骤之间的短暂停顿
    pub action_pause: Duration,
    /// 点击生成后的固定等待（数据源没有完成信号）
    pub generation_settle: Duration,
    /// 下载轮询间隔
    pub download_poll: Duration,
    /// 下载等待上限
    pub download_timeout: Duration,
    /// 判断文件大小稳定的间隔
    pub download_settle: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            login_settle: Duration::from_secs(3),
            page_settle: Duration::from_secs(3),
            element_timeout: Duration::from_secs(15),
            action_pause: Duration::from_millis(300),
            generation_settle: Duration::from_secs(8),
            download_poll: Duration::from_secs(2),
            download_timeout: Duration::from_secs(60),
            download_settle: Duration::from_secs(3),
        }
    }
}

/// 合并配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// 采集文件中的编码列名
    pub acquired_code_column: String,
    /// 用户文件中的价格列名
    pub price_column: String,
    /// 用于生成商品链接的编号列（按顺序查找）
    pub link_number_columns: Vec<String>,
    pub link_base_url: String,
    pub product_link_base_url: String,
    /// 输出列顺序，未列出的列会被丢弃
    pub column_order: Vec<String>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            acquired_code_column: "EAN".to_string(),
            price_column: "Price".to_string(),
            link_number_columns: ["Link.1", "Link", "link", "LINK"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            link_base_url: "https://allegro.pl/oferta/".to_string(),
            product_link_base_url: "https://api.qogita.com/variants/link/".to_string(),
            column_order: [
                "Lp",
                "EAN",
                "Price",
                "Price PL",
                "Cena min.",
                "Profit",
                "ROI",
                "Link",
                "Top oferta",
                "Dost. szt.",
                "Ilość aukcji",
                "Transakcje (30 dni)",
                "Product Link",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_parallel_sessions: 1,
            headless: true,
            chrome_executable: None,
            download_dir: PathBuf::from("downloads"),
            output_dir: PathBuf::from("output"),
            report_layout_file: None,
            verbose_logging: false,
            credentials: Credentials {
                username: String::new(),
                password: String::new(),
            },
            portal: PortalConfig::default(),
            timings: Timings::default(),
            merge: MergeConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        let constrained = env_parse("CONSTRAINED_ENV").unwrap_or(false);
        Self {
            batch_size: env_parse("BATCH_SIZE")
                .filter(|n: &usize| *n > 0)
                .unwrap_or_else(|| batch_size_for_environment(constrained)),
            max_parallel_sessions: env_parse("MAX_PARALLEL_SESSIONS")
                .unwrap_or(default.max_parallel_sessions)
                .clamp(1, MAX_PARALLEL_SESSIONS_CAP),
            headless: env_parse("HEADLESS").unwrap_or(default.headless),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().map(PathBuf::from),
            download_dir: std::env::var("DOWNLOAD_DIR").map(PathBuf::from).unwrap_or(default.download_dir),
            output_dir: std::env::var("OUTPUT_DIR").map(PathBuf::from).unwrap_or(default.output_dir),
            report_layout_file: std::env::var("REPORT_LAYOUT_FILE").ok().map(PathBuf::from),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(default.verbose_logging),
            credentials: Credentials {
                username: std::env::var("PORTAL_USERNAME").unwrap_or(default.credentials.username),
                password: std::env::var("PORTAL_PASSWORD").unwrap_or(default.credentials.password),
            },
            portal: default.portal,
            timings: default.timings,
            merge: default.merge,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
