//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `REEL__*` 覆盖（双下划线表示嵌套，如 `REEL__ENGINE__MAX_CASCADE_DEPTH=4`）。

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub llm: LlmSection,
}

/// [app] 段：应用名、快照文件、固定参考日期
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
    /// 项目快照 JSON；未设置时加载内置演示项目且不落盘
    pub snapshot_path: Option<PathBuf>,
    /// 相对日期的参考日；未设置时取本地今天
    pub reference_date: Option<NaiveDate>,
}

/// [engine] 段：冲突检查与 what-if 推演
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    /// 是否附加日历与硬截止提示（只产生 warning/info，不阻断移动）
    #[serde(default = "default_calendar_advisories")]
    pub calendar_advisories: bool,
    #[serde(default = "default_max_cascade_depth")]
    pub max_cascade_depth: usize,
}

fn default_calendar_advisories() -> bool {
    true
}

fn default_max_cascade_depth() -> usize {
    8
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            calendar_advisories: default_calendar_advisories(),
            max_cascade_depth: default_max_cascade_depth(),
        }
    }
}

/// [llm] 段：自由文本指令的可选解析后端
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 关闭时只用模式匹配解析指令
    #[serde(default)]
    pub enabled: bool,
    /// 后端：deepseek / openai / mock
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

fn default_provider() -> String {
    "deepseek".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    /// 单次请求超时（秒）
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

fn default_request_timeout() -> u64 {
    20
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 REEL__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 REEL__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("REEL")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
