use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::i18n::TargetLanguage;

/// LLM Provider类型
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum LLMProvider {
    #[serde(rename = "openai")]
    OpenAI,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "gemini")]
    #[default]
    Gemini,
    #[serde(rename = "ollama")]
    Ollama,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::Gemini => write!(f, "gemini"),
            LLMProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LLMProvider::OpenAI),
            "anthropic" => Ok(LLMProvider::Anthropic),
            "gemini" => Ok(LLMProvider::Gemini),
            "ollama" => Ok(LLMProvider::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// 应用程序配置
///
/// 进程启动时构建一次，之后显式传入编排引擎。
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    /// 结果输出路径，缺省时打印到标准输出
    pub output_path: Option<PathBuf>,

    /// 规划摘要使用的语言
    pub target_language: TargetLanguage,

    /// LLM模型配置
    pub llm: LLMConfig,

    /// 外部模型工具配置
    pub tools: ToolsConfig,

    /// 空间数据库配置
    pub database: DatabaseConfig,

    /// 编排图配置
    pub graph: GraphConfig,

    /// 是否启用详细日志
    pub verbose: bool,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    /// LLM Provider类型
    pub provider: LLMProvider,

    /// LLM API KEY
    pub api_key: String,

    /// LLM API基地址（openai 兼容服务使用）
    pub api_base_url: String,

    /// 用于生成规划摘要的模型
    pub model: String,

    /// 最大tokens
    pub max_tokens: u32,

    /// 温度
    pub temperature: f64,

    /// 单次模型调用的尝试次数，步骤级重试由 `[graph]` 配置
    pub retry_attempts: u32,

    /// 重试间隔（毫秒）
    pub retry_delay_ms: u64,

    /// 超时时间（秒）
    pub timeout_seconds: u64,
}

/// 外部模型工具（MCP）配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ToolsConfig {
    /// MCP 服务地址
    pub endpoint: String,

    /// 城市基础设施模型的工具名
    pub infrastructure_tool: String,

    /// 人口不平等模型的工具名
    pub inequality_tool: String,

    /// 单次工具调用超时（秒）
    pub timeout_seconds: u64,
}

/// 空间数据库配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Postgres 连接串
    pub url: String,

    /// 连接池上限
    pub max_connections: u32,

    /// 获取连接超时（秒）
    pub acquire_timeout_seconds: u64,
}

/// 单个节点的重试策略
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// 最大尝试次数（含首次），至少为 1
    pub max_attempts: u32,

    /// 两次尝试之间的等待（毫秒）
    pub backoff_ms: u64,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, backoff_ms: u64) -> Self {
        Self {
            max_attempts,
            backoff_ms,
        }
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// 编排图配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct GraphConfig {
    /// 决策节点允许的最大循环轮数
    pub max_iterations: u32,

    /// 不平等模型给出建设点位时，生成正方形的半边长（米）
    pub construction_square_meters: f64,

    /// 摘要中要求的优先行动数量
    pub prioritized_actions: u32,

    pub fetch_data: RetryPolicy,
    pub preprocess: RetryPolicy,
    pub run_models: RetryPolicy,
    pub analyze_results: RetryPolicy,
    pub finalize: RetryPolicy,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}

impl ToolsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_path: None,
            target_language: TargetLanguage::default(),
            llm: LLMConfig::default(),
            tools: ToolsConfig::default(),
            database: DatabaseConfig::default(),
            graph: GraphConfig::default(),
            verbose: false,
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::default(),
            api_key: std::env::var("URBAN_LLM_API_KEY").unwrap_or_default(),
            api_base_url: String::from("https://api.openai.com/v1"),
            model: String::from("gemini-2.0-flash"),
            max_tokens: 2048,
            temperature: 0.2,
            retry_attempts: 1,
            retry_delay_ms: 2000,
            timeout_seconds: 60,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            endpoint: std::env::var("MCP_HOST")
                .unwrap_or_else(|_| String::from("http://localhost:8000/mcp")),
            infrastructure_tool: String::from("City Infrastructure Model"),
            inequality_tool: String::from("Population Inequality Model"),
            timeout_seconds: 30,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| String::from("postgres://localhost/urban")),
            max_connections: 5,
            acquire_timeout_seconds: 10,
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            construction_square_meters: 80.0,
            prioritized_actions: 5,
            fetch_data: RetryPolicy::new(3, 200),
            preprocess: RetryPolicy::new(2, 100),
            run_models: RetryPolicy::new(3, 200),
            analyze_results: RetryPolicy::new(2, 100),
            finalize: RetryPolicy::new(1, 0),
        }
    }
}

// Include tests
#[cfg(test)]
mod tests;
