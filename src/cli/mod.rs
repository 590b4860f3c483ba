use crate::config::{Config, LLMProvider};
use crate::i18n::TargetLanguage;
use crate::types::zone::PlanRequest;
use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// 默认配置文件名（位于当前工作目录）
pub const DEFAULT_CONFIG_FILE: &str = "urban.toml";

/// Urban Orchestrator - 由Rust与AI驱动的城市规划编排引擎
#[derive(Parser, Debug)]
#[command(name = "urban-orchestrator")]
#[command(
    about = "Urban-planning orchestration engine. Enriches zones with spatial context, runs external models per zone, builds a GeoJSON map through append-only patches and asks an LLM for a prioritized action plan, streaming progress as JSON lines."
)]
#[command(version)]
pub struct Args {
    /// 规划请求文件（JSON，包含 zones / filters / objectives）
    #[arg(short, long)]
    pub zones: PathBuf,

    /// 结果输出路径，缺省时打印到标准输出
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 追加规划目标，可重复
    #[arg(long = "objective")]
    pub objectives: Vec<String>,

    /// 追加过滤条件（JSON 对象）
    #[arg(long)]
    pub filters: Option<String>,

    /// 是否启用详细日志
    #[arg(short, long)]
    pub verbose: bool,

    /// LLM Provider (openai, anthropic, gemini, ollama)
    #[arg(long)]
    pub llm_provider: Option<String>,

    /// 生成规划摘要的模型
    #[arg(long)]
    pub model: Option<String>,

    /// LLM API基地址
    #[arg(long)]
    pub llm_api_base_url: Option<String>,

    /// LLM API KEY
    #[arg(long)]
    pub llm_api_key: Option<String>,

    /// 最大tokens数
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// 温度参数
    #[arg(long)]
    pub temperature: Option<f64>,

    /// MCP 服务地址
    #[arg(long)]
    pub tools_endpoint: Option<String>,

    /// 空间数据库连接串
    #[arg(long)]
    pub database_url: Option<String>,

    /// 最大循环轮数
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// 摘要目标语言 (es, en, pt, fr, zh)
    #[arg(long)]
    pub target_language: Option<String>,
}

impl Args {
    /// 将CLI参数转换为配置
    pub fn into_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            // 显式指定的配置文件必须可读
            Some(config_path) => Config::from_file(config_path)?,
            None => {
                let default_config_path = std::env::current_dir()
                    .unwrap_or_else(|_| PathBuf::from("."))
                    .join(DEFAULT_CONFIG_FILE);

                if default_config_path.exists() {
                    Config::from_file(&default_config_path)?
                } else {
                    Config::default()
                }
            }
        };

        if let Some(output) = &self.output {
            config.output_path = Some(output.clone());
        }

        // 覆盖LLM配置
        if let Some(provider_str) = &self.llm_provider {
            config.llm.provider = provider_str
                .parse::<LLMProvider>()
                .map_err(anyhow::Error::msg)?;
        }
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
        if let Some(llm_api_base_url) = &self.llm_api_base_url {
            config.llm.api_base_url = llm_api_base_url.clone();
        }
        if let Some(llm_api_key) = &self.llm_api_key {
            config.llm.api_key = llm_api_key.clone();
        }
        if let Some(max_tokens) = self.max_tokens {
            config.llm.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            config.llm.temperature = temperature;
        }

        if let Some(endpoint) = &self.tools_endpoint {
            config.tools.endpoint = endpoint.clone();
        }
        if let Some(database_url) = &self.database_url {
            config.database.url = database_url.clone();
        }
        if let Some(max_iterations) = self.max_iterations {
            config.graph.max_iterations = max_iterations;
        }

        // 目标语言配置
        if let Some(target_language_str) = &self.target_language {
            config.target_language = target_language_str
                .parse::<TargetLanguage>()
                .map_err(anyhow::Error::msg)?;
        }

        config.verbose = config.verbose || self.verbose;

        Ok(config)
    }

    /// 读取规划请求，并合并命令行给出的目标与过滤条件
    pub fn load_request(&self) -> Result<PlanRequest> {
        let mut request = read_request(&self.zones)?;
        request.objectives.extend(self.objectives.iter().cloned());

        if let Some(filters) = &self.filters {
            let extra: Map<String, Value> =
                serde_json::from_str(filters).context("--filters must be a JSON object")?;
            request.filters.extend(extra);
        }

        Ok(request)
    }
}

fn read_request(path: &Path) -> Result<PlanRequest> {
    let content = std::fs::read_to_string(path)
        .context(format!("Failed to read request file: {:?}", path))?;
    serde_json::from_str(&content).context("Failed to parse planning request")
}
