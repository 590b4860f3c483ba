#[cfg(test)]
mod tests {
    use crate::config::{Config, GraphConfig, LLMConfig, LLMProvider, RetryPolicy, ToolsConfig};
    use crate::i18n::TargetLanguage;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert!(config.output_path.is_none());
        assert_eq!(config.target_language, TargetLanguage::Spanish);
        assert!(!config.verbose);
    }

    #[test]
    fn test_llm_provider_default() {
        let provider = LLMProvider::default();
        assert_eq!(provider, LLMProvider::Gemini);
    }

    #[test]
    fn test_llm_provider_from_str() {
        assert_eq!(
            "openai".parse::<LLMProvider>().unwrap(),
            LLMProvider::OpenAI
        );
        assert_eq!(
            "Anthropic".parse::<LLMProvider>().unwrap(),
            LLMProvider::Anthropic
        );
        assert_eq!(
            "gemini".parse::<LLMProvider>().unwrap(),
            LLMProvider::Gemini
        );
        assert_eq!(
            "ollama".parse::<LLMProvider>().unwrap(),
            LLMProvider::Ollama
        );

        assert!("invalid".parse::<LLMProvider>().is_err());
    }

    #[test]
    fn test_llm_provider_display() {
        assert_eq!(LLMProvider::OpenAI.to_string(), "openai");
        assert_eq!(LLMProvider::Anthropic.to_string(), "anthropic");
        assert_eq!(LLMProvider::Gemini.to_string(), "gemini");
        assert_eq!(LLMProvider::Ollama.to_string(), "ollama");
    }

    #[test]
    fn test_llm_config_default() {
        let config = LLMConfig::default();

        assert_eq!(config.provider, LLMProvider::Gemini);
        // api_key may be empty if env var is not set
        assert!(!config.model.is_empty());
        assert_eq!(config.retry_attempts, 1);
        assert_eq!(config.retry_delay_ms, 2000);
        assert_eq!(config.timeout_seconds, 60);
    }

    #[test]
    fn test_tools_config_default() {
        let config = ToolsConfig::default();

        assert_eq!(config.infrastructure_tool, "City Infrastructure Model");
        assert_eq!(config.inequality_tool, "Population Inequality Model");
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_graph_config_default_retry_policies() {
        let config = GraphConfig::default();

        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.construction_square_meters, 80.0);
        assert_eq!(config.prioritized_actions, 5);
        assert_eq!(config.fetch_data, RetryPolicy::new(3, 200));
        assert_eq!(config.preprocess, RetryPolicy::new(2, 100));
        assert_eq!(config.run_models, RetryPolicy::new(3, 200));
        assert_eq!(config.analyze_results, RetryPolicy::new(2, 100));
        assert_eq!(config.finalize, RetryPolicy::new(1, 0));
        assert_eq!(config.run_models.backoff(), Duration::from_millis(200));
    }

    #[test]
    fn test_from_file_partial_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("urban.toml");
        fs::write(
            &config_path,
            r#"
target_language = "en"

[llm]
provider = "openai"
model = "gpt-4o-mini"

[tools]
endpoint = "http://mcp.internal:9000/mcp"
timeout_seconds = 5

[graph]
max_iterations = 1
run_models = { max_attempts = 5, backoff_ms = 50 }
"#,
        )
        .unwrap();

        let config = Config::from_file(&config_path).unwrap();

        assert_eq!(config.target_language, TargetLanguage::English);
        assert_eq!(config.llm.provider, LLMProvider::OpenAI);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.retry_attempts, 1);
        assert_eq!(config.tools.endpoint, "http://mcp.internal:9000/mcp");
        assert_eq!(config.tools.timeout_seconds, 5);
        assert_eq!(config.tools.inequality_tool, "Population Inequality Model");
        assert_eq!(config.graph.max_iterations, 1);
        assert_eq!(config.graph.run_models, RetryPolicy::new(5, 50));
        assert_eq!(config.graph.fetch_data, RetryPolicy::new(3, 200));
    }

    #[test]
    fn test_from_file_missing() {
        let temp_dir = TempDir::new().unwrap();
        let result = Config::from_file(&temp_dir.path().join("missing.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("urban.toml");
        fs::write(&config_path, "[graph\nmax_iterations = ").unwrap();

        assert!(Config::from_file(&config_path).is_err());
    }
}
