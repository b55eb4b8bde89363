//! CLI configuration loader for rlm
//!
//! Implements single-source priority loading with flag overrides:
//! 1. --config file/dir (highest priority)
//! 2. Current working directory: ./rlm.json or ./.rlm/config.json
//! 3. Git repository root: <repo_root>/.rlm/config.json
//! 4. User config directory: <config_dir>/rlm/config.json
//! 5. Environment variables only (no files)

use anyhow::{anyhow, Context, Result};
use rlm_core::{ModelParams, Protocol, ResolvedLlmConfig, SubAgentConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Raw configuration file format (simple single-file schema)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawConfig {
    /// Protocol to use
    pub protocol: String,
    /// API key (can be "env:VAR_NAME" for environment variable)
    pub api_key: String,
    /// Base URL (optional, uses protocol default if not specified)
    pub base_url: Option<String>,
    /// Model name
    pub model: String,
    /// Model for the REPL sub-agent (optional, defaults to `model`)
    #[serde(default)]
    pub sub_model: Option<String>,
    /// Model parameters (optional)
    #[serde(default)]
    pub params: ModelParams,
    /// Additional headers (optional)
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Sub-agent limits (optional)
    #[serde(default)]
    pub sub_agent: SubAgentConfig,
}

/// Everything the commands need from configuration
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub llm: ResolvedLlmConfig,
    /// Set only when the sub-agent uses a different model
    pub sub_llm: Option<ResolvedLlmConfig>,
    pub sub_agent: SubAgentConfig,
}

/// One provider the environment-only mode can pick up
struct EnvProvider {
    protocol: &'static str,
    key_vars: &'static [&'static str],
    base_url_var: &'static str,
    model_var: &'static str,
    default_model: &'static str,
}

static ENV_PROVIDERS: [EnvProvider; 4] = [
    EnvProvider {
        protocol: "openai",
        key_vars: &["OPENAI_API_KEY"],
        base_url_var: "OPENAI_BASE_URL",
        model_var: "OPENAI_MODEL",
        default_model: "gpt-4o",
    },
    EnvProvider {
        protocol: "anthropic",
        key_vars: &["ANTHROPIC_API_KEY"],
        base_url_var: "ANTHROPIC_BASE_URL",
        model_var: "ANTHROPIC_MODEL",
        default_model: "claude-3-5-sonnet-20241022",
    },
    EnvProvider {
        protocol: "google_ai",
        key_vars: &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
        base_url_var: "GOOGLE_BASE_URL",
        model_var: "GEMINI_MODEL",
        default_model: "gemini-2.0-flash",
    },
    EnvProvider {
        protocol: "azure_openai",
        key_vars: &["AZURE_OPENAI_API_KEY"],
        base_url_var: "AZURE_OPENAI_BASE_URL",
        model_var: "AZURE_OPENAI_MODEL",
        default_model: "gpt-4o",
    },
];

/// CLI configuration loader
#[derive(Default)]
pub struct CliConfigLoader {
    /// Override config file/directory path
    config_override: Option<PathBuf>,
    /// Flag overrides
    protocol_override: Option<String>,
    api_key_override: Option<String>,
    base_url_override: Option<String>,
    model_override: Option<String>,
    sub_model_override: Option<String>,
}

impl CliConfigLoader {
    /// Create a new loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Set config file/directory override
    pub fn with_config_override(mut self, path: PathBuf) -> Self {
        self.config_override = Some(path);
        self
    }

    /// Set protocol override
    pub fn with_protocol_override(mut self, protocol: String) -> Self {
        self.protocol_override = Some(protocol);
        self
    }

    /// Set API key override
    pub fn with_api_key_override(mut self, api_key: String) -> Self {
        self.api_key_override = Some(api_key);
        self
    }

    /// Set base URL override
    pub fn with_base_url_override(mut self, base_url: String) -> Self {
        self.base_url_override = Some(base_url);
        self
    }

    /// Set model override
    pub fn with_model_override(mut self, model: String) -> Self {
        self.model_override = Some(model);
        self
    }

    /// Set sub-agent model override
    pub fn with_sub_model_override(mut self, model: String) -> Self {
        self.sub_model_override = Some(model);
        self
    }

    /// Load and resolve configuration
    pub async fn load(&self) -> Result<LoadedConfig> {
        // Step 1: Find and load base configuration
        let mut config = if let Some(override_path) = &self.config_override {
            let expanded = shellexpand::tilde(&override_path.to_string_lossy()).into_owned();
            self.load_from_path(Path::new(&expanded))
                .await
                .with_context(|| {
                    format!(
                        "Failed to load config from override path: {}",
                        override_path.display()
                    )
                })?
        } else {
            self.search_and_load().await?
        };

        // Step 2: Apply flag overrides
        if let Some(protocol) = &self.protocol_override {
            config.protocol = protocol.clone();
        }
        if let Some(api_key) = &self.api_key_override {
            config.api_key = api_key.clone();
        }
        if let Some(base_url) = &self.base_url_override {
            config.base_url = Some(base_url.clone());
        }
        if let Some(model) = &self.model_override {
            config.model = model.clone();
        }
        if let Some(sub_model) = &self.sub_model_override {
            config.sub_model = Some(sub_model.clone());
        }
        if config.sub_model.is_none() {
            config.sub_model = std::env::var("RLM_SUB_MODEL").ok();
        }

        // Step 3: Resolve to final configuration
        self.resolve_config(config)
    }

    /// Search for config in priority order
    async fn search_and_load(&self) -> Result<RawConfig> {
        let cwd = std::env::current_dir()?;
        let mut candidates = vec![cwd.join("rlm.json"), cwd.join(".rlm").join("config.json")];
        if let Some(git_root) = find_git_root(&cwd) {
            candidates.push(git_root.join(".rlm").join("config.json"));
        }
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join("rlm").join("config.json"));
        }

        for candidate in candidates {
            if candidate.is_file() {
                tracing::debug!(path = %candidate.display(), "Using config file");
                return self.load_file(&candidate).await;
            }
        }

        self.try_load_env_only()
    }

    /// Build a configuration from environment variables only
    fn try_load_env_only(&self) -> Result<RawConfig> {
        let available: Vec<(&EnvProvider, String)> = ENV_PROVIDERS
            .iter()
            .filter_map(|provider| {
                provider
                    .key_vars
                    .iter()
                    .find_map(|var| std::env::var(var).ok())
                    .map(|key| (provider, key))
            })
            .collect();
        let available_names = available
            .iter()
            .map(|(provider, _)| provider.protocol)
            .collect::<Vec<_>>()
            .join(", ");

        let env_protocol = std::env::var("RLM_PROTOCOL").ok();
        let preference = self.protocol_override.as_ref().or(env_protocol.as_ref());

        let (provider, api_key) = match preference {
            Some(preferred) => {
                let wanted = Protocol::parse(preferred);
                available
                    .into_iter()
                    .find(|(provider, _)| Protocol::parse(provider.protocol) == wanted)
                    .ok_or_else(|| {
                        anyhow!(
                            "Protocol '{}' specified but no corresponding API key found. Available keys: {}",
                            preferred,
                            available_names
                        )
                    })?
            }
            None => {
                let mut available = available.into_iter();
                match (available.next(), available.next()) {
                    (None, _) => return Err(anyhow!(
                        "No configuration found. Please create an rlm.json file or set environment variables like GEMINI_API_KEY"
                    )),
                    (Some(only), None) => only,
                    (Some(_), Some(_)) => return Err(anyhow!(
                        "Multiple API keys detected: {}. Please specify which protocol to use with RLM_PROTOCOL or --protocol",
                        available_names
                    )),
                }
            }
        };

        // Model priority: protocol-specific env > generic env > default
        let model = std::env::var(provider.model_var)
            .or_else(|_| std::env::var("RLM_MODEL"))
            .unwrap_or_else(|_| provider.default_model.to_string());
        let base_url = std::env::var(provider.base_url_var)
            .or_else(|_| std::env::var("RLM_BASE_URL"))
            .ok();

        Ok(RawConfig {
            protocol: provider.protocol.to_string(),
            api_key,
            base_url,
            model,
            sub_model: None,
            params: ModelParams::default(),
            headers: HashMap::new(),
            sub_agent: SubAgentConfig::default(),
        })
    }

    /// Load configuration from a specific path (file or directory)
    async fn load_from_path(&self, path: &Path) -> Result<RawConfig> {
        if path.is_file() {
            self.load_file(path).await
        } else if path.is_dir() {
            let config_file = path.join("config.json");
            if config_file.exists() {
                self.load_file(&config_file).await
            } else {
                Err(anyhow!(
                    "No config.json found in directory: {}",
                    path.display()
                ))
            }
        } else {
            Err(anyhow!("Config path does not exist: {}", path.display()))
        }
    }

    /// Load a single config file
    async fn load_file(&self, path: &Path) -> Result<RawConfig> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Resolve raw config to the LLM configurations and sub-agent limits
    fn resolve_config(&self, config: RawConfig) -> Result<LoadedConfig> {
        let protocol = Protocol::parse(&config.protocol);

        // Resolve API key (handle env: prefix)
        let api_key = match config.api_key.strip_prefix("env:") {
            Some(var_name) => std::env::var(var_name)
                .with_context(|| format!("Environment variable not found: {}", var_name))?,
            None => config.api_key,
        };

        let base_url = match config.base_url {
            Some(url) => url,
            None => protocol
                .default_base_url()
                .ok_or_else(|| {
                    anyhow!(
                        "Protocol '{}' has no default endpoint; set base_url",
                        protocol.as_str()
                    )
                })?
                .to_string(),
        };

        let llm = ResolvedLlmConfig::new(protocol, base_url, api_key, config.model)
            .with_params(config.params)
            .with_headers(config.headers);

        llm.validate()
            .map_err(|e| anyhow!("Configuration validation failed: {}", e))?;

        let sub_llm = config
            .sub_model
            .filter(|sub_model| !sub_model.is_empty() && *sub_model != llm.model)
            .map(|sub_model| llm.clone().with_model(sub_model));

        Ok(LoadedConfig {
            llm,
            sub_llm,
            sub_agent: config.sub_agent,
        })
    }
}

/// Walk up from `start` to the first directory holding `.git`
fn find_git_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("rlm.json");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[tokio::test]
    async fn test_file_with_sub_agent_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"{
                "protocol": "google_ai",
                "api_key": "secret",
                "model": "gemini-2.0-flash",
                "sub_model": "gemini-2.0-flash-lite",
                "sub_agent": {"max_depth": 2, "max_turns": 5}
            }"#,
        );

        let loaded = CliConfigLoader::new()
            .with_config_override(path)
            .load()
            .await
            .unwrap();

        assert_eq!(loaded.llm.protocol, Protocol::GoogleAI);
        assert_eq!(
            loaded.llm.base_url,
            "https://generativelanguage.googleapis.com/v1beta"
        );
        assert_eq!(loaded.sub_llm.unwrap().model, "gemini-2.0-flash-lite");
        assert_eq!(loaded.sub_agent.max_depth, 2);
        assert_eq!(loaded.sub_agent.max_turns, 5);
        assert_eq!(loaded.sub_agent.max_output_chars, 16000);
    }

    #[tokio::test]
    async fn test_flags_override_the_file() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            dir.path(),
            r#"{"protocol": "openai", "api_key": "k", "model": "gpt-4o"}"#,
        );

        let loaded = CliConfigLoader::new()
            .with_config_override(dir.path().join("rlm.json"))
            .with_model_override("gpt-4o-mini".to_string())
            .with_base_url_override("http://localhost:8080/v1".to_string())
            .with_sub_model_override("gpt-4o-mini".to_string())
            .load()
            .await
            .unwrap();

        assert_eq!(loaded.llm.protocol, Protocol::OpenAICompat);
        assert_eq!(loaded.llm.model, "gpt-4o-mini");
        assert_eq!(loaded.llm.base_url, "http://localhost:8080/v1");
        // same model as the outer agent, so no separate config
        assert!(loaded.sub_llm.is_none());
    }

    #[tokio::test]
    async fn test_api_key_from_environment_reference() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("RLM_LOADER_TEST_KEY", "from-env");
        let path = write_config(
            dir.path(),
            r#"{"protocol": "anthropic", "api_key": "env:RLM_LOADER_TEST_KEY", "model": "claude"}"#,
        );

        let loaded = CliConfigLoader::new()
            .with_config_override(path)
            .load()
            .await
            .unwrap();
        assert_eq!(loaded.llm.api_key, "from-env");
    }

    #[tokio::test]
    async fn test_directory_override_reads_config_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"protocol": "openai", "api_key": "k", "model": "m"}"#,
        )
        .unwrap();

        let loaded = CliConfigLoader::new()
            .with_config_override(dir.path().to_path_buf())
            .load()
            .await
            .unwrap();
        assert_eq!(loaded.llm.model, "m");
    }

    #[tokio::test]
    async fn test_azure_requires_base_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"{"protocol": "azure_openai", "api_key": "k", "model": "deployment"}"#,
        );

        let err = CliConfigLoader::new()
            .with_config_override(path)
            .load()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }

    #[tokio::test]
    async fn test_missing_override_path_fails() {
        let err = CliConfigLoader::new()
            .with_config_override(PathBuf::from("/definitely/not/here.json"))
            .load()
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("does not exist"));
    }

    #[test]
    fn test_git_root_is_found_from_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_git_root(&nested).as_deref(), Some(dir.path()));
    }
}
