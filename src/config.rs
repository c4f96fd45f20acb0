use std::env;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

use crate::analysis::AnalysisSettings;
use crate::pipeline::PipelineSettings;
use crate::preprocessing::PreprocessSettings;

const DEFAULT_INPUT_DIR: &str = "input/papers";
const DEFAULT_OUTPUT_DIR: &str = "output/results";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_MODEL: &str = "gpt-4";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// Input or output directory could not be created.
    #[error("Failed to create directory {}: {source}", .path.display())]
    Directory {
        /// Directory we attempted to create.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
}

/// Runtime configuration for the paper digest pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory scanned for PDF papers.
    pub input_dir: PathBuf,
    /// Directory receiving JSON and text reports.
    pub output_dir: PathBuf,
    /// Backend used for the analysis step.
    pub analysis_provider: AnalysisProvider,
    /// API key for the OpenAI provider.
    pub openai_api_key: Option<String>,
    /// Base URL of the OpenAI-compatible API.
    pub openai_base_url: String,
    /// Base URL of the Ollama runtime.
    pub ollama_url: String,
    /// Model identifier passed to the provider.
    pub llm_model: String,
    /// Sampling temperature for completions.
    pub temperature: f32,
    /// Maximum tokens requested for each completion.
    pub max_tokens: u32,
    /// Attempts per completion before giving up.
    pub max_retries: u32,
    /// Pause between completion retries.
    pub retry_delay_secs: u64,
    /// Token budget for a single prompt.
    pub prompt_token_budget: usize,
    /// Approximate token budget of a single chunk.
    pub chunk_size_tokens: usize,
    /// Characters assumed per token when estimating chunk sizes.
    pub chars_per_token: usize,
    /// Characters shared between consecutive slices of an oversized section.
    pub chunk_overlap_chars: usize,
    /// Pause between papers in batch mode.
    pub paper_delay_secs: u64,
    /// Pause between chunk completions of one paper.
    pub chunk_delay_secs: u64,
    /// Skip papers whose JSON result already exists.
    pub skip_processed: bool,
    /// Write a human-readable `.txt` report next to each JSON result.
    pub write_text_reports: bool,
}

/// Supported backends for the analysis step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnalysisProvider {
    /// Hosted OpenAI chat completions.
    OpenAI,
    /// Local Ollama runtime.
    Ollama,
    /// No model; analyses are built extractively from the paper text.
    None,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let analysis_provider = match get("ANALYSIS_PROVIDER") {
            Some(value) => value
                .parse()
                .map_err(|()| ConfigError::InvalidValue("ANALYSIS_PROVIDER".into()))?,
            None => AnalysisProvider::OpenAI,
        };

        let config = Self {
            input_dir: get("PAPERS_INPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT_DIR)),
            output_dir: get("RESULTS_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            analysis_provider,
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            ollama_url: get("OLLAMA_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            llm_model: get("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: parse_or(&get, "TEMPERATURE", 0.2)?,
            max_tokens: parse_or(&get, "MAX_TOKENS", 1000)?,
            max_retries: parse_or(&get, "LLM_MAX_RETRIES", 3)?,
            retry_delay_secs: parse_or(&get, "LLM_RETRY_DELAY_SECS", 5)?,
            prompt_token_budget: parse_or(&get, "PROMPT_TOKEN_BUDGET", 6500)?,
            chunk_size_tokens: parse_or(&get, "CHUNK_SIZE_TOKENS", 6000)?,
            chars_per_token: parse_or(&get, "CHARS_PER_TOKEN", 4)?,
            chunk_overlap_chars: parse_or(&get, "CHUNK_OVERLAP_CHARS", 0)?,
            paper_delay_secs: parse_or(&get, "PAPER_DELAY_SECS", 2)?,
            chunk_delay_secs: parse_or(&get, "CHUNK_DELAY_SECS", 1)?,
            skip_processed: parse_flag(&get, "SKIP_PROCESSED", true)?,
            write_text_reports: parse_flag(&get, "WRITE_TEXT_REPORTS", true)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject combinations that cannot run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.analysis_provider == AnalysisProvider::OpenAI && self.openai_api_key.is_none() {
            return Err(ConfigError::MissingVariable("OPENAI_API_KEY".into()));
        }
        if self.chunk_size_tokens == 0 {
            return Err(ConfigError::InvalidValue("CHUNK_SIZE_TOKENS".into()));
        }
        if self.chars_per_token == 0 {
            return Err(ConfigError::InvalidValue("CHARS_PER_TOKEN".into()));
        }
        if self.max_retries == 0 {
            return Err(ConfigError::InvalidValue("LLM_MAX_RETRIES".into()));
        }
        Ok(())
    }

    /// Chunking parameters for the text preprocessor.
    pub fn preprocess_settings(&self) -> PreprocessSettings {
        PreprocessSettings {
            chunk_size_tokens: self.chunk_size_tokens,
            chars_per_token: self.chars_per_token,
            overlap_chars: self.chunk_overlap_chars,
        }
    }

    /// Prompt and pacing parameters for the analyzer.
    pub fn analysis_settings(&self) -> AnalysisSettings {
        AnalysisSettings {
            model: self.llm_model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            prompt_token_budget: self.prompt_token_budget,
            chunk_delay: Duration::from_secs(self.chunk_delay_secs),
        }
    }

    /// Batch parameters for the pipeline.
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            input_dir: self.input_dir.clone(),
            output_dir: self.output_dir.clone(),
            skip_processed: self.skip_processed,
            write_text_reports: self.write_text_reports,
            paper_delay: Duration::from_secs(self.paper_delay_secs),
        }
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
        .map(|value| value.unwrap_or(default))
}

fn parse_flag<G>(get: &G, key: &str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|value| value.to_lowercase()).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(_) => Err(ConfigError::InvalidValue(key.to_string())),
    }
}

impl std::str::FromStr for AnalysisProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            "none" | "extractive" => Ok(Self::None),
            _ => Err(()),
        }
    }
}

/// Create the input and output directories when they are missing.
pub fn ensure_directories(config: &Config) -> Result<(), ConfigError> {
    for dir in [&config.input_dir, &config.output_dir] {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Directory {
            path: dir.clone(),
            source,
        })?;
    }
    Ok(())
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load variables from a dotenv file into the process environment without overriding values
/// already set. `None` searches `.env` from the working directory upwards.
///
/// Returns the file that was loaded, if any. Call this before [`crate::logging::init_tracing`]
/// so `RUST_LOG` and `PAPERDIGEST_LOG_FILE` can come from the file.
pub fn load_env_file(path: Option<&Path>) -> Option<PathBuf> {
    match path {
        Some(path) => dotenvy::from_path(path).ok().map(|()| path.to_path_buf()),
        None => dotenvy::dotenv().ok(),
    }
}

/// Load configuration from the environment (and `.env`) and install it in the global cache.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    load_env_file(None);
    let config = Config::from_env()?;
    tracing::debug!(
        input_dir = %config.input_dir.display(),
        output_dir = %config.output_dir.display(),
        provider = ?config.analysis_provider,
        model = %config.llm_model,
        chunk_size_tokens = config.chunk_size_tokens,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}
