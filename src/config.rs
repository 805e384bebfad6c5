use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Prefix for layered environment overrides, e.g. `MEDTALK_PROVIDER_CONFIG__CHAT_MODEL`.
const ENV_PREFIX: &str = "MEDTALK";

/// Files probed, in order, when `CONFIG_PATH` is not set.
const CONFIG_CANDIDATES: &[&str] = &["conf.yaml", "conf.yml", "conf.json"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub system_config: SystemConfig,
    #[serde(default)]
    pub provider_config: ProviderConfig,
    #[serde(default)]
    pub prompt_config: PromptConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory where uploaded audio is staged for the duration of one request.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_upload_dir() -> String {
    "uploads".to_string()
}

fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            upload_dir: default_upload_dir(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Settings for the OpenAI-compatible upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_transcription_model")]
    pub transcription_model: String,
    /// Deadline applied to every upstream call.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_chat_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_transcription_model() -> String {
    "whisper-1".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            organization_id: None,
            chat_model: default_chat_model(),
            transcription_model: default_transcription_model(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ProviderConfig {
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}

/// Prompt templates and sampling settings.
///
/// The templates carry the whole behavioural contract of translation and
/// summarization, so they are versioned alongside the rest of the settings.
/// `{source_language}` and `{target_language}` are substituted in the
/// translation template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    #[serde(default = "default_prompt_version")]
    pub version: String,
    #[serde(default = "default_translation_system")]
    pub translation_system: String,
    #[serde(default = "default_translation_temperature")]
    pub translation_temperature: f32,
    #[serde(default = "default_summary_system")]
    pub summary_system: String,
    #[serde(default = "default_summary_temperature")]
    pub summary_temperature: f32,
    /// Require the summary object to match the five-field schema before forwarding it.
    #[serde(default)]
    pub strict_summary_schema: bool,
}

fn default_prompt_version() -> String {
    "2024-medical-v1".to_string()
}

fn default_translation_system() -> String {
    "You are a medical translator. Translate the following text from {source_language} to \
     {target_language} accurately maintaining medical terminology. Translate only the text, \
     return nothing else."
        .to_string()
}

fn default_translation_temperature() -> f32 {
    0.3
}

fn default_summary_system() -> String {
    "You are a medical data assistant. Analyze the following doctor-patient conversation and \
     extract key medical information.\n\
     Format your response as a JSON object with these fields:\n\
     - summary: A brief narrative summary of the consultation.\n\
     - symptoms: Array of strings (symptoms mentioned).\n\
     - diagnoses: Array of strings (diagnoses discussed).\n\
     - medications: Array of strings (medications prescribed with dosages).\n\
     - followups: Array of strings (instructions or next steps).\n\
     \n\
     Return ONLY valid JSON."
        .to_string()
}

fn default_summary_temperature() -> f32 {
    0.5
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            version: default_prompt_version(),
            translation_system: default_translation_system(),
            translation_temperature: default_translation_temperature(),
            summary_system: default_summary_system(),
            summary_temperature: default_summary_temperature(),
            strict_summary_schema: false,
        }
    }
}

impl Config {
    /// Build the configuration from defaults, an optional file, `MEDTALK_*`
    /// variables and finally the plain `OPENAI_API_KEY` / `PORT` variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, &std::env::vars().collect())
    }

    /// Same as [`Config::load`], reading variables from `env` instead of the process.
    pub fn load_with_env(path: Option<&Path>, env: &HashMap<String, String>) -> Result<Self> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Config::default())?);

        if let Some(path) = path {
            let content = read_with_env(path, env)?;
            builder = builder.add_source(config::File::from_str(&content, file_format(path)));
        }

        let config: Config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .source(Some(env.iter().map(|(k, v)| (k.clone(), v.clone())).collect())),
            )
            .set_override_option("provider_config.api_key", env.get("OPENAI_API_KEY").cloned())?
            .set_override_option("system_config.port", legacy_port(env)?)?
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Resolve which file to load: `CONFIG_PATH` must exist when set,
    /// otherwise the first existing candidate in the working directory wins.
    pub fn locate() -> Result<Option<PathBuf>> {
        if let Ok(explicit) = std::env::var("CONFIG_PATH") {
            let path = PathBuf::from(&explicit);
            if !path.exists() {
                anyhow::bail!("Configuration file not found: {}", explicit);
            }
            return Ok(Some(path));
        }

        for candidate in CONFIG_CANDIDATES {
            let path = Path::new(candidate);
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            debug!("No config file at {}", candidate);
        }
        Ok(None)
    }
}

fn legacy_port(env: &HashMap<String, String>) -> Result<Option<i64>> {
    match env.get("PORT") {
        Some(raw) => {
            let port: u16 = raw
                .trim()
                .parse()
                .with_context(|| format!("PORT is not a valid port number: {raw}"))?;
            Ok(Some(i64::from(port)))
        }
        None => Ok(None),
    }
}

fn file_format(path: &Path) -> config::FileFormat {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("json") => config::FileFormat::Json,
        Some("toml") => config::FileFormat::Toml,
        _ => config::FileFormat::Yaml,
    }
}

/// Read a configuration file, dropping a UTF-8 BOM and expanding `${VAR}`.
fn read_with_env(path: &Path, env: &HashMap<String, String>) -> Result<String> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
    substitute_env(content, env)
}

/// Replace `${VAR_NAME}` with the variable's value. Unset variables are left as written.
pub fn substitute_env(content: &str, env: &HashMap<String, String>) -> Result<String> {
    let pattern = Regex::new(r"\$\{(\w+)\}")?;
    let replaced = pattern.replace_all(content, |caps: &regex::Captures| {
        env.get(&caps[1]).cloned().unwrap_or_else(|| caps[0].to_string())
    });
    Ok(replaced.into_owned())
}
