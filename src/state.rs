use std::path::PathBuf;
use std::sync::Arc;

use crate::asr::Transcriber;
use crate::config::Config;
use crate::provider::{CompletionProvider, OpenAIProvider};
use crate::summarize::Summarizer;
use crate::translate::Translator;

/// Shared, read-only after start-up. Every service holds its own handle to
/// the same provider client.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub translator: Arc<Translator>,
    pub transcriber: Arc<Transcriber>,
    pub summarizer: Arc<Summarizer>,
    pub upload_dir: PathBuf,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let provider = Arc::new(OpenAIProvider::new(&config.provider_config)?);
        Ok(Self::with_provider(config, provider))
    }

    pub fn with_provider(config: Config, provider: Arc<dyn CompletionProvider>) -> Self {
        let deadline = config.provider_config.request_timeout();
        let prompts = &config.prompt_config;

        Self {
            translator: Arc::new(Translator::new(provider.clone(), prompts, deadline)),
            transcriber: Arc::new(Transcriber::new(provider.clone(), deadline)),
            summarizer: Arc::new(Summarizer::new(provider, prompts, deadline)),
            upload_dir: PathBuf::from(&config.system_config.upload_dir),
            config: Arc::new(config),
        }
    }
}
