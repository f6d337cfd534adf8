use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use crate::chunker::{CharWindow, ChunkPolicy, SentencePack, Whitespace};
use crate::error::ConfigError;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub reader: ReaderConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
}

// ============================================================================
// Reader Config
// ============================================================================

#[derive(Debug, Deserialize, Clone)]
pub struct ReaderConfig {
    /// Display time per chunk
    #[serde(default = "default_speed_ms")]
    pub speed_ms: u64,
    /// Delay before the next chunk renders while auto-advancing
    #[serde(default = "default_overlap_ms")]
    pub overlap_ms: u64,
    #[serde(default = "default_speed_step_ms")]
    pub speed_step_ms: u64,
    #[serde(default = "default_min_speed_ms")]
    pub min_speed_ms: u64,
    #[serde(default = "default_max_speed_ms")]
    pub max_speed_ms: u64,
    #[serde(default = "default_overlap_floor_ms")]
    pub overlap_floor_ms: u64,
    /// How long the speed notice shows before auto-advance resumes
    #[serde(default = "default_speed_notice_ms")]
    pub speed_notice_ms: u64,
    /// How long echoed captions stay up in command mode
    #[serde(default = "default_caption_ms")]
    pub caption_ms: u64,
    /// Start auto-advancing as soon as a document loads
    #[serde(default = "default_autoplay")]
    pub autoplay: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            speed_ms: default_speed_ms(),
            overlap_ms: default_overlap_ms(),
            speed_step_ms: default_speed_step_ms(),
            min_speed_ms: default_min_speed_ms(),
            max_speed_ms: default_max_speed_ms(),
            overlap_floor_ms: default_overlap_floor_ms(),
            speed_notice_ms: default_speed_notice_ms(),
            caption_ms: default_caption_ms(),
            autoplay: default_autoplay(),
        }
    }
}

fn default_speed_ms() -> u64 {
    5000
}
fn default_overlap_ms() -> u64 {
    1800
}
fn default_speed_step_ms() -> u64 {
    500
}
fn default_min_speed_ms() -> u64 {
    500
}
fn default_max_speed_ms() -> u64 {
    10_000
}
fn default_overlap_floor_ms() -> u64 {
    400
}
fn default_speed_notice_ms() -> u64 {
    2000
}
fn default_caption_ms() -> u64 {
    3000
}
fn default_autoplay() -> bool {
    true
}

// ============================================================================
// Chunking Config
// ============================================================================

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    /// Character window with overlap
    #[default]
    Window,
    /// Whole sentences packed up to a word budget
    Sentences,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default)]
    pub policy: PolicyKind,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub overlap: usize,
    #[serde(default)]
    pub whitespace: Whitespace,
    #[serde(default = "default_target_words")]
    pub target_words: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::default(),
            chunk_size: default_chunk_size(),
            overlap: default_chunk_overlap(),
            whitespace: Whitespace::default(),
            target_words: default_target_words(),
        }
    }
}

impl ChunkingConfig {
    /// Build the configured chunking policy
    pub fn policy(&self) -> Result<Box<dyn ChunkPolicy>, ConfigError> {
        Ok(match self.policy {
            PolicyKind::Window => Box::new(
                CharWindow::new(self.chunk_size, self.overlap)?.with_whitespace(self.whitespace),
            ),
            PolicyKind::Sentences => Box::new(SentencePack::new(self.target_words)?),
        })
    }
}

fn default_chunk_size() -> usize {
    2000
}
fn default_chunk_overlap() -> usize {
    200
}
fn default_target_words() -> usize {
    30
}

// ============================================================================
// Commands Config
// ============================================================================

#[derive(Debug, Deserialize, Clone)]
pub struct CommandsConfig {
    /// Phrase that opens lookup mode
    #[serde(default = "default_wake_phrase")]
    pub wake_phrase: String,
    /// Tolerate transcription slips in the wake phrase
    #[serde(default)]
    pub fuzzy_wake: bool,
    /// Extra keywords per intent, e.g. `next = ["forward"]`
    #[serde(default)]
    pub extra: BTreeMap<String, Vec<String>>,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            wake_phrase: default_wake_phrase(),
            fuzzy_wake: false,
            extra: BTreeMap::new(),
        }
    }
}

fn default_wake_phrase() -> String {
    "hey reader".into()
}

// ============================================================================
// Lookup Config
// ============================================================================

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum LookupBackend {
    #[default]
    #[serde(rename = "openai-compat")]
    OpenAiCompat,
    #[serde(rename = "ollama")]
    Ollama,
    #[serde(rename = "none")]
    Disabled,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LookupConfig {
    #[serde(default)]
    pub backend: LookupBackend,
    /// Base URL - can use preset or explicit URL
    #[serde(default)]
    pub base_url: String,
    /// Preset shortcuts: "lm_studio", "openai", "ollama"
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default = "default_lookup_model")]
    pub model: String,
    /// API key (supports ${ENV_VAR} syntax)
    #[serde(default = "default_api_key")]
    pub api_key: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: Option<u32>,
    /// Definitions longer than this are cut at a word boundary
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            backend: LookupBackend::default(),
            base_url: String::new(),
            preset: None,
            model: default_lookup_model(),
            api_key: default_api_key(),
            temperature: None,
            max_tokens: default_max_tokens(),
            max_chars: default_max_chars(),
        }
    }
}

fn default_lookup_model() -> String {
    "gpt-4o-mini".into()
}
fn default_api_key() -> Option<String> {
    Some("${OPENAI_API_KEY}".into())
}
fn default_max_tokens() -> Option<u32> {
    Some(150)
}
fn default_max_chars() -> usize {
    300
}

/// Expand `${VAR}` and `${VAR:-fallback}` from the environment. `$$` is a
/// literal `$`.
fn expand_env_vars(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(dollar) = rest.find('$') {
        out.push_str(&rest[..dollar]);
        let after = &rest[dollar + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
            continue;
        }
        let Some((expr, tail)) = after.strip_prefix('{').and_then(|a| a.split_once('}')) else {
            out.push('$');
            rest = after;
            continue;
        };

        let (name, fallback) = match expr.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (expr, None),
        };
        match (std::env::var(name).ok().filter(|v| !v.is_empty()), fallback) {
            (Some(value), _) => out.push_str(&value),
            (None, Some(fallback)) => out.push_str(fallback),
            (None, None) => tracing::warn!(var = name, "environment variable not set"),
        }
        rest = tail;
    }

    out.push_str(rest);
    out
}

impl LookupConfig {
    /// Resolve preset to base_url if needed, and expand env vars in api_key
    pub fn resolve_presets(&mut self) {
        if self.base_url.is_empty() {
            self.base_url = match self.preset.as_deref() {
                Some("lm_studio") => "http://localhost:1234/v1".to_string(),
                Some("openai") => "https://api.openai.com/v1".to_string(),
                Some("ollama") => "http://localhost:11434/v1".to_string(),
                Some(other) => {
                    tracing::warn!(preset = other, "unknown preset, using LM Studio default");
                    "http://localhost:1234/v1".to_string()
                }
                None => match self.backend {
                    LookupBackend::Ollama => "http://localhost:11434/v1".to_string(),
                    _ => "https://api.openai.com/v1".to_string(),
                },
            };
        }

        if let Some(key) = &mut self.api_key {
            *key = expand_env_vars(key);
        }
        // An unset variable expands to nothing; send no auth header then
        if self.api_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            self.api_key = None;
        }
    }
}

impl Config {
    /// Load from `path`. A missing file gives defaults; a malformed one is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                let mut config = Config::default();
                config.lookup.resolve_presets();
                return Ok(config);
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let mut config: Config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.lookup.resolve_presets();
        Ok(config)
    }
}
