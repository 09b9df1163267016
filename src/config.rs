use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Policy file looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = ".pr-describer.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing required input: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Policy configuration loaded from .pr-describer.toml.
/// All fields are optional — the tool works with zero config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub diff: DiffConfig,

    #[serde(default)]
    pub ticket: TicketConfig,

    /// Extra markers fed into the API-relevance heuristic
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub api_base_url: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.github.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL including the version segment (e.g. https://api.openai.com/v1)
    pub api_base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub system_prompt: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4-turbo".to_string(),
            max_tokens: 4096,
            system_prompt: "You are a helpful assistant for generating PR descriptions.".to_string(),
        }
    }
}

/// What to do when the unified diff cannot be fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffFailurePolicy {
    /// Log a warning and continue with an empty diff
    #[default]
    Skip,
    /// Treat the diff like any other required fetch
    Abort,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Diffs longer than this many characters are truncated
    pub max_chars: usize,
    pub on_failure: DiffFailurePolicy,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            max_chars: 20_000,
            on_failure: DiffFailurePolicy::Skip,
        }
    }
}

/// What to do when the branch name carries no ticket id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingTicketPolicy {
    /// Leave the Ticket section out of the description
    #[default]
    Omit,
    /// Link the configured sentinel ticket instead
    Sentinel,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TicketConfig {
    /// Issue-tracker project keys matched as `KEY-<digits>`
    pub prefixes: Vec<String>,
    /// Browse URL the ticket id is appended to (e.g. https://acme.atlassian.net/browse/)
    pub base_url: Option<String>,
    pub on_missing: MissingTicketPolicy,
    pub sentinel: String,
}

impl Default for TicketConfig {
    fn default() -> Self {
        Self {
            prefixes: vec!["CDB".to_string(), "DBP".to_string()],
            base_url: None,
            on_missing: MissingTicketPolicy::Omit,
            sentinel: "CDB-0000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Additional path substrings that mark a file as API surface
    pub extra_path_markers: Vec<String>,
    /// Additional diff substrings that mark an HTTP endpoint definition or call
    pub extra_diff_signatures: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Tag prepended output with a hidden marker so reruns replace it
    pub marker: bool,
}

impl Config {
    /// Load configuration from an explicit path, or from .pr-describer.toml
    /// in the current directory. A missing default file yields the defaults;
    /// a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::load_from(path)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }
}

/// Run inputs as they arrive from flags or the environment, before validation.
#[derive(Debug, Clone, Default)]
pub struct RawInputs {
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub pr_number: Option<String>,
    pub branch: Option<String>,
    pub openai_api_key: Option<String>,
    pub github_token: Option<String>,
}

/// The pull request a run targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub owner: String,
    pub repo: String,
    pub pr_number: u64,
    pub branch: String,
}

#[derive(Clone)]
pub struct Credentials {
    pub openai_api_key: String,
    pub github_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("openai_api_key", &"<redacted>")
            .field("github_token", &"<redacted>")
            .finish()
    }
}

/// Fully resolved settings, built once at startup and passed down by reference.
#[derive(Debug, Clone)]
pub struct Settings {
    pub target: Target,
    pub credentials: Credentials,
    pub config: Config,
}

impl Settings {
    /// Validate raw inputs against the loaded policy file.
    /// Credentials are checked first so a missing secret is reported even
    /// when the target inputs are also incomplete.
    pub fn resolve(raw: RawInputs, config: Config) -> Result<Settings, ConfigError> {
        let openai_api_key = required(raw.openai_api_key, "OPENAI_API_KEY")?;
        let github_token = required(raw.github_token, "GITHUB_TOKEN")?;

        let owner = required(raw.owner, "INPUT_REPOSITORY_OWNER")?;
        let repo = required(raw.repo, "INPUT_REPOSITORY_NAME")?;
        let pr_number = required(raw.pr_number, "INPUT_PULL_REQUEST_NUMBER")?;
        let pr_number = pr_number
            .parse::<u64>()
            .map_err(|e| ConfigError::Invalid {
                name: "INPUT_PULL_REQUEST_NUMBER",
                reason: format!("{pr_number:?} is not a pull request number ({e})"),
            })?;
        let branch = required(raw.branch, "INPUT_BRANCH_NAME")?;

        if config.diff.max_chars == 0 {
            return Err(ConfigError::Invalid {
                name: "diff.max_chars",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Settings {
            target: Target {
                owner,
                repo,
                pr_number,
                branch,
            },
            credentials: Credentials {
                openai_api_key,
                github_token,
            },
            config,
        })
    }
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ConfigError::Missing(name)),
    }
}
