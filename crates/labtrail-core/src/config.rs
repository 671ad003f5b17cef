use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::api::Credentials;
use crate::error::ErrorCode;
use crate::labels::{DEFAULT_LABEL_COLOR, validate_color};
use crate::timeline::{IMAGE_NOUN, SYSTEM_ACTOR, TimelineConfig};

/// Directory holding the project config, searched upward from the cwd.
pub const PROJECT_DIR: &str = ".labtrail";

/// Environment variable overriding the API base URL.
pub const API_URL_ENV: &str = "LABTRAIL_API_URL";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub timeline: TimelineSection,
    #[serde(default)]
    pub labels: LabelsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Name of the environment variable holding the bearer token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout_secs(),
            token_env: default_token_env(),
        }
    }
}

impl ApiConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Read the token from the configured environment variable.
    #[must_use]
    pub fn credentials(&self) -> Option<Credentials> {
        env::var(&self.token_env)
            .ok()
            .filter(|token| !token.trim().is_empty())
            .map(Credentials::bearer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineSection {
    #[serde(default = "default_system_actor")]
    pub system_actor: String,
    #[serde(default = "default_image_noun")]
    pub image_noun: String,
    #[serde(default = "default_true")]
    pub collapse_same_actor: bool,
}

impl Default for TimelineSection {
    fn default() -> Self {
        Self {
            system_actor: default_system_actor(),
            image_noun: default_image_noun(),
            collapse_same_actor: default_true(),
        }
    }
}

impl TimelineSection {
    #[must_use]
    pub fn to_timeline_config(&self) -> TimelineConfig {
        TimelineConfig {
            system_actor: self.system_actor.clone(),
            image_noun: self.image_noun.clone(),
            collapse_same_actor: self.collapse_same_actor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelsConfig {
    #[serde(default = "default_label_color")]
    pub default_color: String,
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            default_color: default_label_color(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
    /// Base URL after CLI, environment, project and user precedence.
    pub api_url: Option<Url>,
}

impl EffectiveConfig {
    #[must_use]
    pub fn timeline(&self) -> TimelineConfig {
        self.project.timeline.to_timeline_config()
    }
}

/// Walk up from `start` to the first directory containing `.labtrail/`.
#[must_use]
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(PROJECT_DIR).is_dir())
        .map(Path::to_path_buf)
}

/// Read `.labtrail/config.toml` under `project_root`, or defaults when absent.
///
/// # Errors
///
/// Returns an error if the file cannot be read, does not parse, or names an
/// invalid default label color.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(PROJECT_DIR).join("config.toml");
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config = toml::from_str::<ProjectConfig>(&content).with_context(|| {
        format!(
            "{}: failed to parse {}",
            ErrorCode::ConfigParseError.code(),
            path.display()
        )
    })?;

    if let Err(err) = validate_color(&config.labels.default_color) {
        bail!(
            "{}: {} in {}",
            ErrorCode::ConfigParseError.code(),
            err,
            path.display()
        );
    }
    Ok(config)
}

/// # Errors
///
/// Returns an error if the user config exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };
    load_user_config_from(&config_dir.join("labtrail/config.toml"))
}

fn load_user_config_from(path: &Path) -> Result<UserConfig> {
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content).with_context(|| {
        format!(
            "{}: failed to parse {}",
            ErrorCode::ConfigParseError.code(),
            path.display()
        )
    })
}

/// Load project and user config and settle the API base URL.
///
/// `cli_api_url` wins over `LABTRAIL_API_URL`, which wins over the project
/// `[api] base_url`, which wins over the user `api_url`.
///
/// # Errors
///
/// Returns an error if a config file is invalid or the chosen URL does not
/// parse.
pub fn resolve_config(project_root: Option<&Path>, cli_api_url: Option<&str>) -> Result<EffectiveConfig> {
    let project = match project_root {
        Some(root) => load_project_config(root)?,
        None => ProjectConfig::default(),
    };
    let user = load_user_config()?;
    let env_url = env::var(API_URL_ENV).ok();
    let api_url = resolve_api_url(cli_api_url, env_url.as_deref(), &project, &user)?;

    Ok(EffectiveConfig {
        project,
        user,
        api_url,
    })
}

fn resolve_api_url(
    cli: Option<&str>,
    env_url: Option<&str>,
    project: &ProjectConfig,
    user: &UserConfig,
) -> Result<Option<Url>> {
    let raw = [
        cli,
        env_url,
        project.api.base_url.as_deref(),
        user.api_url.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .find(|value| !value.is_empty());

    raw.map(|value| Url::parse(value).with_context(|| format!("Invalid API URL '{value}'")))
        .transpose()
}

const fn default_true() -> bool {
    true
}

const fn default_timeout_secs() -> u64 {
    30
}

fn default_token_env() -> String {
    "LABTRAIL_TOKEN".to_string()
}

fn default_system_actor() -> String {
    SYSTEM_ACTOR.to_string()
}

fn default_image_noun() -> String {
    IMAGE_NOUN.to_string()
}

fn default_label_color() -> String {
    DEFAULT_LABEL_COLOR.to_string()
}
