//! How command results and failures reach the terminal.
//!
//! Each command builds one serializable value and hands it to [`render_mode`]
//! or [`render`] together with its human renderers. The mode is chosen once in
//! `main` by [`resolve_output_mode`], first match wins:
//!
//! 1. `--format`, then `--json`
//! 2. `LABTRAIL_FORMAT` (`pretty`, `text` or `json`; anything else is ignored)
//! 3. `output` in the user config
//! 4. pretty on a terminal, text otherwise

use clap::ValueEnum;
use labtrail_core::{ErrorCode, LabError};
use serde::Serialize;
use std::io::{self, IsTerminal, Write};

/// Width of the rule under pretty section headings.
pub const PRETTY_RULE_WIDTH: usize = 72;

pub const FORMAT_ENV: &str = "LABTRAIL_FORMAT";

pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{}", "-".repeat(PRETTY_RULE_WIDTH))
}

/// Heading line with a rule beneath it.
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    pretty_rule(w)
}

/// `key:` padded to a fixed column, then the value.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<12} {}", format!("{key}:"), value.as_ref())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Sections and aligned fields for reading at a terminal.
    Pretty,
    /// One tab-separated record per line.
    Text,
    /// The serialized value, pretty-printed.
    Json,
}

impl OutputMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" => Some(Self::Pretty),
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

fn pick_output_mode(
    format_flag: Option<OutputMode>,
    json_flag: bool,
    format_env: Option<&str>,
    user_default: Option<&str>,
    is_tty: bool,
) -> OutputMode {
    format_flag
        .or_else(|| json_flag.then_some(OutputMode::Json))
        .or_else(|| format_env.and_then(OutputMode::parse))
        .or_else(|| user_default.and_then(OutputMode::parse))
        .unwrap_or(if is_tty { OutputMode::Pretty } else { OutputMode::Text })
}

pub fn resolve_output_mode(
    format_flag: Option<OutputMode>,
    json_flag: bool,
    user_default: Option<&str>,
) -> OutputMode {
    let format_env = std::env::var(FORMAT_ENV).ok();
    pick_output_mode(
        format_flag,
        json_flag,
        format_env.as_deref(),
        user_default,
        io::stdout().is_terminal(),
    )
}

fn write_json(out: &mut dyn Write, value: &impl Serialize) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Write `value` to stdout with a separate renderer for text and pretty.
pub fn render_mode<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    match mode {
        OutputMode::Json => write_json(&mut out, value)?,
        OutputMode::Text => text_fn(value, &mut out)?,
        OutputMode::Pretty => pretty_fn(value, &mut out)?,
    }
    Ok(())
}

/// [`render_mode`] for commands whose text and pretty output are the same.
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    human_fn: impl Fn(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    render_mode(mode, value, &human_fn, &human_fn)
}

/// A failure as shown to the user. JSON mode nests it under `"error"`.
#[derive(Debug, Serialize)]
pub struct CliError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// `E####` when the failure has a stable code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            error_code: None,
        }
    }

    /// Tag `message` with `code` and its remediation hint.
    pub fn coded(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: code.hint().map(str::to_string),
            error_code: Some(code.code().to_string()),
        }
    }
}

impl From<&LabError> for CliError {
    fn from(err: &LabError) -> Self {
        Self::coded(err.code(), err.to_string())
    }
}

impl From<&anyhow::Error> for CliError {
    fn from(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<LabError>() {
            Some(lab) => Self::from(lab),
            None => Self::new(format!("{err:#}")),
        }
    }
}

/// Report `error` on stderr; stdout stays reserved for results.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let mut out = io::stderr().lock();
    if mode == OutputMode::Json {
        return write_json(&mut out, &serde_json::json!({ "error": error }));
    }
    writeln!(out, "error: {}", error.message)?;
    if let Some(suggestion) = &error.suggestion {
        writeln!(out, "  suggestion: {suggestion}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use labtrail_core::api::ApiError;

    #[test]
    fn format_flag_wins_over_json_and_env() {
        let mode =
            pick_output_mode(Some(OutputMode::Text), true, Some("pretty"), None, true);
        assert_eq!(mode, OutputMode::Text);
    }

    #[test]
    fn json_flag_wins_over_env() {
        let mode = pick_output_mode(None, true, Some("text"), Some("pretty"), true);
        assert_eq!(mode, OutputMode::Json);
    }

    #[test]
    fn env_wins_over_user_config() {
        let mode = pick_output_mode(None, false, Some("JSON"), Some("text"), true);
        assert_eq!(mode, OutputMode::Json);
    }

    #[test]
    fn unknown_env_falls_through_to_user_config() {
        let mode = pick_output_mode(None, false, Some("yaml"), Some("text"), true);
        assert_eq!(mode, OutputMode::Text);
    }

    #[test]
    fn tty_decides_last() {
        assert_eq!(
            pick_output_mode(None, false, None, None, true),
            OutputMode::Pretty
        );
        assert_eq!(
            pick_output_mode(None, false, None, Some("bogus"), false),
            OutputMode::Text
        );
    }

    #[test]
    fn missing_backend_has_its_own_code() {
        let err = CliError::coded(ErrorCode::BackendMissing, "no lab service configured");
        assert_eq!(err.error_code.as_deref(), Some("E1004"));
        assert!(err.suggestion.as_deref().is_some_and(|s| s.contains("--fixture")));
    }

    #[test]
    fn cli_error_from_lab_error_carries_code_and_hint() {
        let err = LabError::from_mutation(ApiError::Rejected {
            status: 409,
            message: "conflict".into(),
        });
        let cli_err = CliError::from(&err);
        assert!(cli_err.message.contains("conflict"));
        assert_eq!(cli_err.error_code.as_deref(), Some("E2001"));
        assert!(cli_err.suggestion.is_some());
    }

    #[test]
    fn cli_error_from_anyhow_downcasts() {
        let wrapped = anyhow::Error::new(LabError::validation("name must not be empty"));
        assert_eq!(
            CliError::from(&wrapped).error_code.as_deref(),
            Some("E1001")
        );

        let plain = anyhow::anyhow!("fixture missing");
        let cli_err = CliError::from(&plain);
        assert_eq!(cli_err.message, "fixture missing");
        assert!(cli_err.error_code.is_none());
    }

    #[test]
    fn render_error_json_and_human() {
        let err = CliError::coded(ErrorCode::ValidationRejected, "bad input");
        assert_eq!(err.error_code.as_deref(), Some("E1001"));
        assert!(render_error(OutputMode::Json, &err).is_ok());
        assert!(render_error(OutputMode::Pretty, &err).is_ok());
    }

    #[test]
    fn pretty_helpers_write_aligned_lines() {
        let mut buf = Vec::new();
        pretty_section(&mut buf, "Sample").expect("section");
        pretty_kv(&mut buf, "state", "Recibida").expect("kv");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.starts_with("Sample\n"));
        assert!(text.contains(&"-".repeat(PRETTY_RULE_WIDTH)));
        assert!(text.contains("state:       Recibida"));
    }
}
