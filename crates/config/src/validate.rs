//! Configuration validation.
//!
//! Structural checks (syntax, unknown or misspelled keys, wrong types) run on
//! the config file; semantic checks run on the effective config after env
//! overrides, so a token supplied through the environment counts.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use serde_json::Value;

use crate::{
    loader::parse_config_value,
    schema::{AlertcastConfig, StorageConfig},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        })
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "telegram.token"
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn new(severity: Severity, path: &str, message: impl Into<String>) -> Self {
        Self {
            severity,
            path: path.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}: {}", self.severity, self.message)
        } else {
            write!(f, "{}: {}: {}", self.severity, self.path, self.message)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// Append another result's diagnostics.
    pub fn merge(&mut self, other: Self) {
        self.diagnostics.extend(other.diagnostics);
        if self.config_path.is_none() {
            self.config_path = other.config_path;
        }
    }
}

const TELEGRAM_KEYS: &[&str] = &[
    "token",
    "bot_username",
    "subscription_policy",
    "start_parameter",
    "poll_timeout_secs",
    "request_timeout_secs",
    "api_url",
];
const STORAGE_KEYS: &[&str] = &["data_dir", "storage_name"];
const TOP_LEVEL_KEYS: &[&str] = &["telegram", "storage"];
const SUBSCRIPTION_POLICIES: &[&str] = &["any_message", "start_command"];

/// Telegram caps `getUpdates` long polling at 50 seconds.
const MAX_POLL_TIMEOUT_SECS: u64 = 50;

/// Semantic checks on an effective config.
#[must_use]
pub fn validate(config: &AlertcastConfig) -> ValidationResult {
    let mut diagnostics = Vec::new();
    check_telegram(config, &mut diagnostics);
    check_storage(&config.storage, &mut diagnostics);
    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

/// Structural checks on a config file.
#[must_use]
pub fn validate_file(path: &Path) -> ValidationResult {
    let mut result = ValidationResult {
        diagnostics: Vec::new(),
        config_path: Some(path.to_path_buf()),
    };
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            result.diagnostics.push(Diagnostic::new(
                Severity::Error,
                "",
                format!("failed to read config file: {e}"),
            ));
            return result;
        },
    };
    let raw = crate::env_subst::substitute_env(&raw);
    let tree = match parse_config_value(&raw, path) {
        Ok(tree) => tree,
        Err(e) => {
            result
                .diagnostics
                .push(Diagnostic::new(Severity::Error, "", e.to_string()));
            return result;
        },
    };

    check_unknown_fields(&tree, &mut result.diagnostics);
    if let Err(e) = serde_json::from_value::<AlertcastConfig>(tree) {
        result
            .diagnostics
            .push(Diagnostic::new(Severity::Error, "", format!("type error: {e}")));
    }
    result
}

fn check_unknown_fields(tree: &Value, diagnostics: &mut Vec<Diagnostic>) {
    let Some(root) = tree.as_object() else {
        return;
    };
    for (key, value) in root {
        let known = match key.as_str() {
            "telegram" => TELEGRAM_KEYS,
            "storage" => STORAGE_KEYS,
            _ => {
                diagnostics.push(unknown_field(key, key, TOP_LEVEL_KEYS));
                continue;
            },
        };
        // Non-table sections surface as type errors.
        let Some(section) = value.as_object() else {
            continue;
        };
        for child in section.keys().filter(|k| !known.contains(&k.as_str())) {
            diagnostics.push(unknown_field(&format!("{key}.{child}"), child, known));
        }
    }
}

fn unknown_field(path: &str, key: &str, known: &[&str]) -> Diagnostic {
    let message = match suggest(key, known, 3) {
        Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
        None => "unknown field".to_string(),
    };
    Diagnostic::new(Severity::Error, path, message)
}

fn check_telegram(config: &AlertcastConfig, diagnostics: &mut Vec<Diagnostic>) {
    if !config.telegram.is_object() {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "telegram",
            "expected a table",
        ));
        return;
    }

    match config.telegram_str("token").map(str::trim) {
        None | Some("") => diagnostics.push(Diagnostic::new(
            Severity::Error,
            "telegram.token",
            "bot token is missing (set it in the config or ALERTCAST_TELEGRAM_TOKEN)",
        )),
        Some(token) if !looks_like_bot_token(token) => diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "telegram.token",
            "token does not look like a Telegram bot token (<bot id>:<secret>)",
        )),
        Some(_) => {},
    }

    if let Some(policy) = config.telegram_str("subscription_policy")
        && !SUBSCRIPTION_POLICIES.contains(&policy)
    {
        let message = match suggest(policy, SUBSCRIPTION_POLICIES, 3) {
            Some(s) => format!("unknown subscription policy (did you mean \"{s}\"?)"),
            None => format!("unknown subscription policy, expected one of {SUBSCRIPTION_POLICIES:?}"),
        };
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "telegram.subscription_policy",
            message,
        ));
    }

    if let Some(param) = config.telegram_str("start_parameter")
        && !is_valid_start_parameter(param)
    {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "telegram.start_parameter",
            "must be 1-64 characters of A-Z, a-z, 0-9, '_' or '-'",
        ));
    }

    if let Some(timeout) = config
        .telegram
        .get("poll_timeout_secs")
        .and_then(Value::as_u64)
        && timeout > MAX_POLL_TIMEOUT_SECS
    {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "telegram.poll_timeout_secs",
            format!("Telegram caps long polling at {MAX_POLL_TIMEOUT_SECS}s"),
        ));
    }

    if config.telegram_str("bot_username").is_none() {
        diagnostics.push(Diagnostic::new(
            Severity::Info,
            "telegram.bot_username",
            "not set, the subscribe link will ask Telegram via getMe",
        ));
    }
}

fn check_storage(storage: &StorageConfig, diagnostics: &mut Vec<Diagnostic>) {
    let name = storage.storage_name.trim();
    if name.is_empty() {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "storage.storage_name",
            "must not be empty",
        ));
    } else if name.contains(['/', '\\']) || name == "." || name == ".." {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "storage.storage_name",
            "must be a file name, not a path",
        ));
    }
}

/// `<digits>:<secret>` where the secret uses the URL-safe alphabet.
fn looks_like_bot_token(token: &str) -> bool {
    let Some((id, secret)) = token.split_once(':') else {
        return false;
    };
    !id.is_empty()
        && id.bytes().all(|b| b.is_ascii_digit())
        && secret.len() >= 30
        && secret
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

fn is_valid_start_parameter(param: &str) -> bool {
    (1..=64).contains(&param.len())
        && param
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Levenshtein edit distance.
fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Closest candidate within `max_distance` edits.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|&c| (c, levenshtein(needle, c)))
        .filter(|&(_, d)| d > 0 && d <= max_distance)
        .min_by_key(|&(_, d)| d)
        .map(|(c, _)| c)
}
