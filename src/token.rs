//! Token resolution.
//!
//! A provider turns an optional [`Config`] into an optional token. Providers
//! never fail loudly: a missing key, file or command simply yields `None`, and
//! [`token`] moves on to the next provider in the chain.
//!
//! ```no_run
//! use cmr::token::{bearer, token_file, token_manager, TokenProvider};
//! use cmr::Config;
//!
//! let config = Config::new().with("env", "uat");
//! let header = bearer(&[&token_file as &dyn TokenProvider, &token_manager], Some(&config));
//! ```

use std::path::PathBuf;
use std::process::Command;

use tracing::debug;

use crate::config::{Config, keys};

const TOKEN_FILE_BASE: &str = "~/.cmr_token";
const DEFAULT_MANAGER_SERVICE: &str = "cmr-lib-token";

/// Something that can produce a token from configuration.
///
/// Any `Fn(Option<&Config>) -> Option<String>` is a provider, so the
/// functions in this module can be used directly.
pub trait TokenProvider {
    fn provide(&self, config: Option<&Config>) -> Option<String>;
}

impl<F> TokenProvider for F
where
    F: Fn(Option<&Config>) -> Option<String>,
{
    fn provide(&self, config: Option<&Config>) -> Option<String> {
        self(config)
    }
}

/// Provider returned by [`token_literal`].
#[derive(Clone)]
pub struct LiteralToken(Option<String>);

impl TokenProvider for LiteralToken {
    fn provide(&self, _config: Option<&Config>) -> Option<String> {
        self.0.clone()
    }
}

impl std::fmt::Debug for LiteralToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shown = if self.0.is_some() { "<redacted>" } else { "<none>" };
        f.debug_tuple("LiteralToken").field(&shown).finish()
    }
}

/// Returns a provider that always yields `value`, ignoring configuration.
///
/// `None` or an empty string gives a provider that never yields a token,
/// which is a way to switch token lookup off.
pub fn token_literal<S: Into<String>>(value: Option<S>) -> LiteralToken {
    LiteralToken(value.map(Into::into).filter(|v| !v.is_empty()))
}

/// Reads the token from `cmr.token.value`.
pub fn token_config(config: Option<&Config>) -> Option<String> {
    config?.get(keys::TOKEN_VALUE).map(str::to_string)
}

/// Reads the token from the file named by [`token_file_path`].
///
/// The first line that is neither blank nor a `#` comment is the token.
pub fn token_file(config: Option<&Config>) -> Option<String> {
    let path = expand_home(&token_file_path(config));
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "token file not readable");
            return None;
        }
    };

    let token = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string);
    if token.is_none() {
        debug!(path = %path.display(), "token file holds no token");
    }
    token
}

/// Asks a password manager for the token.
///
/// Runs `cmr.token.manager.command` when set, otherwise the macOS keychain:
/// `security find-generic-password -a <account> -s <service> -w`.
pub fn token_manager(config: Option<&Config>) -> Option<String> {
    let argv = manager_command(config);
    let (program, args) = argv.split_first()?;

    let output = match Command::new(program).args(args).output() {
        Ok(output) => output,
        Err(e) => {
            debug!(program = %program, error = %e, "password manager could not be started");
            return None;
        }
    };
    if !output.status.success() {
        debug!(program = %program, status = %output.status, "password manager failed");
        return None;
    }

    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if value.is_empty() { None } else { Some(value) }
}

/// Tries each provider in order and returns the first non-empty token.
///
/// Pass a one-element slice to use a single provider.
pub fn token(providers: &[&dyn TokenProvider], config: Option<&Config>) -> Option<String> {
    for (index, provider) in providers.iter().enumerate() {
        match provider.provide(config).filter(|t| !t.is_empty()) {
            Some(found) => return Some(found),
            None => debug!(provider = index, "token provider yielded nothing"),
        }
    }
    None
}

/// Like [`token`], formatted as an `Authorization` header value.
pub fn bearer(providers: &[&dyn TokenProvider], config: Option<&Config>) -> Option<String> {
    token(providers, config).map(|t| format!("Bearer {}", t))
}

const HELP: &[(&str, &str)] = &[
    (
        "token_literal(value)",
        "provider that always returns the given value; None disables lookup",
    ),
    (
        "token_config(config)",
        "reads the token from the cmr.token.value setting",
    ),
    (
        "token_file(config)",
        "reads the first non-comment line of cmr.token.file, or ~/.cmr_token[.env]",
    ),
    (
        "token_manager(config)",
        "runs cmr.token.manager.command, or the macOS keychain, and returns its output",
    ),
    (
        "token(providers, config)",
        "tries each provider in order and returns the first token found",
    ),
    (
        "bearer(providers, config)",
        "same lookup, formatted as 'Bearer <token>' for the Authorization header",
    ),
];

/// Describes the public token functions, optionally only those whose name
/// starts with `filter`.
pub fn help_text(filter: Option<&str>) -> String {
    let mut out = String::new();
    for (name, about) in HELP {
        if filter.is_some_and(|prefix| !name.starts_with(prefix)) {
            continue;
        }
        out.push_str(name);
        out.push_str(": ");
        out.push_str(about);
        out.push('\n');
    }
    out
}

/// Token file suffix for an environment name.
///
/// Production names map to no suffix; anything else becomes `.<env>`.
pub fn env_to_extension(env: Option<&str>) -> String {
    match env.map(str::to_lowercase).as_deref() {
        None | Some("") | Some("ops") | Some("prod") | Some("production") => String::new(),
        Some(other) => format!(".{}", other),
    }
}

/// Path of the token file: `cmr.token.file` verbatim, or `~/.cmr_token`
/// suffixed for the configured environment. `~` is left unexpanded.
pub fn token_file_path(config: Option<&Config>) -> String {
    if let Some(path) = config.and_then(|c| c.get(keys::TOKEN_FILE)) {
        return path.to_string();
    }
    let env = config.and_then(Config::env);
    format!("{}{}", TOKEN_FILE_BASE, env_to_extension(env))
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

fn manager_command(config: Option<&Config>) -> Vec<String> {
    if let Some(cmd) = config.and_then(|c| c.get(keys::TOKEN_MANAGER_COMMAND)) {
        return cmd.split_whitespace().map(str::to_string).collect();
    }

    let account = config
        .and_then(|c| c.get(keys::TOKEN_MANAGER_ACCOUNT))
        .map(str::to_string)
        .or_else(|| std::env::var("USER").ok())
        .unwrap_or_else(|| "user".to_string());
    let service = config
        .and_then(|c| c.get(keys::TOKEN_MANAGER_SERVICE))
        .unwrap_or(DEFAULT_MANAGER_SERVICE);

    ["security", "find-generic-password", "-a", account.as_str(), "-s", service, "-w"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
