use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration keys read by this crate.
pub mod keys {
    /// Deployment environment: `ops`, `uat`, `sit`, ...
    pub const ENV: &str = "env";
    /// Overrides the environment-derived base URL.
    pub const URL: &str = "cmr.url";
    /// Request timeout, in seconds.
    pub const TIMEOUT: &str = "cmr.timeout";
    pub const TOKEN_VALUE: &str = "cmr.token.value";
    pub const TOKEN_FILE: &str = "cmr.token.file";
    pub const TOKEN_MANAGER_COMMAND: &str = "cmr.token.manager.command";
    pub const TOKEN_MANAGER_ACCOUNT: &str = "cmr.token.manager.account";
    pub const TOKEN_MANAGER_SERVICE: &str = "cmr.token.manager.service";
}

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// String key/value settings passed explicitly to every call.
///
/// A missing key and an empty value mean the same thing to every consumer in
/// this crate.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Config {
    values: BTreeMap<String, String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads settings from an rc file, then applies `CMR_ENV`.
    ///
    /// The rc file is looked up in this order:
    /// - `CMR_RC` (explicit path)
    /// - `./.cmrrc`
    /// - `~/.cmrrc`
    ///
    /// Having no rc file at all is not an error.
    pub fn load() -> Result<Self> {
        let mut config = Config::new();
        for rc_path in rc_candidates() {
            if rc_path.exists() {
                config = Self::from_file(&rc_path)?;
                break;
            }
        }

        if let Ok(env) = std::env::var("CMR_ENV") {
            config.set(keys::ENV, env);
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration file {}", path.display()))?;
        Ok(Self::parse(&text))
    }

    /// Parses `key: value` lines. Blank lines and `#` comments are skipped,
    /// surrounding quotes are removed from values.
    pub fn parse(text: &str) -> Self {
        let mut config = Config::new();
        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((k, v)) = line.split_once(':') {
                let k = k.trim();
                if !k.is_empty() {
                    config.set(k, strip_quotes(v));
                }
            }
        }
        config
    }

    /// Returns the value for `key`, treating empty values as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn env(&self) -> Option<&str> {
        self.get(keys::ENV)
    }

    pub fn timeout(&self) -> Duration {
        self.get(keys::TIMEOUT)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT)
    }

    /// Base URL of the CMR deployment selected by `cmr.url` or `env`.
    pub fn base_url(&self) -> String {
        if let Some(url) = self.get(keys::URL) {
            return url.trim_end_matches('/').to_string();
        }
        match self.env().map(str::to_lowercase).as_deref() {
            None | Some("ops") | Some("prod") | Some("production") => {
                "https://cmr.earthdata.nasa.gov".to_string()
            }
            Some(env) => format!("https://cmr.{}.earthdata.nasa.gov", env),
        }
    }
}

// Values may hold tokens, so only keys are printed.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Config {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut config = Config::new();
        for (k, v) in iter {
            config.set(k, v);
        }
        config
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Config {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn rc_candidates() -> Vec<PathBuf> {
    if let Ok(p) = std::env::var("CMR_RC") {
        return vec![PathBuf::from(p)];
    }

    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        v.push(cwd.join(".cmrrc"));
    }
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(".cmrrc"));
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_skips_comments_and_strips_quotes() {
        let config = Config::parse(
            "# local settings\n\nenv: uat\ncmr.url: \"http://localhost:3003/\"\ncmr.token.file: '/tmp/token'\nnot a pair\n",
        );
        assert_eq!(config.env(), Some("uat"));
        assert_eq!(config.get(keys::URL), Some("http://localhost:3003/"));
        assert_eq!(config.get(keys::TOKEN_FILE), Some("/tmp/token"));
        assert_eq!(config.get("not a pair"), None);
    }

    #[test]
    fn empty_values_read_as_absent() {
        let config = Config::from([(keys::ENV, ""), (keys::TOKEN_VALUE, "abc")]);
        assert_eq!(config.env(), None);
        assert_eq!(config.get(keys::TOKEN_VALUE), Some("abc"));
        assert_eq!(config.get("missing"), None);
    }

    #[test]
    fn from_file_reads_rc() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "env: sit\ncmr.timeout: 5").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.env(), Some("sit"));
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn from_file_reports_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_file(&dir.path().join("absent")).unwrap_err();
        assert!(err.to_string().contains("failed to read configuration file"));
    }

    #[test]
    fn timeout_falls_back_on_garbage() {
        let config = Config::new().with(keys::TIMEOUT, "soon");
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn base_url_follows_env() {
        let url = |env: &str| Config::new().with(keys::ENV, env).base_url();
        assert_eq!(Config::new().base_url(), "https://cmr.earthdata.nasa.gov");
        assert_eq!(url("OPS"), "https://cmr.earthdata.nasa.gov");
        assert_eq!(url("production"), "https://cmr.earthdata.nasa.gov");
        assert_eq!(url("uat"), "https://cmr.uat.earthdata.nasa.gov");
        assert_eq!(url("Sit"), "https://cmr.sit.earthdata.nasa.gov");
    }

    #[test]
    fn base_url_override_wins() {
        let config = Config::from([(keys::ENV, "uat"), (keys::URL, "http://127.0.0.1:8080/")]);
        assert_eq!(config.base_url(), "http://127.0.0.1:8080");
    }

    #[test]
    fn debug_hides_values() {
        let config = Config::new().with(keys::TOKEN_VALUE, "secret-value");
        let printed = format!("{:?}", config);
        assert!(printed.contains(keys::TOKEN_VALUE));
        assert!(!printed.contains("secret-value"));
    }
}
