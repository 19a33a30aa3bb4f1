//! File configuration for CLI defaults.
//!
//! One `key = value` per line. Values are double-quoted strings, non-negative
//! integers or `true`/`false`; `#` outside a string starts a comment.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};

const APP_DIR: &str = "animal-catalog";

/// Parsed config file. Every field is optional; CLI flags override.
#[derive(Debug, Clone, Default)]
pub(crate) struct FileConfig {
    pub(crate) database_path: Option<PathBuf>,
    pub(crate) search_api_key: Option<String>,
    pub(crate) search_engine_id: Option<String>,
    /// Override for the image search endpoint.
    pub(crate) search_base_url: Option<String>,
    pub(crate) animals_api_key: Option<String>,
    /// Override for the animal data endpoint.
    pub(crate) animals_base_url: Option<String>,
    pub(crate) verbosity: Option<VerbositySetting>,
    pub(crate) no_color: Option<bool>,
    pub(crate) http_connect_timeout_secs: Option<u64>,
    pub(crate) http_read_timeout_secs: Option<u64>,
    pub(crate) db_max_connections: Option<u32>,
    pub(crate) db_busy_timeout_ms: Option<u32>,
}

/// Log level preset for when no `-q`/`-v` flag is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    pub(crate) fn level(self) -> &'static str {
        match self {
            Self::Default => "info",
            Self::Verbose | Self::Debug => "debug",
            Self::Quiet => "error",
        }
    }
}

impl std::str::FromStr for VerbositySetting {
    type Err = anyhow::Error;

    fn from_str(label: &str) -> Result<Self> {
        Ok(match label {
            "default" => Self::Default,
            "verbose" => Self::Verbose,
            "quiet" => Self::Quiet,
            "debug" => Self::Debug,
            other => bail!("unknown verbosity '{other}' (expected default, verbose, quiet or debug)"),
        })
    }
}

/// A right-hand side before it is matched to a key.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RawValue {
    Text(String),
    Integer(u64),
    Bool(bool),
}

impl RawValue {
    fn parse(token: &str) -> Result<Self> {
        if let Some(inner) = token.strip_prefix('"') {
            let text = inner
                .strip_suffix('"')
                .ok_or_else(|| anyhow!("unterminated string"))?;
            return Ok(Self::Text(text.to_string()));
        }
        match token {
            "true" => return Ok(Self::Bool(true)),
            "false" => return Ok(Self::Bool(false)),
            _ => {}
        }
        token
            .parse::<u64>()
            .map(Self::Integer)
            .map_err(|_| anyhow!("expected a quoted string, a non-negative integer or true/false"))
    }

    fn text(self) -> Result<String> {
        match self {
            Self::Text(text) => Ok(text),
            other => bail!("expected a quoted string, got {other:?}"),
        }
    }

    fn integer(self) -> Result<u64> {
        match self {
            Self::Integer(n) => Ok(n),
            other => bail!("expected an integer, got {other:?}"),
        }
    }

    fn boolean(self) -> Result<bool> {
        match self {
            Self::Bool(b) => Ok(b),
            other => bail!("expected true or false, got {other:?}"),
        }
    }

    fn small_integer(self) -> Result<u32> {
        let n = self.integer()?;
        u32::try_from(n).map_err(|_| anyhow!("{n} does not fit in 32 bits"))
    }
}

impl FileConfig {
    fn assign(&mut self, key: &str, value: RawValue) -> Result<()> {
        match key {
            "database_path" => self.database_path = Some(PathBuf::from(value.text()?)),
            "search_api_key" => self.search_api_key = Some(value.text()?),
            "search_engine_id" => self.search_engine_id = Some(value.text()?),
            "search_base_url" => self.search_base_url = Some(value.text()?),
            "animals_api_key" => self.animals_api_key = Some(value.text()?),
            "animals_base_url" => self.animals_base_url = Some(value.text()?),
            "verbosity" => self.verbosity = Some(value.text()?.parse()?),
            "no_color" => self.no_color = Some(value.boolean()?),
            "http_connect_timeout_secs" => self.http_connect_timeout_secs = Some(value.integer()?),
            "http_read_timeout_secs" => self.http_read_timeout_secs = Some(value.integer()?),
            "db_max_connections" => self.db_max_connections = Some(value.small_integer()?),
            "db_busy_timeout_ms" => self.db_busy_timeout_ms = Some(value.small_integer()?),
            unknown => bail!("Unknown configuration key: '{unknown}'"),
        }
        Ok(())
    }

    /// Checks ranges and URLs once every line is read.
    pub(crate) fn validate(&self) -> Result<()> {
        check_range("http_connect_timeout_secs", self.http_connect_timeout_secs, 1, 3600)?;
        check_range("http_read_timeout_secs", self.http_read_timeout_secs, 1, 3600)?;
        check_range("db_max_connections", self.db_max_connections.map(u64::from), 1, 20)?;
        check_range("db_busy_timeout_ms", self.db_busy_timeout_ms.map(u64::from), 0, 120_000)?;
        for (field, value) in [
            ("search_base_url", &self.search_base_url),
            ("animals_base_url", &self.animals_base_url),
        ] {
            if let Some(value) = value {
                url::Url::parse(value)
                    .with_context(|| format!("Invalid config value for `{field}`: '{value}' is not a URL"))?;
            }
        }
        Ok(())
    }
}

fn check_range(field: &str, value: Option<u64>, min: u64, max: u64) -> Result<()> {
    match value {
        Some(value) if !(min..=max).contains(&value) => {
            bail!("Invalid config value for `{field}`: {value}. Expected range: {min}..={max}")
        }
        _ => Ok(()),
    }
}

/// `$XDG_CONFIG_HOME/animal-catalog/config.toml`, else under `$HOME/.config`.
pub(crate) fn resolve_default_config_path() -> Option<PathBuf> {
    let base = non_empty_env("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| non_empty_env("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join(APP_DIR).join("config.toml"))
}

/// `$XDG_DATA_HOME/animal-catalog/catalog.db`, else under
/// `$HOME/.local/share`, else `./catalog.db`.
pub(crate) fn resolve_default_database_path() -> PathBuf {
    non_empty_env("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(|| non_empty_env("HOME").map(|home| PathBuf::from(home).join(".local").join("share")))
        .map_or_else(
            || PathBuf::from("catalog.db"),
            |base| base.join(APP_DIR).join("catalog.db"),
        )
}

fn non_empty_env(name: &str) -> Option<OsString> {
    env::var_os(name).filter(|value| !value.is_empty())
}

/// Loads `explicit` if given (must exist), else the default path if present.
pub(crate) fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match resolve_default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(FileConfig::default()),
        },
    };
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config(&raw).with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (index, line) in raw.lines().enumerate() {
        let line_no = index + 1;
        let line = without_comment(line).trim();
        if line.is_empty() {
            continue;
        }
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| anyhow!("Invalid config syntax on line {line_no}: expected key = value"))?;
        let key = key.trim();
        RawValue::parse(value.trim())
            .and_then(|value| cfg.assign(key, value))
            .with_context(|| format!("Invalid `{key}` on line {line_no}"))?;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn without_comment(line: &str) -> &str {
    let mut quoted = false;
    for (index, ch) in line.char_indices() {
        if ch == '"' {
            quoted = !quoted;
        } else if ch == '#' && !quoted {
            return &line[..index];
        }
    }
    line
}
