use crate::error::ConfigError;

use std::env;
use std::num::NonZeroUsize;
use std::str::FromStr;

pub const ENV_MODE: &str = "SWITCHBACK_ENV";
pub const ENV_CACHE_CAPACITY: &str = "SWITCHBACK_CACHE_CAPACITY";

const DEFAULT_CACHE_CAPACITY: usize = 8192;

/// Selects how much the built-in fallback responses reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Minimal plain-text bodies.
    #[default]
    Production,
    /// HTML diagnostic pages with the unmatched path or the error chain.
    Development,
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" => Ok(Self::Development),
            _ => Err(ConfigError::InvalidMode(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub mode: Mode,
    pub cache_capacity: NonZeroUsize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::Production,
            cache_capacity: NonZeroUsize::new(DEFAULT_CACHE_CAPACITY)
                .unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl Config {
    /// Reads `SWITCHBACK_ENV` and `SWITCHBACK_CACHE_CAPACITY`; unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(mode) = lookup(ENV_MODE) {
            config.mode = mode.parse()?;
        }

        if let Some(raw) = lookup(ENV_CACHE_CAPACITY) {
            let capacity: usize = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_CACHE_CAPACITY,
                value: raw.clone(),
            })?;
            config = config.with_cache_capacity(capacity)?;
        }

        Ok(config)
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Result<Self, ConfigError> {
        self.cache_capacity = NonZeroUsize::new(capacity).ok_or(ConfigError::ZeroCacheCapacity)?;
        Ok(self)
    }

    pub fn is_development(&self) -> bool {
        self.mode == Mode::Development
    }
}
