use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("rule `{rule}` failed to generate declarations for `{token}`: {source}")]
    Generate {
        token: String,
        rule: String,
        #[source]
        source: RuleError,
    },

    #[error("invalid rule pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid glob `{pattern}`: {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("config {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("invalid breakpoint `{name}`: {message}")]
    InvalidBreakpoint { name: String, message: String },

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("watch error: {0}")]
    Watch(String),
}

impl Error {
    pub fn generate(token: impl Into<String>, rule: impl Into<String>, source: RuleError) -> Self {
        Self::Generate {
            token: token.into(),
            rule: rule.into(),
            source,
        }
    }

    pub fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn invalid_breakpoint(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidBreakpoint {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("`{value}` is not a representable integer")]
    InvalidNumber { value: String },

    #[error("template references capture group {index}, which the pattern does not define")]
    MissingCapture { index: String },

    #[error("theme has no entry `{key}`")]
    UnknownThemeKey { key: String },

    #[error("`{value}` is not an accepted value")]
    UnknownValue { value: String },
}
