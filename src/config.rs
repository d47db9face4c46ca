use crate::error::{Error, Result};
use serde::Deserialize;
use serde::de::{Deserializer, MapAccess, Visitor};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_CONFIG_PATH: &str = "watch-class.toml";

pub const DEFAULT_CONFIG_TOML: &str = include_str!("default_config.toml");

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub watch_dirs: Vec<String>,
    pub extensions: Vec<String>,
    pub debounce_ms: u64,
    pub units: Units,
    pub theme: Theme,
    pub media_queries: MediaQueries,
    pub exclude: Exclude,
    pub output: OutputConfig,
    pub rules: Vec<UserRule>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub units: Units,
    pub theme: Theme,
    pub media_queries: Vec<Breakpoint>,
    pub exclude: Exclude,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Units {
    pub default: String,
    pub spacing: String,
    pub font_size: String,
    pub line_height: String,
    pub border_width: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(default)]
pub struct Theme {
    pub colors: BTreeMap<String, String>,
    pub spacing: BTreeMap<String, String>,
    pub border_radius: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint {
    pub name: String,
    pub min_width: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaQueries(pub Vec<Breakpoint>);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(default)]
pub struct Exclude {
    pub patterns: Vec<String>,
    pub class_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: String,
    pub file_name: String,
    pub extension: String,
    pub minify: bool,
    pub source_map: bool,
    pub important: bool,
    pub important_scope: ImportantScope,
    pub class_prefix: String,
    pub unprocessed_classes: UnprocessedClasses,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImportantScope {
    #[default]
    All,
    /// Only the text before the first `;` (legacy output).
    First,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UnprocessedClasses {
    pub enable: bool,
    pub position: ReportPosition,
    pub format: ReportFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportPosition {
    Top,
    #[default]
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Line,
    #[default]
    Inline,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserRule {
    pub pattern: String,
    pub template: String,
}

pub fn load(path: &Path) -> Result<Config> {
    let text = fs::read_to_string(path).map_err(|err| Error::io(path, err))?;
    parse(&text).map_err(|message| Error::config(path, message))
}

pub fn load_or_default(path: &Path) -> Result<Config> {
    match fs::read_to_string(path) {
        Ok(text) => {
            let config = parse(&text).map_err(|message| Error::config(path, message))?;
            info!(path = %path.display(), "loaded config");
            Ok(config)
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            warn!(path = %path.display(), "config file not found, using defaults");
            Ok(Config::default())
        }
        Err(err) => Err(Error::io(path, err)),
    }
}

fn parse(text: &str) -> std::result::Result<Config, String> {
    toml::from_str(text).map_err(|err| err.to_string())
}

impl Config {
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        validate_breakpoints(&self.media_queries.0)?;
        Ok(ResolvedConfig {
            units: self.units.clone(),
            theme: self.theme.clone(),
            media_queries: self.media_queries.0.clone(),
            exclude: self.exclude.clone(),
            output: self.output.clone(),
        })
    }
}

fn validate_breakpoints(breakpoints: &[Breakpoint]) -> Result<()> {
    let mut seen = HashSet::new();
    for breakpoint in breakpoints {
        let name = breakpoint.name.as_str();
        if name.is_empty() {
            return Err(Error::invalid_breakpoint(name, "name must not be empty"));
        }
        if name.contains(':') || name.chars().any(char::is_whitespace) {
            return Err(Error::invalid_breakpoint(
                name,
                "name must not contain `:` or whitespace",
            ));
        }
        if breakpoint.min_width.trim().is_empty() {
            return Err(Error::invalid_breakpoint(name, "min-width must not be empty"));
        }
        if !seen.insert(name) {
            return Err(Error::invalid_breakpoint(name, "listed more than once"));
        }
    }
    Ok(())
}

impl OutputConfig {
    pub fn file_path(&self) -> PathBuf {
        Path::new(&self.dir).join(format!("{}{}", self.file_name, self.extension))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watch_dirs: vec!["./src".to_string()],
            extensions: [".js", ".jsx", ".ts", ".tsx", ".vue", ".html"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            debounce_ms: 300,
            units: Units::default(),
            theme: Theme::default(),
            media_queries: MediaQueries::default(),
            exclude: Exclude::default(),
            output: OutputConfig::default(),
            rules: Vec::new(),
        }
    }
}

impl Default for Units {
    fn default() -> Self {
        Self {
            default: "px".to_string(),
            spacing: "px".to_string(),
            font_size: "px".to_string(),
            line_height: String::new(),
            border_width: "px".to_string(),
        }
    }
}

impl Default for MediaQueries {
    fn default() -> Self {
        Self(
            [("sm", "640px"), ("md", "768px"), ("lg", "1024px"), ("xl", "1280px")]
                .iter()
                .map(|(name, min_width)| Breakpoint {
                    name: name.to_string(),
                    min_width: min_width.to_string(),
                })
                .collect(),
        )
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "./src/styles".to_string(),
            file_name: "generated".to_string(),
            extension: ".css".to_string(),
            minify: false,
            source_map: false,
            important: false,
            important_scope: ImportantScope::default(),
            class_prefix: String::new(),
            unprocessed_classes: UnprocessedClasses::default(),
        }
    }
}

impl Default for UnprocessedClasses {
    fn default() -> Self {
        Self {
            enable: true,
            position: ReportPosition::default(),
            format: ReportFormat::default(),
        }
    }
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        let config = Config::default();
        Self {
            units: config.units,
            theme: config.theme,
            media_queries: config.media_queries.0,
            exclude: config.exclude,
            output: config.output,
        }
    }
}

impl<'de> Deserialize<'de> for MediaQueries {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct BreakpointTable;

        impl<'de> Visitor<'de> for BreakpointTable {
            type Value = MediaQueries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a table of breakpoint names to min-width values")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut breakpoints = Vec::new();
                while let Some((name, min_width)) = map.next_entry::<String, String>()? {
                    breakpoints.push(Breakpoint { name, min_width });
                }
                Ok(MediaQueries(breakpoints))
            }
        }

        deserializer.deserialize_map(BreakpointTable)
    }
}
