use crate::config::{ResolvedConfig, Theme, UserRule};
use crate::error::{Error, Result, RuleError};
use crate::values::{Unit, parse_magnitude, percent_fraction, resolve_color};
use regex::{Captures, Regex};
use std::collections::BTreeMap;

pub type CustomFn = fn(&Captures<'_>, &ResolvedConfig) -> std::result::Result<String, RuleError>;

pub type Aliases = &'static [(&'static str, &'static str)];

const NO_ALIASES: Aliases = &[];

const DIRECTIONS: [(&str, &str); 4] = [
    ("t", "top"),
    ("r", "right"),
    ("b", "bottom"),
    ("l", "left"),
];

const MAGNITUDE: &str = r"(-?\d+|--\d+)";

#[derive(Debug, Clone)]
pub enum Generator {
    Numeric { property: String, unit: Unit },
    Enum { property: String, aliases: Aliases },
    Color { property: String },
    Static(String),
    Theme { property: String, scale: ThemeScale },
    Template(String),
    Custom(CustomFn),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeScale {
    Spacing,
    BorderRadius,
}

#[derive(Debug, Clone)]
pub struct Rule {
    source: String,
    pattern: Regex,
    generator: Generator,
}

impl Rule {
    pub fn new(pattern: &str, generator: Generator) -> Result<Self> {
        let anchored = format!("^(?:{})$", pattern);
        let compiled = Regex::new(&anchored).map_err(|source| Error::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            source: pattern.to_string(),
            pattern: compiled,
            generator,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn captures<'t>(&self, body: &'t str) -> Option<Captures<'t>> {
        self.pattern.captures(body)
    }

    pub fn generate(
        &self,
        caps: &Captures<'_>,
        config: &ResolvedConfig,
    ) -> std::result::Result<String, RuleError> {
        match &self.generator {
            Generator::Numeric { property, unit } => {
                let value = parse_magnitude(group(caps, 1))?;
                Ok(format!("{}: {}{};", property, value, config.units.get(*unit)))
            }
            Generator::Enum { property, aliases } => {
                let value = group(caps, 1);
                let keyword = aliases
                    .iter()
                    .find(|(from, _)| *from == value)
                    .map(|(_, to)| *to)
                    .unwrap_or(value);
                Ok(format!("{}: {};", property, keyword))
            }
            Generator::Color { property } => {
                let fragment = group(caps, caps.len() - 1);
                Ok(format!(
                    "{}: {};",
                    property,
                    resolve_color(fragment, &config.theme)
                ))
            }
            Generator::Static(declarations) => Ok(declarations.clone()),
            Generator::Theme { property, scale } => {
                let key = group(caps, 1);
                let table = match scale {
                    ThemeScale::Spacing => &config.theme.spacing,
                    ThemeScale::BorderRadius => &config.theme.border_radius,
                };
                let value = table.get(key).ok_or_else(|| RuleError::UnknownThemeKey {
                    key: key.to_string(),
                })?;
                Ok(format!("{}: {};", property, value))
            }
            Generator::Template(template) => expand_template(template, &self.pattern, caps),
            Generator::Custom(generate) => generate(caps, config),
        }
    }
}

/// Rules are tried in push order and the first whole-body match wins, so order is part of the output.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    pub fn builtin(config: &ResolvedConfig) -> Result<Self> {
        let mut rules = builtin_rules()?;
        rules.extend(theme_rules(&config.theme)?);
        Ok(Self { rules })
    }

    /// [`RuleTable::builtin`] with `user_rules` appended, so built-ins win on overlap.
    pub fn with_user_rules(config: &ResolvedConfig, user_rules: &[UserRule]) -> Result<Self> {
        let mut table = Self::builtin(config)?;
        for user_rule in user_rules {
            table.push(Rule::new(
                &user_rule.pattern,
                Generator::Template(user_rule.template.clone()),
            )?);
        }
        Ok(table)
    }

    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub(crate) fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn find_match<'a, 't>(&'a self, body: &'t str) -> Option<(usize, &'a Rule, Captures<'t>)> {
        self.rules
            .iter()
            .enumerate()
            .find_map(|(idx, rule)| rule.captures(body).map(|caps| (idx, rule, caps)))
    }
}

impl From<Vec<Rule>> for RuleTable {
    fn from(rules: Vec<Rule>) -> Self {
        Self { rules }
    }
}

pub fn simple_rule(prefix: &str, property: &str, unit: Unit) -> Result<Rule> {
    Rule::new(
        &format!("{}-{}", regex::escape(prefix), MAGNITUDE),
        Generator::Numeric {
            property: property.to_string(),
            unit,
        },
    )
}

pub fn size_rule(prefix: &str, property: &str, unit: Unit) -> Result<Rule> {
    Rule::new(
        &format!(r"{}-(\d+)", regex::escape(prefix)),
        Generator::Numeric {
            property: property.to_string(),
            unit,
        },
    )
}

pub fn directional_rules(prefix: &str, property: &str, unit: Unit) -> Result<Vec<Rule>> {
    DIRECTIONS
        .iter()
        .map(|(short, side)| {
            Rule::new(
                &format!("{}{}-{}", regex::escape(prefix), short, MAGNITUDE),
                Generator::Numeric {
                    property: format!("{}-{}", property, side),
                    unit,
                },
            )
        })
        .collect()
}

pub fn enum_rule(prefix: &str, property: &str, values: &[&str], aliases: Aliases) -> Result<Rule> {
    Rule::new(
        &format!("{}-({})", regex::escape(prefix), alternation(values)),
        Generator::Enum {
            property: property.to_string(),
            aliases,
        },
    )
}

pub fn keyword_rule(property: &str, values: &[&str], aliases: Aliases) -> Result<Rule> {
    Rule::new(
        &format!("({})", alternation(values)),
        Generator::Enum {
            property: property.to_string(),
            aliases,
        },
    )
}

pub fn color_rule(prefixes: &[&str], property: &str) -> Result<Rule> {
    Rule::new(
        &format!("({})-(.+)", alternation(prefixes)),
        Generator::Color {
            property: property.to_string(),
        },
    )
}

pub fn static_rule(class: &str, declarations: &str) -> Result<Rule> {
    Rule::new(
        &regex::escape(class),
        Generator::Static(declarations.to_string()),
    )
}

pub fn custom_rule(pattern: &str, generate: CustomFn) -> Result<Rule> {
    Rule::new(pattern, Generator::Custom(generate))
}

fn alternation(values: &[&str]) -> String {
    values
        .iter()
        .map(|value| regex::escape(value))
        .collect::<Vec<_>>()
        .join("|")
}

fn group<'t>(caps: &Captures<'t>, idx: usize) -> &'t str {
    caps.get(idx).map(|m| m.as_str()).unwrap_or("")
}

fn builtin_rules() -> Result<Vec<Rule>> {
    let mut rules = vec![
        simple_rule("w", "width", Unit::Default)?,
        simple_rule("h", "height", Unit::Default)?,
        simple_rule("m", "margin", Unit::Spacing)?,
        simple_rule("p", "padding", Unit::Spacing)?,
    ];
    rules.extend(directional_rules("m", "margin", Unit::Spacing)?);
    rules.extend(directional_rules("p", "padding", Unit::Spacing)?);

    rules.extend([
        keyword_rule(
            "display",
            &["block", "inline", "inline-block", "flex", "grid", "none"],
            NO_ALIASES,
        )?,
        enum_rule("float", "float", &["left", "right", "none"], NO_ALIASES)?,
        enum_rule(
            "object",
            "object-fit",
            &["contain", "cover", "fill", "none", "scale-down"],
            NO_ALIASES,
        )?,
        enum_rule(
            "object",
            "object-position",
            &["top", "bottom", "center", "left", "right"],
            NO_ALIASES,
        )?,
        enum_rule(
            "overflow-x",
            "overflow-x",
            &["auto", "hidden", "visible", "scroll"],
            NO_ALIASES,
        )?,
        enum_rule(
            "overflow-y",
            "overflow-y",
            &["auto", "hidden", "visible", "scroll"],
            NO_ALIASES,
        )?,
        enum_rule(
            "overflow",
            "overflow",
            &["auto", "hidden", "visible", "scroll"],
            NO_ALIASES,
        )?,
        keyword_rule(
            "position",
            &["static", "relative", "absolute", "fixed", "sticky"],
            NO_ALIASES,
        )?,
        keyword_rule(
            "visibility",
            &["visible", "invisible", "collapse"],
            &[("invisible", "hidden")],
        )?,
        enum_rule(
            "flex",
            "flex-wrap",
            &["wrap", "nowrap", "wrap-reverse"],
            NO_ALIASES,
        )?,
        enum_rule(
            "items",
            "align-items",
            &["start", "end", "center", "baseline", "stretch"],
            NO_ALIASES,
        )?,
        enum_rule(
            "text",
            "text-align",
            &["left", "right", "center", "justify"],
            NO_ALIASES,
        )?,
        enum_rule(
            "border",
            "border-style",
            &["solid", "dashed", "dotted", "none"],
            NO_ALIASES,
        )?,
        enum_rule(
            "cursor",
            "cursor",
            &[
                "pointer",
                "default",
                "not-allowed",
                "wait",
                "text",
                "move",
                "grab",
            ],
            NO_ALIASES,
        )?,
        keyword_rule(
            "text-transform",
            &["uppercase", "lowercase", "capitalize"],
            NO_ALIASES,
        )?,
        enum_rule(
            "break",
            "word-break",
            &["normal", "all", "words"],
            &[("all", "break-all"), ("words", "break-word")],
        )?,
        enum_rule(
            "select",
            "user-select",
            &["none", "text", "all", "auto", "contain"],
            NO_ALIASES,
        )?,
        enum_rule("scroll", "scroll-behavior", &["auto", "smooth"], NO_ALIASES)?,
        size_rule("fs", "font-size", Unit::FontSize)?,
        custom_rule(r"my-(\d+)", |caps, config| {
            let value = spacing_value(caps, config)?;
            Ok(format!("margin-top: {value}; margin-bottom: {value};"))
        })?,
        static_rule("mx-auto", "margin-left: auto; margin-right: auto;")?,
        custom_rule(r"py-(\d+)", |caps, config| {
            let value = spacing_value(caps, config)?;
            Ok(format!("padding-top: {value}; padding-bottom: {value};"))
        })?,
        color_rule(&["c", "color", "text"], "color")?,
        color_rule(&["bg", "background"], "background-color")?,
    ]);

    for (_, side) in DIRECTIONS {
        rules.push(simple_rule(side, side, Unit::Default)?);
    }

    rules.extend([
        simple_rule("z", "z-index", Unit::None)?,
        enum_rule(
            "flex",
            "flex-direction",
            &["row", "col", "row-reverse", "col-reverse"],
            &[("col", "column"), ("col-reverse", "column-reverse")],
        )?,
        custom_rule(r"flex-(auto|\d+)", |caps, _| {
            Ok(format!("flex: {};", group(caps, 1)))
        })?,
        size_rule("gap", "gap", Unit::Spacing)?,
        size_rule("gap-x", "column-gap", Unit::Spacing)?,
        size_rule("gap-y", "row-gap", Unit::Spacing)?,
        enum_rule(
            "justify",
            "justify-content",
            &["start", "end", "center", "between", "around", "evenly"],
            &[
                ("between", "space-between"),
                ("around", "space-around"),
                ("evenly", "space-evenly"),
            ],
        )?,
        size_rule("min-w", "min-width", Unit::Default)?,
        size_rule("max-w", "max-width", Unit::Default)?,
        size_rule("min-h", "min-height", Unit::Default)?,
        size_rule("max-h", "max-height", Unit::Default)?,
        enum_rule(
            "fw",
            "font-weight",
            &[
                "100", "200", "300", "400", "500", "600", "700", "800", "900", "bold",
            ],
            NO_ALIASES,
        )?,
        size_rule("line", "line-height", Unit::LineHeight)?,
        custom_rule(r"clamp-(\d+)", |caps, _| {
            let lines = parse_magnitude(group(caps, 1))?;
            Ok(format!(
                "display: -webkit-box; -webkit-box-orient: vertical; -webkit-line-clamp: {}; overflow: hidden;",
                lines
            ))
        })?,
        size_rule("rounded", "border-radius", Unit::Default)?,
        size_rule("border", "border-width", Unit::BorderWidth)?,
        color_rule(&["border"], "border-color")?,
        custom_rule(r"opacity-(\d+)", |caps, _| {
            Ok(format!("opacity: {};", percent_fraction(group(caps, 1))?))
        })?,
        static_rule("w-full", "width: 100%;")?,
        static_rule("h-full", "height: 100%;")?,
        static_rule("w-screen", "width: 100vw;")?,
        static_rule("h-screen", "height: 100vh;")?,
        static_rule("min-w-screen", "min-width: 100vw;")?,
        static_rule("min-h-screen", "min-height: 100vh;")?,
        static_rule("max-w-screen", "max-width: 100vw;")?,
        static_rule("max-h-screen", "max-height: 100vh;")?,
        static_rule("rounded-full", "border-radius: 9999px;")?,
        custom_rule(r"rotate-(-?\d+)", |caps, _| {
            let degrees = parse_magnitude(group(caps, 1))?;
            Ok(format!("transform: rotate({}deg);", degrees))
        })?,
        custom_rule(r"scale-(-?\d+)", |caps, _| {
            let factor = parse_magnitude(group(caps, 1))?;
            Ok(format!("transform: scale({});", factor))
        })?,
        enum_rule(
            "shadow",
            "box-shadow",
            &["sm", "md", "lg", "xl", "none"],
            &[
                ("sm", "0 1px 2px 0 rgba(0, 0, 0, 0.05)"),
                ("md", "0 4px 6px -1px rgba(0, 0, 0, 0.1)"),
                ("lg", "0 10px 15px -3px rgba(0, 0, 0, 0.1)"),
                ("xl", "0 20px 25px -5px rgba(0, 0, 0, 0.1)"),
            ],
        )?,
        enum_rule(
            "transition",
            "transition",
            &["none", "all", "fast", "slow"],
            &[
                ("all", "all 0.3s ease"),
                ("fast", "all 0.15s ease"),
                ("slow", "all 0.5s ease"),
            ],
        )?,
        keyword_rule(
            "text-decoration",
            &["underline", "line-through", "no-underline"],
            &[("no-underline", "none")],
        )?,
        keyword_rule(
            "white-space",
            &["whitespace", "nowrap", "pre", "pre-line", "pre-wrap"],
            &[("whitespace", "normal")],
        )?,
        enum_rule(
            "pointer",
            "pointer-events",
            &["events", "none", "auto"],
            &[("events", "auto")],
        )?,
        custom_rule(r"scrollbar-(hide|show)", |caps, _| {
            Ok(match group(caps, 1) {
                "hide" => "scrollbar-width: none; &::-webkit-scrollbar { display: none; }",
                _ => "scrollbar-width: auto;",
            }
            .to_string())
        })?,
    ]);

    Ok(rules)
}

fn spacing_value(
    caps: &Captures<'_>,
    config: &ResolvedConfig,
) -> std::result::Result<String, RuleError> {
    let value = parse_magnitude(group(caps, 1))?;
    Ok(format!("{}{}", value, config.units.spacing))
}

fn theme_rules(theme: &Theme) -> Result<Vec<Rule>> {
    let mut rules = Vec::new();

    if let Some(keys) = key_alternation(&theme.spacing) {
        for (prefix, property) in [("m", "margin"), ("p", "padding"), ("gap", "gap")] {
            rules.push(theme_rule(prefix, property.to_string(), &keys, ThemeScale::Spacing)?);
        }
        for (prefix, property) in [("m", "margin"), ("p", "padding")] {
            for (short, side) in DIRECTIONS {
                rules.push(theme_rule(
                    &format!("{}{}", prefix, short),
                    format!("{}-{}", property, side),
                    &keys,
                    ThemeScale::Spacing,
                )?);
            }
        }
    }

    if let Some(keys) = key_alternation(&theme.border_radius) {
        rules.push(theme_rule(
            "rounded",
            "border-radius".to_string(),
            &keys,
            ThemeScale::BorderRadius,
        )?);
    }

    Ok(rules)
}

fn theme_rule(prefix: &str, property: String, keys: &str, scale: ThemeScale) -> Result<Rule> {
    Rule::new(
        &format!("{}-({})", regex::escape(prefix), keys),
        Generator::Theme { property, scale },
    )
}

fn key_alternation(table: &BTreeMap<String, String>) -> Option<String> {
    if table.is_empty() {
        return None;
    }
    let keys: Vec<&str> = table.keys().map(String::as_str).collect();
    Some(alternation(&keys))
}

fn expand_template(
    template: &str,
    pattern: &Regex,
    caps: &Captures<'_>,
) -> std::result::Result<String, RuleError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(idx) = rest.find('$') {
        out.push_str(&rest[..idx]);
        let after = &rest[idx + 1..];
        if let Some(stripped) = after.strip_prefix('$') {
            out.push('$');
            rest = stripped;
            continue;
        }

        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => {
                    out.push('$');
                    rest = after;
                    continue;
                }
            }
        } else {
            let digits = after.bytes().take_while(u8::is_ascii_digit).count();
            if digits == 0 {
                out.push('$');
                rest = after;
                continue;
            }
            (&after[..digits], digits)
        };

        out.push_str(capture_value(name, pattern, caps)?);
        rest = &after[consumed..];
    }

    out.push_str(rest);
    Ok(out)
}

fn capture_value<'t>(
    name: &str,
    pattern: &Regex,
    caps: &Captures<'t>,
) -> std::result::Result<&'t str, RuleError> {
    let missing = || RuleError::MissingCapture {
        index: name.to_string(),
    };
    if !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()) {
        let idx = name.parse::<usize>().map_err(|_| missing())?;
        if idx >= caps.len() {
            return Err(missing());
        }
        return Ok(group(caps, idx));
    }
    if !pattern.capture_names().flatten().any(|known| known == name) {
        return Err(missing());
    }
    Ok(caps.name(name).map(|m| m.as_str()).unwrap_or(""))
}

#[cfg(test)]
mod tests {
    use super::{
        Generator, Rule, RuleTable, directional_rules, enum_rule, simple_rule, static_rule,
    };
    use crate::config::{ResolvedConfig, UserRule};
    use crate::error::{Error, RuleError};
    use crate::values::Unit;

    fn generate(table: &RuleTable, body: &str, config: &ResolvedConfig) -> Option<String> {
        let (_, rule, caps) = table.find_match(body)?;
        Some(rule.generate(&caps, config).expect("generator should succeed"))
    }

    fn builtin(body: &str) -> Option<String> {
        let config = ResolvedConfig::default();
        let table = RuleTable::builtin(&config).expect("builtin table");
        generate(&table, body, &config)
    }

    #[test]
    fn numeric_rules_render_with_unit() {
        assert_eq!(builtin("w-100").as_deref(), Some("width: 100px;"));
        assert_eq!(builtin("mt-8").as_deref(), Some("margin-top: 8px;"));
        assert_eq!(builtin("mt--8").as_deref(), Some("margin-top: -8px;"));
        assert_eq!(builtin("pl--12").as_deref(), Some("padding-left: -12px;"));
        assert_eq!(builtin("fs-16").as_deref(), Some("font-size: 16px;"));
        assert_eq!(builtin("line-24").as_deref(), Some("line-height: 24;"));
        assert_eq!(builtin("z-10").as_deref(), Some("z-index: 10;"));
        assert_eq!(builtin("top--4").as_deref(), Some("top: -4px;"));
    }

    #[test]
    fn numeric_rules_follow_configured_units() {
        let mut config = ResolvedConfig::default();
        config.units.spacing = "rem".to_string();
        config.units.border_width = "pt".to_string();
        let table = RuleTable::builtin(&config).expect("builtin table");
        assert_eq!(
            generate(&table, "m-2", &config).as_deref(),
            Some("margin: 2rem;")
        );
        assert_eq!(
            generate(&table, "w-2", &config).as_deref(),
            Some("width: 2px;")
        );
        assert_eq!(
            generate(&table, "border-2", &config).as_deref(),
            Some("border-width: 2pt;")
        );
        assert_eq!(
            generate(&table, "my-3", &config).as_deref(),
            Some("margin-top: 3rem; margin-bottom: 3rem;")
        );
    }

    #[test]
    fn directional_rules_cover_all_sides() {
        let config = ResolvedConfig::default();
        let table = RuleTable::from(directional_rules("p", "padding", Unit::Spacing).unwrap());
        assert_eq!(table.len(), 4);
        assert_eq!(
            generate(&table, "pt-1", &config).as_deref(),
            Some("padding-top: 1px;")
        );
        assert_eq!(
            generate(&table, "pr-2", &config).as_deref(),
            Some("padding-right: 2px;")
        );
        assert_eq!(
            generate(&table, "pb-3", &config).as_deref(),
            Some("padding-bottom: 3px;")
        );
        assert_eq!(
            generate(&table, "pl-4", &config).as_deref(),
            Some("padding-left: 4px;")
        );
        assert_eq!(generate(&table, "px-4", &config), None);
    }

    #[test]
    fn enum_rules_are_closed() {
        assert_eq!(
            builtin("justify-between").as_deref(),
            Some("justify-content: space-between;")
        );
        assert_eq!(
            builtin("justify-center").as_deref(),
            Some("justify-content: center;")
        );
        assert_eq!(builtin("justify-foo"), None);
        assert_eq!(builtin("float-leftish"), None);
    }

    #[test]
    fn enum_aliases_map_to_css_keywords() {
        assert_eq!(
            builtin("flex-col-reverse").as_deref(),
            Some("flex-direction: column-reverse;")
        );
        assert_eq!(builtin("invisible").as_deref(), Some("visibility: hidden;"));
        assert_eq!(
            builtin("break-all").as_deref(),
            Some("word-break: break-all;")
        );
        assert_eq!(
            builtin("no-underline").as_deref(),
            Some("text-decoration: none;")
        );
        assert_eq!(
            builtin("shadow-sm").as_deref(),
            Some("box-shadow: 0 1px 2px 0 rgba(0, 0, 0, 0.05);")
        );
        assert_eq!(builtin("shadow-none").as_deref(), Some("box-shadow: none;"));
    }

    #[test]
    fn keyword_rules_match_bare_tokens() {
        assert_eq!(builtin("flex").as_deref(), Some("display: flex;"));
        assert_eq!(
            builtin("inline-block").as_deref(),
            Some("display: inline-block;")
        );
        assert_eq!(builtin("absolute").as_deref(), Some("position: absolute;"));
        assert_eq!(
            builtin("uppercase").as_deref(),
            Some("text-transform: uppercase;")
        );
    }

    #[test]
    fn earlier_rules_shadow_color_rules() {
        assert_eq!(builtin("text-center").as_deref(), Some("text-align: center;"));
        assert_eq!(builtin("text-red").as_deref(), Some("color: red;"));
        assert_eq!(builtin("border-dashed").as_deref(), Some("border-style: dashed;"));
        assert_eq!(builtin("border-2").as_deref(), Some("border-width: 2px;"));
        assert_eq!(builtin("border-1a1a1a").as_deref(), Some("border-color: #1a1a1a;"));
    }

    #[test]
    fn color_rules_prefer_theme_names() {
        let mut config = ResolvedConfig::default();
        config
            .theme
            .colors
            .insert("primary".to_string(), "#3b82f6".to_string());
        let table = RuleTable::builtin(&config).expect("builtin table");
        assert_eq!(
            generate(&table, "bg-primary", &config).as_deref(),
            Some("background-color: #3b82f6;")
        );
        assert_eq!(
            generate(&table, "c-#fff", &config).as_deref(),
            Some("color: #fff;")
        );
        assert_eq!(
            generate(&table, "background-0a0a0a", &config).as_deref(),
            Some("background-color: #0a0a0a;")
        );
    }

    #[test]
    fn custom_rules_compute_values() {
        assert_eq!(builtin("opacity-50").as_deref(), Some("opacity: 0.5;"));
        assert_eq!(builtin("opacity-100").as_deref(), Some("opacity: 1;"));
        assert_eq!(builtin("rotate-45").as_deref(), Some("transform: rotate(45deg);"));
        assert_eq!(builtin("flex-1").as_deref(), Some("flex: 1;"));
        assert_eq!(builtin("flex-auto").as_deref(), Some("flex: auto;"));
        assert_eq!(
            builtin("clamp-2").as_deref(),
            Some(
                "display: -webkit-box; -webkit-box-orient: vertical; -webkit-line-clamp: 2; overflow: hidden;"
            )
        );
        assert_eq!(
            builtin("mx-auto").as_deref(),
            Some("margin-left: auto; margin-right: auto;")
        );
    }

    #[test]
    fn first_match_wins() {
        let config = ResolvedConfig::default();
        let table = RuleTable::from(vec![
            static_rule("w-10", "width: first;").unwrap(),
            simple_rule("w", "width", Unit::Default).unwrap(),
        ]);
        assert_eq!(
            generate(&table, "w-10", &config).as_deref(),
            Some("width: first;")
        );
        assert_eq!(
            generate(&table, "w-11", &config).as_deref(),
            Some("width: 11px;")
        );

        let reordered = RuleTable::from(vec![
            simple_rule("w", "width", Unit::Default).unwrap(),
            static_rule("w-10", "width: first;").unwrap(),
        ]);
        assert_eq!(
            generate(&reordered, "w-10", &config).as_deref(),
            Some("width: 10px;")
        );
        assert_eq!(
            generate(&reordered, "w-11", &config).as_deref(),
            Some("width: 11px;")
        );
    }

    #[test]
    fn patterns_match_the_whole_body() {
        let table = RuleTable::from(vec![
            enum_rule("float", "float", &["left"], &[]).unwrap(),
        ]);
        assert!(table.find_match("float-left").is_some());
        assert!(table.find_match("xfloat-left").is_none());
        assert!(table.find_match("float-left-x").is_none());
    }

    #[test]
    fn theme_scales_add_rules() {
        let mut config = ResolvedConfig::default();
        config
            .theme
            .spacing
            .insert("gutter".to_string(), "24px".to_string());
        config
            .theme
            .border_radius
            .insert("card".to_string(), "12px".to_string());
        let table = RuleTable::builtin(&config).expect("builtin table");
        assert_eq!(
            generate(&table, "p-gutter", &config).as_deref(),
            Some("padding: 24px;")
        );
        assert_eq!(
            generate(&table, "mt-gutter", &config).as_deref(),
            Some("margin-top: 24px;")
        );
        assert_eq!(
            generate(&table, "rounded-card", &config).as_deref(),
            Some("border-radius: 12px;")
        );
        assert_eq!(generate(&table, "p-other", &config), None);
    }

    #[test]
    fn theme_rule_reports_missing_key() {
        let mut config = ResolvedConfig::default();
        config
            .theme
            .spacing
            .insert("gutter".to_string(), "24px".to_string());
        let table = RuleTable::builtin(&config).expect("builtin table");
        let (_, rule, caps) = table.find_match("p-gutter").expect("theme rule");
        let other = ResolvedConfig::default();
        assert_eq!(
            rule.generate(&caps, &other),
            Err(RuleError::UnknownThemeKey {
                key: "gutter".to_string()
            })
        );
    }

    #[test]
    fn user_rules_are_appended_after_builtins() {
        let config = ResolvedConfig::default();
        let user_rules = vec![
            UserRule {
                pattern: r"fade-(\d+)".to_string(),
                template: "opacity: 0.$1;".to_string(),
            },
            UserRule {
                pattern: r"^w-(\d+)$".to_string(),
                template: "width: $1vw;".to_string(),
            },
        ];
        let table = RuleTable::with_user_rules(&config, &user_rules).expect("table");
        assert_eq!(
            table.len(),
            RuleTable::builtin(&config).unwrap().len() + 2
        );
        assert_eq!(
            generate(&table, "fade-5", &config).as_deref(),
            Some("opacity: 0.5;")
        );
        assert_eq!(
            generate(&table, "w-5", &config).as_deref(),
            Some("width: 5px;")
        );
    }

    #[test]
    fn templates_expand_named_and_escaped_captures() {
        let config = ResolvedConfig::default();
        let rule = Rule::new(
            r"price-(?P<amount>\d+)",
            Generator::Template("--price: $$${amount}; --raw: ${1};".to_string()),
        )
        .unwrap();
        let caps = rule.captures("price-30").expect("match");
        assert_eq!(
            rule.generate(&caps, &config).as_deref(),
            Ok("--price: $30; --raw: 30;")
        );
    }

    #[test]
    fn templates_reject_unknown_groups() {
        let config = ResolvedConfig::default();
        let rule = Rule::new(
            r"gap-(\d+)",
            Generator::Template("gap: $2px;".to_string()),
        )
        .unwrap();
        let caps = rule.captures("gap-3").expect("match");
        assert_eq!(
            rule.generate(&caps, &config),
            Err(RuleError::MissingCapture {
                index: "2".to_string()
            })
        );
    }

    #[test]
    fn invalid_user_pattern_is_an_error() {
        let config = ResolvedConfig::default();
        let user_rules = vec![UserRule {
            pattern: "(unclosed".to_string(),
            template: String::new(),
        }];
        let err = RuleTable::with_user_rules(&config, &user_rules).expect_err("should fail");
        assert!(matches!(err, Error::InvalidPattern { .. }));
    }
}
