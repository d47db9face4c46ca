use crate::config::{ImportantScope, OutputConfig, ReportFormat, ReportPosition};
use crate::engine::{Resolution, ResolvedDeclaration, is_class_name};

const IMPORTANT: &str = "!important";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub tool: String,
    pub version: String,
    pub generated_at: Option<String>,
}

impl Header {
    pub fn new(tool: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            version: version.into(),
            generated_at: None,
        }
    }

    pub fn with_timestamp(mut self, generated_at: impl Into<String>) -> Self {
        self.generated_at = Some(generated_at.into());
        self
    }

    fn render(&self) -> String {
        let mut lines = vec![format!("/* Generated by {} v{} */", self.tool, self.version)];
        if let Some(generated_at) = &self.generated_at {
            lines.push(format!("/* Generated at: {} */", generated_at));
        }
        lines.push("/* Do not edit: this file is regenerated on change */".to_string());
        lines.join("\n")
    }
}

pub fn render(resolution: &Resolution, output: &OutputConfig, header: &Header) -> String {
    let minify = output.minify;
    let mut plain = Vec::new();
    let mut groups: Vec<MediaGroup<'_>> = Vec::new();

    for declaration in &resolution.resolved {
        let Some(media_query) = &declaration.media_query else {
            plain.push(declaration);
            continue;
        };
        match groups
            .iter_mut()
            .find(|group| group.min_width == media_query.min_width)
        {
            Some(group) => {
                group.rank = group.rank.min(media_query.rank);
                group.declarations.push(declaration);
            }
            None => groups.push(MediaGroup {
                min_width: &media_query.min_width,
                rank: media_query.rank,
                declarations: vec![declaration],
            }),
        }
    }
    groups.sort_by_key(|group| group.rank);

    let mut blocks = Vec::new();
    for declaration in plain {
        blocks.extend(render_declaration(declaration, output));
    }
    for group in &groups {
        blocks.push(group.render(output));
    }

    let report = render_report(resolution, output);
    let mut sections = vec![header.render()];
    if output.unprocessed_classes.position == ReportPosition::Top {
        sections.extend(report.clone());
    }
    if minify {
        if !blocks.is_empty() {
            sections.push(blocks.concat());
        }
    } else {
        sections.extend(blocks);
    }
    if output.unprocessed_classes.position == ReportPosition::Bottom {
        sections.extend(report);
    }

    let separator = if minify { "\n" } else { "\n\n" };
    let mut css = sections.join(separator);
    css.push('\n');
    css
}

struct MediaGroup<'a> {
    min_width: &'a str,
    rank: usize,
    declarations: Vec<&'a ResolvedDeclaration>,
}

impl MediaGroup<'_> {
    fn render(&self, output: &OutputConfig) -> String {
        let rules = self
            .declarations
            .iter()
            .flat_map(|declaration| render_declaration(declaration, output))
            .collect::<Vec<_>>();
        if output.minify {
            format!("@media (min-width:{}){{{}}}", self.min_width, rules.concat())
        } else {
            format!(
                "@media (min-width: {}) {{\n{}\n}}",
                self.min_width,
                indent_css_block(&rules.join("\n\n"), 2)
            )
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    Property { name: String, value: String },
    Nested { selector: String, items: Vec<Item> },
    Raw(String),
}

fn render_declaration(declaration: &ResolvedDeclaration, output: &OutputConfig) -> Vec<String> {
    let selector = format!(".{}", escape_selector(&declaration.class_name));
    let mut items = match (output.important, output.important_scope) {
        (true, ImportantScope::First) => parse_items(&mark_first_important(&declaration.declarations)),
        _ => parse_items(&declaration.declarations),
    };
    if output.important && output.important_scope == ImportantScope::All {
        mark_all_important(&mut items);
    }
    render_rule(&selector, &items, output.minify)
}

/// Inserts the marker before the first `;` of the raw text.
fn mark_first_important(text: &str) -> String {
    text.replacen(';', &format!(" {};", IMPORTANT), 1)
}

fn mark_all_important(items: &mut [Item]) {
    for item in items {
        match item {
            Item::Property { value, .. } if !value.contains(IMPORTANT) => {
                value.push(' ');
                value.push_str(IMPORTANT);
            }
            Item::Nested { items, .. } => mark_all_important(items),
            _ => {}
        }
    }
}

fn parse_items(text: &str) -> Vec<Item> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars();

    while let Some(ch) = chars.next() {
        match ch {
            ';' => push_property(&mut items, &current),
            '{' => {
                let mut depth = 1usize;
                let mut body = String::new();
                for inner in chars.by_ref() {
                    match inner {
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    body.push(inner);
                }
                items.push(Item::Nested {
                    selector: current.trim().to_string(),
                    items: parse_items(&body),
                });
            }
            _ => {
                current.push(ch);
                continue;
            }
        }
        current.clear();
    }
    push_property(&mut items, &current);

    items
}

fn push_property(items: &mut Vec<Item>, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    match text.split_once(':') {
        Some((name, value)) => items.push(Item::Property {
            name: name.trim().to_string(),
            value: value.trim().to_string(),
        }),
        None => items.push(Item::Raw(text.to_string())),
    }
}

fn render_rule(selector: &str, items: &[Item], minify: bool) -> Vec<String> {
    let mut lines = Vec::new();
    let mut nested = Vec::new();

    for item in items {
        match item {
            Item::Property { name, value } => {
                if minify {
                    lines.push(format!("{}:{}", name, value.replace(" !important", IMPORTANT)));
                } else {
                    lines.push(format!("{}: {};", name, value));
                }
            }
            Item::Raw(text) => {
                if minify {
                    lines.push(text.clone());
                } else {
                    lines.push(format!("{};", text));
                }
            }
            Item::Nested {
                selector: child,
                items,
            } => {
                let child = if child.contains('&') {
                    child.replace('&', selector)
                } else {
                    format!("{} {}", selector, child)
                };
                nested.extend(render_rule(&child, items, minify));
            }
        }
    }

    let mut blocks = Vec::new();
    if !lines.is_empty() {
        if minify {
            blocks.push(format!("{}{{{}}}", selector, lines.join(";")));
        } else {
            blocks.push(format!(
                "{} {{\n{}\n}}",
                selector,
                indent_css_block(&lines.join("\n"), 2)
            ));
        }
    }
    blocks.extend(nested);
    blocks
}

fn render_report(resolution: &Resolution, output: &OutputConfig) -> Option<String> {
    let settings = &output.unprocessed_classes;
    if !settings.enable {
        return None;
    }
    let tokens = resolution
        .unresolved
        .iter()
        .filter(|token| is_class_name(token))
        .map(String::as_str)
        .collect::<Vec<_>>();
    if tokens.is_empty() {
        return None;
    }

    let mut lines = vec![format!("/* Unmatched classes ({}) */", tokens.len())];
    match settings.format {
        ReportFormat::Line => {
            lines.extend(tokens.iter().map(|token| format!("/* {} */", token)));
        }
        ReportFormat::Inline => lines.push(format!("/* {} */", tokens.join(", "))),
    }
    Some(lines.join("\n"))
}

fn indent_css_block(css: &str, spaces: usize) -> String {
    let padding = " ".repeat(spaces);
    css.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", padding, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Escapes a class name for use after `.` in a selector.
pub fn escape_selector(class: &str) -> String {
    let mut escaped = String::with_capacity(class.len() * 2);

    for (idx, ch) in class.chars().enumerate() {
        match ch {
            '0'..='9' if idx == 0 => escaped.push_str(&format!("\\3{} ", ch)),
            '\\' => escaped.push_str("\\\\"),
            ':' | '/' | '.' | '%' | '#' | '!' | '@' | '[' | ']' | '(' | ')' | ',' | '+' | '*'
            | '=' | '&' | '>' | '~' | '\'' | '"' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            _ => escaped.push(ch),
        }
    }

    escaped
}
