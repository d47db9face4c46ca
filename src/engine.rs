use crate::config::{Breakpoint, ResolvedConfig};
use crate::error::{Error, Result};
use crate::rules::RuleTable;
use std::collections::BTreeSet;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaQuery {
    pub rank: usize,
    pub min_width: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDeclaration {
    pub token: String,
    pub class_name: String,
    pub declarations: String,
    pub media_query: Option<MediaQuery>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionResult {
    Resolved(ResolvedDeclaration),
    Unresolved(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Resolution {
    pub resolved: Vec<ResolvedDeclaration>,
    pub unresolved: BTreeSet<String>,
}

impl Resolution {
    pub fn total(&self) -> usize {
        self.resolved.len() + self.unresolved.len()
    }
}

pub fn resolve(
    tokens: &BTreeSet<String>,
    table: &RuleTable,
    config: &ResolvedConfig,
) -> Result<Resolution> {
    let mut resolution = Resolution::default();

    for token in tokens {
        match resolve_token(token, table, config)? {
            Some(ResolutionResult::Resolved(declaration)) => {
                resolution.resolved.push(declaration);
            }
            Some(ResolutionResult::Unresolved(token)) => {
                resolution.unresolved.insert(token);
            }
            None => debug!(token = %token, "excluded"),
        }
    }

    Ok(resolution)
}

pub fn resolve_token(
    token: &str,
    table: &RuleTable,
    config: &ResolvedConfig,
) -> Result<Option<ResolutionResult>> {
    let (media_query, body) = strip_responsive_prefix(token, &config.media_queries);

    if is_excluded(body, &config.exclude.class_names) {
        return Ok(None);
    }

    if !is_class_name(token) {
        return Ok(Some(unresolved(token)));
    }
    if media_query.is_some() && strip_responsive_prefix(body, &config.media_queries).0.is_some() {
        warn!(token = %token, "more than one responsive prefix, leaving unresolved");
        return Ok(Some(unresolved(token)));
    }

    let Some((idx, rule, caps)) = table.find_match(body) else {
        return Ok(Some(unresolved(token)));
    };
    let declarations = rule
        .generate(&caps, config)
        .map_err(|source| Error::generate(token, format!("#{} {}", idx, rule.source()), source))?;

    Ok(Some(ResolutionResult::Resolved(ResolvedDeclaration {
        token: token.to_string(),
        class_name: format!("{}{}", config.output.class_prefix, token),
        declarations,
        media_query,
    })))
}

fn unresolved(token: &str) -> ResolutionResult {
    ResolutionResult::Unresolved(token.to_string())
}

pub fn strip_responsive_prefix<'t>(
    token: &'t str,
    breakpoints: &[Breakpoint],
) -> (Option<MediaQuery>, &'t str) {
    for (rank, breakpoint) in breakpoints.iter().enumerate() {
        let Some(rest) = token.strip_prefix(breakpoint.name.as_str()) else {
            continue;
        };
        if let Some(body) = rest.strip_prefix(':') {
            let media_query = MediaQuery {
                rank,
                min_width: breakpoint.min_width.clone(),
            };
            return (Some(media_query), body);
        }
    }
    (None, token)
}

pub fn is_excluded(body: &str, prefixes: &[String]) -> bool {
    prefixes
        .iter()
        .any(|prefix| !prefix.is_empty() && body.starts_with(prefix.as_str()))
}

/// Whether `token` can be written as a class selector without leftovers from markup or templates.
pub fn is_class_name(token: &str) -> bool {
    !token.is_empty()
        && token.chars().all(|ch| {
            ch.is_ascii_alphanumeric()
                || matches!(ch, '-' | '_' | ':' | '/' | '.' | '%' | '#' | '!' | '@' | '[' | ']')
        })
}
