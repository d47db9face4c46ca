use crate::config::{Theme, Units};
use crate::error::RuleError;
use std::borrow::Cow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Default,
    Spacing,
    FontSize,
    LineHeight,
    BorderWidth,
    None,
}

impl Units {
    pub fn get(&self, unit: Unit) -> &str {
        match unit {
            Unit::Default => &self.default,
            Unit::Spacing => &self.spacing,
            Unit::FontSize => &self.font_size,
            Unit::LineHeight => &self.line_height,
            Unit::BorderWidth => &self.border_width,
            Unit::None => "",
        }
    }
}

/// Normalizes a magnitude fragment (`N`, `-N`, or `--N` for negation) to
/// decimal text. Digits stay text, so a fragment of any length renders.
pub fn parse_magnitude(raw: &str) -> Result<String, RuleError> {
    let (negative, digits) = match raw.strip_prefix("--").or_else(|| raw.strip_prefix('-')) {
        Some(digits) => (true, digits),
        None => (false, raw),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RuleError::InvalidNumber {
            value: raw.to_string(),
        });
    }
    let digits = trim_leading_zeros(digits);
    if negative && digits != "0" {
        Ok(format!("-{}", digits))
    } else {
        Ok(digits.to_string())
    }
}

pub fn percent_fraction(raw: &str) -> Result<String, RuleError> {
    let value = parse_magnitude(raw)?;
    let (sign, digits) = match value.strip_prefix('-') {
        Some(digits) => ("-", digits),
        None => ("", value.as_str()),
    };
    let padded = format!("{:0>3}", digits);
    let (whole, fraction) = padded.split_at(padded.len() - 2);
    let whole = trim_leading_zeros(whole);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        Ok(format!("{}{}", sign, whole))
    } else {
        Ok(format!("{}{}.{}", sign, whole, fraction))
    }
}

fn trim_leading_zeros(digits: &str) -> &str {
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() { "0" } else { trimmed }
}

/// Resolves a color fragment to a CSS color value.
///
/// Theme names win over every literal interpretation, then `#hex`, then bare
/// keywords like `red`. Anything else is treated as hex missing its `#`.
pub fn resolve_color<'a>(fragment: &'a str, theme: &'a Theme) -> Cow<'a, str> {
    if let Some(color) = theme.colors.get(fragment) {
        return Cow::Borrowed(color.as_str());
    }
    if fragment.starts_with('#') {
        return Cow::Borrowed(fragment);
    }
    if !fragment.is_empty() && fragment.chars().all(|ch| ch.is_ascii_alphabetic()) {
        return Cow::Borrowed(fragment);
    }
    Cow::Owned(format!("#{}", fragment))
}
