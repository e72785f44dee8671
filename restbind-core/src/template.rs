//! `{name}` templates for URLs and header lines.
//!
//! A placeholder runs from an unescaped `{` to the next `}`. `\{` and `\}`
//! stand for literal braces. Nested braces are rejected when the template is
//! parsed, so every error reported while rendering is a per-call error.

use crate::{CallArguments, ConfigError, Failure, FailureKind};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use thiserror::Error;

/// Everything outside the RFC 3986 unreserved set.
const URL_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("no argument for placeholder '{{{0}}}'")]
    UnresolvedPlaceholder(String),
    #[error("value of '{{{placeholder}}}' for header '{header}' contains control characters")]
    InvalidHeaderValue { header: String, placeholder: String },
}

impl From<TemplateError> for Failure {
    fn from(err: TemplateError) -> Self {
        let kind = match err {
            TemplateError::UnresolvedPlaceholder(_) => FailureKind::UnresolvedPlaceholder,
            TemplateError::InvalidHeaderValue { .. } => FailureKind::InvalidHeaderValue,
        };
        Failure::new(kind, err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, ConfigError> {
        let malformed = |reason: &str| ConfigError::MalformedTemplate {
            template: source.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '\\' if matches!(chars.peek(), Some('{') | Some('}')) => {
                    if let Some(escaped) = chars.next() {
                        literal.push(escaped);
                    }
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') => return Err(malformed("nested '{' in placeholder")),
                            Some(ch) => name.push(ch),
                            None => return Err(malformed("unterminated placeholder")),
                        }
                    }
                    if name.is_empty() {
                        return Err(malformed("empty placeholder"));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(name));
                }
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Template {
            source: source.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Placeholder names in order of appearance, repeats included.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn references(&self, name: &str) -> bool {
        self.placeholders().any(|p| p == name)
    }

    fn literals(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Literal(text) => Some(text.as_str()),
            Segment::Placeholder(_) => None,
        })
    }

    /// Render as a URL; substituted values are percent-encoded.
    pub fn render_url(&self, args: &CallArguments) -> Result<String, TemplateError> {
        self.render_with(args, |_, value| {
            Ok(utf8_percent_encode(value, URL_COMPONENT).to_string())
        })
    }

    /// Render verbatim. Used for header values, after validation.
    fn render_with<F>(&self, args: &CallArguments, mut substitute: F) -> Result<String, TemplateError>
    where
        F: FnMut(&str, &str) -> Result<String, TemplateError>,
    {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value = args
                        .get(name)
                        .ok_or_else(|| TemplateError::UnresolvedPlaceholder(name.clone()))?;
                    out.push_str(&substitute(name, value)?);
                }
            }
        }
        Ok(out)
    }
}

/// One `Name: value` header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderTemplate {
    name: String,
    value: Template,
}

impl HeaderTemplate {
    pub fn parse(line: &str) -> Result<Self, ConfigError> {
        let malformed = |reason: String| ConfigError::MalformedHeader {
            line: line.to_string(),
            reason,
        };

        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| malformed("missing ':' separator".to_string()))?;
        let name = name.trim();
        http::HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| malformed(format!("'{}' is not a valid header name", name)))?;

        let value = Template::parse(value.trim())?;
        if value.literals().any(has_control_chars) {
            return Err(malformed("control characters in header value".to_string()));
        }

        Ok(HeaderTemplate {
            name: name.to_string(),
            value,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Template {
        &self.value
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.value.placeholders()
    }

    /// Render to a `(name, value)` pair. Values carrying CR, LF or any other
    /// control character except tab are rejected.
    pub fn render(&self, args: &CallArguments) -> Result<(String, String), TemplateError> {
        let value = self.value.render_with(args, |placeholder, value| {
            if has_control_chars(value) {
                return Err(TemplateError::InvalidHeaderValue {
                    header: self.name.clone(),
                    placeholder: placeholder.to_string(),
                });
            }
            Ok(value.to_string())
        })?;
        Ok((self.name.clone(), value))
    }
}

fn has_control_chars(text: &str) -> bool {
    text.chars().any(|c| c.is_control() && c != '\t')
}
