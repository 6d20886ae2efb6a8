// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Name templates for extraction directories and frame files.
//!
//! Templates use `{placeholder}` segments, e.g. `{type}_{video_name}_{timestamp}` or
//! `frame_{index:05}.{extension}`. The index placeholder accepts a zero-padded width.

use std::fmt;

use crate::error::{PoseError, Result};

/// A substitutable template field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// Stream directory type (`frames`, `overlay`).
    Type,
    /// Input video file stem.
    VideoName,
    /// Run timestamp.
    Timestamp,
    /// Frame index.
    Index,
    /// Image file extension.
    Extension,
}

impl Placeholder {
    fn parse(key: &str) -> Option<Self> {
        match key {
            "type" => Some(Self::Type),
            "video_name" => Some(Self::VideoName),
            "timestamp" => Some(Self::Timestamp),
            "index" | "" => Some(Self::Index),
            "extension" => Some(Self::Extension),
            _ => None,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::VideoName => "video_name",
            Self::Timestamp => "timestamp",
            Self::Index => "index",
            Self::Extension => "extension",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field { placeholder: Placeholder, width: usize },
}

/// Values substituted into a template.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateValues<'a> {
    /// Directory type.
    pub kind: &'a str,
    /// Video file stem.
    pub video_name: &'a str,
    /// Run timestamp.
    pub timestamp: &'a str,
    /// Frame index.
    pub index: usize,
    /// File extension without the dot.
    pub extension: &'a str,
}

/// A parsed, validated name template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl NameTemplate {
    /// Parse a template, accepting only the given placeholders.
    ///
    /// `{:05d}` is read as the index placeholder with width 5.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ConfigError`] for unbalanced braces, unknown or disallowed
    /// placeholders, and widths on non-index fields.
    pub fn parse(template: &str, allowed: &[Placeholder]) -> Result<Self> {
        let err = |msg: String| PoseError::ConfigError(format!("Template '{template}': {msg}"));

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars();

        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    let mut field = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') | None => return Err(err("unclosed '{'".to_string())),
                            Some(ch) => field.push(ch),
                        }
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }

                    let (key, width_spec) = field.split_once(':').unwrap_or((field.as_str(), ""));
                    let placeholder = Placeholder::parse(key)
                        .ok_or_else(|| err(format!("unknown placeholder '{{{field}}}'")))?;
                    if !allowed.contains(&placeholder) {
                        return Err(err(format!(
                            "placeholder '{{{}}}' is not allowed here",
                            placeholder.as_str()
                        )));
                    }

                    let width_spec = width_spec.trim_end_matches('d');
                    let width = if width_spec.is_empty() {
                        0
                    } else if placeholder == Placeholder::Index {
                        width_spec
                            .parse::<usize>()
                            .map_err(|_| err(format!("invalid width '{width_spec}'")))?
                    } else {
                        return Err(err(format!(
                            "width is only supported for '{{index}}', not '{{{}}}'",
                            placeholder.as_str()
                        )));
                    };
                    segments.push(Segment::Field { placeholder, width });
                }
                '}' => return Err(err("unmatched '}'".to_string())),
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        if segments.is_empty() {
            return Err(err("template is empty".to_string()));
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    /// Check whether the template uses a placeholder.
    #[must_use]
    pub fn contains(&self, placeholder: Placeholder) -> bool {
        self.segments.iter().any(|s| {
            matches!(s, Segment::Field { placeholder: p, .. } if *p == placeholder)
        })
    }

    /// Substitute values into the template.
    #[must_use]
    pub fn render(&self, values: &TemplateValues<'_>) -> String {
        let mut out = String::with_capacity(self.source.len() + 16);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field { placeholder, width } => match placeholder {
                    Placeholder::Type => out.push_str(values.kind),
                    Placeholder::VideoName => out.push_str(values.video_name),
                    Placeholder::Timestamp => out.push_str(values.timestamp),
                    Placeholder::Index => {
                        out.push_str(&format!("{:0width$}", values.index, width = *width));
                    }
                    Placeholder::Extension => out.push_str(values.extension),
                },
            }
        }
        out
    }

    /// Original template text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for NameTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
