//! Template rendering module
//!
//! Templates are plain HTML with `{{ .Title }}` and `{{ .Body }}` placeholders.
//! `{{ printf "%s" .Body }}` is accepted as a spelling of `{{ .Body }}`.
//! They are parsed once at startup; only field substitution happens per request.

use super::Page;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const VIEW: &str = "view";
pub const EDIT: &str = "edit";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to read template '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("template '{name}': {message} at byte {offset}")]
    Parse {
        name: String,
        offset: usize,
        message: String,
    },
    #[error("template '{0}' is not defined")]
    Undefined(String),
}

/// Page field a placeholder refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Body,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Field(Field),
}

/// A parsed template
#[derive(Debug, Clone)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(name: &str, source: &str) -> Result<Self, TemplateError> {
        let parse_error = |offset: usize, message: String| TemplateError::Parse {
            name: name.to_string(),
            offset,
            message,
        };

        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(open) = rest.find("{{") {
            if open > 0 {
                segments.push(Segment::Text(rest[..open].to_string()));
            }
            let after_open = &rest[open + 2..];
            let Some(close) = after_open.find("}}") else {
                return Err(parse_error(offset + open, "unclosed action".to_string()));
            };

            let action = after_open[..close].trim();
            let field = parse_action(action)
                .ok_or_else(|| parse_error(offset + open, format!("unknown action '{action}'")))?;
            segments.push(Segment::Field(field));

            let consumed = open + 2 + close + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self { segments })
    }

    pub fn render(&self, page: &Page) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Field(Field::Title) => escape_html_into(&page.title, &mut out),
                Segment::Field(Field::Body) => {
                    escape_html_into(&String::from_utf8_lossy(&page.body), &mut out);
                }
            }
        }
        out
    }
}

fn parse_action(action: &str) -> Option<Field> {
    let words: Vec<&str> = action.split_whitespace().collect();
    let field = match words.as_slice() {
        [field] | ["printf", "\"%s\"", field] => *field,
        _ => return None,
    };
    match field {
        ".Title" => Some(Field::Title),
        ".Body" => Some(Field::Body),
        _ => None,
    }
}

fn escape_html_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

/// The named templates the wiki renders with
#[derive(Debug, Clone)]
pub struct Templates {
    templates: HashMap<String, Template>,
}

impl Templates {
    /// Read and parse the view and edit templates from `dir`
    pub fn load(dir: &Path, view_file: &str, edit_file: &str) -> Result<Self, TemplateError> {
        let view = read_template(&dir.join(view_file))?;
        let edit = read_template(&dir.join(edit_file))?;
        Self::from_sources(&view, &edit)
    }

    pub fn from_sources(view: &str, edit: &str) -> Result<Self, TemplateError> {
        let mut templates = HashMap::new();
        templates.insert(VIEW.to_string(), Template::parse(VIEW, view)?);
        templates.insert(EDIT.to_string(), Template::parse(EDIT, edit)?);
        Ok(Self { templates })
    }

    pub fn render(&self, name: &str, page: &Page) -> Result<String, TemplateError> {
        self.templates
            .get(name)
            .map(|t| t.render(page))
            .ok_or_else(|| TemplateError::Undefined(name.to_string()))
    }
}

fn read_template(path: &Path) -> Result<String, TemplateError> {
    std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
        path: path.to_path_buf(),
        source,
    })
}
