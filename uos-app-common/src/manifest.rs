//! App manifest rendering.
//!
//! The manifest template is a text file with `{{.Field}}` placeholders. Only
//! the fields of [`Manifest`] may be referenced. `{{- ` / ` -}}` trim markers
//! and `{{/* ... */}}` comments behave as in Go templates; everything else
//! outside the braces is copied through untouched.

use crate::config::Settings;
use crate::error::CommonError;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";
const COMMENT_OPEN: &str = "/*";
const COMMENT_CLOSE: &str = "*/";

/// Values substituted into the manifest template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Manifest {
    pub image_name: String,
    pub image_version: String,
    pub version: String,
}

impl Manifest {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            image_name: settings.image_name.clone(),
            image_version: settings.version.clone(),
            version: settings.version.clone(),
        }
    }

    /// Look up a template field by its placeholder name.
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "ImageName" => Some(&self.image_name),
            "ImageVersion" => Some(&self.image_version),
            "Version" => Some(&self.version),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Field(String),
}

/// A parsed manifest template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Split `source` into literal text and field placeholders.
    ///
    /// `{{- ` and ` -}}` trim the whitespace before and after the action,
    /// and `{{/* ... */}}` comments render as nothing.
    pub fn parse(source: &str) -> Result<Self, CommonError> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut trim_next = false;

        while let Some(start) = rest.find(OPEN) {
            let offset = source.len() - rest.len() + start;
            let mut inner = &rest[start + OPEN.len()..];
            let trim_left = inner.starts_with('-') && inner[1..].starts_with(is_space);
            if trim_left {
                inner = &inner[1..];
            }
            push_text(&mut segments, &rest[..start], trim_next, trim_left);

            let unclosed =
                || CommonError::template(format!("unclosed action starting at byte {offset}"));

            let trimmed = inner.trim_start_matches(is_space);
            if let Some(comment) = trimmed.strip_prefix(COMMENT_OPEN) {
                let end = comment.find(COMMENT_CLOSE).ok_or_else(|| {
                    CommonError::template(format!("unclosed comment starting at byte {offset}"))
                })?;
                let after = &comment[end + COMMENT_CLOSE.len()..];
                let close = after.find(CLOSE).ok_or_else(unclosed)?;
                let (tail, trim_right) = strip_right_trim(&after[..close]);
                if !tail.trim_matches(is_space).is_empty() {
                    return Err(CommonError::template(format!(
                        "comment ends before closing delimiter at byte {offset}"
                    )));
                }
                trim_next = trim_right;
                rest = &after[close + CLOSE.len()..];
                continue;
            }

            let close = inner.find(CLOSE).ok_or_else(unclosed)?;
            let (body, trim_right) = strip_right_trim(&inner[..close]);
            let action = body.trim_matches(is_space);
            let name = action
                .strip_prefix('.')
                .filter(|name| is_field_name(name))
                .ok_or_else(|| {
                    CommonError::template(format!("unsupported action '{{{{{action}}}}}'"))
                })?;
            segments.push(Segment::Field(name.to_string()));

            trim_next = trim_right;
            rest = &inner[close + CLOSE.len()..];
        }

        push_text(&mut segments, rest, trim_next, false);

        Ok(Self { segments })
    }

    /// Write the template to `out` with `manifest` substituted.
    pub fn render_to<W: Write>(&self, manifest: &Manifest, out: &mut W) -> Result<(), CommonError> {
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.write_all(text.as_bytes())?,
                Segment::Field(name) => {
                    let value = manifest.field(name).ok_or_else(|| {
                        CommonError::template(format!("can't evaluate field {name} in manifest"))
                    })?;
                    out.write_all(value.as_bytes())?;
                }
            }
        }
        Ok(())
    }

    pub fn render(&self, manifest: &Manifest) -> Result<String, CommonError> {
        let mut out = Vec::new();
        self.render_to(manifest, &mut out)?;
        String::from_utf8(out).map_err(|e| CommonError::template(e.to_string()))
    }
}

/// Whitespace as the template trim markers see it.
fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Split a trailing ` -` trim marker off an action body.
fn strip_right_trim(body: &str) -> (&str, bool) {
    match body.strip_suffix('-') {
        Some(stripped) if stripped.ends_with(is_space) => (stripped, true),
        _ => (body, false),
    }
}

fn push_text(segments: &mut Vec<Segment>, text: &str, trim_start: bool, trim_end: bool) {
    let mut text = text;
    if trim_start {
        text = text.trim_start_matches(is_space);
    }
    if trim_end {
        text = text.trim_end_matches(is_space);
    }
    if !text.is_empty() {
        segments.push(Segment::Text(text.to_string()));
    }
}

fn is_field_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Render the template at `template_path` into `out_path`.
///
/// The output file is truncated before rendering starts, so a rendering
/// failure leaves it empty or partially written.
pub fn generate_manifest(
    manifest: &Manifest,
    template_path: &Path,
    out_path: &Path,
) -> Result<(), CommonError> {
    let source = fs::read_to_string(template_path)?;
    let template = Template::parse(&source)?;

    let mut out = BufWriter::new(File::create(out_path)?);
    template.render_to(manifest, &mut out)?;
    out.flush()?;
    Ok(())
}
