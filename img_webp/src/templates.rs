//! Page Templates Module
//!
//! HTML fragments with `<!-- NAME -->` placeholder markers. Built-in copies are
//! compiled into the binary; a templates directory can override any of them
//! by file name.

use crate::{Result, WebpError};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

pub const REPORT_TEMPLATE: &str = "template.html";
pub const CARD_TEMPLATE: &str = "card_template.html";
pub const COMMON_HEAD: &str = "common_head.html";
pub const COMMON_TAIL: &str = "common_tail.html";
pub const HEADER: &str = "header.html";
pub const FOOTER: &str = "footer.html";

const MARKER_OPEN: &str = "<!-- ";
const MARKER_CLOSE: &str = " -->";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Templates {
    pub report: String,
    pub card: String,
    pub common_head: String,
    pub common_tail: String,
    pub header: String,
    pub footer: String,
}

impl Default for Templates {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Templates {
    pub fn builtin() -> Self {
        Self {
            report: include_str!("../templates/template.html").to_string(),
            card: include_str!("../templates/card_template.html").to_string(),
            common_head: include_str!("../templates/common_head.html").to_string(),
            common_tail: include_str!("../templates/common_tail.html").to_string(),
            header: include_str!("../templates/header.html").to_string(),
            footer: include_str!("../templates/footer.html").to_string(),
        }
    }

    /// Built-in templates, with files present in `dir` taking precedence.
    pub fn load(dir: Option<&Path>) -> Result<Self> {
        let mut templates = Self::builtin();
        let Some(dir) = dir else {
            return Ok(templates);
        };

        if !dir.is_dir() {
            return Err(WebpError::folder_read(
                dir,
                std::io::Error::new(std::io::ErrorKind::NotFound, "templates directory not found"),
            ));
        }

        let slots: [(&str, &mut String); 6] = [
            (REPORT_TEMPLATE, &mut templates.report),
            (CARD_TEMPLATE, &mut templates.card),
            (COMMON_HEAD, &mut templates.common_head),
            (COMMON_TAIL, &mut templates.common_tail),
            (HEADER, &mut templates.header),
            (FOOTER, &mut templates.footer),
        ];
        for (name, slot) in slots {
            let path = dir.join(name);
            if path.is_file() {
                *slot = fs::read_to_string(&path).map_err(|e| WebpError::file_system(&path, e))?;
                debug!(template = name, path = %path.display(), "Using template override");
            }
        }

        Ok(templates)
    }
}

/// Replace every `<!-- KEY -->` marker whose key is in `values`.
///
/// Keys are upper-cased before matching, so `content` fills `<!-- CONTENT -->`.
/// Unknown markers (ordinary HTML comments) are left as they are. The scan is
/// single-pass, so substituted text is never searched for markers again.
pub fn fill_placeholders(template: &str, values: &[(&str, &str)]) -> String {
    let lookup: HashMap<String, &str> = values
        .iter()
        .map(|(key, value)| (key.to_uppercase(), *value))
        .collect();

    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(MARKER_OPEN) {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + MARKER_OPEN.len()..];

        match after_open.find(MARKER_CLOSE) {
            Some(end) => {
                let key = &after_open[..end];
                match lookup.get(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str(MARKER_OPEN);
                        out.push_str(key);
                        out.push_str(MARKER_CLOSE);
                    }
                }
                rest = &after_open[end + MARKER_CLOSE.len()..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
