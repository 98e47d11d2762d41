//! Parser for the plain-text catalog format.
//!
//! One declaration per line:
//! ```text
//! libreoffice # Office suite
//! #blender # 3D tool, declared but disabled
//! ## lines with a doubled marker are comments
//! ```

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::PackageDecl;

enum Line {
    Skip,
    Malformed,
    Decl(PackageDecl),
}

/// Parse a catalog from a file path.
///
/// A missing file is [`Error::CatalogNotFound`]; any other read failure is
/// [`Error::Io`].
pub fn parse_file(path: &Path) -> Result<Vec<PackageDecl>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::CatalogNotFound(path.to_path_buf()));
        }
        Err(err) => return Err(Error::Io(err)),
    };
    Ok(parse_str(&content))
}

/// Parse a catalog from a string.
///
/// Malformed lines are skipped with a warn log, duplicate names keep the
/// first occurrence, and file order is preserved.
pub fn parse_str(content: &str) -> Vec<PackageDecl> {
    let mut declarations: Vec<PackageDecl> = Vec::new();

    for (line_num, raw) in content.lines().enumerate() {
        match classify(raw) {
            Line::Skip => {}
            Line::Malformed => {
                log::warn!("catalog line {}: missing package name, skipped", line_num + 1);
            }
            Line::Decl(decl) => {
                if let Some(first) = declarations
                    .iter()
                    .find(|existing| existing.name.eq_ignore_ascii_case(&decl.name))
                {
                    log::warn!(
                        "catalog line {}: duplicate declaration '{}', keeping '{}'",
                        line_num + 1,
                        decl.name,
                        first.name
                    );
                    continue;
                }
                declarations.push(decl);
            }
        }
    }

    declarations
}

/// Classify a single catalog line.
///
/// A single leading `#` disables the declaration; a second `#` (with or
/// without spacing) makes the line a comment.
fn classify(raw: &str) -> Line {
    let line = raw.trim();
    if line.is_empty() {
        return Line::Skip;
    }

    let (enabled, body) = match line.strip_prefix('#') {
        Some(rest) => {
            let rest = rest.trim_start();
            if rest.starts_with('#') {
                return Line::Skip;
            }
            (false, rest)
        }
        None => (true, line),
    };

    let (name, description) = match body.split_once('#') {
        Some((name, description)) => {
            let description = description.trim();
            let description = (!description.is_empty()).then(|| description.to_string());
            (name.trim(), description)
        }
        None => (body.trim(), None),
    };

    if name.is_empty() {
        return Line::Malformed;
    }

    Line::Decl(PackageDecl {
        name: name.to_string(),
        description,
        enabled,
    })
}
