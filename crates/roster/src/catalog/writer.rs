//! Writer for generating catalog content.
//!
//! Output parses back to the same declarations: enabled state and
//! descriptions survive a round-trip, free-form comments do not.

use std::path::Path;

use crate::types::PackageDecl;

/// Options for writing a catalog.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Keep disabled declarations, with their leading marker.
    pub include_disabled: bool,
    /// Start the file with an explanatory header comment.
    pub header: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            include_disabled: true,
            header: true,
        }
    }
}

/// Write a catalog to a file, creating parent directories as needed.
pub fn write_file(
    declarations: &[PackageDecl],
    path: &Path,
    options: &WriteOptions,
) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, write_string(declarations, options))
}

/// Render a catalog to a string.
pub fn write_string(declarations: &[PackageDecl], options: &WriteOptions) -> String {
    let mut output = String::new();

    if options.header {
        output.push_str("## Package catalog: one `name # description` per line.\n");
        output.push_str("## A single leading `#` disables a declaration.\n\n");
    }

    for decl in declarations {
        if !decl.enabled && !options.include_disabled {
            continue;
        }
        if !decl.enabled {
            output.push('#');
        }
        output.push_str(&decl.name);
        if let Some(description) = &decl.description {
            output.push_str(" # ");
            output.push_str(description);
        }
        output.push('\n');
    }

    output
}
