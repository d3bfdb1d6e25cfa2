//! CSV export of the license collection.

use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::license::License;
use crate::store::file;

/// Column headers of the export, in output order.
pub const CSV_HEADER: [&str; 5] = ["Name", "Start Date", "End Date", "Active", "Level"];

/// Content type of the export download.
pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

const LINE_END: &str = "\r\n";

/// Quote a field if it holds a delimiter, a quote or a line break.
fn escape_field(field: &str) -> std::borrow::Cow<'_, str> {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\"")).into()
    } else {
        field.into()
    }
}

fn push_row<S: AsRef<str>>(out: &mut String, fields: &[S]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&escape_field(field.as_ref()));
    }
    out.push_str(LINE_END);
}

/// Render the header and one row per record.
#[must_use]
pub fn render_csv(records: &[License]) -> String {
    let mut out = String::new();
    push_row(&mut out, &CSV_HEADER);
    for license in records {
        push_row(
            &mut out,
            &[
                license.name.clone(),
                license.start_date.clone(),
                license.end_date.clone(),
                license.active.to_string(),
                license.level.to_string(),
            ],
        );
    }
    out
}

/// Regenerate the export file at `path` and return its contents.
///
/// # Errors
///
/// Returns an error if the file or its parent directory cannot be written.
pub fn export_to(path: &Path, records: &[License]) -> Result<Vec<u8>> {
    let bytes = render_csv(records).into_bytes();
    file::ensure_parent(path)?;
    file::write_atomic(path, &bytes)?;
    info!("Exported {} licenses to {}", records.len(), path.display());
    Ok(bytes)
}
