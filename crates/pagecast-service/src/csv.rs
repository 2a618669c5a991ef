//! Bulk post import and export in a small comma-separated dialect.
//!
//! Import is line based: a quoted field can hold commas (and `""` for a
//! literal quote) but never a line break. Per-row problems never abort the
//! import; they are collected as [`RowWarning`]s next to the parsed rows.

use serde::Serialize;
use thiserror::Error;

use crate::models::{Page, Post};

pub const LOCATION_NAME: &str = "location_name";
pub const LOCATION_NUMBER: &str = "location_number";
pub const POST_CONTENT: &str = "post_content";
pub const LINK: &str = "link";
pub const SCHEDULED_FOR: &str = "scheduled_for";
pub const MEDIA_TYPE: &str = "media_type";
pub const MEDIA_URL: &str = "media_url";

const IMPORT_COLUMNS: [&str; 7] = [
    LOCATION_NAME,
    LOCATION_NUMBER,
    POST_CONTENT,
    LINK,
    SCHEDULED_FOR,
    MEDIA_TYPE,
    MEDIA_URL,
];

#[derive(Error, Debug, PartialEq)]
pub enum CsvError {
    #[error("CSV file is empty")]
    Empty,
    #[error("CSV must have a '{0}' column")]
    MissingColumn(&'static str),
    #[error("CSV must have a 'location_name' or 'location_number' column")]
    MissingLocationColumn,
}

/// One data line that passed structural checks. Absent cells are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CsvRow {
    /// 1-based line number in the uploaded text
    pub line: usize,
    pub location_name: String,
    pub location_number: String,
    pub post_content: String,
    pub link: String,
    pub scheduled_for: String,
    pub media_type: String,
    pub media_url: String,
}

impl CsvRow {
    /// The identifier shown to the user when this row's page cannot be found.
    pub fn identifier(&self) -> &str {
        if self.location_number.is_empty() {
            &self.location_name
        } else {
            &self.location_number
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowWarning {
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CsvImport {
    pub rows: Vec<CsvRow>,
    pub warnings: Vec<RowWarning>,
}

/// Column positions of the recognised header fields.
struct Header {
    width: usize,
    positions: [Option<usize>; IMPORT_COLUMNS.len()],
}

impl Header {
    fn parse(line: &str) -> Result<Self, CsvError> {
        let names: Vec<String> = split_line(line)
            .into_iter()
            .map(|field| field.trim().trim_matches('"').to_lowercase())
            .collect();

        let mut positions = [None; IMPORT_COLUMNS.len()];
        for (slot, column) in positions.iter_mut().zip(IMPORT_COLUMNS) {
            *slot = names.iter().position(|name| name == column);
        }

        let header = Header {
            width: names.len(),
            positions,
        };

        if header.position(POST_CONTENT).is_none() {
            return Err(CsvError::MissingColumn(POST_CONTENT));
        }
        if header.position(LOCATION_NAME).is_none() && header.position(LOCATION_NUMBER).is_none()
        {
            return Err(CsvError::MissingLocationColumn);
        }

        Ok(header)
    }

    fn position(&self, column: &str) -> Option<usize> {
        IMPORT_COLUMNS
            .iter()
            .position(|c| *c == column)
            .and_then(|i| self.positions[i])
    }

    fn cell(&self, fields: &mut [String], column: &str) -> String {
        self.position(column)
            .map(|i| std::mem::take(&mut fields[i]))
            .unwrap_or_default()
    }
}

/// Splits one line on commas that are not inside double quotes.
///
/// Quote characters delimit, they are not kept, except `""` inside a quoted
/// field which stands for one literal quote. Fields are trimmed.
pub fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());

    fields
}

/// Parses uploaded CSV text into rows, collecting per-row warnings.
pub fn parse(text: &str) -> Result<CsvImport, CsvError> {
    // Spreadsheet exports often lead with a byte order mark
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line))
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header_line) = lines.next().ok_or(CsvError::Empty)?;
    let header = Header::parse(header_line)?;

    let mut import = CsvImport::default();

    for (line, raw) in lines {
        let mut fields = split_line(raw);
        if fields.len() != header.width {
            import.warnings.push(RowWarning {
                line,
                reason: format!(
                    "expected {} fields, found {}",
                    header.width,
                    fields.len()
                ),
            });
            continue;
        }

        let row = CsvRow {
            line,
            location_name: header.cell(&mut fields, LOCATION_NAME),
            location_number: header.cell(&mut fields, LOCATION_NUMBER),
            post_content: header.cell(&mut fields, POST_CONTENT),
            link: header.cell(&mut fields, LINK),
            scheduled_for: header.cell(&mut fields, SCHEDULED_FOR),
            media_type: header.cell(&mut fields, MEDIA_TYPE),
            media_url: header.cell(&mut fields, MEDIA_URL),
        };

        if row.location_name.is_empty() && row.location_number.is_empty() {
            import.warnings.push(RowWarning {
                line,
                reason: "missing location_name and location_number".to_string(),
            });
            continue;
        }
        if row.post_content.is_empty() {
            import.warnings.push(RowWarning {
                line,
                reason: "missing post_content".to_string(),
            });
            continue;
        }

        import.rows.push(row);
    }

    Ok(import)
}

/// Quotes a field when it holds a comma, a quote or surrounding whitespace.
/// Line breaks are flattened to spaces since import is line based.
fn escape_field(value: &str) -> String {
    let value = value.replace("\r\n", " ").replace(['\n', '\r'], " ");
    if value.contains([',', '"']) || value.trim() != value {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value
    }
}

fn write_record(out: &mut String, fields: &[&str]) {
    let line = fields
        .iter()
        .map(|f| escape_field(f))
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(&line);
    out.push('\n');
}

/// Renders posts in the import dialect, plus a trailing `status` column.
/// Pending posts without a schedule are reported as `draft`.
///
/// Posts whose page is unknown keep empty location cells.
pub fn export(posts: &[Post], pages: &[Page]) -> String {
    let mut out = String::new();
    let mut header: Vec<&str> = IMPORT_COLUMNS.to_vec();
    header.push("status");
    write_record(&mut out, &header);

    for post in posts {
        let page = pages.iter().find(|p| p.id == post.page_id);
        let scheduled_for = post
            .scheduled_for
            .map(|at| at.to_rfc3339())
            .unwrap_or_default();
        let media_type = match post.media_type {
            crate::models::MediaType::None => "",
            other => other.as_str(),
        };

        write_record(
            &mut out,
            &[
                page.map(|p| p.name.as_str()).unwrap_or_default(),
                page.and_then(|p| p.location_number.as_deref())
                    .unwrap_or_default(),
                post.content.as_str(),
                post.link.as_deref().unwrap_or_default(),
                scheduled_for.as_str(),
                media_type,
                post.media_url.as_deref().unwrap_or_default(),
                if post.is_draft() {
                    "draft"
                } else {
                    post.status.as_str()
                },
            ],
        );
    }

    out
}

/// Header plus one example row, offered as a starting point for bulk uploads.
pub fn template() -> String {
    let mut out = String::new();
    write_record(&mut out, &IMPORT_COLUMNS);
    write_record(
        &mut out,
        &[
            "Downtown",
            "1234",
            "Two-for-one slices all weekend, see you there!",
            "https://example.com/weekend",
            "01/20/2025 2:00 PM",
            "photo",
            "https://example.com/slice.jpg",
        ],
    );
    out
}
