use thiserror::Error;

use crate::csv::CsvRow;
use crate::models::Page;

/// No page matched a row. Carries the identifier the user typed.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Location not found: {identifier}")]
pub struct Unresolved {
    pub identifier: String,
}

fn same(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Finds the page a CSV row is addressed to.
///
/// The location number wins when present; the display name is only tried when
/// the number is blank or matches nothing. Both comparisons are exact apart
/// from case.
pub fn resolve<'a>(row: &CsvRow, pages: &'a [Page]) -> Result<&'a Page, Unresolved> {
    let number = row.location_number.trim();
    if !number.is_empty() {
        let by_number = pages.iter().find(|page| {
            page.location_number
                .as_deref()
                .is_some_and(|code| same(code, number))
        });
        if let Some(page) = by_number {
            return Ok(page);
        }
    }

    let name = row.location_name.trim();
    if !name.is_empty() {
        if let Some(page) = pages.iter().find(|page| same(&page.name, name)) {
            return Ok(page);
        }
    }

    Err(Unresolved {
        identifier: row.identifier().to_string(),
    })
}
