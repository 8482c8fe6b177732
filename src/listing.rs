//! Project listing page
//!
//! [`extract_rows`] pulls `(title, href)` pairs out of the listing markup;
//! [`project_refs`] keeps the rows that name a project.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::consts::PROJECT_TABLE_ID;
use crate::project::ProjectRef;

static ROW: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(&format!("#{PROJECT_TABLE_ID} tbody tr")).expect("valid selector")
});
static CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").expect("valid selector"));
static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").expect("valid selector"));

// projectID must stay the first query parameter
static PROJECT_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^transcription\.html\?projectID=(\d+)").expect("valid regex")
});

/// `(title attribute, href of the first cell's link)` for every row of the
/// project table, in document order. Missing attributes come back empty.
pub fn extract_rows(html: &str) -> Vec<(String, String)> {
    let document = Html::parse_document(html);
    document
        .select(&ROW)
        .map(|row| {
            let title = row.value().attr("title").unwrap_or_default().to_string();
            let href = row
                .select(&CELL)
                .next()
                .and_then(|cell| cell.select(&LINK).next())
                .and_then(|link| link.value().attr("href"))
                .unwrap_or_default()
                .to_string();
            (title, href)
        })
        .collect()
}

/// Project id from a row link, if the link points at a project
pub fn project_id(href: &str) -> Option<&str> {
    PROJECT_HREF
        .captures(href)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Rows with a title and a project link, in row order. Others are skipped.
pub fn project_refs(rows: &[(String, String)]) -> Vec<ProjectRef> {
    rows.iter()
        .filter(|(title, _)| !title.is_empty())
        .filter_map(|(title, href)| project_id(href).map(|id| ProjectRef::new(title, id)))
        .collect()
}
