use tpen::{ErrorTally, ProjectRecord, ProjectRef};

pub(crate) fn listing_json(projects: &[ProjectRef]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(projects)
}

/// One record per line, for streaming output
pub(crate) fn record_json(record: &ProjectRecord) -> serde_json::Result<String> {
    serde_json::to_string(record)
}

pub(crate) fn tally_json(tally: &ErrorTally) -> serde_json::Result<String> {
    serde_json::to_string(tally)
}
