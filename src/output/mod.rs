mod format;
mod json;
mod table;

pub(crate) use json::{listing_json, record_json, tally_json};
pub(crate) use table::{print_listing_table, print_records_table, tally_table};
