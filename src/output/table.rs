use comfy_table::{Color, Table};

use tpen::{ErrorTally, ProjectRecord, ProjectRef};

use crate::output::format::{
    create_styled_table, format_number, header_cell, right_cell, styled_cell,
};

pub(crate) fn print_listing_table(projects: &[ProjectRef], use_color: bool) {
    let mut table = create_styled_table();
    table.set_header(vec![header_cell("ID", use_color), header_cell("Project", use_color)]);
    for project in projects {
        table.add_row(vec![
            right_cell(&project.id, None, false),
            styled_cell(&project.label, None, false),
        ]);
    }
    println!("{table}");
    println!("\n  {} projects\n", format_number(projects.len() as u64));
}

pub(crate) fn print_records_table(records: &[ProjectRecord], use_color: bool) {
    let mut table = create_styled_table();
    table.set_header(vec![
        header_cell("ID", use_color),
        header_cell("Project", use_color),
        header_cell("Status", use_color),
        header_cell("Bytes", use_color),
    ]);

    let mut failed = 0;
    for record in records {
        let (status, color, bytes) = match (record.data(), record.garbage()) {
            (Some(data), _) => ("ok", Color::Green, data.len()),
            (None, garbage) => {
                failed += 1;
                ("bad file", Color::Red, garbage.map_or(0, str::len))
            }
        };
        table.add_row(vec![
            right_cell(&record.project.id, None, false),
            styled_cell(&record.project.label, None, false),
            styled_cell(status, use_color.then_some(color), false),
            right_cell(&format_number(bytes as u64), None, false),
        ]);
    }
    println!("{table}");
    println!(
        "\n  {} fetched, {} failed\n",
        format_number((records.len() - failed) as u64),
        format_number(failed as u64)
    );
}

/// Per-category counts with a total row
pub(crate) fn tally_table(tally: &ErrorTally, use_color: bool) -> Table {
    let mut table = create_styled_table();
    table.set_header(vec![header_cell("Category", use_color), header_cell("Count", use_color)]);
    for (kind, count) in tally.iter() {
        let color = (use_color && count > 0).then_some(Color::Yellow);
        table.add_row(vec![
            styled_cell(kind.as_str(), color, false),
            right_cell(&format_number(count), color, count > 0),
        ]);
    }
    table.add_row(vec![
        styled_cell("total", None, true),
        right_cell(&format_number(tally.total()), None, true),
    ]);
    table
}
