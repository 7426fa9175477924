//! Rendering shared by the subcommands: pretty JSON with `--json`, borderless tables
//! otherwise.

use comfy_table::{presets, CellAlignment, ContentArrangement, Table};
use serde::Serialize;

use crate::app::GlobalOptions;

/// Print `data` as JSON (if `--json`) or call `display_fn` for human-readable output.
pub fn print_output<T: Serialize>(
    data: &T,
    opts: &GlobalOptions,
    display_fn: impl FnOnce(&T),
) -> anyhow::Result<()> {
    if opts.json {
        println!("{}", serde_json::to_string_pretty(data)?);
    } else {
        display_fn(data);
    }
    Ok(())
}

/// Table columns printed by the subcommands.
#[derive(Clone, Copy, Debug)]
pub enum Column {
    /// Evaluation position of a rule.
    Order,
    /// Rule name.
    Rule,
    /// What a rule matches and does.
    Matches,
    /// Outcome of one overload.
    Status,
    /// The overload's full signature.
    Overload,
    /// Replacement kind or the reason nothing was installed.
    Detail,
}

impl Column {
    fn header(self) -> &'static str {
        match self {
            Column::Order => "#",
            Column::Rule => "Rule",
            Column::Matches => "Matches",
            Column::Status => "Status",
            Column::Overload => "Overload",
            Column::Detail => "Detail",
        }
    }

    fn alignment(self) -> CellAlignment {
        match self {
            Column::Order => CellAlignment::Right,
            _ => CellAlignment::Left,
        }
    }
}

/// Renders `rows` under `columns`, one space between columns, no trailing whitespace.
pub fn render_table(columns: &[Column], rows: impl IntoIterator<Item = Vec<String>>) -> String {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(columns.iter().map(|column| column.header()));

    for (index, column) in columns.iter().enumerate() {
        if let Some(cells) = table.column_mut(index) {
            cells.set_cell_alignment(column.alignment());
            cells.set_padding((0, 1));
        }
    }
    table.add_rows(rows);

    table
        .to_string()
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_table_aligns_order_right() {
        let text = render_table(
            &[Column::Order, Column::Rule],
            vec![
                vec!["1".to_string(), "okhttp-pinning".to_string()],
                vec!["10".to_string(), "default".to_string()],
            ],
        );
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("Rule"));
        assert!(lines[1].starts_with(" 1 okhttp-pinning"));
        assert!(lines[2].starts_with("10 default"));
        assert!(lines.iter().all(|line| !line.ends_with(' ')));
    }
}
