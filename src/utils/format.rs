//! Table formatting and output utilities

use tabled::{
    settings::{object::Rows, Alignment, Modify, Padding, Style},
    Table, Tabled,
};

/// Render rows as a rounded table with a centered header
pub fn format_table<T: Tabled>(data: &[T]) -> String {
    if data.is_empty() {
        return "No data to display".to_string();
    }

    Table::new(data)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .with(Padding::new(1, 1, 0, 0))
        .to_string()
}

/// Format key-value pairs with aligned keys
pub fn format_key_value_pairs(pairs: &[(&str, String)]) -> String {
    let max_key_length = pairs.iter().map(|(key, _)| key.len()).max().unwrap_or(0);

    pairs
        .iter()
        .map(|(key, value)| format!("{:width$}: {}", key, value, width = max_key_length))
        .collect::<Vec<_>>()
        .join("\n")
}
