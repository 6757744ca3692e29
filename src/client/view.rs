//! Plain-text rendering of the browser state.

use chrono::DateTime;
use std::fmt::Write;

use super::store::CatalogState;
use crate::database::{OrderColumn, OrderSpec};

pub const NO_MATCHES: &str = "No episodes matched.";

/// `YYYY.MM.DD` in UTC; out-of-range timestamps render as `????.??.??`.
pub fn format_air_date(epoch_ms: i64) -> String {
    DateTime::from_timestamp_millis(epoch_ms)
        .map(|dt| dt.format("%Y.%m.%d").to_string())
        .unwrap_or_else(|| "????.??.??".to_string())
}

fn sort_marker(order: OrderSpec, column: OrderColumn) -> &'static str {
    if order.column() != column {
        ""
    } else if order.is_ascending() {
        " ^"
    } else {
        " v"
    }
}

pub fn render(state: &CatalogState) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Episodes (page {}/{})",
        state.current_page, state.num_of_pages
    );
    let _ = writeln!(
        out,
        "{} matching, sorted by {}",
        state.total_matching, state.order
    );

    if state.rows.is_empty() {
        let _ = writeln!(out, "{}", NO_MATCHES);
    } else {
        let _ = writeln!(
            out,
            "{:>3}  {:<40} {:<12} {}",
            "#",
            format!("Title{}", sort_marker(state.order, OrderColumn::Title)),
            format!("Air date{}", sort_marker(state.order, OrderColumn::Date)),
            format!("Episode{}", sort_marker(state.order, OrderColumn::Episode)),
        );
        for (index, row) in state.rows.iter().enumerate() {
            let _ = writeln!(
                out,
                "{:>3}  {:<40} {:<12} {}",
                index + 1,
                row.episode.title,
                format_air_date(row.episode.air_date),
                row.episode.episode_code
            );
        }
    }

    if state.popup.shown {
        let _ = writeln!(out);
        let _ = writeln!(out, "Characters {}", state.popup.episode_code);
        if state.popup.characters.is_empty() {
            let _ = writeln!(out, "  (none loaded)");
        }
        for character in &state.popup.characters {
            let _ = writeln!(out, "  {}", character.name);
        }
    }

    out
}
