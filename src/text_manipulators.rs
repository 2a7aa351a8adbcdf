use std::sync::LazyLock;

use scraper::{ElementRef, Selector};

/// Widest row any portal table is read at.
const MAX_COLUMN: usize = 8;

// `td:nth-child(1)` ..= `td:nth-child(MAX_COLUMN)`.
static COLUMN_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    (1..=MAX_COLUMN)
        .map(|n| Selector::parse(&format!("td:nth-child({n})")).expect("static selector"))
        .collect()
});

pub fn extract_text(node: ElementRef) -> String {
    node.text().collect::<String>()
}

/// Text of the `column`-th (1-based) cell under `row`, trimmed.
///
/// Every matching descendant contributes, so a cell split across nested
/// markup still reads as one string. Missing cells read as `""`.
pub fn cell_text(row: ElementRef, column: usize) -> String {
    let Some(selector) = column.checked_sub(1).and_then(|i| COLUMN_SELECTORS.get(i)) else {
        return String::new();
    };
    row.select(selector)
        .map(extract_text)
        .collect::<String>()
        .trim()
        .to_string()
}

/// Reads `N` consecutive cells starting at column `first`.
pub fn row_cells<const N: usize>(row: ElementRef, first: usize) -> [String; N] {
    std::array::from_fn(|i| cell_text(row, first + i))
}

/// Drops `-` separators from a phone number.
pub fn strip_separators(phone: &str) -> String {
    phone.split('-').collect()
}
