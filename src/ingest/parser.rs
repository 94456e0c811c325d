//! Row classification and parsing for one year-sheet
//!
//! The sheets are laid out by hand:
//!
//! ```text
//! col:  0     1       2          3                 4      5        6         7          8       9
//!       STT | Ngày  | Tên KH   | Địa chỉ/SĐT     | Tổng | Cọc    | Ship    | Còn lại  | TT    | Ghi chú
//!       1   | 2/1   | Lan      | Q1, 0909...     | 350  | 100    | 30      | 280      | xong  |
//!       2   |       | Minh     | ...             | 120  | 0      | 0       | 120      | done  |
//!           |       |          |                 | 470  |        |         |          |       |   <- subtotal
//! ```
//!
//! - One or more label rows sit above the data (detected, not assumed)
//! - The date is only written on the first order of each day
//! - Subtotal rows carry numbers but no customer name

use super::normalizer::{parse_amount, try_parse_amount, try_parse_local_date, year_from_sheet_name};
use super::types::Order;

/// Only the first few rows are inspected for header/label rows
const HEADER_SCAN_ROWS: usize = 5;

/// Rows shorter than this cannot hold a total and are skipped
const MIN_ROW_CELLS: usize = 5;

const COL_DATE: usize = 1;
const COL_CUSTOMER: usize = 2;
const COL_ADDRESS: usize = 3;
const COL_TOTAL: usize = 4;
const COL_DEPOSIT: usize = 5;
const COL_SHIPPING: usize = 6;
const COL_REMAINING: usize = 7;
const COL_STATUS: usize = 8;
const COL_NOTES: usize = 9;

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("")
}

/// A row is a label row when its total cell holds text that is not a number
fn is_label_row(row: &[String]) -> bool {
    let total = cell(row, COL_TOTAL);
    !total.is_empty() && try_parse_amount(total).is_err()
}

/// Index of the first data row: one past the last label row within the scan window
pub fn data_start_index(grid: &[Vec<String>]) -> usize {
    grid.iter()
        .take(HEADER_SCAN_ROWS)
        .enumerate()
        .filter(|(_, row)| is_label_row(row))
        .map(|(i, _)| i + 1)
        .last()
        .unwrap_or(0)
}

/// Parse one sheet's raw grid into orders, preserving row order.
///
/// `current_year` is used only when the sheet name carries no year. Malformed
/// cells degrade to defaults and unqualified rows are dropped; this never fails.
pub fn parse_sheet(grid: &[Vec<String>], sheet_name: &str, current_year: i32) -> Vec<Order> {
    let year = year_from_sheet_name(sheet_name, current_year);
    let start = data_start_index(grid);

    let mut orders = Vec::new();
    let mut carried_date = String::new();
    let mut skipped = 0usize;

    for (row_index, row) in grid.iter().enumerate().skip(start) {
        if row.len() < MIN_ROW_CELLS {
            skipped += 1;
            continue;
        }

        let customer_name = cell(row, COL_CUSTOMER).trim();
        if customer_name.is_empty() {
            skipped += 1;
            continue;
        }

        if let Ok(parts) = try_parse_local_date(cell(row, COL_DATE), year) {
            carried_date = parts.to_iso();
        }

        orders.push(Order {
            id: format!("{}-{}", sheet_name, row_index),
            date: carried_date.clone(),
            customer_name: customer_name.to_string(),
            address_phone_notes: cell(row, COL_ADDRESS).trim().to_string(),
            total: parse_amount(cell(row, COL_TOTAL)),
            deposit: parse_amount(cell(row, COL_DEPOSIT)),
            shipping: parse_amount(cell(row, COL_SHIPPING)),
            remaining: parse_amount(cell(row, COL_REMAINING)),
            status: cell(row, COL_STATUS).trim().to_lowercase(),
            notes: cell(row, COL_NOTES).trim().to_string(),
            sheet_name: sheet_name.to_string(),
        });
    }

    log::debug!(
        "Parsed sheet {:?}: {} orders, {} header rows, {} rows skipped",
        sheet_name,
        orders.len(),
        start,
        skipped
    );

    orders
}
