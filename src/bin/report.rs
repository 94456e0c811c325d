//! Report Binary - dashboard figures from the last snapshot
//!
//! Prints summary totals, top customers and revenue per period as JSON on
//! stdout. Works offline; only the stored snapshot is read.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin report -- --sheet "Order 2025" --top 5
//! cargo run --release --bin report -- --customer "Lan"
//! cargo run --release --bin report -- --search "quận 3" --daily
//! ```
//!
//! ## Flags
//!
//! - --backend json|sqlite - snapshot backend (default: json)
//! - --sheet NAME - restrict to one year-sheet
//! - --customer NAME - list that customer's orders (case-insensitive)
//! - --search TEXT - list orders matching TEXT
//! - --top N - top customer count (default: TOP_CUSTOMERS_LIMIT or 10)
//! - --daily - revenue per day instead of per month
//! - --sort date|customer|total|remaining|status - order listing sort (default: date)
//! - --asc - ascending listing (default: descending)

use orderflow::aggregator::{
    daily_revenue, filter_by_sheet, monthly_revenue, orders_for_customer, search_orders,
    sort_orders, summarize, top_customers, SortDirection, SortField,
};
use orderflow::config::{arg_value, StoreConfig};
use orderflow::snapshot::open_store;
use serde_json::json;
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let config = StoreConfig::from_env(&args);
    let store = open_store(&config)?;

    let (Some(orders), Some(meta)) = (store.load().await?, store.load_meta().await?) else {
        log::info!("⚠️  No snapshot yet, run the sync binary first");
        return Ok(());
    };

    let sheet = arg_value(&args, "--sheet");
    let limit = match arg_value(&args, "--top") {
        Some(raw) => raw.parse::<usize>().map_err(|e| format!("invalid --top '{}': {}", raw, e))?,
        None => config.top_customers_limit,
    };

    let sort_field: SortField = arg_value(&args, "--sort")
        .as_deref()
        .unwrap_or("date")
        .parse()?;
    let direction = if args.iter().any(|a| a == "--asc") {
        SortDirection::Asc
    } else {
        SortDirection::Desc
    };

    let scoped = filter_by_sheet(&orders, sheet.as_deref());
    log::info!("📊 {} of {} orders in scope", scoped.len(), orders.len());

    if let Some(name) = arg_value(&args, "--customer") {
        let mut history = orders_for_customer(&scoped, &name);
        sort_orders(&mut history, sort_field, direction);
        let report = json!({
            "customer": name,
            "summary": summarize(&history),
            "orders": history,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if let Some(query) = arg_value(&args, "--search") {
        let mut matches = search_orders(&scoped, &query);
        sort_orders(&mut matches, sort_field, direction);
        let report = json!({
            "query": query,
            "count": matches.len(),
            "orders": matches,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let revenue = if args.iter().any(|a| a == "--daily") {
        daily_revenue(&scoped)
    } else {
        monthly_revenue(&scoped)
    };

    let report = json!({
        "lastSync": meta.last_sync.to_rfc3339(),
        "sheets": meta.sheet_names,
        "sheet": sheet,
        "summary": summarize(&scoped),
        "topCustomers": top_customers(&scoped, limit),
        "revenue": revenue,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
