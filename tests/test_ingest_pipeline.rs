//! Integration tests for the ingestion pipeline
//!
//! Drives discovery, concurrent fetch, parsing, snapshot replacement and the
//! aggregates end-to-end through an in-memory sheet source.
//!
//! Key integration points tested:
//! - Sheets come back in discovery order no matter which fetch finishes first
//! - A failed or timed-out run leaves the previous snapshot untouched
//! - Both snapshot backends feed the same aggregates

#[cfg(test)]
mod ingest_pipeline_tests {
    use orderflow::aggregator::{monthly_revenue, search_orders, summarize, top_customers};
    use orderflow::ingest::{run_with_timeout, sync_snapshot, IngestOptions, MemorySource};
    use orderflow::snapshot::{JsonSnapshotStore, SnapshotStore, SqliteSnapshotStore};
    use orderflow::IngestError;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;

    const CURRENT_YEAR: i32 = 2026;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn options() -> IngestOptions {
        IngestOptions {
            sheet_prefix: "Order ".to_string(),
            target_gid: "0".to_string(),
            current_year: CURRENT_YEAR,
            ingest_timeout: Duration::from_secs(5),
        }
    }

    /// Three real sheets: 2024 and 2025 by name, 2026 behind the default view
    fn shop_source() -> MemorySource {
        MemorySource::new("D")
            .with_sheet(
                "Order 2024",
                "S24",
                vec![
                    row(&["ĐƠN HÀNG 2024", "", "", "", ""]),
                    row(&["STT", "Ngày", "Tên KH", "Địa chỉ/SĐT", "Tổng", "Cọc", "Ship", "Còn lại", "TT", "Ghi chú"]),
                    row(&["1", "15/1", "Lan", "Q1 0909 111 222", "500,000", "100,000", "30,000", "400,000", "Xong", "gói quà"]),
                    row(&["2", "", "Minh", "Q3 0912 333 444", "200,000", "0", "0", "200,000", "", ""]),
                    row(&["", "", "", "", "700,000", "", "", "", "", ""]),
                    row(&["3", "2/2", "Lan", "Q1 0909 111 222", "300,000", "300,000", "0", "0", "done", ""]),
                ],
            )
            .with_sheet(
                "Order 2025",
                "S25",
                vec![
                    row(&["STT", "Ngày", "Tên KH", "Địa chỉ/SĐT", "Tổng"]),
                    row(&["1", "20/2/25", "Hoa", "Thủ Đức", "1,000,000", "", "", "", "đã lên đơn", ""]),
                ],
            )
            .with_sheet(
                "Order 2026",
                "D",
                vec![row(&["1", "3/1", "Minh", "Q3 0912 333 444", "150,000", "", "", "", "chờ", ""])],
            )
            .with_gid("0", "D")
    }

    #[tokio::test]
    async fn test_end_to_end_sqlite_snapshot() {
        let dir = tempdir().unwrap();
        let store = SqliteSnapshotStore::new(dir.path().join("orders.db")).unwrap();

        let report = sync_snapshot(Arc::new(shop_source()), &store, &options()).await.unwrap();
        assert_eq!(report.meta.sheet_names, vec!["Order 2024", "Order 2025", "Order 2026"]);
        assert_eq!(report.meta.record_count, 5);

        let orders = store.load().await.unwrap().unwrap();
        let ids: Vec<&str> = orders.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["Order 2024-2", "Order 2024-3", "Order 2024-5", "Order 2025-1", "Order 2026-0"]
        );

        // Carried-forward date and two-digit year
        assert_eq!(orders[1].date, "2024-01-15");
        assert_eq!(orders[3].date, "2025-02-20");

        let summary = summarize(&orders);
        assert_eq!(summary.total_orders, 5);
        assert_eq!(summary.completed_orders, 3);
        assert_eq!(summary.total_revenue, 2_150_000.0);

        let top = top_customers(&orders, 2);
        assert_eq!(top[0].name, "Hoa");
        assert_eq!(top[1].name, "Lan");
        assert_eq!(top[1].order_count, 2);

        let months: Vec<String> = monthly_revenue(&orders).into_iter().map(|p| p.period).collect();
        assert_eq!(months, vec!["2024-01", "2024-02", "2025-02", "2026-01"]);

        assert_eq!(search_orders(&orders, "0912").len(), 2);
    }

    #[tokio::test]
    async fn test_discovery_order_survives_slow_fetches() {
        let dir = tempdir().unwrap();
        let store = JsonSnapshotStore::new(dir.path().join("orders.json"));
        // Completion order is 2026, 2025, 2024: the reverse of discovery order
        let source = shop_source()
            .with_sheet_delay("Order 2024", Duration::from_millis(300))
            .with_sheet_delay("Order 2025", Duration::from_millis(150));

        let report = sync_snapshot(Arc::new(source), &store, &options()).await.unwrap();

        let sheets: Vec<&str> = report.result.orders.iter().map(|o| o.sheet_name.as_str()).collect();
        assert_eq!(
            sheets,
            vec!["Order 2024", "Order 2024", "Order 2024", "Order 2025", "Order 2026"]
        );
    }

    #[tokio::test]
    async fn test_failed_run_keeps_previous_snapshot() {
        let dir = tempdir().unwrap();
        let store = JsonSnapshotStore::new(dir.path().join("orders.json"));

        let first = sync_snapshot(Arc::new(shop_source()), &store, &options()).await.unwrap();

        // 2026 is only reachable through the default view and now has no content
        let broken = MemorySource::new("D")
            .with_sheet("Order 2024", "S24", vec![row(&["1", "1/1", "Tú", "", "10"])])
            .with_gid("0", "D");
        let err = sync_snapshot(Arc::new(broken), &store, &options()).await.unwrap_err();
        assert!(matches!(err, IngestError::Source { ref sheet, .. } if sheet == "Order 2026"));

        assert_eq!(store.load().await.unwrap().unwrap(), first.result.orders);
        assert_eq!(store.load_meta().await.unwrap().unwrap(), first.meta);
    }

    #[tokio::test]
    async fn test_timed_out_run_keeps_previous_snapshot() {
        let dir = tempdir().unwrap();
        let store = SqliteSnapshotStore::new(dir.path().join("orders.db")).unwrap();

        let first = run_with_timeout(Arc::new(shop_source()), &store, &options()).await.unwrap();

        let slow = shop_source().with_fetch_delay(Duration::from_secs(30));
        let mut opts = options();
        opts.ingest_timeout = Duration::from_millis(50);
        let err = run_with_timeout(Arc::new(slow), &store, &opts).await.unwrap_err();
        assert!(matches!(err, IngestError::Timeout(_)));

        let meta = store.load_meta().await.unwrap().unwrap();
        assert_eq!(meta.record_count, first.meta.record_count);
        assert_eq!(store.load().await.unwrap().unwrap(), first.result.orders);
    }

    #[tokio::test]
    async fn test_backends_agree() {
        let dir = tempdir().unwrap();
        let json = JsonSnapshotStore::new(dir.path().join("orders.json"));
        let sqlite = SqliteSnapshotStore::new(dir.path().join("orders.db")).unwrap();

        sync_snapshot(Arc::new(shop_source()), &json, &options()).await.unwrap();
        sync_snapshot(Arc::new(shop_source()), &sqlite, &options()).await.unwrap();

        let from_json = json.load().await.unwrap().unwrap();
        let from_sqlite = sqlite.load().await.unwrap().unwrap();
        assert_eq!(from_json, from_sqlite);
        assert_eq!(summarize(&from_json), summarize(&from_sqlite));
    }
}
