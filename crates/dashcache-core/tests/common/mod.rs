#![allow(dead_code)]
use dashcache_core::Table;
use serde_json::json;

/// Three days of overview case counts, newest first.
pub fn overview_cases() -> Table {
    Table::new(["date", "areaType", "areaCode", "newCases"])
        .with_row(vec![json!("2021-01-04"), json!("overview"), json!("K02000001"), json!(58784)])
        .and_then(|t| {
            t.with_row(vec![json!("2021-01-03"), json!("overview"), json!("K02000001"), json!(54990)])
        })
        .and_then(|t| {
            t.with_row(vec![json!("2021-01-02"), json!("overview"), json!("K02000001"), json!(57725)])
        })
        .expect("fixture rows match the header")
}
