//! Report rendering: pure formatting of an aggregated report into a
//! Markdown comment body. No I/O happens here.

use chrono::{LocalResult, TimeZone, Utc};

use crate::report::SchemaChangeReport;

/// Binary (1024-based) unit ladder.
const BYTE_UNITS: [&str; 9] = ["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Render the report: a fixed header followed by one section per item,
/// in report order.
pub fn render(report: &SchemaChangeReport) -> String {
    let mut out = String::from("# Schema changes detected!\n");
    out.push_str("Potentially breaking schema changes were detected for the following tables:\n");

    for item in &report.items {
        let details = &item.table_details;
        out.push_str(&format!("### `{}`\n", item.full_table_name.short_upper()));
        out.push_str(&format!("{}\n", item.change_description));
        out.push_str(&format!("* Filename: `{}`\n", item.filename));
        out.push_str(&format!(
            "* Full Table Name: `{}`\n",
            item.full_table_name.dotted_upper()
        ));
        out.push_str(&format!(
            "* Most Recent Update: {}\n",
            format_utc(details.most_recent_update_timestamp)
        ));
        out.push_str(&format!(
            "* Inserted Row Count: {}\n",
            group_thousands(details.inserted_row_count)
        ));
        out.push_str(&format!(
            "* Total Row Count: {}\n",
            group_thousands(details.total_row_count)
        ));
        out.push_str(&format!(
            "* Total Bytes Processed: {}\n",
            format_bytes(details.total_bytes_processed)
        ));
        out.push_str(&format!(
            "* Load Duration Seconds: {}\n",
            details.load_duration_seconds
        ));
        out.push_str(&format!(
            "* Downstream Object Count: {}\n",
            details.downstream_object_count
        ));
        out.push_str(&format!(
            "* See more details on the [table dashboard]({})\n",
            item.dashboard_link
        ));
    }

    out
}

/// Epoch seconds to a fixed human-readable UTC string,
/// e.g. `Tue, 14 Nov 2023 22:13:20 GMT`.
pub fn format_utc(epoch_secs: i64) -> String {
    match Utc.timestamp_opt(epoch_secs, 0) {
        LocalResult::Single(timestamp) => {
            timestamp.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
        }
        _ => format!("invalid timestamp ({epoch_secs})"),
    }
}

/// Byte count to a human-readable string: divide by 1024 until the
/// value is below 1024, two decimal places.
pub fn format_bytes(byte_count: u64) -> String {
    let mut value = byte_count as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, BYTE_UNITS[unit])
}

/// Insert thousands separators, e.g. 1234567 -> "1,234,567".
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(digit);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::sample_table_details;
    use crate::change::FullTableName;
    use crate::report::{ReportItem, SchemaChangeReport};

    #[test]
    fn test_format_bytes_ladder() {
        assert_eq!(format_bytes(0), "0.00 B");
        assert_eq!(format_bytes(1023), "1023.00 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1024u64.pow(2)), "1.00 MB");
        assert_eq!(format_bytes(1024u64.pow(4)), "1.00 TB");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn test_format_utc() {
        assert_eq!(format_utc(0), "Thu, 01 Jan 1970 00:00:00 GMT");
        assert_eq!(format_utc(1_700_000_000), "Tue, 14 Nov 2023 22:13:20 GMT");
    }

    #[test]
    fn test_render_one_section_per_item() {
        let table = FullTableName::new("PC_DBT_DB", "TEST_DATA", "TPCH_ALL");
        let report = SchemaChangeReport {
            items: vec![ReportItem {
                filename: "snowflake/models/tpch_all.sql".to_string(),
                full_table_name: table.clone(),
                change_description: "Removed column `nation_name` from the select list."
                    .to_string(),
                table_details: sample_table_details(42, &table),
                dashboard_link: "https://app.example.com/table/42/dashboard?dsId=7".to_string(),
            }],
        };

        let body = render(&report);
        assert!(body.starts_with("# Schema changes detected!\n"));
        assert_eq!(body.matches("### ").count(), 1);
        assert!(body.contains("### `TPCH_ALL`\n"));
        assert!(body.contains("nation_name"));
        assert!(body.contains("* Full Table Name: `PC_DBT_DB.TEST_DATA.TPCH_ALL`\n"));
        assert!(body.contains("* Total Row Count: 3,456,789\n"));
        assert!(body.contains("* Total Bytes Processed: 1.50 KB\n"));
        assert!(body.contains("* Most Recent Update: Tue, 14 Nov 2023 22:13:20 GMT\n"));
        assert!(body.contains("https://app.example.com/table/42/dashboard?dsId=7"));
    }

    #[test]
    fn test_render_empty_report_is_header_only() {
        let body = render(&SchemaChangeReport::default());
        assert!(body.contains("# Schema changes detected!"));
        assert_eq!(body.matches("### ").count(), 0);
    }
}
