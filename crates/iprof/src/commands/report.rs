//! Rendering of section statistics as a table, CSV or JSON.

use crate::stats::SectionStats;
use chrono::{DateTime, SecondsFormat, Utc};
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::UTF8_FULL};
use std::collections::BTreeMap;
use std::time::Duration;

/// Run-level facts printed above the table
#[derive(Debug, Clone)]
pub struct ReportMeta {
    pub generated: DateTime<Utc>,
    pub elapsed: Duration,
    pub submitted: u64,
    pub processed: u64,
    pub dropped: u64,
}

pub fn render_table(
    meta: &ReportMeta,
    stats: &BTreeMap<String, SectionStats>,
    percentiles: &[f64],
) -> String {
    let mut out = String::new();
    let elapsed = Duration::from_millis(meta.elapsed.as_millis() as u64);
    out.push_str(&format!(
        "# Generated: {}\n",
        meta.generated.to_rfc3339_opts(SecondsFormat::Secs, true)
    ));
    out.push_str(&format!(
        "# Elapsed: {} | Submitted: {} | Processed: {} | Dropped: {}\n\n",
        humantime::format_duration(elapsed),
        format_count(meta.submitted),
        format_count(meta.processed),
        format_count(meta.dropped)
    ));

    if stats.is_empty() {
        out.push_str("No samples recorded.\n");
        return out;
    }

    let mut header = vec![
        "SECTION".to_string(),
        "COUNT".to_string(),
        "TOTAL".to_string(),
        "MEAN".to_string(),
        "MIN".to_string(),
    ];
    header.extend(percentiles.iter().map(|p| percentile_label(*p).to_uppercase()));
    header.push("MAX".to_string());

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);

    for (name, s) in stats {
        let mut row = vec![
            Cell::new(name),
            right(format_count(s.count as u64)),
            right(format_count(s.total)),
            right(format_ms(s.mean)),
            right(format_ms(s.percentiles.min())),
        ];
        row.extend(percentiles.iter().map(|p| right(format_ms(s.percentile(*p)))));
        row.push(right(format_ms(s.percentiles.max())));
        table.add_row(row);
    }

    out.push_str(&table.to_string());
    out.push('\n');
    out
}

pub fn render_csv(stats: &BTreeMap<String, SectionStats>, percentiles: &[f64]) -> String {
    let mut out = String::from("section,count,total,mean_ms,min_ms");
    for p in percentiles {
        out.push_str(&format!(",{}_ms", percentile_label(*p)));
    }
    out.push_str(",max_ms\n");

    for (name, s) in stats {
        out.push_str(&format!(
            "\"{}\",{},{},{:.3},{:.3}",
            name.replace('"', "\"\""),
            s.count,
            s.total,
            s.mean,
            s.percentiles.min()
        ));
        for p in percentiles {
            out.push_str(&format!(",{:.3}", s.percentile(*p)));
        }
        out.push_str(&format!(",{:.3}\n", s.percentiles.max()));
    }
    out
}

pub fn render_json(
    meta: &ReportMeta,
    stats: &BTreeMap<String, SectionStats>,
    percentiles: &[f64],
) -> String {
    let mut out = String::from("{\n");
    out.push_str(&format!(
        "  \"generated\": \"{}\",\n",
        meta.generated.to_rfc3339_opts(SecondsFormat::Millis, true)
    ));
    out.push_str(&format!("  \"elapsed_ms\": {},\n", meta.elapsed.as_millis()));
    out.push_str(&format!("  \"submitted\": {},\n", meta.submitted));
    out.push_str(&format!("  \"processed\": {},\n", meta.processed));
    out.push_str(&format!("  \"dropped\": {},\n", meta.dropped));
    out.push_str("  \"sections\": [\n");

    for (i, (name, s)) in stats.iter().enumerate() {
        let comma = if i < stats.len() - 1 { "," } else { "" };
        let pcts: Vec<String> = percentiles
            .iter()
            .map(|p| format!("\"{}\": {:.3}", percentile_label(*p), s.percentile(*p)))
            .collect();
        out.push_str(&format!(
            "    {{ \"section\": \"{}\", \"count\": {}, \"total\": {}, \"mean_ms\": {:.3}, \"min_ms\": {:.3}, \"max_ms\": {:.3}, \"percentiles_ms\": {{ {} }} }}{}\n",
            escape_json(name),
            s.count,
            s.total,
            s.mean,
            s.percentiles.min(),
            s.percentiles.max(),
            pcts.join(", "),
            comma
        ));
    }

    out.push_str("  ]\n}\n");
    out
}

fn right(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

fn escape_json(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// `p50`, `p99.9`
pub fn percentile_label(p: f64) -> String {
    if p.fract() == 0.0 {
        format!("p{}", p as u64)
    } else {
        format!("p{}", p)
    }
}

/// Format milliseconds with a unit that keeps 3-4 significant digits
pub fn format_ms(ms: f64) -> String {
    if ms < 1.0 {
        format!("{:.0}µs", ms * 1000.0)
    } else if ms < 1000.0 {
        format!("{:.2}ms", ms)
    } else {
        format!("{:.2}s", ms / 1000.0)
    }
}

/// Format a number with commas for readability
pub fn format_count(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::Percentiles;

    fn sample() -> BTreeMap<String, SectionStats> {
        let mut map = BTreeMap::new();
        map.insert(
            "db".to_string(),
            SectionStats {
                count: 4,
                total: 9,
                mean: 2.5,
                percentiles: Percentiles::new(vec![1.0, 2.0, 3.0, 4.0]).unwrap(),
            },
        );
        map
    }

    fn meta() -> ReportMeta {
        ReportMeta {
            generated: Utc::now(),
            elapsed: Duration::from_millis(1500),
            submitted: 9,
            processed: 9,
            dropped: 0,
        }
    }

    #[test]
    fn test_labels_and_units() {
        assert_eq!(percentile_label(99.0), "p99");
        assert_eq!(percentile_label(99.9), "p99.9");
        assert_eq!(format_ms(0.25), "250µs");
        assert_eq!(format_ms(12.346), "12.35ms");
        assert_eq!(format_ms(2500.0), "2.50s");
        assert_eq!(format_count(1234567), "1,234,567");
    }

    #[test]
    fn test_csv() {
        let csv = render_csv(&sample(), &[50.0, 100.0]);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "section,count,total,mean_ms,min_ms,p50_ms,p100_ms,max_ms"
        );
        // p50 over 4 values: n=2.5 -> 3 + 0.5 * (4 - 3)
        assert_eq!(
            lines.next().unwrap(),
            "\"db\",4,9,2.500,1.000,3.500,4.000,4.000"
        );
    }

    #[test]
    fn test_json_contains_sections() {
        let json = render_json(&meta(), &sample(), &[95.0]);
        assert!(json.contains("\"section\": \"db\""));
        assert!(json.contains("\"p95\": "));
        assert!(json.contains("\"elapsed_ms\": 1500"));
    }

    #[test]
    fn test_json_escapes_control_characters() {
        let mut stats = sample();
        let db = stats.remove("db").unwrap();
        stats.insert("db\tq\n\"x\"\\\u{1}".to_string(), db);

        let json = render_json(&meta(), &stats, &[50.0]);
        assert!(json.contains(r#""section": "db\tq\n\"x\"\\\u0001""#));
        assert!(!json.contains('\t'));
        assert!(!json.contains('\u{1}'));
    }

    #[test]
    fn test_table_mentions_every_section() {
        let table = render_table(&meta(), &sample(), &[50.0, 99.0]);
        assert!(table.contains("db"));
        assert!(table.contains("P99"));
        assert!(table.contains("Elapsed: 1s 500ms"));
    }

    #[test]
    fn test_empty_table() {
        let table = render_table(&meta(), &BTreeMap::new(), &[50.0]);
        assert!(table.contains("No samples recorded."));
    }
}
