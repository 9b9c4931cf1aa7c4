//! Text rendering for the one-shot report commands.

use chrono::{DateTime, FixedOffset};
use facescan_core::record::timestamp;
use facescan_core::{ScanRecord, ScanStats};
use std::fmt::Write;
use std::path::Path;

pub fn render_stats(stats: &ScanStats, faces_dir: &Path, log_file: &Path) -> String {
    let fmt_ts = |ts: Option<DateTime<FixedOffset>>| {
        ts.as_ref()
            .map(timestamp::format)
            .unwrap_or_else(|| "-".to_string())
    };

    let mut out = String::from("Scanning Statistics:\n");
    let _ = writeln!(out, "  total_scans: {}", stats.total_count);
    let _ = writeln!(out, "  unique_faces: {}", stats.unique_faces);
    let _ = writeln!(out, "  earliest_scan: {}", fmt_ts(stats.earliest));
    let _ = writeln!(out, "  latest_scan: {}", fmt_ts(stats.latest));
    let _ = writeln!(out, "  distinct_days: {}", stats.distinct_days);
    let _ = writeln!(out, "  scanned_faces_dir: {}", faces_dir.display());
    let _ = writeln!(out, "  log_file: {}", log_file.display());
    out
}

pub fn render_faces(records: &[ScanRecord]) -> String {
    let mut out = format!("Found {} scanned faces:\n", records.len());
    for record in records {
        let confidence = record
            .confidence
            .map(|c| format!(" ({:.0}%)", c * 100.0))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "  {} - {}{}",
            record.face_id,
            timestamp::format(&record.timestamp),
            confidence
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, ts: &str, confidence: Option<f32>) -> ScanRecord {
        let ts = DateTime::parse_from_rfc3339(ts).unwrap();
        ScanRecord::new(id, ts, Path::new("x.jpg"), confidence)
    }

    #[test]
    fn test_render_faces() {
        let out = render_faces(&[
            record("face_a", "2024-05-01T10:00:00+00:00", Some(0.914)),
            record("face_b", "2024-05-02T11:30:00+02:00", None),
        ]);
        assert_eq!(
            out,
            "Found 2 scanned faces:\n  face_a - 2024-05-01T10:00:00+00:00 (91%)\n  face_b - 2024-05-02T11:30:00+02:00\n"
        );
    }

    #[test]
    fn test_render_faces_empty() {
        assert_eq!(render_faces(&[]), "Found 0 scanned faces:\n");
    }

    #[test]
    fn test_render_stats() {
        let records = [
            record("face_a", "2024-05-01T10:00:00+00:00", None),
            record("face_b", "2024-05-03T09:00:00+00:00", None),
        ];
        let out = render_stats(
            &ScanStats::from_records(&records),
            Path::new("face_data/scanned_faces"),
            Path::new("face_data/logs/scan_log.json"),
        );
        assert!(out.starts_with("Scanning Statistics:\n"));
        assert!(out.contains("  total_scans: 2\n"));
        assert!(out.contains("  earliest_scan: 2024-05-01T10:00:00+00:00\n"));
        assert!(out.contains("  latest_scan: 2024-05-03T09:00:00+00:00\n"));
        assert!(out.contains("  distinct_days: 2\n"));
        assert!(out.contains("  log_file: face_data/logs/scan_log.json\n"));
    }

    #[test]
    fn test_render_stats_empty_log() {
        let out = render_stats(&ScanStats::from_records(&[]), Path::new("f"), Path::new("l"));
        assert!(out.contains("  earliest_scan: -\n"));
    }
}
