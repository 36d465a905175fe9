use crate::record::SessionRecord;
use crate::util::format_score;
use chrono::NaiveDate;
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub const HEADER: [&str; 7] = [
    "Date",
    "Total Score",
    "Listening",
    "Reading",
    "Writing",
    "Translation",
    "Duration (min)",
];

/// Spreadsheet apps need the byte-order mark to detect UTF-8
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub fn default_file_name(today: NaiveDate) -> String {
    format!("cet6_practice_history_{}.csv", today.format("%Y-%m-%d"))
}

fn row(record: &SessionRecord) -> [String; 7] {
    let date = record
        .created_at()
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    [
        date,
        format_score(record.total_score),
        format_score(record.score_listening),
        format_score(record.score_reading),
        format_score(record.score_writing),
        format_score(record.score_translation),
        record.duration_minutes.to_string(),
    ]
}

/// Writes one row per record, in the order given
pub fn write_csv<W: Write>(records: &[SessionRecord], writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(HEADER)?;
    for record in records {
        wtr.write_record(row(record))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Exports to a file; nothing is written when there are no records
pub fn export_to_path(records: &[SessionRecord], path: &Path) -> Result<bool, csv::Error> {
    if records.is_empty() {
        return Ok(false);
    }
    let mut file = File::create(path)?;
    file.write_all(UTF8_BOM)?;
    write_csv(records, file)?;
    log::debug!("exported {} records to {}", records.len(), path.display());
    Ok(true)
}
