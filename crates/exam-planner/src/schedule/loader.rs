use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::domain::ExamRecord;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read exam data: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid exam JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid exam table: {0}")]
    Csv(#[from] csv::Error),
    #[error("unsupported exam data format '{0}'")]
    UnsupportedFormat(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonRow {
    #[serde(default)]
    school_name: Option<String>,
    #[serde(default)]
    area: Option<String>,
    #[serde(default)]
    deviation: Option<Value>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    exam_name: Option<String>,
    #[serde(default)]
    apply_start: Option<String>,
    #[serde(default)]
    apply_end: Option<String>,
    #[serde(default)]
    exam_date: Option<String>,
    #[serde(default)]
    result_date: Option<String>,
    #[serde(default)]
    annual: Option<String>,
    #[serde(default)]
    refund: Option<String>,
}

impl JsonRow {
    fn into_record(self) -> ExamRecord {
        let text = |value: Option<String>| value.unwrap_or_default();
        ExamRecord {
            school_name: text(self.school_name),
            area: text(self.area),
            deviation: self.deviation.as_ref().and_then(deviation_from_json),
            category: text(self.category),
            exam_name: text(self.exam_name),
            apply_start: text(self.apply_start),
            apply_end: text(self.apply_end),
            exam_date: text(self.exam_date),
            result_date: text(self.result_date),
            annual: text(self.annual),
            refund: text(self.refund),
        }
    }
}

fn deviation_from_json(value: &Value) -> Option<i32> {
    match value {
        Value::Number(number) => number.as_f64().map(|v| v.round() as i32),
        Value::String(raw) => parse_deviation(raw),
        _ => None,
    }
}

/// Leading integer of `raw`; zero and non-numeric values mean "no deviation".
fn parse_deviation(raw: &str) -> Option<i32> {
    let trimmed = raw.trim();
    let digits: String = trimmed
        .char_indices()
        .take_while(|(index, c)| c.is_ascii_digit() || (*index == 0 && *c == '-'))
        .map(|(_, c)| c)
        .collect();
    digits.parse::<i32>().ok().filter(|value| *value != 0)
}

fn clean_field(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '\u{FFFD}' && *c != '\u{FEFF}')
        .collect::<String>()
        .trim()
        .to_string()
}

fn clean_record(record: ExamRecord) -> ExamRecord {
    ExamRecord {
        school_name: clean_field(&record.school_name),
        area: clean_field(&record.area),
        category: clean_field(&record.category),
        exam_name: clean_field(&record.exam_name),
        apply_start: clean_field(&record.apply_start),
        apply_end: clean_field(&record.apply_end),
        exam_date: clean_field(&record.exam_date),
        result_date: clean_field(&record.result_date),
        annual: clean_field(&record.annual),
        refund: clean_field(&record.refund),
        deviation: record.deviation,
    }
}

/// Copies a school's known area onto its rows that left the area blank.
fn fill_missing_areas(records: &mut [ExamRecord]) {
    let known: HashMap<String, String> = records
        .iter()
        .filter(|record| !record.school_name.is_empty() && !record.area.is_empty())
        .map(|record| (record.school_name.clone(), record.area.clone()))
        .collect();

    for record in records.iter_mut() {
        if record.area.is_empty() {
            if let Some(area) = known.get(&record.school_name) {
                record.area = area.clone();
            }
        }
    }
}

fn finish(records: Vec<ExamRecord>) -> Vec<ExamRecord> {
    let total = records.len();
    let mut usable: Vec<ExamRecord> = records
        .into_iter()
        .map(clean_record)
        .filter(|record| !record.exam_date.is_empty())
        .collect();
    fill_missing_areas(&mut usable);

    info!(total, usable = usable.len(), "loaded exam records");
    usable
}

pub fn load_records_from_json<R: Read>(reader: R) -> Result<Vec<ExamRecord>, LoadError> {
    let rows: Vec<JsonRow> = serde_json::from_reader(reader)?;
    Ok(finish(rows.into_iter().map(JsonRow::into_record).collect()))
}

/// Headered rows mapped by position: eleven columns carry a category after the
/// deviation, ten columns omit it.
pub fn load_records_from_csv<R: Read>(
    reader: R,
    delimiter: u8,
) -> Result<Vec<ExamRecord>, LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for row in csv_reader.records() {
        let row = row?;
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        records.push(record_from_columns(&row));
    }

    Ok(finish(records))
}

fn record_from_columns(row: &csv::StringRecord) -> ExamRecord {
    let column = |index: usize| row.get(index).unwrap_or_default().to_string();
    let (category, offset) = if row.len() >= 11 {
        (column(3), 4)
    } else {
        (String::new(), 3)
    };

    ExamRecord {
        school_name: column(0),
        area: column(1),
        deviation: row.get(2).and_then(parse_deviation),
        category,
        exam_name: column(offset),
        apply_start: column(offset + 1),
        apply_end: column(offset + 2),
        exam_date: column(offset + 3),
        result_date: column(offset + 4),
        annual: column(offset + 5),
        refund: column(offset + 6),
    }
}

pub fn load_records_from_path(path: &Path) -> Result<Vec<ExamRecord>, LoadError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    let reader = BufReader::new(File::open(path)?);
    match extension.as_str() {
        "json" => load_records_from_json(reader),
        "csv" => load_records_from_csv(reader, b','),
        "tsv" | "txt" => load_records_from_csv(reader, b'\t'),
        other => Err(LoadError::UnsupportedFormat(other.to_string())),
    }
}
