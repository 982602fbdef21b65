//! CSV Import
//!
//! Reads daily check-ins from a CSV file with a header row. Columns are
//! matched by name, case-insensitively:
//!
//! | column | aliases | required |
//! |---|---|---|
//! | `date` | `day`, `timestamp` | yes |
//! | `mood_rating` | `mood` | yes |
//! | `mood_category` | `category` | no |
//! | `keywords` | `tags` | no (`;` or `\|` separated) |
//! | `energy_level` | `energy` | no |
//! | `stress_level` | `stress` | no |
//! | `sleep_quality` | `sleep` | no |
//! | `social_interaction` | `social` | no |
//! | `notes` | | no |

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use super::ImportError;
use crate::analytics::{CheckIn, MoodCategory, UserId, WellnessMetric};

const MAX_REPORTED_ERRORS: usize = 100;

/// Result of a CSV import operation
#[derive(Debug)]
pub struct CheckinImportResult {
    /// Valid check-ins in file order, one per date
    pub checkins: Vec<CheckIn>,
    pub rows_processed: usize,
    pub rows_failed: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Default)]
struct Columns {
    date: usize,
    mood: usize,
    category: Option<usize>,
    keywords: Option<usize>,
    notes: Option<usize>,
    metrics: Vec<(usize, WellnessMetric)>,
}

impl Columns {
    fn detect(headers: &csv::StringRecord) -> Result<Self, ImportError> {
        let mut date = None;
        let mut mood = None;
        let mut columns = Columns::default();

        for (idx, header) in headers.iter().enumerate() {
            match header.trim().to_lowercase().replace(' ', "_").as_str() {
                "date" | "day" | "timestamp" => date = Some(idx),
                "mood_rating" | "mood" => mood = Some(idx),
                "mood_category" | "category" => columns.category = Some(idx),
                "keywords" | "tags" => columns.keywords = Some(idx),
                "notes" => columns.notes = Some(idx),
                "energy_level" | "energy" => columns.metrics.push((idx, WellnessMetric::Energy)),
                "stress_level" | "stress" => columns.metrics.push((idx, WellnessMetric::Stress)),
                "sleep_quality" | "sleep" => columns.metrics.push((idx, WellnessMetric::SleepQuality)),
                "social_interaction" | "social" => {
                    columns.metrics.push((idx, WellnessMetric::SocialInteraction))
                }
                _ => {}
            }
        }

        columns.date = date.ok_or(ImportError::MissingColumn("date"))?;
        columns.mood = mood.ok_or(ImportError::MissingColumn("mood_rating"))?;
        Ok(columns)
    }
}

/// CSV importer for check-in history
pub struct CheckinCsvImporter {
    user_id: UserId,
    /// Tried before the built-in formats
    date_format: Option<String>,
}

impl CheckinCsvImporter {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            date_format: None,
        }
    }

    /// Set a custom date format string
    pub fn with_date_format(mut self, format: &str) -> Self {
        self.date_format = Some(format.to_string());
        self
    }

    /// Import check-ins from a CSV file
    pub fn import(&self, path: &Path) -> Result<CheckinImportResult, ImportError> {
        let file = std::fs::File::open(path)?;
        self.import_reader(file)
    }

    /// Import from a CSV string (useful for testing)
    pub fn import_str(&self, csv_data: &str) -> Result<CheckinImportResult, ImportError> {
        self.import_reader(csv_data.as_bytes())
    }

    pub fn import_reader<R: Read>(&self, input: R) -> Result<CheckinImportResult, ImportError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(input);

        let columns = Columns::detect(reader.headers()?)?;

        let mut checkins = Vec::new();
        let mut seen = BTreeSet::new();
        let mut rows_failed = 0;
        let mut errors = Vec::new();

        for (line_num, result) in reader.records().enumerate() {
            let line = line_num + 2;

            let parsed = result
                .map_err(|e| e.to_string())
                .and_then(|record| self.parse_row(&columns, &record));

            match parsed {
                Ok(checkin) if !seen.insert(checkin.date) => {
                    errors.push(format!("Line {}: duplicate date {}", line, checkin.date));
                    rows_failed += 1;
                }
                Ok(checkin) => checkins.push(checkin),
                Err(e) => {
                    errors.push(format!("Line {}: {}", line, e));
                    rows_failed += 1;
                }
            }
        }

        // Truncate errors if too many
        if errors.len() > MAX_REPORTED_ERRORS {
            let total = errors.len();
            errors.truncate(MAX_REPORTED_ERRORS);
            errors.push(format!("... and {} more errors", total - MAX_REPORTED_ERRORS));
        }

        tracing::debug!(
            user_id = self.user_id,
            imported = checkins.len(),
            failed = rows_failed,
            "Parsed check-in CSV"
        );

        Ok(CheckinImportResult {
            rows_processed: checkins.len(),
            checkins,
            rows_failed,
            errors,
        })
    }

    fn parse_row(&self, columns: &Columns, record: &csv::StringRecord) -> Result<CheckIn, String> {
        let field = |idx: usize| record.get(idx).map(str::trim).filter(|s| !s.is_empty());

        let date_str = field(columns.date).ok_or("missing date")?;
        let date = self.parse_date(date_str)?;

        let mood_str = field(columns.mood).ok_or("missing mood rating")?;
        let mood = parse_scale("mood_rating", mood_str)?;

        let mut checkin = CheckIn::new(self.user_id, date, mood);

        if let Some(label) = columns.category.and_then(field) {
            checkin = checkin.category(label.parse::<MoodCategory>()?);
        }

        for (idx, metric) in &columns.metrics {
            if let Some(raw) = field(*idx) {
                checkin = checkin.metric(*metric, parse_scale(metric.as_str(), raw)?);
            }
        }

        if let Some(raw) = columns.keywords.and_then(field) {
            for keyword in raw.split([';', '|']).map(str::trim).filter(|k| !k.is_empty()) {
                checkin = checkin.keyword(keyword);
            }
        }

        checkin.notes = columns.notes.and_then(field).map(str::to_string);
        Ok(checkin)
    }

    fn parse_date(&self, value: &str) -> Result<NaiveDate, String> {
        if let Some(format) = &self.date_format {
            if let Ok(date) = NaiveDate::parse_from_str(value, format) {
                return Ok(date);
            }
        }

        let formats = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];
        for fmt in formats {
            if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
                return Ok(date);
            }
        }

        let datetime_formats = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
        for fmt in datetime_formats {
            if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
                return Ok(dt.date());
            }
        }

        // RFC 3339 keeps the writer's calendar day
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Ok(dt.date_naive());
        }

        Err(format!("could not parse date: {}", value))
    }
}

fn parse_scale(name: &str, raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("{} is not a number: {}", name, raw))?;
    if !(1.0..=10.0).contains(&value) {
        return Err(format!("{} must be between 1 and 10", name));
    }
    Ok(value)
}
