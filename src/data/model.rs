use std::collections::BTreeSet;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Source column names
// ---------------------------------------------------------------------------

/// Header names of the columns the pipeline understands.
pub mod columns {
    pub const STATE: &str = "State";
    pub const SEVERITY: &str = "Severity";
    pub const TEMPERATURE: &str = "Temperature(F)";
    pub const VISIBILITY: &str = "Visibility(mi)";
    pub const START_TIME: &str = "Start_Time";
    pub const LATITUDE: &str = "Start_Lat";
    pub const LONGITUDE: &str = "Start_Lng";
    pub const CITY: &str = "City";

    pub const KNOWN: [&str; 8] = [
        STATE,
        SEVERITY,
        TEMPERATURE,
        VISIBILITY,
        START_TIME,
        LATITUDE,
        LONGITUDE,
        CITY,
    ];
}

// ---------------------------------------------------------------------------
// Record – one row of the accidents table
// ---------------------------------------------------------------------------

/// A single accident. Every field is optional: blank or malformed cells
/// are loaded as `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub state: Option<String>,
    pub severity: Option<i64>,
    pub temperature_f: Option<f64>,
    pub visibility_mi: Option<f64>,
    pub start_time: Option<NaiveDateTime>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub city: Option<String>,
}

impl Record {
    /// Calendar date of `start_time`.
    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_time.map(|t| t.date())
    }

    /// `(lat, lng)` when both coordinates are present.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }
}

// ---------------------------------------------------------------------------
// CategoryValue – a group label
// ---------------------------------------------------------------------------

/// A value of a categorical column, usable as a `BTreeMap` key.
///
/// Severity levels order numerically, text labels lexically; a column
/// only ever produces one of the two variants.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryValue {
    Level(i64),
    Text(String),
}

impl fmt::Display for CategoryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryValue::Level(l) => write!(f, "{l}"),
            CategoryValue::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Categorical columns that can be grouped on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryColumn {
    State,
    City,
    Severity,
}

impl CategoryColumn {
    pub fn value(self, record: &Record) -> Option<CategoryValue> {
        match self {
            CategoryColumn::State => record.state.clone().map(CategoryValue::Text),
            CategoryColumn::City => record.city.clone().map(CategoryValue::Text),
            CategoryColumn::Severity => record.severity.map(CategoryValue::Level),
        }
    }

    pub fn source_name(self) -> &'static str {
        match self {
            CategoryColumn::State => columns::STATE,
            CategoryColumn::City => columns::CITY,
            CategoryColumn::Severity => columns::SEVERITY,
        }
    }
}

/// Numeric columns that can be binned or averaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericColumn {
    Temperature,
    Visibility,
    Severity,
    Latitude,
    Longitude,
}

impl NumericColumn {
    pub fn value(self, record: &Record) -> Option<f64> {
        match self {
            NumericColumn::Temperature => record.temperature_f,
            NumericColumn::Visibility => record.visibility_mi,
            NumericColumn::Severity => record.severity.map(|s| s as f64),
            NumericColumn::Latitude => record.latitude,
            NumericColumn::Longitude => record.longitude,
        }
    }

    pub fn source_name(self) -> &'static str {
        match self {
            NumericColumn::Temperature => columns::TEMPERATURE,
            NumericColumn::Visibility => columns::VISIBILITY,
            NumericColumn::Severity => columns::SEVERITY,
            NumericColumn::Latitude => columns::LATITUDE,
            NumericColumn::Longitude => columns::LONGITUDE,
        }
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// Value domains the filter widgets are built from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetIndex {
    pub states: BTreeSet<String>,
    pub cities: BTreeSet<String>,
    pub severity_levels: BTreeSet<i64>,
    /// Observed `(min, max)` temperature, `None` if every value is missing.
    pub temperature_bounds: Option<(f64, f64)>,
    /// Observed `(first, last)` start date.
    pub date_bounds: Option<(NaiveDate, NaiveDate)>,
}

/// Shape of the loaded table, as shown above the gallery charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub column_names: Vec<String>,
}

/// The full parsed dataset with pre-computed value domains.
///
/// Never mutated after construction; consumers share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// All rows, in file order.
    pub records: Vec<Record>,
    /// Every column name in the source file, in file order.
    pub column_names: Vec<String>,
    pub index: DatasetIndex,
}

impl Dataset {
    /// Build value domains from the loaded records.
    pub fn from_records(records: Vec<Record>, column_names: Vec<String>) -> Self {
        let mut index = DatasetIndex::default();

        for rec in &records {
            if let Some(state) = &rec.state {
                index.states.insert(state.clone());
            }
            if let Some(city) = &rec.city {
                index.cities.insert(city.clone());
            }
            if let Some(level) = rec.severity {
                index.severity_levels.insert(level);
            }
            if let Some(t) = rec.temperature_f {
                index.temperature_bounds = Some(match index.temperature_bounds {
                    Some((lo, hi)) => (lo.min(t), hi.max(t)),
                    None => (t, t),
                });
            }
            if let Some(d) = rec.start_date() {
                index.date_bounds = Some(match index.date_bounds {
                    Some((lo, hi)) => (lo.min(d), hi.max(d)),
                    None => (d, d),
                });
            }
        }

        Dataset {
            records,
            column_names,
            index,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            rows: self.len(),
            column_names: self.column_names.clone(),
        }
    }
}
