use std::fs::File;
use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray, Float64Array, Int64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, Int64Type, TimeUnit, TimestampMicrosecondType};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::model::{columns, Dataset, Record};
use crate::error::DatasetLoadError;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load an accidents table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`               – comma separated, header row required
/// * `.tsv`               – tab separated, header row required
/// * `.parquet` / `.pq`   – as written by `df.to_parquet()`
///
/// Columns are matched by header name (see [`columns`]). Cells that cannot
/// be parsed are loaded as missing; only an absent, unreadable or
/// column-less file is an error.
pub fn load_file(path: &Path) -> Result<Dataset, DatasetLoadError> {
    if !path.is_file() {
        return Err(DatasetLoadError::NotFound(path.to_path_buf()));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    log::info!("Loading accidents table from {}", path.display());
    let dataset = match ext.as_str() {
        "csv" => load_delimited(path, b',')?,
        "tsv" => load_delimited(path, b'\t')?,
        "parquet" | "pq" => load_parquet(path)?,
        other => return Err(DatasetLoadError::UnsupportedFormat(other.to_string())),
    };
    log::info!(
        "Loaded {} rows x {} columns from {}",
        dataset.len(),
        dataset.column_names.len(),
        path.display()
    );

    Ok(dataset)
}

// ---------------------------------------------------------------------------
// Cell parsing (lenient: anything malformed becomes `None`)
// ---------------------------------------------------------------------------

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Parse a timestamp cell. Unrecognised input yields `None`, never an error.
///
/// Offsets (`+00:00`, `Z`) are accepted and dropped after converting to UTC.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.naive_utc());
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

fn parse_text(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn parse_float(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Integer cell, also accepting whole floats (`"2.0"`) as written by
/// Pandas for integer columns containing NaN.
fn parse_level(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Some(i);
    }
    parse_float(s)
        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
        .map(|f| f as i64)
}

/// Tracks cells that had content but could not be parsed as a timestamp.
#[derive(Default)]
struct CoercionTally {
    malformed_timestamps: usize,
}

impl CoercionTally {
    fn timestamp(&mut self, raw: Option<&str>) -> Option<NaiveDateTime> {
        let raw = raw?;
        let parsed = parse_timestamp(raw);
        if parsed.is_none() && !raw.trim().is_empty() {
            self.malformed_timestamps += 1;
        }
        parsed
    }

    fn report(&self, path: &Path) {
        if self.malformed_timestamps > 0 {
            log::warn!(
                "{}: {} unparsable {} values loaded as missing",
                path.display(),
                self.malformed_timestamps,
                columns::START_TIME
            );
        }
    }
}

fn warn_missing_columns(path: &Path, present: &[String]) {
    for name in columns::KNOWN {
        if !present.iter().any(|c| c == name) {
            log::warn!("{}: column '{name}' not found, treating as missing", path.display());
        }
    }
}

// ---------------------------------------------------------------------------
// Delimited text loader
// ---------------------------------------------------------------------------

/// Header positions of the known columns.
struct ColumnPositions {
    state: Option<usize>,
    severity: Option<usize>,
    temperature: Option<usize>,
    visibility: Option<usize>,
    start_time: Option<usize>,
    latitude: Option<usize>,
    longitude: Option<usize>,
    city: Option<usize>,
}

impl ColumnPositions {
    fn locate(headers: &[String]) -> Self {
        let pos = |name: &str| headers.iter().position(|h| h == name);
        ColumnPositions {
            state: pos(columns::STATE),
            severity: pos(columns::SEVERITY),
            temperature: pos(columns::TEMPERATURE),
            visibility: pos(columns::VISIBILITY),
            start_time: pos(columns::START_TIME),
            latitude: pos(columns::LATITUDE),
            longitude: pos(columns::LONGITUDE),
            city: pos(columns::CITY),
        }
    }
}

fn load_delimited(path: &Path, delimiter: u8) -> Result<Dataset, DatasetLoadError> {
    let csv_err = |source| DatasetLoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(DatasetLoadError::NoColumns(path.to_path_buf()));
    }
    warn_missing_columns(path, &headers);

    let pos = ColumnPositions::locate(&headers);
    let mut tally = CoercionTally::default();
    let mut records = Vec::new();

    for result in reader.records() {
        let row = result.map_err(csv_err)?;
        let cell = |idx: Option<usize>| idx.and_then(|i| row.get(i));

        records.push(Record {
            state: cell(pos.state).and_then(parse_text),
            severity: cell(pos.severity).and_then(parse_level),
            temperature_f: cell(pos.temperature).and_then(parse_float),
            visibility_mi: cell(pos.visibility).and_then(parse_float),
            start_time: tally.timestamp(cell(pos.start_time)),
            latitude: cell(pos.latitude).and_then(parse_float),
            longitude: cell(pos.longitude).and_then(parse_float),
            city: cell(pos.city).and_then(parse_text),
        });
    }

    tally.report(path);
    Ok(Dataset::from_records(records, headers))
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file written by **Pandas** or **Polars**.
///
/// Each known column is cast to the type the pipeline wants (`Utf8`,
/// `Int64`, `Float64`) with arrow's safe cast, so values that do not
/// convert come back null. `Start_Time` may be a timestamp, a date or a
/// string column.
fn load_parquet(path: &Path) -> Result<Dataset, DatasetLoadError> {
    let file = File::open(path).map_err(|source| DatasetLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parquet_err = |source| DatasetLoadError::Parquet {
        path: path.to_path_buf(),
        source,
    };

    let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(parquet_err)?;
    let column_names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    if column_names.is_empty() {
        return Err(DatasetLoadError::NoColumns(path.to_path_buf()));
    }
    warn_missing_columns(path, &column_names);

    let reader = builder.build().map_err(parquet_err)?;
    let mut tally = CoercionTally::default();
    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result.map_err(|source| DatasetLoadError::Arrow {
            path: path.to_path_buf(),
            source,
        })?;
        append_batch(&batch, &mut tally, &mut records);
    }

    tally.report(path);
    Ok(Dataset::from_records(records, column_names))
}

/// Timestamps come either as native arrow temporals or as text.
enum StartTimeColumn {
    Native(ArrayRef),
    Text(ArrayRef),
}

fn append_batch(batch: &RecordBatch, tally: &mut CoercionTally, out: &mut Vec<Record>) {
    let state = cast_column(batch, columns::STATE, &DataType::Utf8);
    let city = cast_column(batch, columns::CITY, &DataType::Utf8);
    let severity = cast_column(batch, columns::SEVERITY, &DataType::Int64);
    let temperature = cast_column(batch, columns::TEMPERATURE, &DataType::Float64);
    let visibility = cast_column(batch, columns::VISIBILITY, &DataType::Float64);
    let latitude = cast_column(batch, columns::LATITUDE, &DataType::Float64);
    let longitude = cast_column(batch, columns::LONGITUDE, &DataType::Float64);
    let start_time = start_time_column(batch);

    let state = state.as_ref().map(|a| a.as_string::<i32>());
    let city = city.as_ref().map(|a| a.as_string::<i32>());
    let severity = severity.as_ref().map(|a| a.as_primitive::<Int64Type>());
    let temperature = temperature.as_ref().map(|a| a.as_primitive::<Float64Type>());
    let visibility = visibility.as_ref().map(|a| a.as_primitive::<Float64Type>());
    let latitude = latitude.as_ref().map(|a| a.as_primitive::<Float64Type>());
    let longitude = longitude.as_ref().map(|a| a.as_primitive::<Float64Type>());

    for row in 0..batch.num_rows() {
        let start_time = match &start_time {
            Some(StartTimeColumn::Native(arr)) => arr
                .as_primitive::<TimestampMicrosecondType>()
                .value_as_datetime(row)
                .filter(|_| arr.is_valid(row)),
            Some(StartTimeColumn::Text(arr)) => {
                let arr = arr.as_string::<i32>();
                tally.timestamp(arr.is_valid(row).then(|| arr.value(row)))
            }
            None => None,
        };

        out.push(Record {
            state: text_at(state, row),
            severity: level_at(severity, row),
            temperature_f: float_at(temperature, row),
            visibility_mi: float_at(visibility, row),
            start_time,
            latitude: float_at(latitude, row),
            longitude: float_at(longitude, row),
            city: text_at(city, row),
        });
    }
}

/// Cast a named column; an absent or uncastable column reads as all-null.
fn cast_column(batch: &RecordBatch, name: &str, to: &DataType) -> Option<ArrayRef> {
    let col = batch.column_by_name(name)?;
    match cast(col, to) {
        Ok(arr) => Some(arr),
        Err(e) => {
            log::warn!("Column '{name}' ({}) cannot be read as {to}: {e}", col.data_type());
            None
        }
    }
}

fn start_time_column(batch: &RecordBatch) -> Option<StartTimeColumn> {
    let col = batch.column_by_name(columns::START_TIME)?;
    match col.data_type() {
        // The zone is kept through the cast so the stored UTC instant is
        // not shifted; zoned values therefore read as UTC wall time.
        DataType::Timestamp(_, tz) => {
            let to = DataType::Timestamp(TimeUnit::Microsecond, tz.clone());
            cast_column(batch, columns::START_TIME, &to).map(StartTimeColumn::Native)
        }
        DataType::Date32 | DataType::Date64 => {
            cast_column(batch, columns::START_TIME, &DataType::Timestamp(TimeUnit::Microsecond, None))
                .map(StartTimeColumn::Native)
        }
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => {
            cast_column(batch, columns::START_TIME, &DataType::Utf8).map(StartTimeColumn::Text)
        }
        other => {
            log::warn!("Column '{}' has unsupported type {other}", columns::START_TIME);
            None
        }
    }
}

// -- Arrow cell helpers --

fn text_at(arr: Option<&StringArray>, row: usize) -> Option<String> {
    let arr = arr?;
    if arr.is_null(row) {
        return None;
    }
    parse_text(arr.value(row))
}

fn float_at(arr: Option<&Float64Array>, row: usize) -> Option<f64> {
    let arr = arr?;
    if arr.is_null(row) {
        return None;
    }
    Some(arr.value(row)).filter(|v| v.is_finite())
}

fn level_at(arr: Option<&Int64Array>, row: usize) -> Option<i64> {
    let arr = arr?;
    (!arr.is_null(row)).then(|| arr.value(row))
}
