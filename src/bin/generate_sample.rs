use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Int64Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use parquet::arrow::ArrowWriter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use accident_lens::data::model::columns;

const ROWS: usize = 3_000;

/// (state, city, latitude, longitude, typical temperature °F)
const PLACES: &[(&str, &str, f64, f64, f64)] = &[
    ("CA", "Los Angeles", 34.05, -118.24, 68.0),
    ("CA", "San Diego", 32.72, -117.16, 66.0),
    ("CA", "Sacramento", 38.58, -121.49, 62.0),
    ("TX", "Houston", 29.76, -95.37, 75.0),
    ("TX", "Dallas", 32.78, -96.80, 70.0),
    ("FL", "Miami", 25.76, -80.19, 80.0),
    ("FL", "Orlando", 28.54, -81.38, 77.0),
    ("NY", "New York", 40.71, -74.01, 55.0),
    ("NY", "Buffalo", 42.89, -78.88, 48.0),
    ("OH", "Columbus", 39.96, -83.00, 52.0),
    ("MN", "Minneapolis", 44.98, -93.27, 45.0),
    ("AZ", "Phoenix", 33.45, -112.07, 85.0),
];

struct Row {
    state: String,
    city: String,
    severity: i64,
    temperature: Option<f64>,
    visibility: Option<f64>,
    /// Text as it appears in the CSV; may be deliberately malformed.
    start_text: String,
    start: Option<NaiveDateTime>,
    latitude: f64,
    longitude: f64,
}

fn generate_rows(rng: &mut StdRng) -> Vec<Row> {
    let epoch = NaiveDate::from_ymd_opt(2021, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();

    (0..ROWS)
        .map(|_| {
            let &(state, city, lat, lng, base_temp) = &PLACES[rng.gen_range(0..PLACES.len())];

            // Severity skews towards 2, like the source data.
            let severity = match rng.gen_range(0..10) {
                0 => 1,
                1..=6 => 2,
                7 | 8 => 3,
                _ => 4,
            };

            let temperature =
                (!rng.gen_bool(0.03)).then(|| (base_temp + rng.gen_range(-25.0..25.0_f64)).round());
            let visibility = (!rng.gen_bool(0.02)).then(|| rng.gen_range(0.5..10.0_f64).round());

            let start = epoch + Duration::minutes(rng.gen_range(0..(2 * 365 * 24 * 60)));
            let (start_text, start) = if rng.gen_bool(0.01) {
                ("unknown".to_string(), None)
            } else {
                (start.format("%Y-%m-%d %H:%M:%S").to_string(), Some(start))
            };

            Row {
                state: state.to_string(),
                city: city.to_string(),
                severity,
                temperature,
                visibility,
                start_text,
                start,
                latitude: lat + rng.gen_range(-0.3..0.3),
                longitude: lng + rng.gen_range(-0.3..0.3),
            }
        })
        .collect()
}

fn write_csv(rows: &[Row], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV")?;
    writer.write_record([
        "ID",
        columns::SEVERITY,
        columns::START_TIME,
        columns::LATITUDE,
        columns::LONGITUDE,
        columns::CITY,
        columns::STATE,
        columns::TEMPERATURE,
        columns::VISIBILITY,
    ])?;

    let opt = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
    for (i, row) in rows.iter().enumerate() {
        writer.write_record([
            format!("A-{}", i + 1),
            row.severity.to_string(),
            row.start_text.clone(),
            format!("{:.5}", row.latitude),
            format!("{:.5}", row.longitude),
            row.city.clone(),
            row.state.clone(),
            opt(row.temperature),
            opt(row.visibility),
        ])?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

fn write_parquet(rows: &[Row], path: &Path) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new(columns::SEVERITY, DataType::Int64, false),
        Field::new(
            columns::START_TIME,
            DataType::Timestamp(TimeUnit::Microsecond, None),
            true,
        ),
        Field::new(columns::LATITUDE, DataType::Float64, false),
        Field::new(columns::LONGITUDE, DataType::Float64, false),
        Field::new(columns::CITY, DataType::Utf8, false),
        Field::new(columns::STATE, DataType::Utf8, false),
        Field::new(columns::TEMPERATURE, DataType::Float64, true),
        Field::new(columns::VISIBILITY, DataType::Float64, true),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.severity))),
            Arc::new(TimestampMicrosecondArray::from_iter(
                rows.iter().map(|r| r.start.map(|t| t.and_utc().timestamp_micros())),
            )),
            Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.latitude))),
            Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.longitude))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.city.as_str()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.state.as_str()))),
            Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.temperature))),
            Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.visibility))),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data"));
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let mut rng = StdRng::seed_from_u64(42);
    let rows = generate_rows(&mut rng);

    let csv_path = out_dir.join("accidents_small.csv");
    write_csv(&rows, &csv_path)?;
    let parquet_path = out_dir.join("accidents_small.parquet");
    write_parquet(&rows, &parquet_path)?;

    log::info!(
        "Wrote {} accidents to {} and {}",
        rows.len(),
        csv_path.display(),
        parquet_path.display()
    );
    Ok(())
}
