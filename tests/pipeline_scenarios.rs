use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use accident_lens::data::aggregate::{
    category_counts, geo_aggregate, grouped_time_series, histogram, GeoSampling, LocationKey,
};
use accident_lens::data::cache;
use accident_lens::data::model::{CategoryColumn, CategoryValue, NumericColumn};
use accident_lens::{
    filter, AggregateResult, DashboardConfig, FilterCriteria, InsufficientData, Panel, Pipeline,
    ViewSpec,
};

const HEADER: &str = "State,Severity,Temperature(F),Start_Time,Start_Lat,Start_Lng,City\n";

fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

/// 10 rows: CA x5, TX x3, NY x2.
fn ten_row_csv() -> String {
    let mut body = HEADER.to_string();
    for (i, state) in ["CA", "TX", "CA", "NY", "CA", "TX", "CA", "NY", "CA", "TX"]
        .iter()
        .enumerate()
    {
        writeln!(
            body,
            "{state},{},{},2022-01-{:02} 08:00:00,{},{},Town{i}",
            1 + i % 4,
            30.0 + i as f64,
            1 + i % 3,
            35.0 + i as f64 * 0.1,
            -100.0 - i as f64 * 0.1,
        )
        .unwrap();
    }
    body
}

#[test]
fn two_state_selection_counts_descending() {
    let dir = tempfile::tempdir().unwrap();
    let ds = cache::load(&write(dir.path(), "ten.csv", &ten_row_csv())).unwrap();

    let view = filter(&ds, &FilterCriteria::default().with_states(["CA", "TX"]));
    assert_eq!(view.len(), 8);

    let counts = category_counts(&view, CategoryColumn::State).into_ready().unwrap();
    let pairs: Vec<(CategoryValue, usize)> =
        counts.groups.iter().map(|g| (g.value.clone(), g.count)).collect();
    assert_eq!(
        pairs,
        vec![
            (CategoryValue::Text("CA".into()), 5),
            (CategoryValue::Text("TX".into()), 3)
        ]
    );
    assert_eq!(counts.groups.iter().map(|g| g.count).sum::<usize>(), view.len());
}

#[test]
fn empty_state_selection_excludes_everything() {
    let dir = tempfile::tempdir().unwrap();
    let ds = cache::load(&write(dir.path(), "ten.csv", &ten_row_csv())).unwrap();

    let none: [&str; 0] = [];
    let view = filter(&ds, &FilterCriteria::default().with_states(none));
    assert!(view.is_empty());
    assert_eq!(
        category_counts(&view, CategoryColumn::State),
        AggregateResult::InsufficientData(InsufficientData::NoRows)
    );
}

#[test]
fn freezing_point_bounds_are_inclusive() {
    let dir = tempfile::tempdir().unwrap();
    let body = format!("{HEADER}CA,2,32.0,,,,\nCA,2,31.99,,,,\n");
    let ds = cache::load(&write(dir.path(), "cold.csv", &body)).unwrap();

    let view = filter(&ds, &FilterCriteria::default().with_temperature_range(32.0, 32.0));
    assert_eq!(view.len(), 1);
    assert_eq!(view.records().next().unwrap().temperature_f, Some(32.0));
}

#[test]
fn all_malformed_timestamps_give_zero_groups() {
    let dir = tempfile::tempdir().unwrap();
    let body = format!("{HEADER}CA,2,50,last tuesday,,,\nTX,3,60,??,,,\nNY,1,40,2022-99-99,,,\n");
    let ds = cache::load(&write(dir.path(), "bad_times.csv", &body)).unwrap();

    assert_eq!(ds.len(), 3);
    let result = grouped_time_series(&filter(&ds, &FilterCriteria::default()), CategoryColumn::Severity);
    assert_eq!(result.insufficient(), Some(InsufficientData::NoValues));
}

#[test]
fn histogram_bins_sum_to_present_values() {
    let dir = tempfile::tempdir().unwrap();
    let body = format!("{HEADER}CA,2,10,,,,\nCA,2,,,,,\nCA,2,20,,,,\nCA,2,n/a,,,,\nCA,2,35,,,,\n");
    let ds = cache::load(&write(dir.path(), "temps.csv", &body)).unwrap();

    let view = filter(&ds, &FilterCriteria::default());
    let hist = histogram(&view, NumericColumn::Temperature, 30).into_ready().unwrap();
    assert_eq!(hist.bins.len(), 30);
    assert_eq!(hist.total(), 3);
    assert_eq!(hist.missing, 2);
}

#[test]
fn map_sample_is_exactly_the_cap_and_repeatable() {
    let dir = tempfile::tempdir().unwrap();
    let mut body = HEADER.to_string();
    for i in 0..1500 {
        writeln!(
            body,
            "CA,2,{},2022-01-01 00:00:00,{:.4},{:.4},LA",
            i % 90,
            34.0 + (i / 50) as f64 * 0.001,
            -118.0 + (i % 50) as f64 * 0.001
        )
        .unwrap();
    }
    let ds = cache::load(&write(dir.path(), "many.csv", &body)).unwrap();
    let view = filter(&ds, &FilterCriteria::default());
    let sampling = GeoSampling { cap: 1000, seed: 42 };

    let a = geo_aggregate(&view, LocationKey::Coordinates, NumericColumn::Temperature, sampling)
        .into_ready()
        .unwrap();
    let b = geo_aggregate(&view, LocationKey::Coordinates, NumericColumn::Temperature, sampling)
        .into_ready()
        .unwrap();

    assert_eq!(a.distinct_points, 1500);
    assert_eq!(a.points.len(), 1000);
    assert_eq!(a, b);

    let other_seed = geo_aggregate(
        &view,
        LocationKey::Coordinates,
        NumericColumn::Temperature,
        GeoSampling { cap: 1000, seed: 7 },
    )
    .into_ready()
    .unwrap();
    assert_eq!(other_seed.points.len(), 1000);
}

#[test]
fn pipeline_opens_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let data = write(dir.path(), "ten.csv", &ten_row_csv());
    let config_path = write(
        dir.path(),
        "dashboard.json",
        &serde_json::json!({
            "data_path": data,
            "histogram_bins": 4,
            "default_state_count": 2,
        })
        .to_string(),
    );

    let config = DashboardConfig::from_file(&config_path).unwrap();
    let pipeline = Pipeline::open(config).unwrap();
    let dashboard = ViewSpec::dashboard();
    let criteria = pipeline.default_criteria(&dashboard);

    // Sorted states are CA, NY, TX; the first two are selected.
    let frame = pipeline.evaluate(&dashboard, &criteria);
    assert_eq!(frame.rows, 7);

    let gallery_view = ViewSpec::gallery();
    let gallery = pipeline.evaluate(&gallery_view, &pipeline.default_criteria(&gallery_view));
    assert_eq!(gallery.rows, 7);
    match &gallery.panels[1] {
        Panel::Histogram(AggregateResult::Ready(hist)) => {
            assert_eq!(hist.bins.len(), 4);
            assert_eq!(hist.total(), 7);
        }
        other => panic!("expected histogram, got {other:?}"),
    }

    // Same inputs, same output.
    assert_eq!(frame, pipeline.evaluate(&dashboard, &criteria));
}

#[test]
fn pipeline_open_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = DashboardConfig {
        data_path: dir.path().join("absent.parquet"),
        ..DashboardConfig::default()
    };
    assert!(Pipeline::open(config).is_err());
}
