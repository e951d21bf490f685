use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::filter::FilteredView;
use super::model::{CategoryColumn, CategoryValue, NumericColumn, Record};
use crate::config::DashboardConfig;

// ---------------------------------------------------------------------------
// Result wrapper
// ---------------------------------------------------------------------------

/// Why an aggregate has nothing to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsufficientData {
    /// The filtered view has no rows.
    NoRows,
    /// Rows matched, but none carries the fields this aggregate needs.
    NoValues,
}

impl InsufficientData {
    fn for_view(view: &FilteredView<'_>) -> Self {
        if view.is_empty() {
            InsufficientData::NoRows
        } else {
            InsufficientData::NoValues
        }
    }
}

/// Output of every aggregate: either data to draw or an explicit
/// "nothing to draw" state the caller can show instead of an empty chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum AggregateResult<T> {
    Ready(T),
    InsufficientData(InsufficientData),
}

impl<T> AggregateResult<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, AggregateResult::Ready(_))
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            AggregateResult::Ready(v) => Some(v),
            AggregateResult::InsufficientData(_) => None,
        }
    }

    pub fn into_ready(self) -> Option<T> {
        match self {
            AggregateResult::Ready(v) => Some(v),
            AggregateResult::InsufficientData(_) => None,
        }
    }

    pub fn insufficient(&self) -> Option<InsufficientData> {
        match self {
            AggregateResult::Ready(_) => None,
            AggregateResult::InsufficientData(reason) => Some(*reason),
        }
    }
}

// ---------------------------------------------------------------------------
// Category counts (bar charts)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub value: CategoryValue,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCounts {
    pub column: CategoryColumn,
    /// Ordered by count descending; equal counts keep label order.
    pub groups: Vec<CategoryCount>,
    /// Rows whose grouping column is missing.
    pub missing: usize,
}

impl CategoryCounts {
    /// Rows covered, including those with a missing label.
    pub fn total(&self) -> usize {
        self.groups.iter().map(|g| g.count).sum::<usize>() + self.missing
    }

    pub fn get(&self, value: &CategoryValue) -> Option<usize> {
        self.groups.iter().find(|g| &g.value == value).map(|g| g.count)
    }
}

/// Count rows per value of `column`.
pub fn category_counts(
    view: &FilteredView<'_>,
    column: CategoryColumn,
) -> AggregateResult<CategoryCounts> {
    let mut counts: BTreeMap<CategoryValue, usize> = BTreeMap::new();
    let mut missing = 0;

    for rec in view.records() {
        match column.value(rec) {
            Some(value) => *counts.entry(value).or_default() += 1,
            None => missing += 1,
        }
    }
    if counts.is_empty() {
        return AggregateResult::InsufficientData(InsufficientData::for_view(view));
    }

    // Stable sort over label-ordered groups: ties stay in label order.
    let mut groups: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(value, count)| CategoryCount { value, count })
        .collect();
    groups.sort_by(|a, b| b.count.cmp(&a.count));

    AggregateResult::Ready(CategoryCounts {
        column,
        groups,
        missing,
    })
}

// ---------------------------------------------------------------------------
// Histogram
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub column: NumericColumn,
    pub bins: Vec<HistogramBin>,
    /// Rows dropped because the column was missing.
    pub missing: usize,
}

impl Histogram {
    /// Number of binned values.
    pub fn total(&self) -> usize {
        self.bins.iter().map(|b| b.count).sum()
    }
}

/// Bucket `column` into `bins` equal-width bins spanning the observed
/// min/max of the view.  The last bin is closed on the right.
///
/// When every value is identical the range is widened to `value ± 0.5`
/// so the bins keep a positive width.
pub fn histogram(
    view: &FilteredView<'_>,
    column: NumericColumn,
    bins: usize,
) -> AggregateResult<Histogram> {
    let values: Vec<f64> = view.records().filter_map(|r| column.value(r)).collect();
    if values.is_empty() {
        return AggregateResult::InsufficientData(InsufficientData::for_view(view));
    }

    let n = bins.max(1);
    let (mut lo, mut hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let mut counts = vec![0usize; n];
    for &v in &values {
        counts[bin_index(v, lo, hi, n)] += 1;
    }

    let bins = counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: bin_edge(i, lo, hi, n),
            upper: if i + 1 == n { hi } else { bin_edge(i + 1, lo, hi, n) },
            count,
        })
        .collect();

    AggregateResult::Ready(Histogram {
        column,
        bins,
        missing: view.len() - values.len(),
    })
}

/// Bin of `v` in `[lo, hi]` split into `n` bins.  Spans wider than
/// `f64::MAX` are measured in halves so the width stays finite.
fn bin_index(v: f64, lo: f64, hi: f64, n: usize) -> usize {
    if v >= hi {
        return n - 1;
    }
    let width = (hi - lo) / n as f64;
    let pos = if width.is_finite() {
        (v - lo) / width
    } else {
        (v * 0.5 - lo * 0.5) / (hi * 0.5 - lo * 0.5) * n as f64
    };
    (pos as usize).min(n - 1)
}

/// Lower edge of bin `i`.
fn bin_edge(i: usize, lo: f64, hi: f64, n: usize) -> f64 {
    let width = (hi - lo) / n as f64;
    if width.is_finite() {
        lo + i as f64 * width
    } else {
        lo + (hi * 0.5 - lo * 0.5) * (2.0 * i as f64 / n as f64)
    }
}

// ---------------------------------------------------------------------------
// Time series
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub category: CategoryValue,
    pub count: usize,
}

/// Rows per calendar day of `start_time`, in date order.  Rows without a
/// timestamp are dropped.
pub fn daily_counts(view: &FilteredView<'_>) -> AggregateResult<Vec<DailyCount>> {
    let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for date in view.records().filter_map(Record::start_date) {
        *counts.entry(date).or_default() += 1;
    }
    if counts.is_empty() {
        return AggregateResult::InsufficientData(InsufficientData::for_view(view));
    }

    AggregateResult::Ready(
        counts
            .into_iter()
            .map(|(date, count)| DailyCount { date, count })
            .collect(),
    )
}

/// Rows per `(date, column value)`, ordered by date then value.  Rows
/// missing either the timestamp or the category are dropped.
pub fn grouped_time_series(
    view: &FilteredView<'_>,
    column: CategoryColumn,
) -> AggregateResult<Vec<SeriesPoint>> {
    let mut counts: BTreeMap<(NaiveDate, CategoryValue), usize> = BTreeMap::new();
    for rec in view.records() {
        let (Some(date), Some(category)) = (rec.start_date(), column.value(rec)) else {
            continue;
        };
        *counts.entry((date, category)).or_default() += 1;
    }
    if counts.is_empty() {
        return AggregateResult::InsufficientData(InsufficientData::for_view(view));
    }

    AggregateResult::Ready(
        counts
            .into_iter()
            .map(|((date, category), count)| SeriesPoint {
                date,
                category,
                count,
            })
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// Geographic aggregate (map)
// ---------------------------------------------------------------------------

/// What identifies a map point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKey {
    /// Exact `(Start_Lat, Start_Lng)`.
    Coordinates,
    /// `(City, State)`, placed at the centroid of its rows.
    City,
    /// `State`, placed at the centroid of its rows.
    State,
}

/// Cap on distinct map points and the seed used when sampling down to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoSampling {
    pub cap: usize,
    pub seed: u64,
}

impl From<&DashboardConfig> for GeoSampling {
    fn from(config: &DashboardConfig) -> Self {
        GeoSampling {
            cap: config.geo_sample_cap,
            seed: config.geo_seed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoPoint {
    /// `"City, ST"` or `"ST"`; `None` for raw coordinates.
    pub label: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub count: usize,
    /// Mean of the metric column over rows where it is present.
    pub metric_mean: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoAggregate {
    pub key: LocationKey,
    pub metric: NumericColumn,
    /// Points in key order (latitude then longitude, or label).
    pub points: Vec<GeoPoint>,
    /// Distinct points before sampling.
    pub distinct_points: usize,
    pub sampled: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum PointKey {
    Coordinates(f64, f64),
    Place(String, Option<String>),
    State(String),
}

impl PointKey {
    fn of(key: LocationKey, rec: &Record) -> Option<Self> {
        match key {
            // `+ 0.0` folds -0.0 into 0.0 so both group together.
            LocationKey::Coordinates => {
                let (lat, lng) = rec.coordinates()?;
                Some(PointKey::Coordinates(lat + 0.0, lng + 0.0))
            }
            LocationKey::City => Some(PointKey::Place(rec.city.clone()?, rec.state.clone())),
            LocationKey::State => Some(PointKey::State(rec.state.clone()?)),
        }
    }

    /// Total order within one variant; a single aggregate only ever
    /// builds keys of one variant.
    fn order(&self, other: &Self) -> Ordering {
        match (self, other) {
            (PointKey::Coordinates(a_lat, a_lng), PointKey::Coordinates(b_lat, b_lng)) => {
                a_lat.total_cmp(b_lat).then(a_lng.total_cmp(b_lng))
            }
            (PointKey::Place(a_city, a_state), PointKey::Place(b_city, b_state)) => {
                (a_city, a_state).cmp(&(b_city, b_state))
            }
            (PointKey::State(a), PointKey::State(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }

    fn label(&self) -> Option<String> {
        match self {
            PointKey::Coordinates(..) => None,
            PointKey::Place(city, Some(state)) => Some(format!("{city}, {state}")),
            PointKey::Place(city, None) => Some(city.clone()),
            PointKey::State(state) => Some(state.clone()),
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Group rows with coordinates by `key`, counting rows and averaging
/// `metric` per point.
///
/// When more than `sampling.cap` distinct points remain, exactly `cap` of
/// them are kept, chosen by a `StdRng` seeded with `sampling.seed`; the
/// same view and seed always keep the same points.
pub fn geo_aggregate(
    view: &FilteredView<'_>,
    key: LocationKey,
    metric: NumericColumn,
    sampling: GeoSampling,
) -> AggregateResult<GeoAggregate> {
    let mut keyed: Vec<(PointKey, &Record)> = view
        .records()
        .filter(|r| r.coordinates().is_some())
        .filter_map(|r| PointKey::of(key, r).map(|k| (k, r)))
        .collect();
    if keyed.is_empty() {
        return AggregateResult::InsufficientData(InsufficientData::for_view(view));
    }
    keyed.sort_by(|a, b| a.0.order(&b.0));

    let mut points: Vec<GeoPoint> = keyed
        .chunk_by(|a, b| a.0 == b.0)
        .map(|group| {
            let rows = || group.iter().map(|(_, r)| *r);
            GeoPoint {
                label: group[0].0.label(),
                latitude: mean(rows().filter_map(|r| r.latitude)).unwrap_or_default(),
                longitude: mean(rows().filter_map(|r| r.longitude)).unwrap_or_default(),
                count: group.len(),
                metric_mean: mean(rows().filter_map(|r| metric.value(r))),
            }
        })
        .collect();

    let distinct_points = points.len();
    let cap = sampling.cap.max(1);
    let sampled = distinct_points > cap;
    if sampled {
        let mut rng = StdRng::seed_from_u64(sampling.seed);
        let mut keep = vec![false; distinct_points];
        for i in rand::seq::index::sample(&mut rng, distinct_points, cap) {
            keep[i] = true;
        }
        points = points
            .into_iter()
            .zip(keep)
            .filter_map(|(p, k)| k.then_some(p))
            .collect();
        log::debug!("Sampled {cap} of {distinct_points} map points (seed {})", sampling.seed);
    }

    AggregateResult::Ready(GeoAggregate {
        key,
        metric,
        points,
        distinct_points,
        sampled,
    })
}

// ---------------------------------------------------------------------------
// KPIs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub total: usize,
    /// Mean over rows with a severity.
    pub average_severity: Option<f64>,
    pub unique_states: usize,
    pub latest_start: Option<NaiveDateTime>,
}

/// Headline numbers above the dashboard charts.
pub fn kpis(view: &FilteredView<'_>) -> AggregateResult<Kpis> {
    if view.is_empty() {
        return AggregateResult::InsufficientData(InsufficientData::NoRows);
    }

    let states: BTreeSet<&str> = view.records().filter_map(|r| r.state.as_deref()).collect();
    AggregateResult::Ready(Kpis {
        total: view.len(),
        average_severity: mean(view.records().filter_map(|r| r.severity.map(|s| s as f64))),
        unique_states: states.len(),
        latest_start: view.records().filter_map(|r| r.start_time).max(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{filter, FilterCriteria};
    use crate::data::model::Dataset;

    fn at(s: &str) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").ok()
    }

    fn rec(state: &str, severity: i64, temp: Option<f64>, start: &str) -> Record {
        Record {
            state: Some(state.to_string()),
            severity: Some(severity),
            temperature_f: temp,
            start_time: at(start),
            ..Record::default()
        }
    }

    fn scenario() -> Dataset {
        let mut records = Vec::new();
        records.extend((0..5).map(|i| {
            rec("CA", 2, Some(40.0 + i as f64 * 10.0), "2022-05-01 10:00:00")
        }));
        records.extend((0..3).map(|_| rec("TX", 3, Some(90.0), "2022-05-02 18:30:00")));
        records.extend((0..2).map(|_| rec("NY", 2, None, "not a date")));
        Dataset::from_records(records, vec![])
    }

    #[test]
    fn state_counts_descending() {
        let ds = scenario();
        let view = filter(&ds, &FilterCriteria::default().with_states(["CA", "TX"]));
        let counts = category_counts(&view, CategoryColumn::State).into_ready().unwrap();

        let pairs: Vec<(String, usize)> = counts
            .groups
            .iter()
            .map(|g| (g.value.to_string(), g.count))
            .collect();
        assert_eq!(pairs, vec![("CA".into(), 5), ("TX".into(), 3)]);
        assert_eq!(counts.total(), view.len());
    }

    #[test]
    fn category_ties_break_by_label() {
        let ds = Dataset::from_records(
            vec![
                rec("WA", 1, None, ""),
                rec("AZ", 1, None, ""),
                rec("OR", 1, None, ""),
                rec("OR", 1, None, ""),
            ],
            vec![],
        );
        let counts = category_counts(&FilteredView::all(&ds), CategoryColumn::State)
            .into_ready()
            .unwrap();
        let labels: Vec<String> = counts.groups.iter().map(|g| g.value.to_string()).collect();
        assert_eq!(labels, vec!["OR", "AZ", "WA"]);
    }

    #[test]
    fn category_missing_labels_are_reported() {
        let mut records = vec![rec("CA", 1, None, "")];
        records.push(Record::default());
        let ds = Dataset::from_records(records, vec![]);
        let counts = category_counts(&FilteredView::all(&ds), CategoryColumn::State)
            .into_ready()
            .unwrap();
        assert_eq!(counts.missing, 1);
        assert_eq!(counts.total(), 2);
    }

    #[test]
    fn empty_view_is_insufficient_not_error() {
        let ds = scenario();
        let none: [&str; 0] = [];
        let view = filter(&ds, &FilterCriteria::default().with_states(none));

        assert_eq!(
            category_counts(&view, CategoryColumn::State).insufficient(),
            Some(InsufficientData::NoRows)
        );
        assert!(!histogram(&view, NumericColumn::Temperature, 30).is_ready());
        assert!(!daily_counts(&view).is_ready());
        assert!(!grouped_time_series(&view, CategoryColumn::Severity).is_ready());
        assert!(!kpis(&view).is_ready());
        let sampling = GeoSampling { cap: 10, seed: 1 };
        assert!(!geo_aggregate(&view, LocationKey::Coordinates, NumericColumn::Temperature, sampling)
            .is_ready());
    }

    #[test]
    fn histogram_counts_present_values_only() {
        let ds = scenario();
        let view = FilteredView::all(&ds);
        let hist = histogram(&view, NumericColumn::Temperature, 5).into_ready().unwrap();

        assert_eq!(hist.bins.len(), 5);
        assert_eq!(hist.total(), 8);
        assert_eq!(hist.missing, 2);
        assert_eq!(hist.bins[0].lower, 40.0);
        assert_eq!(hist.bins[4].upper, 90.0);
        // 90.0 is the maximum and lands in the closed last bin with 80.0.
        assert_eq!(hist.bins[4].count, 4);
    }

    #[test]
    fn histogram_range_follows_view_not_dataset() {
        let ds = scenario();
        let view = filter(&ds, &FilterCriteria::default().with_states(["CA"]));
        let hist = histogram(&view, NumericColumn::Temperature, 4).into_ready().unwrap();
        assert_eq!(hist.bins[0].lower, 40.0);
        assert_eq!(hist.bins[3].upper, 80.0);
    }

    #[test]
    fn histogram_single_value_widens_range() {
        let ds = Dataset::from_records(vec![rec("CA", 1, Some(32.0), "")], vec![]);
        let hist = histogram(&FilteredView::all(&ds), NumericColumn::Temperature, 3)
            .into_ready()
            .unwrap();
        assert_eq!(hist.bins[0].lower, 31.5);
        assert_eq!(hist.bins[2].upper, 32.5);
        assert_eq!(hist.total(), 1);
    }

    #[test]
    fn histogram_handles_spans_beyond_f64_range() {
        let ds = Dataset::from_records(
            vec![rec("CA", 1, Some(-1e308), ""), rec("CA", 1, Some(1e308), "")],
            vec![],
        );
        let hist = histogram(&FilteredView::all(&ds), NumericColumn::Temperature, 3)
            .into_ready()
            .unwrap();

        let counts: Vec<usize> = hist.bins.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 0, 1]);
        assert_eq!(hist.bins[0].lower, -1e308);
        assert_eq!(hist.bins[2].upper, 1e308);
        assert!(hist.bins.iter().all(|b| b.lower.is_finite() && b.upper.is_finite()));
    }

    #[test]
    fn histogram_all_missing_is_no_values() {
        let ds = Dataset::from_records(vec![rec("CA", 1, None, "")], vec![]);
        let result = histogram(&FilteredView::all(&ds), NumericColumn::Temperature, 3);
        assert_eq!(result.insufficient(), Some(InsufficientData::NoValues));
    }

    #[test]
    fn time_series_drops_unparsed_dates() {
        let ds = scenario();
        let view = FilteredView::all(&ds);

        let daily = daily_counts(&view).into_ready().unwrap();
        assert_eq!(daily.iter().map(|d| d.count).collect::<Vec<_>>(), vec![5, 3]);

        let series = grouped_time_series(&view, CategoryColumn::Severity)
            .into_ready()
            .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].category, CategoryValue::Level(2));
        assert_eq!(series[1].count, 3);
    }

    #[test]
    fn time_series_with_no_valid_dates_is_empty() {
        let ds = Dataset::from_records(
            (0..4).map(|_| rec("CA", 1, None, "garbage")).collect(),
            vec![],
        );
        let result = grouped_time_series(&FilteredView::all(&ds), CategoryColumn::Severity);
        assert_eq!(result.insufficient(), Some(InsufficientData::NoValues));
    }

    fn grid(n: usize) -> Dataset {
        let records = (0..n)
            .map(|i| Record {
                state: Some(if i % 2 == 0 { "CA" } else { "NV" }.to_string()),
                city: Some(format!("City{}", i % 7)),
                temperature_f: Some((i % 50) as f64),
                latitude: Some(30.0 + (i / 100) as f64 * 0.01),
                longitude: Some(-120.0 + (i % 100) as f64 * 0.01),
                ..Record::default()
            })
            .collect();
        Dataset::from_records(records, vec![])
    }

    #[test]
    fn geo_sampling_is_capped_and_reproducible() {
        let ds = grid(2500);
        let view = FilteredView::all(&ds);
        let sampling = GeoSampling { cap: 1000, seed: 42 };

        let first = geo_aggregate(&view, LocationKey::Coordinates, NumericColumn::Temperature, sampling)
            .into_ready()
            .unwrap();
        let second = geo_aggregate(&view, LocationKey::Coordinates, NumericColumn::Temperature, sampling)
            .into_ready()
            .unwrap();

        assert!(first.sampled);
        assert_eq!(first.distinct_points, 2500);
        assert_eq!(first.points.len(), 1000);
        assert_eq!(first, second);
    }

    #[test]
    fn geo_below_cap_keeps_every_point() {
        let ds = grid(30);
        let sampling = GeoSampling { cap: 1000, seed: 42 };
        let agg = geo_aggregate(
            &FilteredView::all(&ds),
            LocationKey::Coordinates,
            NumericColumn::Temperature,
            sampling,
        )
        .into_ready()
        .unwrap();
        assert!(!agg.sampled);
        assert_eq!(agg.points.len(), 30);
        assert_eq!(agg.points.iter().map(|p| p.count).sum::<usize>(), 30);
    }

    #[test]
    fn geo_groups_by_state_with_centroid() {
        let ds = grid(4);
        let sampling = GeoSampling { cap: 1000, seed: 42 };
        let agg = geo_aggregate(
            &FilteredView::all(&ds),
            LocationKey::State,
            NumericColumn::Temperature,
            sampling,
        )
        .into_ready()
        .unwrap();

        assert_eq!(agg.points.len(), 2);
        let ca = &agg.points[0];
        assert_eq!(ca.label.as_deref(), Some("CA"));
        assert_eq!(ca.count, 2);
        // Rows 0 and 2: temperatures 0 and 2, longitudes -120.00 and -119.98.
        assert_eq!(ca.metric_mean, Some(1.0));
        assert!((ca.longitude - -119.99).abs() < 1e-9);
    }

    #[test]
    fn geo_city_labels_include_state() {
        let ds = grid(3);
        let sampling = GeoSampling { cap: 1000, seed: 42 };
        let agg = geo_aggregate(&FilteredView::all(&ds), LocationKey::City, NumericColumn::Temperature, sampling)
            .into_ready()
            .unwrap();
        assert_eq!(agg.points[0].label.as_deref(), Some("City0, CA"));
    }

    #[test]
    fn geo_without_coordinates_is_no_values() {
        let ds = scenario();
        let sampling = GeoSampling { cap: 1000, seed: 42 };
        let result = geo_aggregate(
            &FilteredView::all(&ds),
            LocationKey::Coordinates,
            NumericColumn::Temperature,
            sampling,
        );
        assert_eq!(result.insufficient(), Some(InsufficientData::NoValues));
    }

    #[test]
    fn kpis_summarise_view() {
        let ds = scenario();
        let k = kpis(&FilteredView::all(&ds)).into_ready().unwrap();
        assert_eq!(k.total, 10);
        assert_eq!(k.unique_states, 3);
        assert_eq!(k.average_severity, Some(2.3));
        assert_eq!(k.latest_start, at("2022-05-02 18:30:00"));
    }
}
