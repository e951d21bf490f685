use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::DashboardConfig;
use crate::data::aggregate::{
    category_counts, daily_counts, geo_aggregate, grouped_time_series, histogram, kpis,
    AggregateResult, CategoryCounts, DailyCount, GeoAggregate, GeoSampling, Histogram, Kpis,
    LocationKey, SeriesPoint,
};
use crate::data::cache;
use crate::data::filter::{filter, FilterCriteria, SidebarControl};
use crate::data::model::{CategoryColumn, Dataset, NumericColumn};
use crate::error::DatasetLoadError;

// ---------------------------------------------------------------------------
// View description: which aggregates a page shows
// ---------------------------------------------------------------------------

/// One chart or KPI row on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PanelSpec {
    Kpis,
    CategoryCounts { column: CategoryColumn },
    Histogram { column: NumericColumn },
    DailyCounts,
    TimeSeries { column: CategoryColumn },
    Map { key: LocationKey, metric: NumericColumn },
}

/// A named page, the panels it displays top to bottom, and the sidebar
/// filters it offers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSpec {
    pub name: String,
    pub panels: Vec<PanelSpec>,
    /// Predicates pre-filled by [`Pipeline::default_criteria`].  Empty
    /// means the page opens unfiltered.
    #[serde(default)]
    pub controls: Vec<SidebarControl>,
}

impl ViewSpec {
    /// The exploratory gallery: state bars, temperature histogram,
    /// location map coloured by temperature, daily counts.
    pub fn gallery() -> Self {
        ViewSpec {
            name: "gallery".into(),
            panels: vec![
                PanelSpec::CategoryCounts {
                    column: CategoryColumn::State,
                },
                PanelSpec::Histogram {
                    column: NumericColumn::Temperature,
                },
                PanelSpec::Map {
                    key: LocationKey::Coordinates,
                    metric: NumericColumn::Temperature,
                },
                PanelSpec::DailyCounts,
            ],
            controls: vec![SidebarControl::States, SidebarControl::Temperature],
        }
    }

    /// The dashboard: KPIs, state bars, severity over time.
    pub fn dashboard() -> Self {
        ViewSpec {
            name: "dashboard".into(),
            panels: vec![
                PanelSpec::Kpis,
                PanelSpec::CategoryCounts {
                    column: CategoryColumn::State,
                },
                PanelSpec::TimeSeries {
                    column: CategoryColumn::Severity,
                },
            ],
            controls: vec![
                SidebarControl::States,
                SidebarControl::Severity,
                SidebarControl::Dates,
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluated output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "result", rename_all = "snake_case")]
pub enum Panel {
    Kpis(AggregateResult<Kpis>),
    CategoryCounts(AggregateResult<CategoryCounts>),
    Histogram(AggregateResult<Histogram>),
    DailyCounts(AggregateResult<Vec<DailyCount>>),
    TimeSeries(AggregateResult<Vec<SeriesPoint>>),
    Map(AggregateResult<GeoAggregate>),
}

impl Panel {
    /// Whether the panel has data to draw.
    pub fn is_ready(&self) -> bool {
        match self {
            Panel::Kpis(r) => r.is_ready(),
            Panel::CategoryCounts(r) => r.is_ready(),
            Panel::Histogram(r) => r.is_ready(),
            Panel::DailyCounts(r) => r.is_ready(),
            Panel::TimeSeries(r) => r.is_ready(),
            Panel::Map(r) => r.is_ready(),
        }
    }
}

/// Everything a page renders for one selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub view: String,
    /// Rows that passed the filter.
    pub rows: usize,
    pub panels: Vec<Panel>,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// A loaded dataset plus the settings every page shares.  Stateless
/// between calls: each [`evaluate`](Pipeline::evaluate) filters and
/// aggregates from scratch.
#[derive(Debug, Clone)]
pub struct Pipeline {
    dataset: Arc<Dataset>,
    config: DashboardConfig,
}

impl Pipeline {
    /// Load `config.data_path` through the process-wide cache.
    pub fn open(config: DashboardConfig) -> Result<Self, DatasetLoadError> {
        let dataset = cache::load(&config.data_path)?;
        Ok(Self::new(dataset, config))
    }

    pub fn new(dataset: Arc<Dataset>, config: DashboardConfig) -> Self {
        Pipeline { dataset, config }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// The selection `view` opens with.  Only the predicates its sidebar
    /// exposes are set.
    pub fn default_criteria(&self, view: &ViewSpec) -> FilterCriteria {
        FilterCriteria::defaults_for(&self.dataset, &self.config, &view.controls)
    }

    /// Filter once, then compute every panel of `view` over the result.
    pub fn evaluate(&self, view: &ViewSpec, criteria: &FilterCriteria) -> Frame {
        let filtered = filter(&self.dataset, criteria);
        log::debug!(
            "Evaluating '{}' ({} panels) over {} rows",
            view.name,
            view.panels.len(),
            filtered.len()
        );

        let panels = view
            .panels
            .iter()
            .map(|spec| match *spec {
                PanelSpec::Kpis => Panel::Kpis(kpis(&filtered)),
                PanelSpec::CategoryCounts { column } => {
                    Panel::CategoryCounts(category_counts(&filtered, column))
                }
                PanelSpec::Histogram { column } => {
                    Panel::Histogram(histogram(&filtered, column, self.config.histogram_bins))
                }
                PanelSpec::DailyCounts => Panel::DailyCounts(daily_counts(&filtered)),
                PanelSpec::TimeSeries { column } => {
                    Panel::TimeSeries(grouped_time_series(&filtered, column))
                }
                PanelSpec::Map { key, metric } => Panel::Map(geo_aggregate(
                    &filtered,
                    key,
                    metric,
                    GeoSampling::from(&self.config),
                )),
            })
            .collect();

        Frame {
            view: view.name.clone(),
            rows: filtered.len(),
            panels,
        }
    }
}
