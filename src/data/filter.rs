use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::model::{Dataset, Record};
use crate::config::DashboardConfig;

// ---------------------------------------------------------------------------
// Filter predicate: which rows the sidebar selection keeps
// ---------------------------------------------------------------------------

/// The user's current selection.  All configured predicates are ANDed.
///
/// `None` means "no constraint" for that predicate.  `Some` of an empty
/// set matches nothing: clearing a multiselect hides every row rather
/// than disabling the filter.  Ranges are inclusive at both ends, and a
/// row whose inspected field is missing never satisfies a configured
/// predicate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    pub states: Option<BTreeSet<String>>,
    pub severity_levels: Option<BTreeSet<i64>>,
    pub cities: Option<BTreeSet<String>>,
    pub temperature_range: Option<(f64, f64)>,
    pub visibility_range: Option<(f64, f64)>,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

/// A predicate a page exposes in its sidebar.  Only these are pre-filled
/// when the page opens; the rest stay unconstrained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SidebarControl {
    States,
    Severity,
    Temperature,
    Dates,
}

impl FilterCriteria {
    /// The selection a page opens with, for the sidebar `controls` it
    /// shows: the first few sorted states, every severity level, and the
    /// full observed temperature and date ranges.
    pub fn defaults_for(
        dataset: &Dataset,
        config: &DashboardConfig,
        controls: &[SidebarControl],
    ) -> Self {
        let index = &dataset.index;
        let mut criteria = FilterCriteria::default();
        for control in controls {
            match control {
                SidebarControl::States => {
                    criteria.states = Some(
                        index
                            .states
                            .iter()
                            .take(config.default_state_count)
                            .cloned()
                            .collect(),
                    )
                }
                SidebarControl::Severity => {
                    criteria.severity_levels = Some(index.severity_levels.clone())
                }
                SidebarControl::Temperature => {
                    criteria.temperature_range =
                        Some(index.temperature_bounds.unwrap_or((0.0, 100.0)))
                }
                SidebarControl::Dates => criteria.date_range = index.date_bounds,
            }
        }
        criteria
    }

    pub fn with_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.states = Some(states.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_cities<I, S>(mut self, cities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cities = Some(cities.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_severity_levels(mut self, levels: impl IntoIterator<Item = i64>) -> Self {
        self.severity_levels = Some(levels.into_iter().collect());
        self
    }

    pub fn with_temperature_range(mut self, min: f64, max: f64) -> Self {
        self.temperature_range = Some((min, max));
        self
    }

    pub fn with_visibility_range(mut self, min: f64, max: f64) -> Self {
        self.visibility_range = Some((min, max));
        self
    }

    pub fn with_date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_range = Some((start, end));
        self
    }

    /// Whether a single row passes every configured predicate.
    pub fn matches(&self, record: &Record) -> bool {
        is_member(&self.states, record.state.as_ref())
            && is_member(&self.severity_levels, record.severity.as_ref())
            && is_member(&self.cities, record.city.as_ref())
            && is_within(self.temperature_range, record.temperature_f)
            && is_within(self.visibility_range, record.visibility_mi)
            && is_within(self.date_range, record.start_date())
    }
}

fn is_member<T: Ord>(selected: &Option<BTreeSet<T>>, value: Option<&T>) -> bool {
    match selected {
        None => true,
        Some(set) => value.is_some_and(|v| set.contains(v)),
    }
}

fn is_within<T: PartialOrd>(range: Option<(T, T)>, value: Option<T>) -> bool {
    match range {
        None => true,
        Some((lo, hi)) => value.is_some_and(|v| lo <= v && v <= hi),
    }
}

// ---------------------------------------------------------------------------
// Filtered view
// ---------------------------------------------------------------------------

/// Rows of a [`Dataset`] that passed a [`FilterCriteria`], by index.
///
/// An empty view is a normal result, not an error.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    dataset: &'a Dataset,
    indices: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    /// A view over every row.
    pub fn all(dataset: &'a Dataset) -> Self {
        FilteredView {
            dataset,
            indices: (0..dataset.len()).collect(),
        }
    }

    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Matching rows in dataset order.
    pub fn records(&self) -> impl Iterator<Item = &'a Record> + '_ {
        let records = &self.dataset.records;
        self.indices.iter().map(move |&i| &records[i])
    }
}

/// Return indices of rows that pass all configured predicates.
pub fn filtered_indices(dataset: &Dataset, criteria: &FilterCriteria) -> Vec<usize> {
    dataset
        .records
        .iter()
        .enumerate()
        .filter(|(_, rec)| criteria.matches(rec))
        .map(|(i, _)| i)
        .collect()
}

/// Apply `criteria` to `dataset`.
pub fn filter<'a>(dataset: &'a Dataset, criteria: &FilterCriteria) -> FilteredView<'a> {
    let indices = filtered_indices(dataset, criteria);
    log::debug!("Filter kept {} of {} rows", indices.len(), dataset.len());
    FilteredView { dataset, indices }
}
