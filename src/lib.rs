//! Filter-and-aggregate pipeline behind the US accidents dashboard.
//!
//! A page loads the table once through [`data::cache::load`], builds a
//! [`FilterCriteria`] from its sidebar widgets and asks a [`Pipeline`] for
//! the panels it shows.  Nothing here renders anything.

pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;

pub use config::DashboardConfig;
pub use data::aggregate::{AggregateResult, InsufficientData};
pub use data::filter::{filter, FilterCriteria, FilteredView, SidebarControl};
pub use data::model::{Dataset, Record};
pub use error::{ConfigError, DatasetLoadError};
pub use pipeline::{Frame, Panel, PanelSpec, Pipeline, ViewSpec};
