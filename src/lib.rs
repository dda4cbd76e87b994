//! Filter-and-aggregate core of the listings explorer.
//!
//! A [`BaseTable`](data::model::BaseTable) is loaded once, narrowed by a
//! [`FilterSpec`](data::filter::FilterSpec) and summarised into
//! [`Projections`](pipeline::Projections). [`ExplorerState`](state::ExplorerState)
//! keeps the latest complete set of projections for the presentation layer.

pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod state;
