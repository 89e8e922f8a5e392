//! nutriclean: normalization pipeline for product nutrition tables.
//!
//! Load a spreadsheet or table file into a [`Table`], clean it with the
//! operations on [`Normalizer`], then save it back out.

pub mod config;
pub mod data;
pub mod error;
pub mod flags;
pub mod normalizer;
pub mod product;
pub mod text;
pub mod units;

pub use config::{PipelineConfig, Step};
pub use data::model::{Cell, Column, ColumnKind, Table};
pub use error::{Error, LoadError, Result};
pub use flags::FlagRule;
pub use normalizer::{MissingStrategy, Normalizer};
pub use units::Conversion;
