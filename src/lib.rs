//! Support ticket priority classification.
//!
//! Two independent pipelines share the building blocks in [`ml`]:
//! - [`priority`]: TF-IDF, scaled numeric and one-hot features into a
//!   class-balanced logistic regression, served by `POST /predict`
//! - [`maintenance`]: cleaned Spanish issue text into a random forest, used
//!   from the command line

pub mod api;
pub mod config;
pub mod error;
pub mod maintenance;
pub mod metrics;
pub mod ml;
pub mod models;
pub mod observability;
pub mod priority;

pub use error::{AppError, Result};
