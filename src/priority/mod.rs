//! Mixed-feature ticket priority model served over HTTP.

pub mod pipeline;
pub mod service;
pub mod training;

pub use pipeline::PriorityPipeline;
pub use service::{PriorityService, ServiceSettings};
pub use training::{train_priority_model, TrainingSummary};
