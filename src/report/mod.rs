//! The Journey of Change reporting pipeline.
//!
//! Flow: [`joc::generate_joc_report`] fetches data, [`pairing`] finds each
//! beneficiary's first and last meetings, [`accumulator`] folds
//! per-beneficiary values into cohort aggregates, and [`aggregate`]
//! supplies the numeric primitives plus the per-meeting category view.
//! [`render`] turns the finished report into Markdown or JSON.

pub mod accumulator;
pub mod aggregate;
pub mod joc;
pub mod pairing;
pub mod render;

pub use aggregate::{category_aggregate, category_aggregates};
pub use joc::{generate_joc_report, ReportOptions};
pub use render::{generate_json_report, generate_markdown_report};
