pub mod analytics;
pub mod db;
pub mod domain;

pub use analytics::{ReportKind, ReportOptions, ReportSet};
pub use domain::{JoinOutcome, JoinPolicy, JoinedEmission, Warehouse};
