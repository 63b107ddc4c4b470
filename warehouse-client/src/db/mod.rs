//! Relational rendition of the warehouse: star-schema DDL, server-side bulk
//! load, and the reports as SQL against Postgres.

pub mod emission_reports;
pub mod schema;

pub use schema::Table;
