pub mod csv_file;
pub mod records;

pub use csv_file::CsvFileSource;
pub use records::{EndTimeRow, Fields, FromCsvRecord, StartTimeRow};
