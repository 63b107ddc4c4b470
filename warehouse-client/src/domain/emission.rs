use serde::{Deserialize, Serialize};
use time::Date;

/// A row of the fact table as loaded, with dimension references unresolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionRecord {
    pub id: i32,
    pub country_id: i32,
    pub start_time_id: i32,
    pub end_time_id: i32,
    pub sector_id: i32,
    pub subsector_id: Option<i32>,
    pub gas_id: i32,
    pub quantity: Option<f64>,
}

/// A fact row joined against its dimensions.
///
/// `quantity` is already coalesced: a null quantity in the source becomes
/// `0.0` here, and the record still counts towards record totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinedEmission {
    pub record_id: i32,
    pub country: String,
    pub start_time: Date,
    pub end_time: Date,
    pub sector: String,
    pub subsector: Option<String>,
    pub gas: String,
    pub quantity: f64,
}

impl JoinedEmission {
    /// Reporting period: the calendar year the measurement interval opens in.
    pub fn period(&self) -> i32 {
        self.start_time.year()
    }
}
