use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::Date;

/// The dimension tables of the star schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Country,
    StartTime,
    EndTime,
    Gas,
    Sector,
    Subsector,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Country,
        Dimension::StartTime,
        Dimension::EndTime,
        Dimension::Gas,
        Dimension::Sector,
        Dimension::Subsector,
    ];

    /// Table name, also used as the natural-attribute column name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Country => "country",
            Dimension::StartTime => "start_time",
            Dimension::EndTime => "end_time",
            Dimension::Gas => "gas",
            Dimension::Sector => "sector",
            Dimension::Subsector => "subsector",
        }
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dimension::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| format!("unknown dimension '{s}'"))
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub id: i32,
    pub iso_code: String,
}

/// One side of a measurement interval. Start and end times are loaded into
/// separate dimensions that share this shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePoint {
    pub id: i32,
    pub date: Date,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gas {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sector {
    pub id: i32,
    pub name: String,
}

/// Finer classification than `Sector`. No parent sector is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subsector {
    pub id: i32,
    pub name: String,
}
