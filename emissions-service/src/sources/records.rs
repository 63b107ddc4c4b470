use csv::StringRecord;
use time::{macros::format_description, Date};
use warehouse_client::domain::{Country, EmissionRecord, Gas, Sector, Subsector, TimePoint};

/// A row type that can be decoded from a headed CSV record.
pub trait FromCsvRecord: Sized + Send + 'static {
    /// Header columns the file must carry.
    const COLUMNS: &'static [&'static str];

    fn from_csv_record(fields: &Fields<'_>) -> Result<Self, String>;
}

/// Named access to the fields of one record.
pub struct Fields<'a> {
    record: &'a StringRecord,
    headers: &'a StringRecord,
}

impl<'a> Fields<'a> {
    pub fn new(record: &'a StringRecord, headers: &'a StringRecord) -> Self {
        Self { record, headers }
    }

    fn raw(&self, name: &str) -> Option<&'a str> {
        self.headers
            .iter()
            .position(|h| h == name)
            .and_then(|idx| self.record.get(idx))
            .map(str::trim)
    }

    pub fn required(&self, name: &str) -> Result<&'a str, String> {
        match self.raw(name) {
            Some(v) if !v.is_empty() => Ok(v),
            Some(_) => Err(format!("empty value in column '{name}'")),
            None => Err(format!("missing column '{name}'")),
        }
    }

    pub fn optional(&self, name: &str) -> Option<&'a str> {
        self.raw(name).filter(|v| !v.is_empty())
    }

    pub fn id(&self, name: &str) -> Result<i32, String> {
        let v = self.required(name)?;
        v.parse().map_err(|e| format!("invalid {name} '{v}': {e}"))
    }

    pub fn optional_id(&self, name: &str) -> Result<Option<i32>, String> {
        self.optional(name)
            .map(|v| v.parse().map_err(|e| format!("invalid {name} '{v}': {e}")))
            .transpose()
    }

    pub fn optional_f64(&self, name: &str) -> Result<Option<f64>, String> {
        self.optional(name)
            .map(|v| v.parse().map_err(|e| format!("invalid {name} '{v}': {e}")))
            .transpose()
    }

    /// `YYYY-MM-DD`, optionally followed by a time of day which is ignored.
    pub fn date(&self, name: &str) -> Result<Date, String> {
        let v = self.required(name)?;
        let day = v.get(..10).unwrap_or(v);
        Date::parse(day, format_description!("[year]-[month]-[day]"))
            .map_err(|e| format!("invalid {name} '{v}': {e}"))
    }
}

impl FromCsvRecord for Country {
    const COLUMNS: &'static [&'static str] = &["id", "iso_code"];

    fn from_csv_record(fields: &Fields<'_>) -> Result<Self, String> {
        Ok(Country {
            id: fields.id("id")?,
            iso_code: fields.required("iso_code")?.to_string(),
        })
    }
}

/// A row of the start-time dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartTimeRow(pub TimePoint);

/// A row of the end-time dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndTimeRow(pub TimePoint);

impl FromCsvRecord for StartTimeRow {
    const COLUMNS: &'static [&'static str] = &["id", "start_time"];

    fn from_csv_record(fields: &Fields<'_>) -> Result<Self, String> {
        Ok(StartTimeRow(TimePoint {
            id: fields.id("id")?,
            date: fields.date("start_time")?,
        }))
    }
}

impl FromCsvRecord for EndTimeRow {
    const COLUMNS: &'static [&'static str] = &["id", "end_time"];

    fn from_csv_record(fields: &Fields<'_>) -> Result<Self, String> {
        Ok(EndTimeRow(TimePoint {
            id: fields.id("id")?,
            date: fields.date("end_time")?,
        }))
    }
}

impl FromCsvRecord for Gas {
    const COLUMNS: &'static [&'static str] = &["id", "gas"];

    fn from_csv_record(fields: &Fields<'_>) -> Result<Self, String> {
        Ok(Gas {
            id: fields.id("id")?,
            name: fields.required("gas")?.to_string(),
        })
    }
}

impl FromCsvRecord for Sector {
    const COLUMNS: &'static [&'static str] = &["id", "sector"];

    fn from_csv_record(fields: &Fields<'_>) -> Result<Self, String> {
        Ok(Sector {
            id: fields.id("id")?,
            name: fields.required("sector")?.to_string(),
        })
    }
}

impl FromCsvRecord for Subsector {
    const COLUMNS: &'static [&'static str] = &["id", "subsector"];

    fn from_csv_record(fields: &Fields<'_>) -> Result<Self, String> {
        Ok(Subsector {
            id: fields.id("id")?,
            name: fields.required("subsector")?.to_string(),
        })
    }
}

impl FromCsvRecord for EmissionRecord {
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "country_id",
        "start_time_id",
        "end_time_id",
        "sector_id",
        "gas_id",
        "quantity",
    ];

    fn from_csv_record(fields: &Fields<'_>) -> Result<Self, String> {
        Ok(EmissionRecord {
            id: fields.id("id")?,
            country_id: fields.id("country_id")?,
            start_time_id: fields.id("start_time_id")?,
            end_time_id: fields.id("end_time_id")?,
            sector_id: fields.id("sector_id")?,
            subsector_id: fields.optional_id("subsector_id")?,
            gas_id: fields.id("gas_id")?,
            quantity: fields.optional_f64("quantity")?,
        })
    }
}
