use std::marker::PhantomData;

use crate::{
    pipeline::{Envelope, PipelineError, Transform},
    sources::{EndTimeRow, StartTimeRow},
};
use time::{macros::date, Date};
use warehouse_client::domain::{Country, EmissionRecord, Gas, Sector, Subsector};

/// Row-level checks applied while loading.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

fn validate_label(column: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{column} must not be empty"));
    }
    Ok(())
}

/// Time points must fall within [1900-01-01, 2200-01-01].
fn validate_date(column: &str, value: Date) -> Result<(), String> {
    let min = date!(1900 - 01 - 01);
    let max = date!(2200 - 01 - 01);

    if value < min || value > max {
        return Err(format!("{column} {value} out of allowed range"));
    }
    Ok(())
}

impl Validate for Country {
    fn validate(&self) -> Result<(), String> {
        validate_label("iso_code", &self.iso_code)
    }
}

impl Validate for StartTimeRow {
    fn validate(&self) -> Result<(), String> {
        validate_date("start_time", self.0.date)
    }
}

impl Validate for EndTimeRow {
    fn validate(&self) -> Result<(), String> {
        validate_date("end_time", self.0.date)
    }
}

impl Validate for Gas {
    fn validate(&self) -> Result<(), String> {
        validate_label("gas", &self.name)
    }
}

impl Validate for Sector {
    fn validate(&self) -> Result<(), String> {
        validate_label("sector", &self.name)
    }
}

impl Validate for Subsector {
    fn validate(&self) -> Result<(), String> {
        validate_label("subsector", &self.name)
    }
}

/// Quantity may be null or negative, but not NaN or infinite.
impl Validate for EmissionRecord {
    fn validate(&self) -> Result<(), String> {
        match self.quantity {
            Some(q) if !q.is_finite() => Err(format!("quantity must be finite, got {q}")),
            _ => Ok(()),
        }
    }
}

/// Rejects rows failing [`Validate`].
pub struct Validation<T> {
    _row: PhantomData<fn(T)>,
}

impl<T> Default for Validation<T> {
    fn default() -> Self {
        Self { _row: PhantomData }
    }
}

#[async_trait::async_trait]
impl<T: Validate + Send + 'static> Transform<T, T> for Validation<T> {
    async fn apply(&self, input: Envelope<T>) -> Result<Envelope<T>, PipelineError> {
        match input.payload.validate() {
            Ok(()) => Ok(input),
            Err(message) => {
                metrics::counter!("warehouse_rows_rejected_total", "stage" => "validate").increment(1);
                Err(PipelineError::Transform {
                    origin: input.origin,
                    message,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Origin;
    use warehouse_client::domain::TimePoint;

    fn envelope<T>(payload: T) -> Envelope<T> {
        Envelope {
            payload,
            origin: Origin {
                file: "test.csv".into(),
                line: 2,
            },
            received_at: std::time::SystemTime::now(),
        }
    }

    fn record(quantity: Option<f64>) -> EmissionRecord {
        EmissionRecord {
            id: 1,
            country_id: 1,
            start_time_id: 1,
            end_time_id: 1,
            sector_id: 1,
            subsector_id: None,
            gas_id: 1,
            quantity,
        }
    }

    #[test]
    fn emission_quantity_may_be_null_or_negative() {
        assert!(record(None).validate().is_ok());
        assert!(record(Some(-4.0)).validate().is_ok());
        assert!(record(Some(f64::NAN)).validate().is_err());
        assert!(record(Some(f64::INFINITY)).validate().is_err());
    }

    #[test]
    fn time_point_outside_window_is_rejected() {
        let ok = StartTimeRow(TimePoint { id: 1, date: date!(2015 - 01 - 01) });
        let old = EndTimeRow(TimePoint { id: 1, date: date!(1850 - 01 - 01) });
        assert!(ok.validate().is_ok());
        assert!(old.validate().is_err());
    }

    #[tokio::test]
    async fn validation_transform_keeps_origin_on_rejection() {
        let t = Validation::<Gas>::default();
        let accepted = t
            .apply(envelope(Gas { id: 1, name: "co2".to_string() }))
            .await;
        assert!(accepted.is_ok());

        let rejected = t
            .apply(envelope(Gas { id: 2, name: " ".to_string() }))
            .await;
        match rejected {
            Err(PipelineError::Transform { origin, message }) => {
                assert_eq!(origin.line, 2);
                assert_eq!(message, "gas must not be empty");
            }
            other => panic!("expected transform error, got {other:?}"),
        }
    }
}
