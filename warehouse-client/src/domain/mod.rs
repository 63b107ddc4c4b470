pub mod dimensions;
pub mod emission;
pub mod warehouse;

pub use dimensions::{Country, Dimension, Gas, Sector, Subsector, TimePoint};
pub use emission::{EmissionRecord, JoinedEmission};
pub use warehouse::{
    ExcludedFact, JoinOutcome, JoinPolicy, MissingDimension, MissingReference, Warehouse,
    WarehouseError, UNKNOWN,
};
