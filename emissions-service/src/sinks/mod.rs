pub mod collect;

pub use collect::{Collected, CollectSink};
