//! Session aggregation engine.
//!
//! Observer reports flow `SessionRegistry` → `Session` → `ObserverSlot`;
//! sessions periodically turn their slots into a segment decomposition and
//! append it to a `SeriesStore`.

pub mod error;
pub mod event;
pub mod observer;
pub mod registry;
pub mod series;
pub mod session;
pub mod smoothing;

pub use error::AggregateError;
pub use event::MeasurementEvent;
pub use registry::{AggregatorConfig, SessionId, SessionRegistry};
pub use series::SeriesStore;
