//! Best-subset search over candidate variables.
//!
//! - `subset`: combinations as fixed-size membership sets
//! - `evaluate`: fit and screen one combination
//! - `store`: bounded top-K store ranked by standard error
//! - `engine`: the size-by-size state machine
//! - `observer`: progress events

pub mod context;
pub mod engine;
pub mod evaluate;
pub mod observer;
pub mod store;
pub mod subset;

pub use engine::{SearchEngine, search};
pub use observer::{Budget, LogObserver, NullObserver, SearchEvent, SearchObserver};
pub use store::{InsertOutcome, ResultStore, StoredModel};
pub use subset::VariableSubset;
