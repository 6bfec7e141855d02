//! Movement and traffic analysis
//!
//! Pure functions over position histories: derived movement statistics,
//! traffic density snapshots, and the delay trigger predicate. Nothing in
//! this module touches storage or the network — callers fetch the history
//! windows and hand them in.

pub mod movement;
pub mod traffic;
pub mod trigger;

pub use movement::analyze_movement;
pub use traffic::traffic_snapshot;
pub use trigger::should_queue;
