//! Connection analytics
//!
//! Event collectors and the tracker that times connection attempts.

pub mod collector;
pub mod events_connection;

pub use collector::{
    new_event, AggregatingCollector, ApplicationInfo, Event, EventCollector, HttpEventCollector,
    NoopCollector,
};
pub use events_connection::{
    current_user_time, ConnectContext, ConnectDetails, ConnectEventTracker, UserTime,
    UserTimeProvider,
};
