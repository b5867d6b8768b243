//! Synchronization core of the greenhouse dashboard client.
//!
//! Inbound push events, operator actions and HTTP completions are funnelled
//! into one [`DashboardSession`] queue and handled one at a time, so the
//! [`StateStore`] never sees concurrent writers.

use shared::protocol::OutboundCommand;

pub mod api;
pub mod connection;
pub mod gauge;
pub mod history;
pub mod mode;
pub mod session;
pub mod store;
pub mod thresholds;

pub use api::{DashboardApi, HttpDashboardApi};
pub use connection::{ConnectionError, ConnectionManager};
pub use history::{ChartDataset, ChartFeed, HistoryLoader, HistoryRequest};
pub use mode::{ModeReconciler, ModeView, ReconcilerState, ToggleOutcome};
pub use session::{DashboardEvent, DashboardSession, OperatorAction, SessionHandle, SessionInput};
pub use store::{StateStore, StateUpdate, StoreField};
pub use thresholds::ThresholdEditor;

/// Outbound side of the push channel. Emission is fire-and-forget: failures
/// are logged by the implementation and never reported to the caller.
pub trait CommandSink: Send + Sync {
    fn emit(&self, command: OutboundCommand);
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
