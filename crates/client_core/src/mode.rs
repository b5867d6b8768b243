//! Control-mode reconciliation between operator toggles and server echoes.
//!
//! ```text
//! Idle ──[toggle flipped]──▶ PendingLocalChange ──[mode_update]──▶ SuppressingEcho
//!  ▲                                                                    │
//!  └──────────────────────────[window elapsed]──────────────────────────┘
//! ```
//!
//! The toggle widget fires its own change signal whenever its position is set
//! programmatically. While `SuppressingEcho` is active those signals are
//! recognized as the client's own synchronization write and dropped, so they
//! never turn into a second `set_mode`.

use std::time::Duration;

use shared::{domain::Mode, protocol::OutboundCommand};
use tokio::time::Instant;
use tracing::debug;

use crate::{
    store::{StateStore, StateUpdate},
    CommandSink,
};

pub const DEFAULT_SUPPRESSION_WINDOW: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilerState {
    Idle,
    PendingLocalChange { requested: Mode },
    SuppressingEcho { until: Instant },
}

/// What the mode panel should show for a given authoritative mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeView {
    pub mode: Mode,
    pub toggle_checked: bool,
    pub label: &'static str,
    pub manual_controls_visible: bool,
    pub threshold_panel_visible: bool,
}

impl ModeView {
    pub fn for_mode(mode: Mode) -> Self {
        let auto = mode.is_auto();
        Self {
            mode,
            toggle_checked: auto,
            label: if auto { "Automatic mode" } else { "Manual mode" },
            manual_controls_visible: !auto,
            threshold_panel_visible: auto,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Emitted(Mode),
    Suppressed,
}

#[derive(Debug)]
pub struct ModeReconciler {
    state: ReconcilerState,
    window: Duration,
}

impl Default for ModeReconciler {
    fn default() -> Self {
        Self::new(DEFAULT_SUPPRESSION_WINDOW)
    }
}

impl ModeReconciler {
    pub fn new(window: Duration) -> Self {
        Self {
            state: ReconcilerState::Idle,
            window,
        }
    }

    pub fn state(&self) -> ReconcilerState {
        self.state
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Handles the toggle widget's change signal. The displayed mode is not
    /// changed here; it only follows the server echo.
    pub fn on_toggle_changed(
        &mut self,
        checked: bool,
        now: Instant,
        sink: &dyn CommandSink,
    ) -> ToggleOutcome {
        if let ReconcilerState::SuppressingEcho { until } = self.state {
            if now < until {
                debug!(checked, "mode: ignoring toggle signal inside suppression window");
                return ToggleOutcome::Suppressed;
            }
            self.state = ReconcilerState::Idle;
        }

        let requested = Mode::from_toggle(checked);
        debug!(mode = %requested, "mode: operator requested change");
        sink.emit(OutboundCommand::SetMode { mode: requested });
        self.state = ReconcilerState::PendingLocalChange { requested };
        ToggleOutcome::Emitted(requested)
    }

    /// Applies a `mode_update` echo to the store. Returns the view the toggle
    /// must be synchronized to, or `None` when the echo repeats the current
    /// value and nothing is pending.
    pub fn on_mode_update(
        &mut self,
        mode: Mode,
        store: &mut StateStore,
        now: Instant,
    ) -> Option<ModeView> {
        let changed = !store.apply_partial(&StateUpdate::mode(mode)).is_empty();
        let pending = matches!(self.state, ReconcilerState::PendingLocalChange { .. });
        if !changed && !pending {
            return None;
        }
        Some(self.synchronize(mode, now))
    }

    /// Adopts the mode carried by `initial_state`; the toggle is always
    /// synchronized.
    pub fn adopt_initial(&mut self, mode: Mode, store: &mut StateStore, now: Instant) -> ModeView {
        store.apply_partial(&StateUpdate::mode(mode));
        self.synchronize(mode, now)
    }

    fn synchronize(&mut self, mode: Mode, now: Instant) -> ModeView {
        self.state = ReconcilerState::SuppressingEcho {
            until: now + self.window,
        };
        ModeView::for_mode(mode)
    }

    pub fn suppression_deadline(&self) -> Option<Instant> {
        match self.state {
            ReconcilerState::SuppressingEcho { until } => Some(until),
            _ => None,
        }
    }

    /// Closes the suppression window once `now` has reached its deadline.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.state {
            ReconcilerState::SuppressingEcho { until } if now >= until => {
                self.state = ReconcilerState::Idle;
                true
            }
            _ => false,
        }
    }

    pub fn cancel_suppression(&mut self) -> bool {
        if matches!(self.state, ReconcilerState::SuppressingEcho { .. }) {
            self.state = ReconcilerState::Idle;
            return true;
        }
        false
    }
}

#[cfg(test)]
#[path = "tests/mode_tests.rs"]
mod tests;
