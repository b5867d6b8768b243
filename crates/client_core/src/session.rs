use std::{sync::Arc, time::Duration};

use shared::{
    domain::{
        ActuatorCommand, HistoricalPoint, Metric, Period, SwitchStatus, ThresholdField,
        ThresholdSet,
    },
    error::ThresholdViolation,
    protocol::{InboundEvent, InboundKind, OutboundCommand},
};
use tokio::{
    sync::{broadcast, mpsc},
    time::{sleep_until, Instant},
};
use tracing::{debug, info, warn};

use crate::{
    api::DashboardApi,
    connection::ConnectionManager,
    history::{ChartDataset, ChartFeed, HistoryLoader, HistoryRequest},
    mode::{ModeReconciler, ModeView, ToggleOutcome},
    store::{StateStore, StateUpdate, StoreField},
    thresholds::ThresholdEditor,
    CommandSink,
};

#[derive(Debug, Clone, PartialEq)]
pub enum OperatorAction {
    /// The mode toggle widget reported a new checked state. The widget fires
    /// this both for operator clicks and for programmatic sets.
    ToggleChanged { checked: bool },
    SendCommand(ActuatorCommand),
    EditThreshold { field: ThresholdField, text: String },
    SubmitThresholds,
    SelectPeriod(Period),
    RefreshThresholds,
}

#[derive(Debug)]
pub enum SessionInput {
    Inbound(InboundEvent),
    Operator(OperatorAction),
    ThresholdsFetched {
        revision: u64,
        result: Result<ThresholdSet, String>,
    },
    HistoryLoaded {
        request: HistoryRequest,
        result: Result<Vec<HistoricalPoint>, String>,
    },
    Shutdown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DashboardEvent {
    SensorChanged { metric: Metric, value: f64 },
    PumpStatusChanged(SwitchStatus),
    LightStatusChanged(SwitchStatus),
    ModeSynced(ModeView),
    ThresholdsConfirmed(ThresholdSet),
    ThresholdsSubmitted(ThresholdSet),
    ThresholdRejected(ThresholdViolation),
    ChartUpdated(ChartDataset),
    Error(String),
}

#[derive(Clone)]
pub struct SessionHandle {
    inputs: mpsc::UnboundedSender<SessionInput>,
    events: broadcast::Sender<DashboardEvent>,
}

impl SessionHandle {
    pub fn send(&self, action: OperatorAction) {
        self.input(SessionInput::Operator(action));
    }

    pub fn deliver(&self, event: InboundEvent) {
        self.input(SessionInput::Inbound(event));
    }

    pub fn shutdown(&self) {
        self.input(SessionInput::Shutdown);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<DashboardEvent> {
        self.events.subscribe()
    }

    pub fn input(&self, input: SessionInput) {
        if self.inputs.send(input).is_err() {
            debug!("session: input dropped after shutdown");
        }
    }
}

/// Owns every piece of client state and applies inputs one at a time.
pub struct DashboardSession {
    api: Arc<dyn DashboardApi>,
    commands: Arc<dyn CommandSink>,
    store: StateStore,
    reconciler: ModeReconciler,
    editor: ThresholdEditor,
    chart: ChartFeed,
    history: HistoryLoader,
    // Bumped by every server-pushed threshold set; an HTTP fetch started
    // under an older revision is stale when it lands.
    thresholds_revision: u64,
    inputs: mpsc::UnboundedReceiver<SessionInput>,
    handle: SessionHandle,
}

impl DashboardSession {
    pub fn new(
        api: Arc<dyn DashboardApi>,
        commands: Arc<dyn CommandSink>,
        suppression_window: Duration,
    ) -> Self {
        let (inputs_tx, inputs) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(1024);
        let store = StateStore::new();
        let editor = ThresholdEditor::new(*store.thresholds());
        Self {
            api,
            commands,
            store,
            reconciler: ModeReconciler::new(suppression_window),
            editor,
            chart: ChartFeed::default(),
            history: HistoryLoader::default(),
            thresholds_revision: 0,
            inputs,
            handle: SessionHandle {
                inputs: inputs_tx,
                events,
            },
        }
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Forwards every recognized push event into this session's queue.
    pub fn attach(&self, connection: &ConnectionManager) {
        for kind in InboundKind::ALL {
            let handle = self.handle();
            connection.on(kind, move |event| handle.deliver(event.clone()));
        }
    }

    /// Initial HTTP loads: confirmed thresholds and the history of `period`.
    pub fn start(&mut self, period: Period) {
        self.fetch_thresholds();
        self.load_history(period);
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn reconciler(&self) -> &ModeReconciler {
        &self.reconciler
    }

    pub fn editor(&self) -> &ThresholdEditor {
        &self.editor
    }

    pub fn chart(&self) -> &ChartFeed {
        &self.chart
    }

    pub fn history(&self) -> &HistoryLoader {
        &self.history
    }

    /// Drives the session until `Shutdown` arrives, then hands it back.
    pub async fn run(mut self) -> Self {
        info!("session: started");
        loop {
            let deadline = self.reconciler.suppression_deadline();
            tokio::select! {
                input = self.inputs.recv() => {
                    let Some(input) = input else { break };
                    if !self.handle_input(input) {
                        break;
                    }
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if self.reconciler.expire(Instant::now()) {
                        debug!("mode: suppression window closed");
                    }
                }
            }
        }
        info!("session: stopped");
        self
    }

    /// Applies one input to completion. Returns `false` on shutdown.
    pub fn handle_input(&mut self, input: SessionInput) -> bool {
        match input {
            SessionInput::Inbound(event) => self.on_inbound(event),
            SessionInput::Operator(action) => self.on_operator(action),
            SessionInput::ThresholdsFetched { revision, result } => {
                self.on_thresholds_fetched(revision, result)
            }
            SessionInput::HistoryLoaded { request, result } => {
                self.on_history_loaded(request, result)
            }
            SessionInput::Shutdown => return false,
        }
        true
    }

    fn on_inbound(&mut self, event: InboundEvent) {
        let now = Instant::now();
        match event {
            InboundEvent::InitialState {
                current_state,
                thresholds,
            } => {
                let mut update = StateUpdate::from_initial_state(&current_state, None);
                update.mode = None;
                let changed = self.store.apply_partial(&update);
                self.store.mark_initialized();
                self.publish_changes(&changed);

                let mode = current_state.mode.unwrap_or_default();
                let view = self.reconciler.adopt_initial(mode, &mut self.store, now);
                info!(mode = %mode, "session: initial state received");
                self.publish(DashboardEvent::ModeSynced(view));

                if let Some(thresholds) = thresholds {
                    self.confirm_thresholds(thresholds);
                }
            }
            InboundEvent::SensorDataUpdate(reading) => {
                self.apply(StateUpdate::from_reading(reading));
            }
            InboundEvent::TemperatureUpdate { value } => {
                self.apply(StateUpdate::metric(Metric::Temperature, value));
            }
            InboundEvent::HumidityUpdate { value } => {
                self.apply(StateUpdate::metric(Metric::Humidity, value));
            }
            InboundEvent::SoilMoistureUpdate { value } => {
                self.apply(StateUpdate::metric(Metric::SoilMoisture, value));
            }
            InboundEvent::LightLevelUpdate { value } => {
                self.apply(StateUpdate::metric(Metric::LightLevel, value));
            }
            InboundEvent::PumpStatusUpdate { status } => {
                self.apply(StateUpdate::pump(status));
            }
            InboundEvent::LightStatusUpdate { status } => {
                self.apply(StateUpdate::light(status));
            }
            InboundEvent::ModeUpdate { mode } => {
                if let Some(view) = self.reconciler.on_mode_update(mode, &mut self.store, now) {
                    info!(mode = %mode, "mode: synchronized to server echo");
                    self.publish(DashboardEvent::ModeSynced(view));
                }
            }
            InboundEvent::ThresholdsUpdate(thresholds) => {
                self.confirm_thresholds(thresholds);
            }
        }
    }

    fn on_operator(&mut self, action: OperatorAction) {
        match action {
            OperatorAction::ToggleChanged { checked } => {
                let outcome = self.reconciler.on_toggle_changed(
                    checked,
                    Instant::now(),
                    self.commands.as_ref(),
                );
                if let ToggleOutcome::Emitted(mode) = outcome {
                    info!(mode = %mode, "mode: change requested");
                }
            }
            OperatorAction::SendCommand(command) => {
                info!(command = %command, "session: actuator command");
                self.commands.emit(OutboundCommand::SendCommand { command });
            }
            OperatorAction::EditThreshold { field, text } => {
                if let Err(violation) = self.editor.set_field_text(field, &text) {
                    self.publish(DashboardEvent::ThresholdRejected(violation));
                }
            }
            OperatorAction::SubmitThresholds => match self.editor.submit(self.commands.as_ref()) {
                Ok(submitted) => self.publish(DashboardEvent::ThresholdsSubmitted(submitted)),
                Err(violation) => self.publish(DashboardEvent::ThresholdRejected(violation)),
            },
            OperatorAction::SelectPeriod(period) => self.load_history(period),
            OperatorAction::RefreshThresholds => self.fetch_thresholds(),
        }
    }

    fn on_thresholds_fetched(&mut self, revision: u64, result: Result<ThresholdSet, String>) {
        match result {
            Ok(thresholds) if revision == self.thresholds_revision => {
                debug!("thresholds: loaded from server");
                self.adopt_thresholds(thresholds);
            }
            Ok(_) => {
                debug!(revision, "thresholds: discarding fetch superseded by a pushed update");
            }
            Err(err) => {
                warn!("thresholds: failed to load: {err}");
                self.publish(DashboardEvent::Error(format!("failed to load thresholds: {err}")));
            }
        }
    }

    fn on_history_loaded(
        &mut self,
        request: HistoryRequest,
        result: Result<Vec<HistoricalPoint>, String>,
    ) {
        if !self.history.is_current(&request) {
            debug!(
                id = request.id,
                period = %request.period,
                "history: discarding response for superseded selection"
            );
            return;
        }
        match result {
            Ok(points) => {
                if self.chart.replace(request.period, &points) {
                    if let Some(dataset) = self.chart.dataset() {
                        info!(period = %request.period, points = dataset.len(), "history: chart updated");
                        self.publish(DashboardEvent::ChartUpdated(dataset.clone()));
                    }
                }
            }
            Err(err) => {
                warn!(period = %request.period, "history: failed to load: {err}");
                self.publish(DashboardEvent::Error(format!(
                    "failed to load {} history: {err}",
                    request.period
                )));
            }
        }
    }

    fn confirm_thresholds(&mut self, thresholds: ThresholdSet) {
        self.thresholds_revision += 1;
        self.adopt_thresholds(thresholds);
    }

    fn adopt_thresholds(&mut self, thresholds: ThresholdSet) {
        self.store.apply_partial(&StateUpdate::thresholds(thresholds));
        self.editor.adopt_confirmed(&thresholds);
        self.publish(DashboardEvent::ThresholdsConfirmed(thresholds));
    }

    fn apply(&mut self, update: StateUpdate) {
        let changed = self.store.apply_partial(&update);
        self.publish_changes(&changed);
    }

    fn publish_changes(&self, changed: &[StoreField]) {
        for field in changed {
            match field {
                StoreField::Sensor(metric) => {
                    if let Some(value) = self.store.reading().get(*metric) {
                        self.publish(DashboardEvent::SensorChanged {
                            metric: *metric,
                            value,
                        });
                    }
                }
                StoreField::PumpStatus => self.publish(DashboardEvent::PumpStatusChanged(
                    self.store.control().pump_status,
                )),
                StoreField::LightStatus => self.publish(DashboardEvent::LightStatusChanged(
                    self.store.control().light_status,
                )),
                // Published through the reconciler and threshold paths.
                StoreField::Mode | StoreField::Thresholds => {}
            }
        }
    }

    fn publish(&self, event: DashboardEvent) {
        let _ = self.handle.events.send(event);
    }

    fn fetch_thresholds(&self) {
        let api = Arc::clone(&self.api);
        let handle = self.handle();
        let revision = self.thresholds_revision;
        tokio::spawn(async move {
            let result = api.fetch_thresholds().await.map_err(|err| format!("{err:#}"));
            handle.input(SessionInput::ThresholdsFetched { revision, result });
        });
    }

    fn load_history(&mut self, period: Period) {
        let request = self.history.begin(period);
        debug!(id = request.id, period = %period, "history: loading");
        let api = Arc::clone(&self.api);
        let handle = self.handle();
        tokio::spawn(async move {
            let result = api.fetch_history(period).await.map_err(|err| format!("{err:#}"));
            handle.input(SessionInput::HistoryLoaded { request, result });
        });
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
