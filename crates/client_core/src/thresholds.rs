//! Draft threshold editing. The draft is only ever sent to the server; the
//! confirmed copy lives in the [`StateStore`](crate::store::StateStore) and is
//! replaced solely by server-authoritative values.

use shared::{
    domain::{ThresholdField, ThresholdSet},
    error::ThresholdViolation,
    protocol::OutboundCommand,
};
use tracing::{info, warn};

use crate::CommandSink;

#[derive(Debug, Clone, Default)]
pub struct ThresholdEditor {
    draft: ThresholdSet,
}

impl ThresholdEditor {
    pub fn new(confirmed: ThresholdSet) -> Self {
        Self { draft: confirmed }
    }

    pub fn draft(&self) -> &ThresholdSet {
        &self.draft
    }

    pub fn set_field(&mut self, field: ThresholdField, value: f64) {
        self.draft.set(field, value);
    }

    /// Parses operator input for one field. Unparseable or non-finite input
    /// (`inf`, `NaN`) leaves the draft as it was.
    pub fn set_field_text(
        &mut self,
        field: ThresholdField,
        text: &str,
    ) -> Result<f64, ThresholdViolation> {
        let not_a_number = || ThresholdViolation::NotANumber {
            field,
            input: text.to_string(),
        };
        let value = text.trim().parse::<f64>().map_err(|_| not_a_number())?;
        if !value.is_finite() {
            return Err(not_a_number());
        }
        self.draft.set(field, value);
        Ok(value)
    }

    /// Resets the form to values the server has published.
    pub fn adopt_confirmed(&mut self, confirmed: &ThresholdSet) {
        self.draft = *confirmed;
    }

    /// Validates the draft and, if it passes, emits `set_thresholds`. Nothing
    /// is emitted on failure.
    pub fn submit(&self, sink: &dyn CommandSink) -> Result<ThresholdSet, ThresholdViolation> {
        if let Err(violation) = self.draft.validate() {
            warn!(field = %violation.field(), "thresholds: rejected draft: {violation}");
            return Err(violation);
        }
        info!(draft = ?self.draft, "thresholds: submitting draft");
        sink.emit(OutboundCommand::SetThresholds(self.draft));
        Ok(self.draft)
    }
}

#[cfg(test)]
#[path = "tests/thresholds_tests.rs"]
mod tests;
