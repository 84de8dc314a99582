/// Test doubles for the reconciliation service
use async_trait::async_trait;
use merchant_cascade::modules::reconciliation::{ReconciliationClient, ReconciliationIdentifier};
use merchant_cascade::shared::errors::{AppError, AppResult};
use std::collections::HashSet;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Onboard,
    Offboard,
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub kind: CallKind,
    pub identifiers: Vec<ReconciliationIdentifier>,
}

/// Records every call. A call containing a failing identifier is rejected
/// with a 5xx-style error and not recorded.
#[derive(Default)]
pub struct RecordingReconciliationClient {
    calls: Mutex<Vec<RecordedCall>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingReconciliationClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, identifier: &str) {
        self.failing.lock().unwrap().insert(identifier.to_string());
    }

    pub fn recover(&self, identifier: &str) {
        self.failing.lock().unwrap().remove(identifier);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_of(&self, kind: CallKind) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(|c| c.kind == kind).collect()
    }

    /// Identifiers sent in calls of `kind`, in call order
    pub fn identifiers(&self, kind: CallKind) -> Vec<String> {
        self.calls_of(kind)
            .into_iter()
            .flat_map(|c| c.identifiers.into_iter().map(|i| i.identifier))
            .collect()
    }

    fn record(&self, kind: CallKind, identifiers: &[ReconciliationIdentifier]) -> AppResult<()> {
        let failing = self.failing.lock().unwrap();
        if let Some(bad) = identifiers.iter().find(|i| failing.contains(&i.identifier)) {
            return Err(AppError::ExternalServiceError(format!(
                "Reconciliation service unavailable for {}",
                bad.identifier
            )));
        }
        self.calls.lock().unwrap().push(RecordedCall {
            kind,
            identifiers: identifiers.to_vec(),
        });
        Ok(())
    }
}

#[async_trait]
impl ReconciliationClient for RecordingReconciliationClient {
    async fn onboard(&self, identifiers: &[ReconciliationIdentifier]) -> AppResult<()> {
        self.record(CallKind::Onboard, identifiers)
    }

    async fn offboard(&self, identifiers: &[ReconciliationIdentifier]) -> AppResult<()> {
        self.record(CallKind::Offboard, identifiers)
    }
}
