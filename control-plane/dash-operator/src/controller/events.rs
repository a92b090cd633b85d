use kube::Resource;
use kube::runtime::events::{Event, EventType, Recorder};
use tracing::debug;

use super::reconcile::{ReconcileAction, ReconcileOutcome};
use crate::crd::dash_application::DashApplication;

pub const REASON_CREATED: &str = "Created";
pub const REASON_UPDATED: &str = "Updated";
pub const REASON_DELETED: &str = "Deleted";
pub const REASON_READY: &str = "Ready";

/// Build the Event for a reconcile action. Finalizer bookkeeping is not
/// reported.
pub fn event_for(action: &ReconcileAction) -> Option<Event> {
    let (reason, verb, note) = match action {
        ReconcileAction::Created(kind) => {
            (REASON_CREATED, "Create", format!("Created {}", kind))
        }
        ReconcileAction::Updated { kind, fields } => (
            REASON_UPDATED,
            "Update",
            format!("Updated {} fields: {}", kind, fields.join(", ")),
        ),
        ReconcileAction::Deleted(kind) => {
            (REASON_DELETED, "Delete", format!("Deleted {}", kind))
        }
        ReconcileAction::StatusUpdated { ready } => {
            (REASON_READY, "Status", format!("Ready set to {}", ready))
        }
        ReconcileAction::FinalizerAdded(_) | ReconcileAction::FinalizerRemoved(_) => {
            return None;
        }
    };
    Some(Event {
        type_: EventType::Normal,
        reason: reason.into(),
        note: Some(note),
        action: verb.into(),
        secondary: None,
    })
}

pub async fn publish_outcome(
    recorder: &Recorder,
    owner: &DashApplication,
    outcome: &ReconcileOutcome,
) {
    let reference = owner.object_ref(&());
    for event in outcome.actions.iter().filter_map(event_for) {
        if let Err(e) = recorder.publish(&event, &reference).await {
            debug!(error = %e, reason = %event.reason, "event publish failed");
        }
    }
}
