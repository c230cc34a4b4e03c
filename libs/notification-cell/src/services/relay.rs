// libs/notification-cell/src/services/relay.rs
use serde_json::json;
use tracing::{debug, warn};

use crate::models::{AppointmentEvent, APPOINTMENT_EVENT};
use crate::services::presence::PresenceDirectory;

/// Fan-out of appointment lifecycle transitions to the two interested
/// parties. Best-effort and at-most-once: a party without a live connection
/// simply misses the event.
pub struct NotificationRelay {
    presence: PresenceDirectory,
}

impl NotificationRelay {
    pub fn new(presence: PresenceDirectory) -> Self {
        Self { presence }
    }

    pub fn presence(&self) -> &PresenceDirectory {
        &self.presence
    }

    pub async fn publish(&self, event: &AppointmentEvent) {
        let payload = json!({
            "event": APPOINTMENT_EVENT,
            "data": event,
        })
        .to_string();

        let mut recipients = vec![event.doctor_id, event.patient_id];
        recipients.dedup();

        for party_id in recipients {
            match self.presence.resolve(party_id).await {
                Some(sender) => {
                    if sender.send(payload.clone()).is_err() {
                        warn!("Dropped event for party {}: connection closed", party_id);
                    }
                }
                None => {
                    debug!("No live connection for party {}; event dropped", party_id);
                }
            }
        }
    }
}

impl Clone for NotificationRelay {
    fn clone(&self) -> Self {
        Self {
            presence: self.presence.clone(),
        }
    }
}
