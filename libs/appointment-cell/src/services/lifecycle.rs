// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::models::{AppointmentError, AppointmentStatus};

pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: &AppointmentStatus,
        new_status: &AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        let valid_transitions = self.get_valid_transitions(current_status);

        if !valid_transitions.contains(new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition(*current_status));
        }

        Ok(())
    }

    /// Get all valid next statuses for a given current status
    pub fn get_valid_transitions(&self, current_status: &AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Pending => vec![
                AppointmentStatus::Confirmed,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Confirmed => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ],
            // Terminal states - no transitions allowed
            AppointmentStatus::Completed => vec![],
            AppointmentStatus::Cancelled => vec![],
        }
    }

    pub fn can_cancel(&self, current_status: &AppointmentStatus) -> bool {
        matches!(
            current_status,
            AppointmentStatus::Pending | AppointmentStatus::Confirmed
        )
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn pending_can_confirm_or_cancel() {
        let lifecycle = AppointmentLifecycleService::new();

        assert!(lifecycle
            .validate_status_transition(&AppointmentStatus::Pending, &AppointmentStatus::Confirmed)
            .is_ok());
        assert!(lifecycle
            .validate_status_transition(&AppointmentStatus::Pending, &AppointmentStatus::Cancelled)
            .is_ok());
        assert_matches!(
            lifecycle.validate_status_transition(&AppointmentStatus::Pending, &AppointmentStatus::Completed),
            Err(AppointmentError::InvalidStatusTransition(AppointmentStatus::Pending))
        );
    }

    #[test]
    fn confirmed_can_complete_or_cancel() {
        let lifecycle = AppointmentLifecycleService::new();

        assert!(lifecycle
            .validate_status_transition(&AppointmentStatus::Confirmed, &AppointmentStatus::Completed)
            .is_ok());
        assert!(lifecycle
            .validate_status_transition(&AppointmentStatus::Confirmed, &AppointmentStatus::Cancelled)
            .is_ok());
        assert_matches!(
            lifecycle.validate_status_transition(&AppointmentStatus::Confirmed, &AppointmentStatus::Pending),
            Err(AppointmentError::InvalidStatusTransition(_))
        );
    }

    #[test]
    fn terminal_states_allow_nothing() {
        let lifecycle = AppointmentLifecycleService::new();

        for terminal in [AppointmentStatus::Completed, AppointmentStatus::Cancelled] {
            assert!(lifecycle.get_valid_transitions(&terminal).is_empty());
            for next in [
                AppointmentStatus::Pending,
                AppointmentStatus::Confirmed,
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ] {
                assert_matches!(
                    lifecycle.validate_status_transition(&terminal, &next),
                    Err(AppointmentError::InvalidStatusTransition(_))
                );
            }
        }
    }

    #[test]
    fn only_non_terminal_appointments_can_cancel() {
        let lifecycle = AppointmentLifecycleService::new();

        assert!(lifecycle.can_cancel(&AppointmentStatus::Pending));
        assert!(lifecycle.can_cancel(&AppointmentStatus::Confirmed));
        assert!(!lifecycle.can_cancel(&AppointmentStatus::Completed));
        assert!(!lifecycle.can_cancel(&AppointmentStatus::Cancelled));
    }
}
