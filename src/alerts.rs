//! Maintenance alert policy
//!
//! Decides when a health assessment should open a maintenance alert. The
//! policy is deliberately separated from persistence: the controller fetches
//! the turbine's existing alerts, asks [`evaluate`] for a verdict, and inserts
//! the returned alert if any. Nothing here talks to the store.

use crate::types::{AlertType, HealthScore, MaintenanceAlert, MaintenanceStatus, NewAlert};

/// Score below which a health assessment opens a maintenance alert.
/// Matches the lower edge of the "warning" band, so only critical
/// assessments page anyone.
pub const ALERT_SCORE_THRESHOLD: i32 = 60;

/// Whether this assessment is bad enough to alert on at all
pub fn should_alert(health: &HealthScore) -> bool {
    health.score < ALERT_SCORE_THRESHOLD
}

/// Whether an equivalent alert is already open for this turbine
///
/// Equivalent means: same turbine, automatic health-score type, not yet
/// completed, and carrying the exact same score. A completed alert never
/// suppresses; the condition evidently came back.
pub fn is_duplicate(existing: &[MaintenanceAlert], turbine_id: &str, score: i32) -> bool {
    existing.iter().any(|alert| {
        alert.turbine_id == turbine_id
            && alert.alert_type == AlertType::HealthScore
            && alert.status != MaintenanceStatus::Completed
            && alert.health_score == Some(score)
    })
}

/// Full trigger decision: Some(alert to insert) or None
pub fn evaluate(
    existing: &[MaintenanceAlert],
    turbine_id: &str,
    health: &HealthScore,
) -> Option<NewAlert> {
    if !should_alert(health) {
        return None;
    }
    if is_duplicate(existing, turbine_id, health.score) {
        return None;
    }
    Some(build_low_score_alert(turbine_id, health.score))
}

/// Construct the pending alert a low score opens
pub fn build_low_score_alert(turbine_id: &str, score: i32) -> NewAlert {
    NewAlert {
        turbine_id: turbine_id.to_string(),
        alert_type: AlertType::HealthScore,
        status: MaintenanceStatus::Pending,
        description: format!("Low health score detected: {score}"),
        health_score: Some(score),
        assigned_to: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HealthStatus;
    use chrono::Utc;

    fn health(score: i32) -> HealthScore {
        HealthScore {
            score,
            status: HealthStatus::Critical,
            issues: vec![],
        }
    }

    fn alert(turbine_id: &str, score: i32, status: MaintenanceStatus) -> MaintenanceAlert {
        MaintenanceAlert {
            id: 1,
            turbine_id: turbine_id.to_string(),
            alert_type: AlertType::HealthScore,
            status,
            description: format!("Low health score detected: {score}"),
            health_score: Some(score),
            assigned_to: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn triggers_strictly_below_sixty() {
        assert!(should_alert(&health(59)));
        assert!(!should_alert(&health(60)));
        assert!(!should_alert(&health(100)));
    }

    #[test]
    fn evaluate_opens_pending_alert_with_score_in_description() {
        let new = evaluate(&[], "T-03", &health(45)).unwrap();
        assert_eq!(new.turbine_id, "T-03");
        assert_eq!(new.alert_type, AlertType::HealthScore);
        assert_eq!(new.status, MaintenanceStatus::Pending);
        assert_eq!(new.description, "Low health score detected: 45");
        assert_eq!(new.health_score, Some(45));
        assert!(new.assigned_to.is_none());
    }

    #[test]
    fn open_alert_with_same_score_suppresses() {
        let existing = vec![alert("T-03", 45, MaintenanceStatus::Pending)];
        assert!(evaluate(&existing, "T-03", &health(45)).is_none());

        let in_progress = vec![alert("T-03", 45, MaintenanceStatus::InProgress)];
        assert!(evaluate(&in_progress, "T-03", &health(45)).is_none());
    }

    #[test]
    fn different_score_is_not_a_duplicate() {
        let existing = vec![alert("T-03", 45, MaintenanceStatus::Pending)];
        let new = evaluate(&existing, "T-03", &health(40)).unwrap();
        assert_eq!(new.health_score, Some(40));
    }

    #[test]
    fn completed_alert_does_not_suppress() {
        let existing = vec![alert("T-03", 45, MaintenanceStatus::Completed)];
        assert!(evaluate(&existing, "T-03", &health(45)).is_some());
    }

    #[test]
    fn other_turbines_and_other_alert_types_do_not_suppress() {
        let other_turbine = vec![alert("T-09", 45, MaintenanceStatus::Pending)];
        assert!(evaluate(&other_turbine, "T-03", &health(45)).is_some());

        let mut scheduled = alert("T-03", 45, MaintenanceStatus::Pending);
        scheduled.alert_type = AlertType::Scheduled;
        assert!(evaluate(&[scheduled], "T-03", &health(45)).is_some());
    }
}
