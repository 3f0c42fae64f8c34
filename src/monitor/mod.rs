//! Critical-value monitor.
//!
//! A stateless batch pass over the record store: each rule finds breaching
//! rows, skips those that already have a notification of the same type,
//! and notifies every recipient. Rules run in sequence and fail
//! independently. Scheduling lives in [`background`]; a run never
//! schedules itself.

pub mod background;
pub mod rules;

use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{now_utc, repository, DatabaseError};
use crate::store::RecordStore;

pub use rules::{Alert, MonitorRule};

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Invalid monitor thresholds: {0}")]
    InvalidThresholds(String),

    #[error("Record store unavailable: {0}")]
    StoreUnavailable(#[source] DatabaseError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorThresholds {
    /// Strictly below this RSI is critical.
    pub low_rsi: f64,
    /// This pain intensity or above is critical.
    pub high_pain: i32,
    /// Scheduled appointments older than this are overdue.
    pub overdue_after: chrono::Duration,
}

impl Default for MonitorThresholds {
    fn default() -> Self {
        Self {
            low_rsi: 1.5,
            high_pain: 8,
            overdue_after: chrono::Duration::hours(24),
        }
    }
}

impl MonitorThresholds {
    pub fn validate(&self) -> Result<(), MonitorError> {
        if !self.low_rsi.is_finite() || self.low_rsi <= 0.0 {
            return Err(MonitorError::InvalidThresholds(format!(
                "low_rsi must be positive, got {}",
                self.low_rsi
            )));
        }
        if !(0..=10).contains(&self.high_pain) {
            return Err(MonitorError::InvalidThresholds(format!(
                "high_pain must be within 0..=10, got {}",
                self.high_pain
            )));
        }
        if self.overdue_after <= chrono::Duration::zero() {
            return Err(MonitorError::InvalidThresholds(
                "overdue_after must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Outcome of one rule within a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleReport {
    pub rule: MonitorRule,
    /// Breaching rows found.
    pub breaches: usize,
    /// Breaches skipped because they were already notified.
    pub already_notified: usize,
    pub notifications_created: usize,
    /// Notifications that could not be written.
    pub failures: usize,
    /// Set when the rule itself could not be evaluated.
    pub error: Option<String>,
}

impl RuleReport {
    fn new(rule: MonitorRule) -> Self {
        Self {
            rule,
            breaches: 0,
            already_notified: 0,
            notifications_created: 0,
            failures: 0,
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorReport {
    pub started_at: NaiveDateTime,
    pub rules: Vec<RuleReport>,
}

impl MonitorReport {
    pub fn notifications_created(&self) -> usize {
        self.rules.iter().map(|r| r.notifications_created).sum()
    }

    pub fn has_failures(&self) -> bool {
        self.rules.iter().any(|r| r.failures > 0 || r.error.is_some())
    }

    pub fn rule(&self, rule: MonitorRule) -> Option<&RuleReport> {
        self.rules.iter().find(|r| r.rule == rule)
    }
}

/// Run every rule against the current time.
pub fn run_monitor(
    store: &RecordStore,
    thresholds: &MonitorThresholds,
) -> Result<MonitorReport, MonitorError> {
    run_monitor_at(store, thresholds, now_utc())
}

/// Run every rule as if the clock read `now` (UTC).
///
/// Notifications inserted before an aborting error are kept.
pub fn run_monitor_at(
    store: &RecordStore,
    thresholds: &MonitorThresholds,
    now: NaiveDateTime,
) -> Result<MonitorReport, MonitorError> {
    thresholds.validate()?;
    store
        .read(|conn| {
            conn.query_row("SELECT 1", [], |_| Ok(()))
                .map_err(DatabaseError::from)
        })
        .map_err(MonitorError::StoreUnavailable)?;

    tracing::info!("Starting critical values check");
    let mut report = MonitorReport {
        started_at: now,
        rules: Vec::with_capacity(MonitorRule::ALL.len()),
    };

    for rule in MonitorRule::ALL {
        let rule_report = match run_rule(store, rule, thresholds, now) {
            Ok(r) => r,
            Err(DatabaseError::LockPoisoned) => {
                return Err(MonitorError::StoreUnavailable(DatabaseError::LockPoisoned))
            }
            Err(e) => {
                tracing::error!(rule = rule.as_str(), error = %e, "Monitor rule failed");
                RuleReport {
                    error: Some(e.to_string()),
                    ..RuleReport::new(rule)
                }
            }
        };
        report.rules.push(rule_report);
    }

    tracing::info!(
        notifications = report.notifications_created(),
        failures = report.has_failures(),
        "Critical values check completed"
    );
    Ok(report)
}

fn run_rule(
    store: &RecordStore,
    rule: MonitorRule,
    thresholds: &MonitorThresholds,
    now: NaiveDateTime,
) -> Result<RuleReport, DatabaseError> {
    let alerts = store.read(|conn| rules::evaluate(rule, conn, thresholds, now))?;
    let mut report = RuleReport {
        breaches: alerts.len(),
        ..RuleReport::new(rule)
    };
    if alerts.is_empty() {
        return Ok(report);
    }

    let roles = rule.recipient_roles();
    let role_recipients: Vec<Uuid> = store
        .read(|conn| repository::list_profiles_by_roles(conn, &roles))?
        .into_iter()
        .map(|p| p.id)
        .collect();

    for alert in alerts {
        let notified = store.read(|conn| {
            repository::notification_exists_for(
                conn,
                alert.related_table,
                &alert.related_id,
                alert.notification_type,
            )
        })?;
        if notified {
            report.already_notified += 1;
            continue;
        }

        for recipient_id in recipients(&alert, &role_recipients) {
            match store.create_notification(alert.addressed_to(recipient_id)) {
                Ok(_) => report.notifications_created += 1,
                Err(e) => {
                    report.failures += 1;
                    tracing::warn!(
                        rule = rule.as_str(),
                        related_id = %alert.related_id,
                        recipient_id = %recipient_id,
                        error = %e,
                        "Notification not created"
                    );
                }
            }
        }
    }
    Ok(report)
}

/// Direct recipients first, then role members, without duplicates.
fn recipients(alert: &Alert, role_recipients: &[Uuid]) -> Vec<Uuid> {
    let mut all: Vec<Uuid> = Vec::with_capacity(alert.direct_recipients.len() + role_recipients.len());
    for id in alert.direct_recipients.iter().chain(role_recipients) {
        if !all.contains(id) {
            all.push(*id);
        }
    }
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::test_support::*;
    use crate::models::*;

    fn store() -> RecordStore {
        RecordStore::open_in_memory().unwrap()
    }

    fn low_rsi_test(store: &RecordStore, player: &Player, rsi: f64) -> CmjTest {
        let mut test = CmjTest::new(player.id, date(2024, 1, 10));
        test.rsi_score = Some(rsi);
        store.create_cmj_test(test).unwrap()
    }

    fn inbox(store: &RecordStore, recipient: &Uuid) -> Vec<Notification> {
        store
            .read(|c| repository::list_notifications_for_recipient(c, recipient, 50))
            .unwrap()
    }

    #[test]
    fn low_rsi_fans_out_to_trainers_and_admins() {
        let store = store();
        let (player, t1, t2, physio, admin) = store
            .read(|c| {
                Ok((
                    make_player(c, "Max", "Mustermann"),
                    make_profile(c, "Tom Trainer", Role::Trainer),
                    make_profile(c, "Tina Trainer", Role::Trainer),
                    make_profile(c, "Paula Physio", Role::Physiotherapist),
                    make_profile(c, "Anna Admin", Role::Admin),
                ))
            })
            .unwrap();
        let test = low_rsi_test(&store, &player, 1.2);

        let report = run_monitor(&store, &MonitorThresholds::default()).unwrap();
        let rule = report.rule(MonitorRule::LowRsi).unwrap();
        assert_eq!(rule.breaches, 1);
        assert_eq!(rule.notifications_created, 3);

        for recipient in [t1.id, t2.id, admin.id] {
            let got = inbox(&store, &recipient);
            assert_eq!(got.len(), 1);
            assert_eq!(got[0].title, "Kritischer RSI-Score erkannt");
            assert_eq!(got[0].related_id, Some(test.id));
            assert!(got[0].action_required);
        }
        assert!(inbox(&store, &physio.id).is_empty());
    }

    #[test]
    fn second_run_is_deduplicated() {
        let store = store();
        let player = store
            .read(|c| {
                make_profile(c, "Tom Trainer", Role::Trainer);
                Ok(make_player(c, "Max", "Mustermann"))
            })
            .unwrap();
        low_rsi_test(&store, &player, 1.0);

        let first = run_monitor(&store, &MonitorThresholds::default()).unwrap();
        assert_eq!(first.notifications_created(), 1);

        let second = run_monitor(&store, &MonitorThresholds::default()).unwrap();
        assert_eq!(second.notifications_created(), 0);
        assert_eq!(second.rule(MonitorRule::LowRsi).unwrap().already_notified, 1);
    }

    #[test]
    fn high_pain_goes_to_physios_and_admins() {
        let store = store();
        let (player, physio, trainer, admin) = store
            .read(|c| {
                Ok((
                    make_player(c, "Lena", "Block"),
                    make_profile(c, "Paula Physio", Role::Physiotherapist),
                    make_profile(c, "Tom Trainer", Role::Trainer),
                    make_profile(c, "Anna Admin", Role::Admin),
                ))
            })
            .unwrap();
        let mut assessment = PhysioAssessment::new(player.id, date(2024, 2, 1));
        assessment.pain_intensity = Some(9);
        store.create_physio_assessment(assessment).unwrap();

        run_monitor(&store, &MonitorThresholds::default()).unwrap();
        assert_eq!(inbox(&store, &physio.id).len(), 1);
        assert_eq!(inbox(&store, &admin.id).len(), 1);
        assert!(inbox(&store, &trainer.id).is_empty());
    }

    #[test]
    fn overdue_appointment_notifies_staff_and_admins_once() {
        let store = store();
        let (player, physio, admin) = store
            .read(|c| {
                Ok((
                    make_player(c, "Max", "Mustermann"),
                    make_profile(c, "Paula Physio", Role::Physiotherapist),
                    make_profile(c, "Anna Admin", Role::Admin),
                ))
            })
            .unwrap();
        let now = date(2024, 3, 10).and_hms_opt(12, 0, 0).unwrap();
        store
            .create_appointment(Appointment::new(
                player.id,
                physio.id,
                now - chrono::Duration::hours(30),
                "Kontrolle",
            ))
            .unwrap();
        // Assigned to an admin: still one notification for them.
        store
            .create_appointment(Appointment::new(
                player.id,
                admin.id,
                now - chrono::Duration::hours(48),
                "Kontrolle",
            ))
            .unwrap();
        // Not yet overdue.
        store
            .create_appointment(Appointment::new(
                player.id,
                physio.id,
                now - chrono::Duration::hours(2),
                "Kontrolle",
            ))
            .unwrap();

        let report = run_monitor_at(&store, &MonitorThresholds::default(), now).unwrap();
        let rule = report.rule(MonitorRule::OverdueAppointment).unwrap();
        assert_eq!(rule.breaches, 2);
        assert_eq!(rule.notifications_created, 3);
        assert_eq!(inbox(&store, &physio.id).len(), 1);
        assert_eq!(inbox(&store, &admin.id).len(), 2);
        assert_eq!(inbox(&store, &admin.id)[0].priority, Priority::Medium);
    }

    #[test]
    fn completed_appointments_are_not_overdue() {
        let store = store();
        let (player, physio) = store
            .read(|c| {
                Ok((
                    make_player(c, "Max", "Mustermann"),
                    make_profile(c, "Paula Physio", Role::Physiotherapist),
                ))
            })
            .unwrap();
        let now = date(2024, 3, 10).and_hms_opt(12, 0, 0).unwrap();
        let appointment = store
            .create_appointment(Appointment::new(
                player.id,
                physio.id,
                now - chrono::Duration::hours(30),
                "Kontrolle",
            ))
            .unwrap();
        store
            .set_appointment_status(&appointment.id, AppointmentStatus::Completed)
            .unwrap();

        let report = run_monitor_at(&store, &MonitorThresholds::default(), now).unwrap();
        assert_eq!(report.notifications_created(), 0);
    }

    #[test]
    fn failing_rule_does_not_block_others() {
        let store = store();
        let (player, physio) = store
            .read(|c| {
                Ok((
                    make_player(c, "Lena", "Block"),
                    make_profile(c, "Paula Physio", Role::Physiotherapist),
                ))
            })
            .unwrap();
        let mut assessment = PhysioAssessment::new(player.id, date(2024, 2, 1));
        assessment.pain_intensity = Some(10);
        store.create_physio_assessment(assessment).unwrap();
        store
            .read(|c| {
                c.execute_batch("DROP TABLE cmj_tests")?;
                Ok(())
            })
            .unwrap();

        let report = run_monitor(&store, &MonitorThresholds::default()).unwrap();
        assert!(report.has_failures());
        assert!(report.rule(MonitorRule::LowRsi).unwrap().error.is_some());
        assert_eq!(
            report.rule(MonitorRule::HighPain).unwrap().notifications_created,
            1
        );
        assert_eq!(inbox(&store, &physio.id).len(), 1);
    }

    #[test]
    fn invalid_thresholds_abort_before_work() {
        let store = store();
        let thresholds = MonitorThresholds {
            low_rsi: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(
            run_monitor(&store, &thresholds),
            Err(MonitorError::InvalidThresholds(_))
        ));
    }

    #[test]
    fn custom_threshold_changes_breaches() {
        let store = store();
        let player = store
            .read(|c| {
                make_profile(c, "Tom Trainer", Role::Trainer);
                Ok(make_player(c, "Max", "Mustermann"))
            })
            .unwrap();
        low_rsi_test(&store, &player, 1.8);

        let defaults = run_monitor(&store, &MonitorThresholds::default()).unwrap();
        assert_eq!(defaults.notifications_created(), 0);

        let stricter = MonitorThresholds {
            low_rsi: 2.0,
            ..Default::default()
        };
        let report = run_monitor(&store, &stricter).unwrap();
        assert_eq!(report.notifications_created(), 1);
    }

    fn poison(store: &RecordStore) {
        std::thread::scope(|s| {
            let result = s
                .spawn(|| store.read(|_| -> Result<(), DatabaseError> { panic!("writer crashed") }))
                .join();
            assert!(result.is_err());
        });
    }

    #[test]
    fn poisoned_store_aborts_run() {
        let store = store();
        poison(&store);
        let err = run_monitor(&store, &MonitorThresholds::default()).unwrap_err();
        assert!(matches!(
            err,
            MonitorError::StoreUnavailable(DatabaseError::LockPoisoned)
        ));
    }

    #[test]
    fn notifications_from_earlier_runs_survive_abort() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("volleymed.db");
        let store = RecordStore::open(&path).unwrap();
        let (player, trainer) = store
            .read(|c| {
                Ok((
                    make_player(c, "Max", "Mustermann"),
                    make_profile(c, "Tom Trainer", Role::Trainer),
                ))
            })
            .unwrap();
        low_rsi_test(&store, &player, 1.2);
        let report = run_monitor(&store, &MonitorThresholds::default()).unwrap();
        assert_eq!(report.notifications_created(), 1);

        poison(&store);
        assert!(matches!(
            run_monitor(&store, &MonitorThresholds::default()),
            Err(MonitorError::StoreUnavailable(_))
        ));
        drop(store);

        let conn = crate::db::open_database(&path).unwrap();
        let kept = repository::list_notifications_for_recipient(&conn, &trainer.id, 50).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title, "Kritischer RSI-Score erkannt");
    }
}
