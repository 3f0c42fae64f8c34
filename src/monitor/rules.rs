//! The three critical-value rules.
//!
//! Each rule turns breaching rows into [`Alert`]s. Deduplication and
//! fan-out to recipients happen in the runner.

use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use super::MonitorThresholds;
use crate::authorization::{roles_receiving, AlertClass};
use crate::db::{repository, DatabaseError};
use crate::models::{NewNotification, NotificationType, Priority, Role, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorRule {
    LowRsi,
    HighPain,
    OverdueAppointment,
}

impl MonitorRule {
    pub const ALL: [MonitorRule; 3] = [
        MonitorRule::LowRsi,
        MonitorRule::HighPain,
        MonitorRule::OverdueAppointment,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MonitorRule::LowRsi => "low_rsi",
            MonitorRule::HighPain => "high_pain",
            MonitorRule::OverdueAppointment => "overdue_appointment",
        }
    }

    /// Roles notified for every breach of this rule.
    pub fn recipient_roles(self) -> Vec<Role> {
        match self {
            MonitorRule::LowRsi => roles_receiving(AlertClass::LowRsi),
            MonitorRule::HighPain => roles_receiving(AlertClass::HighPain),
            MonitorRule::OverdueAppointment => vec![Role::Admin],
        }
    }
}

/// One breaching row, not yet addressed to anyone.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub related_table: Table,
    pub related_id: Uuid,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    pub metadata: serde_json::Value,
    /// Notified ahead of the role recipients, e.g. the assigned staff member.
    pub direct_recipients: Vec<Uuid>,
}

impl Alert {
    pub fn addressed_to(&self, recipient_id: Uuid) -> NewNotification {
        NewNotification {
            recipient_id,
            notification_type: self.notification_type,
            title: self.title.clone(),
            message: self.message.clone(),
            priority: self.priority,
            action_required: true,
            related_table: Some(self.related_table),
            related_id: Some(self.related_id),
            metadata: self.metadata.clone(),
        }
    }
}

pub fn evaluate(
    rule: MonitorRule,
    conn: &Connection,
    thresholds: &MonitorThresholds,
    now: NaiveDateTime,
) -> Result<Vec<Alert>, DatabaseError> {
    match rule {
        MonitorRule::LowRsi => low_rsi(conn, thresholds),
        MonitorRule::HighPain => high_pain(conn, thresholds),
        MonitorRule::OverdueAppointment => overdue_appointments(conn, thresholds, now),
    }
}

fn low_rsi(conn: &Connection, thresholds: &MonitorThresholds) -> Result<Vec<Alert>, DatabaseError> {
    let rows = repository::list_cmj_tests_below_rsi(conn, thresholds.low_rsi)?;
    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let score = row.test.rsi_score?;
            Some(Alert {
                related_table: Table::CmjTests,
                related_id: row.test.id,
                notification_type: NotificationType::CriticalValue,
                title: "Kritischer RSI-Score erkannt".into(),
                message: format!(
                    "{}: RSI-Score von {} liegt unter dem kritischen Wert von {}",
                    row.player_name, score, thresholds.low_rsi
                ),
                priority: Priority::High,
                metadata: serde_json::json!({
                    "player_name": row.player_name,
                    "rsi_score": score,
                    "test_date": row.test.test_date,
                }),
                direct_recipients: Vec::new(),
            })
        })
        .collect())
}

fn high_pain(conn: &Connection, thresholds: &MonitorThresholds) -> Result<Vec<Alert>, DatabaseError> {
    let rows = repository::list_physio_assessments_with_pain_at_least(conn, thresholds.high_pain)?;
    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let pain = row.assessment.pain_intensity?;
            Some(Alert {
                related_table: Table::PhysioAssessments,
                related_id: row.assessment.id,
                notification_type: NotificationType::CriticalValue,
                title: "Hohe Schmerzintensität gemeldet".into(),
                message: format!(
                    "{}: Schmerzintensität von {}/10 erfordert Aufmerksamkeit",
                    row.player_name, pain
                ),
                priority: Priority::High,
                metadata: serde_json::json!({
                    "player_name": row.player_name,
                    "pain_intensity": pain,
                    "assessment_date": row.assessment.date_of_assessment,
                }),
                direct_recipients: Vec::new(),
            })
        })
        .collect())
}

fn overdue_appointments(
    conn: &Connection,
    thresholds: &MonitorThresholds,
    now: NaiveDateTime,
) -> Result<Vec<Alert>, DatabaseError> {
    let cutoff = now - thresholds.overdue_after;
    let hours = thresholds.overdue_after.num_hours();
    let rows = repository::list_overdue_appointments(conn, &cutoff)?;
    Ok(rows
        .into_iter()
        .map(|row| Alert {
            related_table: Table::Appointments,
            related_id: row.appointment.id,
            notification_type: NotificationType::AppointmentOverdue,
            title: "Überfälliger Termin".into(),
            message: format!(
                "Termin mit {} ist seit mehr als {hours} Stunden überfällig",
                row.player_name
            ),
            priority: Priority::Medium,
            metadata: serde_json::json!({
                "player_name": row.player_name,
                "appointment_date": row.appointment.appointment_date,
                "appointment_type": row.appointment.appointment_type,
            }),
            direct_recipients: vec![row.appointment.staff_id],
        })
        .collect())
}
