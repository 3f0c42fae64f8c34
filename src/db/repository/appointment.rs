use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::expect_one;
use crate::db::{format_timestamp, parse_timestamp, parse_uuid, DatabaseError};
use crate::models::{Appointment, AppointmentStatus};

const APPOINTMENT_COLUMNS: &str = "a.id, a.player_id, a.staff_id, a.appointment_date,
     a.appointment_type, a.status, a.notes, a.created_at";

struct AppointmentRow {
    id: String,
    player_id: String,
    staff_id: String,
    appointment_date: String,
    appointment_type: String,
    status: String,
    notes: Option<String>,
    created_at: String,
}

impl AppointmentRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            player_id: row.get(1)?,
            staff_id: row.get(2)?,
            appointment_date: row.get(3)?,
            appointment_type: row.get(4)?,
            status: row.get(5)?,
            notes: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    fn into_appointment(self) -> Result<Appointment, DatabaseError> {
        Ok(Appointment {
            id: parse_uuid(&self.id)?,
            player_id: parse_uuid(&self.player_id)?,
            staff_id: parse_uuid(&self.staff_id)?,
            appointment_date: parse_timestamp(&self.appointment_date)?,
            appointment_type: self.appointment_type,
            status: AppointmentStatus::from_str(&self.status)?,
            notes: self.notes,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

/// An appointment joined with the player's display name.
#[derive(Debug, Clone)]
pub struct AppointmentWithPlayer {
    pub appointment: Appointment,
    pub player_name: String,
}

pub fn insert_appointment(conn: &Connection, appointment: &Appointment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (id, player_id, staff_id, appointment_date, appointment_type,
         status, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            appointment.id.to_string(),
            appointment.player_id.to_string(),
            appointment.staff_id.to_string(),
            format_timestamp(&appointment.appointment_date),
            appointment.appointment_type,
            appointment.status.as_str(),
            appointment.notes,
            format_timestamp(&appointment.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_appointment(conn: &Connection, id: &Uuid) -> Result<Option<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments a WHERE a.id = ?1"
    ))?;
    let mut rows = stmt.query_map(params![id.to_string()], AppointmentRow::read)?;
    match rows.next() {
        Some(row) => Ok(Some(row?.into_appointment()?)),
        None => Ok(None),
    }
}

/// Soonest first.
pub fn list_appointments(conn: &Connection) -> Result<Vec<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments a ORDER BY a.appointment_date"
    ))?;
    let rows = stmt.query_map([], AppointmentRow::read)?;

    let mut appointments = Vec::new();
    for row in rows {
        appointments.push(row?.into_appointment()?);
    }
    Ok(appointments)
}

/// Still-scheduled appointments dated strictly before `cutoff`.
pub fn list_overdue_appointments(
    conn: &Connection,
    cutoff: &NaiveDateTime,
) -> Result<Vec<AppointmentWithPlayer>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS}, p.first_name || ' ' || p.last_name
         FROM appointments a JOIN players p ON p.id = a.player_id
         WHERE a.status = 'scheduled' AND a.appointment_date < ?1
         ORDER BY a.appointment_date, a.id"
    ))?;
    let rows = stmt.query_map(params![format_timestamp(cutoff)], |row| {
        Ok((AppointmentRow::read(row)?, row.get::<_, String>(8)?))
    })?;

    let mut overdue = Vec::new();
    for row in rows {
        let (appointment, player_name) = row?;
        overdue.push(AppointmentWithPlayer {
            appointment: appointment.into_appointment()?,
            player_name,
        });
    }
    Ok(overdue)
}

pub fn set_appointment_status(
    conn: &Connection,
    id: &Uuid,
    status: AppointmentStatus,
) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "UPDATE appointments SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id.to_string()],
    )?;
    expect_one(affected, "Appointment", id)
}
