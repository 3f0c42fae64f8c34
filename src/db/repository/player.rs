use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::{expect_one, opt_date};
use crate::db::{format_timestamp, now_utc, parse_timestamp, parse_uuid, DatabaseError};
use crate::models::Player;

const PLAYER_COLUMNS: &str = "id, first_name, last_name, date_of_birth, jersey_number, position,
     height, weight, emergency_contact, emergency_phone, is_active, created_at, updated_at";

struct PlayerRow {
    id: String,
    first_name: String,
    last_name: String,
    date_of_birth: Option<String>,
    jersey_number: Option<i32>,
    position: Option<String>,
    height: Option<f64>,
    weight: Option<f64>,
    emergency_contact: Option<String>,
    emergency_phone: Option<String>,
    is_active: i32,
    created_at: String,
    updated_at: String,
}

impl PlayerRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            date_of_birth: row.get(3)?,
            jersey_number: row.get(4)?,
            position: row.get(5)?,
            height: row.get(6)?,
            weight: row.get(7)?,
            emergency_contact: row.get(8)?,
            emergency_phone: row.get(9)?,
            is_active: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }

    fn into_player(self) -> Result<Player, DatabaseError> {
        Ok(Player {
            id: parse_uuid(&self.id)?,
            first_name: self.first_name,
            last_name: self.last_name,
            date_of_birth: opt_date(self.date_of_birth)?,
            jersey_number: self.jersey_number,
            position: self.position,
            height: self.height,
            weight: self.weight,
            emergency_contact: self.emergency_contact,
            emergency_phone: self.emergency_phone,
            is_active: self.is_active != 0,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

pub fn insert_player(conn: &Connection, player: &Player) -> Result<(), DatabaseError> {
    conn.execute(
        &format!("INSERT INTO players ({PLAYER_COLUMNS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"),
        params![
            player.id.to_string(),
            player.first_name,
            player.last_name,
            player.date_of_birth.map(|d| d.to_string()),
            player.jersey_number,
            player.position,
            player.height,
            player.weight,
            player.emergency_contact,
            player.emergency_phone,
            player.is_active as i32,
            format_timestamp(&player.created_at),
            format_timestamp(&player.updated_at),
        ],
    )?;
    Ok(())
}

/// Replace all editable fields. `updated_at` is stamped here.
pub fn update_player(conn: &Connection, player: &Player) -> Result<Player, DatabaseError> {
    let updated_at = now_utc();
    let affected = conn.execute(
        "UPDATE players SET first_name = ?1, last_name = ?2, date_of_birth = ?3,
         jersey_number = ?4, position = ?5, height = ?6, weight = ?7,
         emergency_contact = ?8, emergency_phone = ?9, is_active = ?10, updated_at = ?11
         WHERE id = ?12",
        params![
            player.first_name,
            player.last_name,
            player.date_of_birth.map(|d| d.to_string()),
            player.jersey_number,
            player.position,
            player.height,
            player.weight,
            player.emergency_contact,
            player.emergency_phone,
            player.is_active as i32,
            format_timestamp(&updated_at),
            player.id.to_string(),
        ],
    )?;
    expect_one(affected, "Player", &player.id)?;
    Ok(Player { updated_at, ..player.clone() })
}

pub fn get_player(conn: &Connection, id: &Uuid) -> Result<Option<Player>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("SELECT {PLAYER_COLUMNS} FROM players WHERE id = ?1"))?;
    let mut rows = stmt.query_map(params![id.to_string()], PlayerRow::read)?;
    match rows.next() {
        Some(row) => Ok(Some(row?.into_player()?)),
        None => Ok(None),
    }
}

pub fn list_players(conn: &Connection, active_only: bool) -> Result<Vec<Player>, DatabaseError> {
    let sql = if active_only {
        format!("SELECT {PLAYER_COLUMNS} FROM players WHERE is_active = 1 ORDER BY last_name, first_name")
    } else {
        format!("SELECT {PLAYER_COLUMNS} FROM players ORDER BY last_name, first_name")
    };
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], PlayerRow::read)?;

    let mut players = Vec::new();
    for row in rows {
        players.push(row?.into_player()?);
    }
    Ok(players)
}

/// Soft delete. Players are never removed because medical records reference them.
pub fn deactivate_player(conn: &Connection, id: &Uuid) -> Result<Player, DatabaseError> {
    let affected = conn.execute(
        "UPDATE players SET is_active = 0, updated_at = ?1 WHERE id = ?2",
        params![format_timestamp(&now_utc()), id.to_string()],
    )?;
    expect_one(affected, "Player", id)?;
    get_player(conn, id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "Player".into(),
        id: id.to_string(),
    })
}
