use std::str::FromStr;

use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

use crate::db::{format_timestamp, parse_timestamp, parse_uuid, DatabaseError};
use crate::models::{Profile, Role};

const PROFILE_COLUMNS: &str = "id, email, full_name, role, phone, is_active, created_at, updated_at";

struct ProfileRow {
    id: String,
    email: String,
    full_name: String,
    role: String,
    phone: Option<String>,
    is_active: i32,
    created_at: String,
    updated_at: String,
}

impl ProfileRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            full_name: row.get(2)?,
            role: row.get(3)?,
            phone: row.get(4)?,
            is_active: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn into_profile(self) -> Result<Profile, DatabaseError> {
        Ok(Profile {
            id: parse_uuid(&self.id)?,
            email: self.email,
            full_name: self.full_name,
            role: Role::from_str(&self.role)?,
            phone: self.phone,
            is_active: self.is_active != 0,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

pub fn insert_profile(conn: &Connection, profile: &Profile) -> Result<(), DatabaseError> {
    conn.execute(
        &format!("INSERT INTO profiles ({PROFILE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
        params![
            profile.id.to_string(),
            profile.email,
            profile.full_name,
            profile.role.as_str(),
            profile.phone,
            profile.is_active as i32,
            format_timestamp(&profile.created_at),
            format_timestamp(&profile.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_profile(conn: &Connection, id: &Uuid) -> Result<Option<Profile>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1"))?;
    let mut rows = stmt.query_map(params![id.to_string()], ProfileRow::read)?;
    match rows.next() {
        Some(row) => Ok(Some(row?.into_profile()?)),
        None => Ok(None),
    }
}

/// Active staff whose role is in `roles` (the `role=in.(...)` filter).
pub fn list_profiles_by_roles(
    conn: &Connection,
    roles: &[Role],
) -> Result<Vec<Profile>, DatabaseError> {
    if roles.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = (1..=roles.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT {PROFILE_COLUMNS} FROM profiles
         WHERE is_active = 1 AND role IN ({placeholders})
         ORDER BY full_name"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(roles.iter().map(|r| r.as_str())), ProfileRow::read)?;

    let mut profiles = Vec::new();
    for row in rows {
        profiles.push(row?.into_profile()?);
    }
    Ok(profiles)
}
