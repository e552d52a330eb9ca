use chrono::Utc;
use rusqlite::{Connection, Row, params};

use super::PinStore;
use super::models::{NewPin, Pin, PinPhoto, StoreStats};
use super::schema;
use crate::errors::Result;

pub struct SqliteStore {
    conn: Connection,
}

fn row_to_pin(row: &Row) -> rusqlite::Result<Pin> {
    let id: i64 = row.get(0)?;
    // Rows written by older builds may carry a NULL title.
    let title: Option<String> = row.get(3)?;
    Ok(Pin {
        id,
        latitude: row.get(1)?,
        longitude: row.get(2)?,
        title: title.unwrap_or_else(|| format!("Pin {id}")),
        created_at: row.get(4)?,
    })
}

fn row_to_photo(row: &Row) -> rusqlite::Result<PinPhoto> {
    Ok(PinPhoto {
        id: row.get(0)?,
        pin_id: row.get(1)?,
        uri: row.get(2)?,
        created_at: row.get(3)?,
    })
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Result<Self> {
        conn.execute(schema::CREATE_PINS_TABLE, [])?;
        conn.execute(schema::CREATE_PIN_PHOTOS_TABLE, [])?;
        conn.execute(schema::CREATE_INDEX_PINS_CREATED_AT, [])?;
        conn.execute(schema::CREATE_INDEX_PHOTOS_PIN_ID, [])?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::new(conn)
    }

    #[cfg(test)]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

impl PinStore for SqliteStore {
    fn insert_pin(&mut self, pin: NewPin) -> Result<Pin> {
        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO pins (latitude, longitude, title, created_at) VALUES (?, ?, ?, ?)",
            params![pin.latitude, pin.longitude, pin.title, now],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(Pin {
            id,
            latitude: pin.latitude,
            longitude: pin.longitude,
            title: pin.title,
            created_at: now,
        })
    }

    fn delete_pin(&mut self, id: i64) -> Result<bool> {
        // Photos and the pin go in one transaction so a partial cascade
        // cannot leave orphaned photo rows.
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM pin_photos WHERE pin_id = ?", params![id])?;
        let changes = tx.execute("DELETE FROM pins WHERE id = ?", params![id])?;
        tx.commit()?;
        Ok(changes > 0)
    }

    fn insert_photo(&mut self, pin_id: i64, uri: &str) -> Result<PinPhoto> {
        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO pin_photos (pin_id, uri, created_at) VALUES (?, ?, ?)",
            params![pin_id, uri, now],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(PinPhoto {
            id,
            pin_id,
            uri: uri.to_string(),
            created_at: now,
        })
    }

    fn delete_photo(&mut self, id: i64) -> Result<bool> {
        let changes = self
            .conn
            .execute("DELETE FROM pin_photos WHERE id = ?", params![id])?;
        Ok(changes > 0)
    }

    fn load_pins(&self) -> Result<Vec<Pin>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, latitude, longitude, title, created_at
             FROM pins ORDER BY created_at DESC, id DESC",
        )?;
        let pins = stmt
            .query_map([], row_to_pin)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(pins)
    }

    fn load_photos(&self) -> Result<Vec<PinPhoto>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, pin_id, uri, created_at
             FROM pin_photos ORDER BY created_at DESC, id DESC",
        )?;
        let photos = stmt
            .query_map([], row_to_photo)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(photos)
    }

    fn stats(&self) -> Result<StoreStats> {
        self.conn
            .query_row(
                "SELECT
                    (SELECT COUNT(*) FROM pins),
                    (SELECT COUNT(*) FROM pin_photos),
                    (SELECT MIN(created_at) FROM pins),
                    (SELECT MAX(created_at) FROM pins)",
                [],
                |row| {
                    Ok(StoreStats {
                        total_pins: row.get(0)?,
                        total_photos: row.get(1)?,
                        oldest: row.get(2)?,
                        newest: row.get(3)?,
                    })
                },
            )
            .map_err(crate::errors::PinError::Storage)
    }
}
