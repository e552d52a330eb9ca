use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Pin {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PinPhoto {
    pub id: i64,
    pub pin_id: i64,
    pub uri: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPin {
    pub latitude: f64,
    pub longitude: f64,
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct StoreStats {
    pub total_pins: i64,
    pub total_photos: i64,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}
