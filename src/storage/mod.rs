pub mod models;
pub mod schema;
pub mod sqlite;

use crate::errors::Result;
use models::{NewPin, Pin, PinPhoto, StoreStats};

pub trait PinStore {
    fn insert_pin(&mut self, pin: NewPin) -> Result<Pin>;
    /// Deletes the pin and all of its photos in one transaction.
    /// Returns whether the pin row existed.
    fn delete_pin(&mut self, id: i64) -> Result<bool>;
    fn insert_photo(&mut self, pin_id: i64, uri: &str) -> Result<PinPhoto>;
    fn delete_photo(&mut self, id: i64) -> Result<bool>;
    /// All pins, newest first.
    fn load_pins(&self) -> Result<Vec<Pin>>;
    /// All photos, newest first.
    fn load_photos(&self) -> Result<Vec<PinPhoto>>;
    fn stats(&self) -> Result<StoreStats>;
}
