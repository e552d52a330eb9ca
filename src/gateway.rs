//! The store gateway: the single owner of the persistent store and the
//! in-memory mirror the UI renders from.
//!
//! Every mutation goes through the store first and touches the mirror only
//! after the statement succeeded, so the mirror is an exact reflection of the
//! persisted rows after each completed operation. The mirror is newest-first;
//! fresh entries are prepended.

use rusqlite::Connection;
use tracing::{debug, warn};

use crate::config::AppPaths;
use crate::errors::{PinError, Result};
use crate::storage::PinStore;
use crate::storage::models::{NewPin, Pin, PinPhoto, StoreStats};
use crate::storage::sqlite::SqliteStore;

pub struct StoreGateway<S: PinStore> {
    store: Option<S>,
    pins: Vec<Pin>,
    photos: Vec<PinPhoto>,
}

fn validate_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    if !latitude.is_finite() || !longitude.is_finite() {
        return Err(PinError::InvalidInput(
            "coordinates must be finite numbers".to_string(),
        ));
    }
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(PinError::InvalidInput(format!(
            "latitude {latitude} out of range [-90, 90]"
        )));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(PinError::InvalidInput(format!(
            "longitude {longitude} out of range [-180, 180]"
        )));
    }
    Ok(())
}

impl StoreGateway<SqliteStore> {
    /// Opens (or creates) the store file, applies the schema, and loads the
    /// mirror.
    pub fn open(paths: &AppPaths) -> Result<Self> {
        std::fs::create_dir_all(&paths.base_dir)?;
        let conn = Connection::open(&paths.db_path)?;
        Self::with_store(SqliteStore::new(conn)?)
    }

    /// Like [`open`](Self::open), but a failed open degrades to a detached
    /// gateway instead of aborting: empty mirror, every mutation rejected
    /// with `Uninitialized`.
    pub fn open_or_detached(paths: &AppPaths) -> Self {
        match Self::open(paths) {
            Ok(gateway) => gateway,
            Err(e) => {
                warn!("store initialization failed, continuing without data: {e}");
                Self::detached()
            }
        }
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_store(SqliteStore::in_memory()?)
    }

    pub fn detached() -> Self {
        Self {
            store: None,
            pins: Vec::new(),
            photos: Vec::new(),
        }
    }
}

impl<S: PinStore> StoreGateway<S> {
    pub fn with_store(store: S) -> Result<Self> {
        let pins = store.load_pins()?;
        let photos = store.load_photos()?;
        debug!(pins = pins.len(), photos = photos.len(), "store loaded");
        Ok(Self {
            store: Some(store),
            pins,
            photos,
        })
    }

    pub fn is_ready(&self) -> bool {
        self.store.is_some()
    }

    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    pub fn photos(&self) -> &[PinPhoto] {
        &self.photos
    }

    pub fn pin(&self, id: i64) -> Option<&Pin> {
        self.pins.iter().find(|p| p.id == id)
    }

    pub fn photos_for(&self, pin_id: i64) -> Vec<&PinPhoto> {
        self.photos.iter().filter(|p| p.pin_id == pin_id).collect()
    }

    /// Creates a pin and returns its store-generated id. On return the mirror
    /// already holds the pin at index 0. An omitted or blank title defaults
    /// to a positional label.
    pub fn create_pin(&mut self, latitude: f64, longitude: f64, title: Option<&str>) -> Result<i64> {
        if self.store.is_none() {
            return Err(PinError::Uninitialized);
        }
        validate_coordinates(latitude, longitude)?;
        let title = match title.map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => format!("Pin {}", self.pins.len() + 1),
        };

        let pin = self
            .store
            .as_mut()
            .ok_or(PinError::Uninitialized)?
            .insert_pin(NewPin {
                latitude,
                longitude,
                title,
            })?;
        let id = pin.id;
        self.pins.insert(0, pin);
        debug!(id, latitude, longitude, "pin created");
        Ok(id)
    }

    /// Deletes a pin and all its photos. Unknown ids are a no-op.
    pub fn delete_pin(&mut self, id: i64) -> Result<()> {
        let existed = self
            .store
            .as_mut()
            .ok_or(PinError::Uninitialized)?
            .delete_pin(id)?;
        self.pins.retain(|p| p.id != id);
        self.photos.retain(|p| p.pin_id != id);
        debug!(id, existed, "pin deleted");
        Ok(())
    }

    /// Attaches a photo reference to an existing pin, returning the photo's
    /// store-generated id.
    pub fn add_photo(&mut self, pin_id: i64, uri: &str) -> Result<i64> {
        if self.store.is_none() {
            return Err(PinError::Uninitialized);
        }
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(PinError::InvalidInput(
                "photo uri must not be empty".to_string(),
            ));
        }
        if self.pin(pin_id).is_none() {
            return Err(PinError::InvalidInput(format!("no pin with id {pin_id}")));
        }

        let photo = self
            .store
            .as_mut()
            .ok_or(PinError::Uninitialized)?
            .insert_photo(pin_id, uri)?;
        let id = photo.id;
        self.photos.insert(0, photo);
        debug!(id, pin_id, "photo added");
        Ok(id)
    }

    /// Deletes a photo. Unknown ids are a no-op.
    pub fn delete_photo(&mut self, id: i64) -> Result<()> {
        let existed = self
            .store
            .as_mut()
            .ok_or(PinError::Uninitialized)?
            .delete_photo(id)?;
        self.photos.retain(|p| p.id != id);
        debug!(id, existed, "photo deleted");
        Ok(())
    }

    /// Re-reads both mirrors from the store.
    pub fn reload(&mut self) -> Result<()> {
        let store = self.store.as_ref().ok_or(PinError::Uninitialized)?;
        self.pins = store.load_pins()?;
        self.photos = store.load_photos()?;
        Ok(())
    }

    pub fn stats(&self) -> Result<StoreStats> {
        self.store.as_ref().ok_or(PinError::Uninitialized)?.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_gateway() -> StoreGateway<SqliteStore> {
        StoreGateway::in_memory().unwrap()
    }

    // --- Creation ---

    #[test]
    fn test_create_pin_visible_immediately() {
        let mut gw = test_gateway();
        let id = gw.create_pin(58.0105, 56.2502, Some("Home")).unwrap();
        assert_eq!(gw.pins().len(), 1);
        let pin = &gw.pins()[0];
        assert_eq!(pin.id, id);
        assert_eq!(pin.latitude, 58.0105);
        assert_eq!(pin.longitude, 56.2502);
        assert_eq!(pin.title, "Home");
    }

    #[test]
    fn test_create_pin_ids_are_fresh() {
        let mut gw = test_gateway();
        let a = gw.create_pin(1.0, 2.0, None).unwrap();
        let b = gw.create_pin(3.0, 4.0, None).unwrap();
        gw.delete_pin(a).unwrap();
        let c = gw.create_pin(5.0, 6.0, None).unwrap();
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }

    #[test]
    fn test_first_pin_gets_default_label() {
        let mut gw = test_gateway();
        gw.create_pin(58.0105, 56.2502, None).unwrap();
        assert_eq!(gw.pins()[0].title, "Pin 1");
    }

    #[test]
    fn test_default_labels_count_up() {
        let mut gw = test_gateway();
        gw.create_pin(1.0, 1.0, None).unwrap();
        gw.create_pin(2.0, 2.0, None).unwrap();
        assert_eq!(gw.pins()[0].title, "Pin 2");
        assert_eq!(gw.pins()[1].title, "Pin 1");
    }

    #[test]
    fn test_blank_title_gets_default_label() {
        let mut gw = test_gateway();
        gw.create_pin(1.0, 1.0, Some("   ")).unwrap();
        assert_eq!(gw.pins()[0].title, "Pin 1");
    }

    #[test]
    fn test_create_pin_rejects_non_finite() {
        let mut gw = test_gateway();
        assert!(matches!(
            gw.create_pin(f64::NAN, 0.0, None),
            Err(PinError::InvalidInput(_))
        ));
        assert!(matches!(
            gw.create_pin(0.0, f64::INFINITY, None),
            Err(PinError::InvalidInput(_))
        ));
        assert!(gw.pins().is_empty());
    }

    #[test]
    fn test_create_pin_rejects_out_of_range() {
        let mut gw = test_gateway();
        assert!(matches!(
            gw.create_pin(90.5, 0.0, None),
            Err(PinError::InvalidInput(_))
        ));
        assert!(matches!(
            gw.create_pin(0.0, -180.5, None),
            Err(PinError::InvalidInput(_))
        ));
        assert!(gw.pins().is_empty());
    }

    // --- Deletion ---

    #[test]
    fn test_delete_pin_removes_from_both_mirrors() {
        let mut gw = test_gateway();
        let id = gw.create_pin(1.0, 1.0, Some("target")).unwrap();
        gw.add_photo(id, "file:///a.jpg").unwrap();
        gw.add_photo(id, "file:///b.jpg").unwrap();
        gw.delete_pin(id).unwrap();
        assert!(gw.pins().iter().all(|p| p.id != id));
        assert!(gw.photos().iter().all(|p| p.pin_id != id));
    }

    #[test]
    fn test_delete_pin_nonexistent_is_noop() {
        let mut gw = test_gateway();
        gw.create_pin(1.0, 1.0, None).unwrap();
        gw.delete_pin(999).unwrap();
        assert_eq!(gw.pins().len(), 1);
    }

    #[test]
    fn test_cascade_spares_other_pins_photos() {
        let mut gw = test_gateway();
        let doomed = gw.create_pin(1.0, 1.0, Some("doomed")).unwrap();
        let kept = gw.create_pin(2.0, 2.0, Some("kept")).unwrap();
        gw.add_photo(doomed, "file:///1.jpg").unwrap();
        gw.add_photo(doomed, "file:///2.jpg").unwrap();
        gw.add_photo(kept, "file:///3.jpg").unwrap();

        gw.delete_pin(doomed).unwrap();

        assert_eq!(gw.photos().len(), 1);
        assert_eq!(gw.photos()[0].pin_id, kept);
    }

    #[test]
    fn test_create_two_delete_first() {
        let mut gw = test_gateway();
        let a = gw.create_pin(58.01, 56.25, Some("A")).unwrap();
        gw.create_pin(58.02, 56.26, Some("B")).unwrap();
        gw.delete_pin(a).unwrap();
        assert_eq!(gw.pins().len(), 1);
        assert_eq!(gw.pins()[0].title, "B");
    }

    // --- Photos ---

    #[test]
    fn test_add_then_delete_photo_round_trip() {
        let mut gw = test_gateway();
        let pin = gw.create_pin(1.0, 1.0, None).unwrap();
        gw.add_photo(pin, "file:///keep.jpg").unwrap();
        let before: Vec<i64> = gw.photos().iter().map(|p| p.id).collect();

        let id = gw.add_photo(pin, "file:///transient.jpg").unwrap();
        gw.delete_photo(id).unwrap();

        let after: Vec<i64> = gw.photos().iter().map(|p| p.id).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_add_photo_rejects_empty_uri() {
        let mut gw = test_gateway();
        let pin = gw.create_pin(1.0, 1.0, None).unwrap();
        assert!(matches!(
            gw.add_photo(pin, "  "),
            Err(PinError::InvalidInput(_))
        ));
        assert!(gw.photos().is_empty());
    }

    #[test]
    fn test_add_photo_rejects_unknown_pin() {
        let mut gw = test_gateway();
        assert!(matches!(
            gw.add_photo(7, "file:///x.jpg"),
            Err(PinError::InvalidInput(_))
        ));
        assert!(gw.photos().is_empty());
    }

    #[test]
    fn test_delete_photo_nonexistent_is_noop() {
        let mut gw = test_gateway();
        gw.delete_photo(123).unwrap();
        assert!(gw.photos().is_empty());
    }

    // --- Ordering ---

    #[test]
    fn test_fresh_entries_are_first() {
        let mut gw = test_gateway();
        gw.create_pin(1.0, 1.0, Some("old")).unwrap();
        let newest = gw.create_pin(2.0, 2.0, Some("new")).unwrap();
        assert_eq!(gw.pins()[0].id, newest);

        gw.add_photo(newest, "file:///old.jpg").unwrap();
        let photo = gw.add_photo(newest, "file:///new.jpg").unwrap();
        assert_eq!(gw.photos()[0].id, photo);
    }

    #[test]
    fn test_ordering_survives_reload_from_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let paths = AppPaths::from_base(dir.path().to_path_buf());

        let ids = {
            let mut gw = StoreGateway::open(&paths).unwrap();
            vec![
                gw.create_pin(1.0, 1.0, Some("a")).unwrap(),
                gw.create_pin(2.0, 2.0, Some("b")).unwrap(),
                gw.create_pin(3.0, 3.0, Some("c")).unwrap(),
            ]
        };

        let gw = StoreGateway::open(&paths).unwrap();
        let loaded: Vec<i64> = gw.pins().iter().map(|p| p.id).collect();
        let mut expected = ids.clone();
        expected.reverse();
        assert_eq!(loaded, expected);
    }

    // --- Mirror exactness ---

    #[test]
    fn test_mirror_matches_store_after_operations() {
        let mut gw = test_gateway();
        let a = gw.create_pin(1.0, 1.0, Some("a")).unwrap();
        let b = gw.create_pin(2.0, 2.0, Some("b")).unwrap();
        gw.add_photo(a, "file:///1.jpg").unwrap();
        let p = gw.add_photo(b, "file:///2.jpg").unwrap();
        gw.delete_pin(a).unwrap();
        gw.delete_photo(p).unwrap();

        let mirror_pins: Vec<i64> = gw.pins().iter().map(|x| x.id).collect();
        let mirror_photos: Vec<i64> = gw.photos().iter().map(|x| x.id).collect();
        gw.reload().unwrap();
        let store_pins: Vec<i64> = gw.pins().iter().map(|x| x.id).collect();
        let store_photos: Vec<i64> = gw.photos().iter().map(|x| x.id).collect();

        assert_eq!(mirror_pins, store_pins);
        assert_eq!(mirror_photos, store_photos);
    }

    #[test]
    fn test_photos_for_filters_by_pin() {
        let mut gw = test_gateway();
        let a = gw.create_pin(1.0, 1.0, None).unwrap();
        let b = gw.create_pin(2.0, 2.0, None).unwrap();
        gw.add_photo(a, "file:///a1.jpg").unwrap();
        gw.add_photo(b, "file:///b1.jpg").unwrap();
        gw.add_photo(a, "file:///a2.jpg").unwrap();

        let for_a = gw.photos_for(a);
        assert_eq!(for_a.len(), 2);
        assert!(for_a.iter().all(|p| p.pin_id == a));
    }

    // --- Detached gateway ---

    #[test]
    fn test_detached_renders_empty() {
        let gw = StoreGateway::detached();
        assert!(!gw.is_ready());
        assert!(gw.pins().is_empty());
        assert!(gw.photos().is_empty());
    }

    #[test]
    fn test_detached_rejects_mutations() {
        let mut gw = StoreGateway::detached();
        assert!(matches!(
            gw.create_pin(1.0, 1.0, None),
            Err(PinError::Uninitialized)
        ));
        assert!(matches!(
            gw.add_photo(1, "file:///x.jpg"),
            Err(PinError::Uninitialized)
        ));
        assert!(matches!(gw.delete_pin(1), Err(PinError::Uninitialized)));
        assert!(matches!(gw.delete_photo(1), Err(PinError::Uninitialized)));
        assert!(matches!(gw.stats(), Err(PinError::Uninitialized)));
    }
}
