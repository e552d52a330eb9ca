pub const CREATE_PINS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS pins (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        latitude REAL NOT NULL,
        longitude REAL NOT NULL,
        title TEXT,
        created_at TEXT NOT NULL
    )
";

pub const CREATE_PIN_PHOTOS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS pin_photos (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        pin_id INTEGER NOT NULL,
        uri TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
";

pub const CREATE_INDEX_PINS_CREATED_AT: &str =
    "CREATE INDEX IF NOT EXISTS idx_pins_created_at ON pins(created_at)";

pub const CREATE_INDEX_PHOTOS_PIN_ID: &str =
    "CREATE INDEX IF NOT EXISTS idx_pin_photos_pin_id ON pin_photos(pin_id)";
