use std::process;

use clap::{Parser, Subcommand};
use serde::Serialize;

use pinmap::config::AppPaths;
use pinmap::errors::PinError;
use pinmap::gateway::StoreGateway;
use pinmap::logging;
use pinmap::storage::models::Pin;

#[derive(Parser)]
#[command(name = "pinmap", version, about = "A local map-pin manager")]
struct Cli {
    /// Output results as JSON
    #[arg(short = 'j', long = "json", global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Place a pin at the given coordinates
    Add {
        /// Latitude in decimal degrees
        latitude: f64,

        /// Longitude in decimal degrees
        longitude: f64,

        /// Pin title (defaults to a positional label)
        #[arg(short, long)]
        title: Option<String>,
    },

    /// List pins, newest first
    List,

    /// Show a pin with its attached photos
    Show {
        /// Pin ID
        id: i64,
    },

    /// Delete a pin and all its photos
    Delete {
        /// Pin ID
        id: i64,
    },

    /// Manage photo attachments
    Photo {
        #[command(subcommand)]
        action: PhotoAction,
    },

    /// Show store statistics
    Stats,

    /// Interactive TUI
    Tui,
}

#[derive(Subcommand)]
enum PhotoAction {
    /// Attach a photo reference to a pin
    Add {
        /// Pin ID
        pin_id: i64,

        /// Photo URI (path or URL; the image itself is never stored)
        uri: String,
    },

    /// Remove a photo attachment
    Rm {
        /// Photo ID
        id: i64,
    },

    /// List photos, optionally for one pin
    List {
        /// Pin ID
        pin_id: Option<i64>,
    },
}

#[derive(Serialize)]
struct StatusResponse {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
}

fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if !matches!(cli.command, Some(Commands::Tui)) {
        logging::init_stderr();
    }

    if let Err(e) = run(cli) {
        if json {
            eprintln!("{}", serde_json::json!({"error": e.to_string()}));
        } else {
            eprintln!("error: {}", e);
        }
        process::exit(1);
    }
}

fn run(cli: Cli) -> pinmap::errors::Result<()> {
    let paths = AppPaths::new();
    let json = cli.json;

    match cli.command {
        None | Some(Commands::List) => cmd_list(&paths, json),
        Some(Commands::Add {
            latitude,
            longitude,
            title,
        }) => cmd_add(&paths, latitude, longitude, title.as_deref(), json),
        Some(Commands::Show { id }) => cmd_show(&paths, id, json),
        Some(Commands::Delete { id }) => cmd_delete(&paths, id, json),
        Some(Commands::Photo { action }) => match action {
            PhotoAction::Add { pin_id, uri } => cmd_photo_add(&paths, pin_id, &uri, json),
            PhotoAction::Rm { id } => cmd_photo_rm(&paths, id, json),
            PhotoAction::List { pin_id } => cmd_photo_list(&paths, pin_id, json),
        },
        Some(Commands::Stats) => cmd_stats(&paths, json),
        Some(Commands::Tui) => {
            logging::init_file(&paths.log_file)?;
            pinmap::tui::run(&paths)
        }
    }
}

fn print_status(status: &StatusResponse, json: bool) {
    if json {
        println!("{}", serde_json::json!(status));
    } else {
        println!("{}", status.message);
    }
}

fn cmd_add(
    paths: &AppPaths,
    latitude: f64,
    longitude: f64,
    title: Option<&str>,
    json: bool,
) -> pinmap::errors::Result<()> {
    let mut gateway = StoreGateway::open(paths)?;
    let id = gateway.create_pin(latitude, longitude, title)?;
    let pin = gateway
        .pin(id)
        .ok_or_else(|| PinError::NotFound(format!("Pin {id} missing after insert")))?;
    print_status(
        &StatusResponse {
            success: true,
            message: format!(
                "Added pin #{} \"{}\" at {:.4}, {:.4}.",
                id, pin.title, pin.latitude, pin.longitude
            ),
            id: Some(id),
        },
        json,
    );
    Ok(())
}

fn cmd_list(paths: &AppPaths, json: bool) -> pinmap::errors::Result<()> {
    let gateway = StoreGateway::open(paths)?;

    if json {
        println!("{}", serde_json::json!(gateway.pins()));
        return Ok(());
    }

    if gateway.pins().is_empty() {
        println!("No pins yet.");
        return Ok(());
    }

    for pin in gateway.pins() {
        print_pin_row(pin, gateway.photos_for(pin.id).len());
    }
    Ok(())
}

fn cmd_show(paths: &AppPaths, id: i64, json: bool) -> pinmap::errors::Result<()> {
    let gateway = StoreGateway::open(paths)?;
    let pin = gateway
        .pin(id)
        .ok_or_else(|| PinError::NotFound(format!("Pin with id {id} not found")))?;
    let photos = gateway.photos_for(id);

    if json {
        println!(
            "{}",
            serde_json::json!({
                "pin": pin,
                "photos": photos,
            })
        );
        return Ok(());
    }

    println!("ID:       {}", pin.id);
    println!("Title:    {}", pin.title);
    println!("Position: {:.6}, {:.6}", pin.latitude, pin.longitude);
    println!("Created:  {}", pin.created_at.format("%Y-%m-%d %H:%M:%S"));
    if photos.is_empty() {
        println!("Photos:   none");
    } else {
        println!("Photos:");
        for photo in photos {
            println!(
                "  {:>4}  {}  {}",
                photo.id,
                photo.created_at.format("%Y-%m-%d %H:%M"),
                photo.uri
            );
        }
    }
    Ok(())
}

fn cmd_delete(paths: &AppPaths, id: i64, json: bool) -> pinmap::errors::Result<()> {
    let mut gateway = StoreGateway::open(paths)?;
    let existed = gateway.pin(id).is_some();
    gateway.delete_pin(id)?;
    let message = if existed {
        format!("Deleted pin #{id}.")
    } else {
        format!("Pin #{id} not found.")
    };
    print_status(
        &StatusResponse {
            success: existed,
            message,
            id: None,
        },
        json,
    );
    Ok(())
}

fn cmd_photo_add(paths: &AppPaths, pin_id: i64, uri: &str, json: bool) -> pinmap::errors::Result<()> {
    let mut gateway = StoreGateway::open(paths)?;
    let id = gateway.add_photo(pin_id, uri)?;
    print_status(
        &StatusResponse {
            success: true,
            message: format!("Attached photo #{id} to pin #{pin_id}."),
            id: Some(id),
        },
        json,
    );
    Ok(())
}

fn cmd_photo_rm(paths: &AppPaths, id: i64, json: bool) -> pinmap::errors::Result<()> {
    let mut gateway = StoreGateway::open(paths)?;
    let existed = gateway.photos().iter().any(|p| p.id == id);
    gateway.delete_photo(id)?;
    let message = if existed {
        format!("Removed photo #{id}.")
    } else {
        format!("Photo #{id} not found.")
    };
    print_status(
        &StatusResponse {
            success: existed,
            message,
            id: None,
        },
        json,
    );
    Ok(())
}

fn cmd_photo_list(paths: &AppPaths, pin_id: Option<i64>, json: bool) -> pinmap::errors::Result<()> {
    let gateway = StoreGateway::open(paths)?;
    let photos: Vec<_> = match pin_id {
        Some(pin_id) => gateway.photos_for(pin_id),
        None => gateway.photos().iter().collect(),
    };

    if json {
        println!("{}", serde_json::json!(photos));
        return Ok(());
    }

    if photos.is_empty() {
        println!("No photos found.");
        return Ok(());
    }

    for photo in photos {
        println!(
            "{:>4}  pin #{:<4}  {}  {}",
            photo.id,
            photo.pin_id,
            photo.created_at.format("%Y-%m-%d %H:%M"),
            photo.uri
        );
    }
    Ok(())
}

fn cmd_stats(paths: &AppPaths, json: bool) -> pinmap::errors::Result<()> {
    let gateway = StoreGateway::open(paths)?;
    let stats = gateway.stats()?;

    if json {
        println!("{}", serde_json::json!(stats));
        return Ok(());
    }

    println!("Pin Statistics");
    println!("──────────────");
    println!("Pins:    {}", stats.total_pins);
    println!("Photos:  {}", stats.total_photos);
    if let Some(oldest) = stats.oldest {
        println!("Oldest:  {}", oldest.format("%Y-%m-%d %H:%M"));
    }
    if let Some(newest) = stats.newest {
        println!("Newest:  {}", newest.format("%Y-%m-%d %H:%M"));
    }
    Ok(())
}

fn print_pin_row(pin: &Pin, photo_count: usize) {
    let photos = match photo_count {
        0 => String::new(),
        1 => " [1 photo]".to_string(),
        n => format!(" [{n} photos]"),
    };
    println!(
        "{:>4}  {:>9.4},{:>9.4}  {}  {}{}",
        pin.id,
        pin.latitude,
        pin.longitude,
        pin.created_at.format("%Y-%m-%d %H:%M"),
        pin.title,
        photos
    );
}
