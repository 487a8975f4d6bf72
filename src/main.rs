mod manager;

use crate::manager::ManagerPlugin;
use bevy::app::ScheduleRunnerPlugin;
use bevy::log::{BoxedLayer, Level, LogPlugin};
use bevy::prelude::*;
use chrono::Utc;
use dotenvy::dotenv;
use miner_core::configuration::{MiningConfig, MINING_CONFIG_PATH};
use miner_core::world::block::BlockRegistry;
use miner_world::terrain::SimulationConfig;
use std::env;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::Layer;

/// Frame interval of the headless runner.
const TICK: Duration = Duration::from_millis(20);

/// Directory with additional block definitions (`*.json`).
const BLOCKS_PATH: &str = "config/blocks";

/// Application entry point.
/// Initializes logging, loads configuration, creates the Bevy app, and runs one mining job.
fn main() -> AppExit {
    let mut app = App::new();
    miner_app(&mut app).run()
}

/// Sets up the headless application, inserting configuration and plugins.
///
/// # Parameters
/// - `app`: Mutable reference to the Bevy [`App`] instance.
///
/// # Returns
/// A mutable reference to the configured [`App`] instance.
///
/// # Behavior
/// - Installs the runner and the logger first so configuration warnings reach the log file.
/// - Reads [`MiningConfig`] and the `[simulation]` section from [`MINING_CONFIG_PATH`].
/// - Extends the built-in blocks with the definitions found in [`BLOCKS_PATH`].
/// - Adds the [`ManagerPlugin`] which sends the configured selection and exits once it is reported.
fn miner_app(app: &mut App) -> &mut App {
    init_bevy_app(app);

    let mining = MiningConfig::load_or_default(MINING_CONFIG_PATH);
    let simulation = SimulationConfig::load_or_default(MINING_CONFIG_PATH);
    let registry = BlockRegistry::load_from_dir(BLOCKS_PATH).unwrap_or_else(|e| {
        warn!("Using built-in blocks only, failed to load {}: {}", BLOCKS_PATH, e);
        BlockRegistry::default()
    });
    info!("Pattern {:?}, direction {:?}, excavation {}", mining.pattern, mining.direction, mining.excavation_enabled);

    app.insert_resource(mining)
        .insert_resource(simulation)
        .insert_resource(registry)
        .add_plugins(ManagerPlugin)
}

/// Initializes the minimal Bevy plugins and logging settings.
fn init_bevy_app(app: &mut App) -> &mut App {
    app.add_plugins((
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(TICK)),
        LogPlugin {
            level: Level::DEBUG,
            filter: load_log_env_filter(),
            custom_layer: log_file_appender,
            ..default()
        },
    ))
}

/// Initializes a log file appender for the application.
///
/// Creates the `logs` directory if it does not exist and appends to a file named
/// `miner-DD-MM-YYYY.log`.
///
/// # Returns
/// - `Some(BoxedLayer)`: If the log file was successfully created and opened.
/// - `None`: If there was an error creating the log directory or opening the file.
fn log_file_appender(_app: &mut App) -> Option<BoxedLayer> {
    let log_dir = PathBuf::from("logs");
    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Failed to create log directory: {}", e);
        return None;
    }

    let timestamp = Utc::now().format("miner-%d-%m-%Y.log").to_string();
    let log_path = log_dir.join(timestamp);

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .ok()?;

    let file_arc = Arc::new(Mutex::new(file));

    let _start_marker = StartLogText {
        file: Arc::clone(&file_arc),
    };

    let writer = BoxMakeWriter::new(move || {
        let file = file_arc.lock().unwrap_or_else(PoisonError::into_inner);
        match file.try_clone() {
            Ok(handle) => Box::new(handle) as Box<dyn Write + Send>,
            Err(_) => Box::new(std::io::sink()) as Box<dyn Write + Send>,
        }
    });

    Some(Box::new(tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(writer)
        .boxed()
    ))
}

/// Loads the `LOG_ENV_FILTER` environment variable from a `.env` file and returns it as a `String`.
///
/// If the `LOG_ENV_FILTER` variable is not set, it defaults to `"error"`.
fn load_log_env_filter() -> String {
    dotenv().ok();
    env::var("LOG_ENV_FILTER").unwrap_or_else(|_| "error".to_string())
}

/// Writes a separator into the log file when dropped, marking the start of a run.
struct StartLogText {
    file: Arc<Mutex<File>>,
}

impl Drop for StartLogText {
    fn drop(&mut self) {
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = writeln!(
            file,
            "\n====================================== [ Start ] ======================================\n"
        );
        let _ = file.flush();
    }
}

// =================================================================================================
//
//                                            Unit Tests
//
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_load_log_env_filter_from_env() {
        unsafe { env::set_var("LOG_ENV_FILTER", "miner_logic=trace"); }
        let value = load_log_env_filter();
        assert_eq!(value, "miner_logic=trace");
        unsafe { env::remove_var("LOG_ENV_FILTER"); }
    }
}
