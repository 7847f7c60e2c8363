// Copyright (C) 2025 the motorpool authors. This program is free software:
// you can redistribute it and/or modify it under the terms of the GNU General
// Public License as published by the Free Software Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use clap::Parser;
use eyre::{bail, eyre, Report};
use fs2::FileExt;
use signal_hook::consts::{SIGINT, SIGTERM};
use tracing::{error, info};

use crate::args::Args;
use motorpool_daemon::rental::{InMemoryRentalStore, VehicleSeed};
use motorpool_daemon::rpc::{RentalMessageHandler, RpcTransport, SessionGuardConfig};
use motorpool_daemon::sessions::{FjallSessionStore, InMemorySessionStore, SessionStore};

mod args;

const BANNER_MSG: &str = r#"                  _                              _
  _ __ ___   ___ | |_ ___  _ __ _ __   ___   ___ | |
 | '_ ` _ \ / _ \| __/ _ \| '__| '_ \ / _ \ / _ \| |
 | | | | | | (_) | || (_) | |  | |_) | (_) | (_) | |
 |_| |_| |_|\___/ \__\___/|_|  | .__/ \___/ \___/|_|
                               |_|                  "#;

/// How often the background sweep looks for fully-idle sessions.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Acquire an exclusive lock on the data directory to prevent multiple daemon
/// instances from operating on the same data.
fn acquire_data_directory_lock(data_dir: &PathBuf) -> Result<File, Report> {
    std::fs::create_dir_all(data_dir)?;

    let lock_file_path = data_dir.join(".motorpool-daemon.lock");
    let lock_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&lock_file_path)?;

    match lock_file.try_lock_exclusive() {
        Ok(()) => {
            info!("Acquired exclusive lock on data directory: {:?}", data_dir);
            Ok(lock_file)
        }
        Err(e) => {
            error!(
                "Failed to acquire lock on data directory {:?}. Another motorpool-daemon instance may already be running in this directory.",
                data_dir
            );
            bail!("Directory lock acquisition failed: {}", e);
        }
    }
}

/// A handful of listings so a fresh daemon has something to serve.
fn seed_demo_catalog(rental: &InMemoryRentalStore) {
    let suv = rental.add_category("SUV");
    let sedan = rental.add_category("sedan");
    rental.add_vehicle(VehicleSeed {
        company_id: 1,
        location: "12 Depot Road".to_string(),
        header: "Comfortable family SUV".to_string(),
        brand: "Kia Sportage".to_string(),
        category_id: suv.id,
        license_category: "B".to_string(),
        year: 2021,
        power: 150,
        price: 120,
        percent: 10.0,
        fixed_rate: 5.0,
        ..Default::default()
    });
    rental.add_vehicle(VehicleSeed {
        company_id: 1,
        location: "12 Depot Road".to_string(),
        header: "City sedan, low mileage".to_string(),
        brand: "Skoda Octavia".to_string(),
        category_id: sedan.id,
        license_category: "B".to_string(),
        year: 2019,
        power: 110,
        price: 80,
        percent: 12.0,
        fixed_rate: 3.0,
        ..Default::default()
    });
    info!("Seeded demo catalog");
}

/// Host for the motorpool runtime.
///   * Opens the session store and discards sessions from a prior run
///   * Stands up the dispatcher behind the session and fault guards
///   * Runs the request loop for the process lifetime
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let args = Args::parse();
    eprintln!("Initializing...\n{BANNER_MSG}");

    let main_subscriber = tracing_subscriber::fmt()
        .compact()
        .with_ansi(true)
        .with_thread_names(true)
        .with_max_level(if args.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .finish();
    tracing::subscriber::set_global_default(main_subscriber)
        .expect("Unable to set configure logging");

    let config = args.load_config()?;

    let _data_dir_lock = acquire_data_directory_lock(&args.data_dir)?;

    let kill_switch = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(SIGINT, kill_switch.clone())?;
    signal_hook::flag::register(SIGTERM, kill_switch.clone())?;

    // Bootstrap preconditions: an unopenable session store is fatal, there is
    // no degraded mode to run in.
    let sessions: Arc<dyn SessionStore> = if args.ephemeral_sessions {
        info!("Using ephemeral in-memory session store");
        Arc::new(InMemorySessionStore::new())
    } else {
        let path = args.resolved_sessions_db_path();
        let store = FjallSessionStore::open(&path)
            .map_err(|e| eyre!("Unable to open sessions database at {:?}: {}", path, e))?;
        info!("Opened sessions database at {:?}", path);
        Arc::new(store)
    };

    let discarded = sessions
        .clear_all()
        .map_err(|e| eyre!("Unable to clear stale sessions: {}", e))?;
    if discarded > 0 {
        info!("Discarded {discarded} stale sessions from a previous run");
    }

    let rental = Arc::new(InMemoryRentalStore::new());
    if args.seed_demo {
        seed_demo_catalog(&rental);
    }

    let guard_config = SessionGuardConfig {
        ttl: Duration::from_secs(config.session_ttl_seconds),
        ttl_refresh: Duration::from_secs(config.session_ttl_refresh_seconds),
    };
    let message_handler = Arc::new(RentalMessageHandler::new(
        sessions.clone(),
        guard_config,
        rental,
        config.password_salt.clone(),
    ));

    // Reclaim fully-idle sessions in the background; the guard already
    // reclaims lazily on access, this catches tokens nobody presents again.
    let sweep_sessions = sessions.clone();
    let sweep_kill_switch = kill_switch.clone();
    let sweep_ttl = guard_config.ttl;
    std::thread::Builder::new()
        .name("motorpool-session-sweep".to_string())
        .spawn(move || loop {
            std::thread::sleep(SESSION_SWEEP_INTERVAL);
            if sweep_kill_switch.load(Ordering::Relaxed) {
                return;
            }
            match sweep_sessions.sweep_expired(sweep_ttl, SystemTime::now()) {
                Ok(0) => {}
                Ok(swept) => info!("Swept {swept} expired sessions"),
                Err(e) => error!(error = ?e, "Session sweep failed"),
            }
        })?;

    let zmq_context = zmq::Context::new();
    zmq_context
        .set_io_threads(config.num_io_threads)
        .map_err(|e| eyre!("Unable to configure ZMQ IO threads: {}", e))?;

    let transport = RpcTransport::new(zmq_context, kill_switch.clone(), &config.replies_listen)?;
    transport.start_request_loop(
        config.requests_listen.clone(),
        config.workers_num,
        message_handler,
    )?;

    info!("Done.");
    Ok(())
}
