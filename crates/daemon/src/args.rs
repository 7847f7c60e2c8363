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

use clap::builder::ValueHint;
use clap_derive::Parser;
use eyre::{bail, eyre};
use figment::providers::{Format as ProviderFormat, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use rpc_common::{DEFAULT_REPLIES_ENDPOINT, DEFAULT_REQUESTS_ENDPOINT};

#[derive(Parser, Debug)]
pub struct Args {
    #[arg(
        value_name = "data-dir",
        help = "Directory to store runtime state under",
        value_hint = ValueHint::DirPath,
        default_value = "./motorpool-data"
    )]
    pub data_dir: PathBuf,

    #[arg(
        long,
        value_name = "config",
        help = "Path to configuration (YAML) file to use, if any. If not specified, defaults are used.\
                Configuration file values can be overridden by command line arguments.",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[arg(
        long,
        value_name = "requests-listen",
        help = "Inbound request endpoint the daemon binds (the shared queue clients publish to)"
    )]
    pub requests_listen: Option<String>,

    #[arg(
        long,
        value_name = "replies-listen",
        help = "Reply publisher endpoint the daemon binds (clients subscribe their private reply topics here)"
    )]
    pub replies_listen: Option<String>,

    #[arg(
        long,
        value_name = "sessions-db",
        help = "Path to sessions database to use or create (relative to data-dir if not absolute)",
        value_hint = ValueHint::FilePath
    )]
    pub sessions_db: Option<PathBuf>,

    #[arg(
        long,
        help = "Keep sessions in memory only; they will not survive a restart",
        default_value = "false"
    )]
    pub ephemeral_sessions: bool,

    #[arg(
        long,
        value_name = "session-ttl",
        help = "Maximum session idle time in seconds before a token is reclaimed"
    )]
    pub session_ttl: Option<u64>,

    #[arg(
        long,
        value_name = "session-ttl-refresh",
        help = "Idle seconds past which an access refreshes the session timestamp; strictly less than session-ttl"
    )]
    pub session_ttl_refresh: Option<u64>,

    #[arg(
        long,
        value_name = "workers-num",
        help = "Number of request worker threads"
    )]
    pub workers_num: Option<usize>,

    #[arg(
        long,
        value_name = "num-io-threads",
        help = "Number of ZeroMQ IO threads to use"
    )]
    pub num_io_threads: Option<i32>,

    #[arg(
        long,
        value_name = "password-salt",
        help = "Salt mixed into account password digests"
    )]
    pub password_salt: Option<String>,

    #[arg(
        long,
        help = "Seed a small demo catalog at startup",
        default_value = "false"
    )]
    pub seed_demo: bool,

    #[arg(long, help = "Enable debug logging", default_value = "false")]
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub requests_listen: String,
    pub replies_listen: String,
    pub session_ttl_seconds: u64,
    pub session_ttl_refresh_seconds: u64,
    pub workers_num: usize,
    pub num_io_threads: i32,
    pub password_salt: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            requests_listen: DEFAULT_REQUESTS_ENDPOINT.to_string(),
            replies_listen: DEFAULT_REPLIES_ENDPOINT.to_string(),
            session_ttl_seconds: 900,
            session_ttl_refresh_seconds: 300,
            workers_num: 4,
            num_io_threads: 2,
            password_salt: "motorpool".to_string(),
        }
    }
}

impl Args {
    /// Load the configuration file if we have it, then merge the arguments
    /// over it.
    pub fn load_config(&self) -> Result<Config, eyre::Report> {
        let config_path = self.config_file.clone();
        let mut config = config_path
            .map(|config_path| {
                let f = Figment::new()
                    .merge(Serialized::defaults(Config::default()))
                    .merge(Yaml::file(config_path.clone()));

                f.extract::<Config>().map_err(|e| {
                    eyre!(
                        "Failed to parse configuration from {:?}: {}",
                        config_path,
                        e
                    )
                })
            })
            .unwrap_or_else(|| Ok(Config::default()))?;

        if let Some(requests_listen) = &self.requests_listen {
            config.requests_listen = requests_listen.clone();
        }
        if let Some(replies_listen) = &self.replies_listen {
            config.replies_listen = replies_listen.clone();
        }
        if let Some(session_ttl) = self.session_ttl {
            config.session_ttl_seconds = session_ttl;
        }
        if let Some(session_ttl_refresh) = self.session_ttl_refresh {
            config.session_ttl_refresh_seconds = session_ttl_refresh;
        }
        if let Some(workers_num) = self.workers_num {
            config.workers_num = workers_num;
        }
        if let Some(num_io_threads) = self.num_io_threads {
            config.num_io_threads = num_io_threads;
        }
        if let Some(password_salt) = &self.password_salt {
            config.password_salt = password_salt.clone();
        }

        if config.session_ttl_refresh_seconds >= config.session_ttl_seconds {
            bail!(
                "session-ttl-refresh ({}) must be strictly less than session-ttl ({})",
                config.session_ttl_refresh_seconds,
                config.session_ttl_seconds
            );
        }
        if config.workers_num == 0 {
            bail!("workers-num must be at least 1");
        }

        Ok(config)
    }

    /// Resolve the sessions database path relative to data_dir.
    pub fn resolved_sessions_db_path(&self) -> PathBuf {
        match &self.sessions_db {
            Some(path) => {
                if path.is_absolute() {
                    path.clone()
                } else {
                    self.data_dir.join(path)
                }
            }
            None => self.data_dir.join("sessions.db"),
        }
    }
}
