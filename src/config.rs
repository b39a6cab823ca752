//! Server configuration from environment variables.
//!
//! Controls the data directory, the fixed address set, the ledger and
//! exchange-rate endpoints and the report week start.

use std::env;
use std::path::PathBuf;

use crate::report::WeekStart;

#[derive(Clone, Debug)]
pub struct PosConfig {
    /// Base data directory; transaction logs live under `<dir>/txlog`.
    pub data_dir: PathBuf,
    /// Newline-separated receiving addresses, loaded once at startup.
    pub address_file: PathBuf,
    /// Esplora-style ledger API base URL.
    pub esplora_url: String,
    /// Exchange-rate API base URL.
    pub rate_url: String,
    /// First day of a report week.
    pub week_start: WeekStart,
}

impl PosConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `POS_DATA_DIR`: data directory (default "./pos-data")
    /// - `POS_ADDRESS_FILE`: address list file (default "./addresses.txt")
    /// - `ESPLORA_URL`: ledger API endpoint (default "http://localhost:3001")
    /// - `RATE_URL`: rate API endpoint (default CoinGecko)
    /// - `POS_WEEK_START`: "monday" (default) or "sunday"
    pub fn from_env() -> Self {
        let data_dir = PathBuf::from(
            env::var("POS_DATA_DIR").unwrap_or_else(|_| "./pos-data".to_string()),
        );
        let address_file = PathBuf::from(
            env::var("POS_ADDRESS_FILE").unwrap_or_else(|_| "./addresses.txt".to_string()),
        );

        let esplora_url = env::var("ESPLORA_URL").unwrap_or_else(|_| {
            log::info!("ESPLORA_URL not set, using http://localhost:3001 (ledger-mock)");
            "http://localhost:3001".to_string()
        });

        let rate_url = env::var("RATE_URL")
            .unwrap_or_else(|_| "https://api.coingecko.com/api/v3".to_string());

        let week_start = match env::var("POS_WEEK_START") {
            Ok(s) => WeekStart::parse(&s).unwrap_or_else(|| {
                log::warn!("Unknown week start '{}', defaulting to monday", s);
                WeekStart::Monday
            }),
            Err(_) => WeekStart::Monday,
        };

        log::info!("Data directory: {:?}", data_dir);
        log::info!("Ledger API: {}", esplora_url);
        log::info!("Rate API: {}", rate_url);

        Self {
            data_dir,
            address_file,
            esplora_url,
            rate_url,
            week_start,
        }
    }
}

impl Default for PosConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./pos-data"),
            address_file: PathBuf::from("./addresses.txt"),
            esplora_url: "http://localhost:3001".to_string(),
            rate_url: "https://api.coingecko.com/api/v3".to_string(),
            week_start: WeekStart::Monday,
        }
    }
}
