//! Static reference data: the two-letter US state code lookup.
//!
//! The table is a flat JSON object (`{"CA": "California", ...}`) served as a
//! static file. It must load successfully before any data fetch begins; a
//! record that later references a code missing from it is a contract
//! violation (stale reference data), not a recoverable condition.

use std::collections::HashMap;

use reqwest::blocking::Client;

use crate::error::AppError;

const DEFAULT_URL: &str = "https://covidgraphs.com/us-states.json";

/// Two-letter region code → full region name.
#[derive(Debug, Clone)]
pub struct StateLookup {
    map: HashMap<String, String>,
}

impl StateLookup {
    /// Fetch the lookup table, honoring a `COVID_STATES_URL` override.
    pub fn fetch(client: &Client) -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let url = std::env::var("COVID_STATES_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());

        let resp = client
            .get(&url)
            .send()
            .map_err(|e| AppError::new(2, format!("Failed to fetch state lookup table: {e}")))?;
        if !resp.status().is_success() {
            return Err(AppError::new(
                2,
                format!("State lookup table request failed with status {}.", resp.status()),
            ));
        }
        let map: HashMap<String, String> = resp
            .json()
            .map_err(|e| AppError::new(2, format!("Invalid state lookup table JSON: {e}")))?;

        if map.is_empty() {
            return Err(AppError::new(2, "State lookup table is empty."));
        }

        Ok(Self { map })
    }

    /// Build a lookup from an in-memory map (tests, fixtures).
    pub fn from_map(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    /// Full name for a two-letter code, if known.
    pub fn resolve(&self, code: &str) -> Option<&str> {
        self.map.get(code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
