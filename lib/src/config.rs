//! Process-wide configuration for an `LdEnv`: size ceilings, network timeout,
//! refetch throttling and the skip list.

use crate::options::SkipList;
use anyhow::Result;
use derive_builder::Builder;
use log::warn;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, Write};
use std::path::Path;
use std::time::Duration;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Builder)]
#[builder(default, setter(into), build_fn(validate = "Self::validate"))]
pub struct Config {
    // documents with more triples than this are fetched but not distributed
    pub graph_size_limit: usize,
    // single network timeout shared by every HTTP request
    pub timeout_secs: u64,
    pub user_agent: String,
    // minimum time between two fetches of the same document
    #[serde(default)]
    pub refetch_interval_secs: Option<u64>,
    // glob patterns of IRIs which are never fetched
    #[serde(default)]
    pub skip_urls: Vec<String>,
    // fetch owl:imports targets while distributing the importing document
    #[serde(default)]
    pub handle_imports: bool,
    // offline mode (HTTP transports refuse to fetch)
    #[serde(default)]
    pub offline: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            graph_size_limit: 30_000,
            timeout_secs: 30,
            user_agent: crate::consts::USER_AGENT.to_string(),
            refetch_interval_secs: None,
            skip_urls: Vec::new(),
            handle_imports: false,
            offline: false,
        }
    }
}

impl ConfigBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        if let Some(skip) = &self.skip_urls {
            SkipList::new(skip).map_err(|e| e.to_string())?;
        }
        if let Some(0) = self.timeout_secs {
            return Err("timeout_secs must be positive".to_string());
        }
        Ok(())
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn refetch_interval(&self) -> Option<chrono::Duration> {
        self.refetch_interval_secs
            .and_then(|secs| chrono::Duration::from_std(Duration::from_secs(secs)).ok())
    }

    pub fn skip_list(&self) -> SkipList {
        match SkipList::new(&self.skip_urls) {
            Ok(skip) => skip,
            Err(e) => {
                warn!("Ignoring invalid skip list: {}", e);
                SkipList::default()
            }
        }
    }

    pub fn save_to_file(&self, file: &Path) -> Result<()> {
        let config_str = serde_json::to_string_pretty(&self)?;
        let mut file = std::fs::File::create(file)?;
        file.write_all(config_str.as_bytes())?;
        Ok(())
    }

    pub fn from_file(file: &Path) -> Result<Self> {
        let file = std::fs::File::open(file)?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)?;
        SkipList::new(&config.skip_urls)?;
        Ok(config)
    }

    /// Prints out the current Config in a clear and readable way for command line output.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  Graph size limit: {}", self.graph_size_limit);
        println!("  Timeout: {}s", self.timeout_secs);
        println!("  User agent: {}", self.user_agent);
        match self.refetch_interval_secs {
            Some(secs) => println!("  Refetch interval: {}s", secs),
            None => println!("  Refetch interval: none"),
        }
        if !self.skip_urls.is_empty() {
            println!("  Skip:");
            for pat in &self.skip_urls {
                println!("    - {}", pat);
            }
        }
        println!("  Eager imports: {}", self.handle_imports);
        println!("  Offline: {}", self.offline);
    }
}
