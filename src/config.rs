use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::name::Name;
use crate::name_prefix_list::{NamePrefixList, PrefixCost};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterConfig {
    pub network: Name,
    pub site: Name,
    pub router: Name,
    #[serde(default = "default_lsa_refresh_time")]
    pub lsa_refresh_time: u64, // seconds
    #[serde(default = "default_control_port")]
    pub control_port: u16,
    #[serde(default)]
    pub advertising: Vec<AdvertisedPrefix>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvertisedPrefix {
    pub name: Name,
    #[serde(default)]
    pub cost: u64,
}

fn default_lsa_refresh_time() -> u64 {
    1800
}

fn default_control_port() -> u16 {
    6363
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            network: Name::new(),
            site: Name::new(),
            router: Name::new(),
            lsa_refresh_time: default_lsa_refresh_time(),
            control_port: default_control_port(),
            advertising: vec![],
        }
    }
}

impl RouterConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading configuration {}", path.display()))?;
        let config: RouterConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing configuration {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Full name of this router: network, site and router joined.
    pub fn router_prefix(&self) -> Name {
        self.network.join(&self.site).join(&self.router)
    }

    pub fn lsa_lifetime(&self) -> Duration {
        Duration::from_secs(self.lsa_refresh_time)
    }

    pub fn prefix_list(&self) -> NamePrefixList {
        self.advertising
            .iter()
            .map(|prefix| PrefixCost::new(prefix.name.clone(), prefix.cost))
            .collect()
    }

    /// Returns false if the prefix was already listed.
    pub fn add_advertised(&mut self, prefix: &PrefixCost) -> bool {
        let entry = AdvertisedPrefix { name: prefix.name.clone(), cost: prefix.cost };
        if self.advertising.contains(&entry) {
            return false;
        }
        self.advertising.push(entry);
        true
    }

    /// Drop every listed cost for `name`. Returns false if none was listed.
    pub fn remove_advertised(&mut self, name: &Name) -> bool {
        let before = self.advertising.len();
        self.advertising.retain(|prefix| &prefix.name != name);
        self.advertising.len() != before
    }
}
