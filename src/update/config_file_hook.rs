use std::path::{Path, PathBuf};

use log::{info, warn};

use super::{PersistOutcome, PersistenceHook};
use crate::config::RouterConfig;
use crate::name::Name;
use crate::name_prefix_list::PrefixCost;

/// Keeps the `advertising` list of the router's configuration file in step
/// with saved advertise/withdraw commands.
#[derive(Debug, Clone)]
pub struct ConfigFileHook {
    path: PathBuf,
}

impl ConfigFileHook {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn rewrite(&self, edit: impl FnOnce(&mut RouterConfig) -> bool) -> anyhow::Result<bool> {
        let mut config = RouterConfig::load(&self.path)?;
        let changed = edit(&mut config);
        if changed {
            config.save(&self.path)?;
        }
        Ok(changed)
    }

    fn outcome(&self, action: &str, result: anyhow::Result<bool>) -> PersistOutcome {
        match result {
            Ok(changed) => {
                info!(
                    "{} {} (file {})",
                    action,
                    self.path.display(),
                    if changed { "updated" } else { "unchanged" }
                );
                PersistOutcome::Success
            }
            Err(e) => {
                warn!("{} {} failed: {:#}", action, self.path.display(), e);
                PersistOutcome::Failure
            }
        }
    }
}

impl PersistenceHook for ConfigFileHook {
    fn after_advertise(&mut self, prefix: &PrefixCost) -> PersistOutcome {
        let result = self.rewrite(|config| config.add_advertised(prefix));
        self.outcome("Saving prefix to", result)
    }

    fn after_withdraw(&mut self, prefix: &Name) -> PersistOutcome {
        let result = self.rewrite(|config| config.remove_advertised(prefix));
        self.outcome("Removing prefix from", result)
    }
}
