pub mod config;
pub mod control_server;
pub mod lsa;
pub mod lsdb;
pub mod name;
pub mod name_prefix_list;
pub mod tlv;
pub mod update;

use std::sync::Arc;
use tokio::sync::Mutex;

pub use lsa::{Lsa, LsaError, NameLsa, NameLsaUpdate};
pub use lsdb::{Lsdb, LsdbEvent, LsaInstaller};
pub use name::Name;
pub use name_prefix_list::{NamePrefixList, PrefixCost};
pub use update::{CommandProcessor, ControlResponse, PersistOutcome, PersistenceHook, PrefixRequest};

/// Command processor shared between control connections. The mutex makes
/// requests run one at a time.
pub type SharedProcessor<H> = Arc<Mutex<CommandProcessor<Lsdb, H>>>;
