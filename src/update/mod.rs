//! Operator-facing prefix advertisement commands.

pub mod command_processor;
pub mod config_file_hook;

pub use command_processor::CommandProcessor;
pub use config_file_hook::ConfigFileHook;

use serde::{Deserialize, Serialize};

use crate::name::Name;
use crate::name_prefix_list::PrefixCost;

/// Flag value asking for the change to be saved to the configuration file.
pub const PREFIX_FLAG: u64 = 1;

/// Parameters of an advertise or withdraw command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixRequest {
    pub name: Name,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
}

impl PrefixRequest {
    pub fn new(name: Name) -> Self {
        Self { name, cost: None, flags: None }
    }

    pub fn with_cost(mut self, cost: u64) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn persistent(mut self) -> Self {
        self.flags = Some(PREFIX_FLAG);
        self
    }

    pub fn wants_persistence(&self) -> bool {
        self.flags == Some(PREFIX_FLAG)
    }
}

/// Outcome of a command. `body` echoes the request it answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlResponse {
    pub code: u16,
    pub text: String,
    pub body: PrefixRequest,
}

impl ControlResponse {
    pub fn new(code: u16, text: impl Into<String>, body: PrefixRequest) -> Self {
        Self { code, text: text.into(), body }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    Success,
    Failure,
    NotApplicable,
}

/// Saves advertised prefixes somewhere durable. Both methods default to
/// `NotApplicable`, which is answered as if persistence was never asked for.
pub trait PersistenceHook {
    fn after_advertise(&mut self, _prefix: &PrefixCost) -> PersistOutcome {
        PersistOutcome::NotApplicable
    }

    fn after_withdraw(&mut self, _prefix: &Name) -> PersistOutcome {
        PersistOutcome::NotApplicable
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoPersistence;

impl PersistenceHook for NoPersistence {}
