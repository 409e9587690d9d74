use log::info;

use super::{ControlResponse, NoPersistence, PersistOutcome, PersistenceHook, PrefixRequest};
use crate::lsdb::LsaInstaller;
use crate::name_prefix_list::{NamePrefixList, PrefixCost};

/// Applies advertise and withdraw commands to the local prefix list.
///
/// Any change to the list rebuilds the router's own Name LSA before the
/// response is returned. A failed save is reported with 406 but the
/// change in memory stays.
pub struct CommandProcessor<I, H = NoPersistence> {
    npl: NamePrefixList,
    installer: I,
    hook: H,
}

impl<I: LsaInstaller> CommandProcessor<I> {
    pub fn new(npl: NamePrefixList, installer: I) -> Self {
        Self::with_hook(npl, installer, NoPersistence)
    }
}

impl<I: LsaInstaller, H: PersistenceHook> CommandProcessor<I, H> {
    pub fn with_hook(npl: NamePrefixList, installer: I, hook: H) -> Self {
        Self { npl, installer, hook }
    }

    pub fn advertise(&mut self, request: PrefixRequest) -> ControlResponse {
        let prefix = PrefixCost::new(request.name.clone(), request.cost.unwrap_or(0));

        let inserted = self.npl.insert_pair(prefix.clone());
        if inserted {
            info!("Advertising name: {}", prefix);
            self.installer.build_and_install_own_name_lsa(&self.npl);
        }

        let persisted = if request.wants_persistence() {
            if inserted {
                info!("Saving name to the configuration file");
            } else {
                info!("Saving an already advertised name: {}", prefix.name);
            }
            self.hook.after_advertise(&prefix)
        } else {
            PersistOutcome::NotApplicable
        };

        let (code, text) = status(
            inserted,
            persisted,
            "Prefix is already advertised/inserted.",
            "Prefix is already Saved/Failed to open configuration file.",
        );
        ControlResponse::new(code, text, request)
    }

    pub fn withdraw(&mut self, request: PrefixRequest) -> ControlResponse {
        let removed = self.npl.erase(&request.name);
        if removed {
            info!("Withdrawing/Removing name: {}", request.name);
            self.installer.build_and_install_own_name_lsa(&self.npl);
        }

        let persisted = if request.wants_persistence() {
            if !removed {
                info!("Deleting an already withdrawn name: {}", request.name);
            }
            self.hook.after_withdraw(&request.name)
        } else {
            PersistOutcome::NotApplicable
        };

        let (code, text) = status(
            removed,
            persisted,
            "Prefix is already withdrawn/removed.",
            "Prefix is already deleted/Failed to open configuration file.",
        );
        ControlResponse::new(code, text, request)
    }

    pub fn npl(&self) -> &NamePrefixList {
        &self.npl
    }

    pub fn installer(&self) -> &I {
        &self.installer
    }

    pub fn installer_mut(&mut self) -> &mut I {
        &mut self.installer
    }

    pub fn hook(&self) -> &H {
        &self.hook
    }
}

fn status(
    changed: bool,
    persisted: PersistOutcome,
    unchanged_text: &'static str,
    unchanged_failure_text: &'static str,
) -> (u16, &'static str) {
    match (changed, persisted) {
        (_, PersistOutcome::Success) => (205, "OK"),
        (true, PersistOutcome::Failure) => (406, "Failed to open configuration file."),
        (true, PersistOutcome::NotApplicable) => (200, "OK"),
        (false, PersistOutcome::Failure) => (406, unchanged_failure_text),
        (false, PersistOutcome::NotApplicable) => (204, unchanged_text),
    }
}
