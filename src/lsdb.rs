//! In-memory link-state database.
//!
//! Holds the newest advertisement of every kind from every router, merges
//! newer versions into the stored copy and publishes what changed for
//! route computation and distribution to pick up.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use tokio::sync::broadcast;

use crate::lsa::{AdjLsa, CoordinateLsa, Lsa, LsaError, NameLsa};
use crate::name::Name;
use crate::name_prefix_list::{NamePrefixList, PrefixCost};

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum LsdbEvent {
    NamesAdded {
        origin: Name,
        names: Vec<PrefixCost>,
    },
    NamesUpdated {
        origin: Name,
        added: Vec<PrefixCost>,
        removed: Vec<PrefixCost>,
    },
    AdjacenciesChanged {
        origin: Name,
    },
    CoordinatesChanged {
        origin: Name,
    },
    /// This router's Name LSA was rebuilt and is ready to be distributed.
    OwnLsaBuilt {
        seq_no: u64,
        wire: Bytes,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    New,
    Updated { changed: bool },
    Stale,
}

/// Rebuilds and installs the local router's Name LSA.
pub trait LsaInstaller {
    fn build_and_install_own_name_lsa(&mut self, npl: &NamePrefixList);
}

pub struct Lsdb {
    own_router: Name,
    lsa_lifetime: Duration,
    own_name_seq_no: u64,
    name_lsas: BTreeMap<Name, NameLsa>,
    adj_lsas: BTreeMap<Name, AdjLsa>,
    coordinate_lsas: BTreeMap<Name, CoordinateLsa>,
    events: broadcast::Sender<LsdbEvent>,
}

impl Lsdb {
    pub fn new(own_router: Name, lsa_lifetime: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            own_router,
            lsa_lifetime,
            own_name_seq_no: 0,
            name_lsas: BTreeMap::new(),
            adj_lsas: BTreeMap::new(),
            coordinate_lsas: BTreeMap::new(),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LsdbEvent> {
        self.events.subscribe()
    }

    pub fn own_router(&self) -> &Name {
        &self.own_router
    }

    /// Decode and install an advertisement received from the network.
    /// Malformed data is rejected whole and leaves the database untouched.
    pub fn receive(&mut self, wire: Bytes) -> Result<InstallOutcome, LsaError> {
        let lsa = Lsa::from_wire(wire).map_err(|e| {
            warn!("Dropping malformed LSA: {}", e);
            e
        })?;
        Ok(self.install_lsa(lsa))
    }

    pub fn install_lsa(&mut self, lsa: Lsa) -> InstallOutcome {
        match lsa {
            Lsa::Name(lsa) => self.install_name_lsa(lsa),
            Lsa::Adjacency(lsa) => self.install_adj_lsa(lsa),
            Lsa::Coordinate(lsa) => self.install_coordinate_lsa(lsa),
        }
    }

    fn install_name_lsa(&mut self, lsa: NameLsa) -> InstallOutcome {
        let origin = lsa.origin().clone();
        let Some(stored) = self.name_lsas.get_mut(&origin) else {
            info!("Adding name LSA from {} (seq {})", origin, lsa.seq_no());
            let names = lsa.npl().iter().cloned().collect();
            self.name_lsas.insert(origin.clone(), lsa);
            self.publish(LsdbEvent::NamesAdded { origin, names });
            return InstallOutcome::New;
        };

        if lsa.seq_no() <= stored.seq_no() {
            debug!(
                "Ignoring name LSA from {}: seq {} is not newer than {}",
                origin,
                lsa.seq_no(),
                stored.seq_no()
            );
            return InstallOutcome::Stale;
        }

        let update = stored.update(&lsa);
        stored.set_base(lsa.seq_no(), lsa.expiration());
        debug!(
            "Updated name LSA from {} to seq {}: {} added, {} removed",
            origin,
            lsa.seq_no(),
            update.added.len(),
            update.removed.len()
        );
        if update.changed {
            self.publish(LsdbEvent::NamesUpdated {
                origin,
                added: update.added,
                removed: update.removed,
            });
        }
        InstallOutcome::Updated { changed: update.changed }
    }

    fn install_adj_lsa(&mut self, lsa: AdjLsa) -> InstallOutcome {
        let origin = lsa.base().origin.clone();
        let Some(stored) = self.adj_lsas.get_mut(&origin) else {
            info!("Adding adjacency LSA from {} (seq {})", origin, lsa.base().seq_no);
            self.adj_lsas.insert(origin.clone(), lsa);
            self.publish(LsdbEvent::AdjacenciesChanged { origin });
            return InstallOutcome::New;
        };

        if lsa.base().seq_no <= stored.base().seq_no {
            return InstallOutcome::Stale;
        }
        let changed = stored.update(&lsa);
        stored.set_base(lsa.base().seq_no, lsa.base().expiration);
        if changed {
            self.publish(LsdbEvent::AdjacenciesChanged { origin });
        }
        InstallOutcome::Updated { changed }
    }

    fn install_coordinate_lsa(&mut self, lsa: CoordinateLsa) -> InstallOutcome {
        let origin = lsa.base().origin.clone();
        let Some(stored) = self.coordinate_lsas.get_mut(&origin) else {
            info!("Adding coordinate LSA from {} (seq {})", origin, lsa.base().seq_no);
            self.coordinate_lsas.insert(origin.clone(), lsa);
            self.publish(LsdbEvent::CoordinatesChanged { origin });
            return InstallOutcome::New;
        };

        if lsa.base().seq_no <= stored.base().seq_no {
            return InstallOutcome::Stale;
        }
        let changed = stored.update(&lsa);
        stored.set_base(lsa.base().seq_no, lsa.base().expiration);
        if changed {
            self.publish(LsdbEvent::CoordinatesChanged { origin });
        }
        InstallOutcome::Updated { changed }
    }

    pub fn find_name_lsa(&self, origin: &Name) -> Option<&NameLsa> {
        self.name_lsas.get(origin)
    }

    pub fn find_adj_lsa(&self, origin: &Name) -> Option<&AdjLsa> {
        self.adj_lsas.get(origin)
    }

    pub fn find_coordinate_lsa(&self, origin: &Name) -> Option<&CoordinateLsa> {
        self.coordinate_lsas.get(origin)
    }

    pub fn own_name_lsa(&self) -> Option<&NameLsa> {
        self.name_lsas.get(&self.own_router)
    }

    /// Wire form of a stored Name LSA, regenerated only if it changed since
    /// it was last encoded.
    pub fn name_lsa_wire(&mut self, origin: &Name) -> Option<Bytes> {
        self.name_lsas.get_mut(origin).map(NameLsa::wire_encode)
    }

    pub fn len(&self) -> usize {
        self.name_lsas.len() + self.adj_lsas.len() + self.coordinate_lsas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn expiration_point(&self) -> DateTime<Utc> {
        let now = Utc::now();
        chrono::Duration::from_std(self.lsa_lifetime)
            .ok()
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .unwrap_or(now)
    }

    /// Sends `event` to current subscribers, if any.
    fn publish(&self, event: LsdbEvent) {
        let _ = self.events.send(event);
    }
}

impl LsaInstaller for Lsdb {
    fn build_and_install_own_name_lsa(&mut self, npl: &NamePrefixList) {
        // A copy received from an earlier run may carry a higher number.
        let stored_seq_no = self.own_name_lsa().map_or(0, NameLsa::seq_no);
        self.own_name_seq_no = self.own_name_seq_no.max(stored_seq_no) + 1;
        let seq_no = self.own_name_seq_no;
        let mut lsa = NameLsa::new(self.own_router.clone(), seq_no, self.expiration_point(), npl);
        let wire = lsa.wire_encode();

        info!(
            "Built own name LSA (seq {}, {} prefixes, {} bytes)",
            seq_no,
            npl.len(),
            wire.len()
        );
        if self.install_name_lsa(lsa) == InstallOutcome::Stale {
            warn!("Own name LSA seq {} was not installed", seq_no);
            return;
        }
        self.publish(LsdbEvent::OwnLsaBuilt { seq_no, wire });
    }
}

impl fmt::Display for Lsdb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for lsa in self.name_lsas.values() {
            writeln!(f, "LSA of type NAME:")?;
            write!(f, "{}", lsa)?;
        }
        for lsa in self.adj_lsas.values() {
            writeln!(f, "LSA of type ADJACENCY:")?;
            write!(f, "{}", lsa)?;
        }
        for lsa in self.coordinate_lsas.values() {
            writeln!(f, "LSA of type COORDINATE:")?;
            write!(f, "{}", lsa)?;
        }
        Ok(())
    }
}
