//! Shared application state: match registry, store handle, event channels,
//! capability registry, and the collaborator seams (clock, passcodes).

pub mod hub;
pub mod lifecycle;
pub mod session;

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    auth::{CapabilityRegistry, Permission},
    clock::{Clock, SystemClock},
    config::AppConfig,
    dao::{memory::MemoryStore, store::LeagueStore},
    passcode::{PasscodeSource, RandomPasscodes},
    state::{hub::MatchChannels, session::MatchSession},
};

/// Cheaply cloneable handle to the application state.
pub type SharedState = Arc<AppState>;

/// Handle to one match's serialized mutable state.
///
/// Every mutation of a match (roster change, transition, vote, submission)
/// goes through this lock, which is the single-writer-per-match discipline.
pub type MatchHandle = Arc<Mutex<MatchSession>>;

/// Central application state shared across routes, services and supervisors.
pub struct AppState {
    config: AppConfig,
    store: Arc<dyn LeagueStore>,
    clock: Arc<dyn Clock>,
    passcodes: Arc<dyn PasscodeSource>,
    matches: DashMap<Uuid, MatchHandle>,
    channels: MatchChannels,
    capabilities: CapabilityRegistry,
    // Passcodes of in-progress games; claimed before use so two lobbies can
    // never share a code.
    passcode_claims: DashMap<String, Uuid>,
    // Season activation is a multi-step check-and-toggle; this gate keeps the
    // "one active season per category" invariant under concurrent activations.
    season_gate: Mutex<()>,
    // Serializes incremental rating application and bulk replay so match
    // numbering and rating order always agree.
    rating_gate: Mutex<()>,
}

impl AppState {
    /// Construct the production state with the in-memory store, the system
    /// clock and random passcodes.
    pub fn new(config: AppConfig) -> SharedState {
        Self::with_parts(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(SystemClock),
            Arc::new(RandomPasscodes),
        )
    }

    /// Construct the state from explicit parts; the seam tests use to inject
    /// a manual clock or a scripted store.
    pub fn with_parts(
        config: AppConfig,
        store: Arc<dyn LeagueStore>,
        clock: Arc<dyn Clock>,
        passcodes: Arc<dyn PasscodeSource>,
    ) -> SharedState {
        let capabilities = CapabilityRegistry::new();
        for moderator in config.moderators() {
            capabilities.grant(*moderator, Permission::ModerateMatches);
            capabilities.grant(*moderator, Permission::ManageSeasons);
            capabilities.grant(*moderator, Permission::ManageSchedule);
            capabilities.grant(*moderator, Permission::RecalculateRatings);
        }

        let channels = MatchChannels::new(config.channel_capacity());

        Arc::new(Self {
            config,
            store,
            clock,
            passcodes,
            matches: DashMap::new(),
            channels,
            capabilities,
            passcode_claims: DashMap::new(),
            season_gate: Mutex::new(()),
            rating_gate: Mutex::new(()),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Handle to the persistence backend.
    pub fn store(&self) -> Arc<dyn LeagueStore> {
        self.store.clone()
    }

    /// Wall-clock seam.
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Passcode generation seam.
    pub fn passcodes(&self) -> &dyn PasscodeSource {
        self.passcodes.as_ref()
    }

    /// Per-match event channels.
    pub fn channels(&self) -> &MatchChannels {
        &self.channels
    }

    /// Capability sets consulted before moderator commands.
    pub fn capabilities(&self) -> &CapabilityRegistry {
        &self.capabilities
    }

    /// Register a new match session, returning its handle.
    pub fn insert_match(&self, session: MatchSession) -> MatchHandle {
        let id = session.id;
        let handle: MatchHandle = Arc::new(Mutex::new(session));
        self.matches.insert(id, handle.clone());
        handle
    }

    /// Handle to a match, if it is registered.
    pub fn match_handle(&self, id: Uuid) -> Option<MatchHandle> {
        self.matches.get(&id).map(|entry| entry.clone())
    }

    /// Ids of every registered match.
    pub fn match_ids(&self) -> Vec<Uuid> {
        self.matches.iter().map(|entry| *entry.key()).collect()
    }

    /// Claim a passcode for a game; fails when another active game holds it.
    pub fn claim_passcode(&self, code: &str, match_id: Uuid) -> bool {
        match self.passcode_claims.entry(code.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(match_id);
                true
            }
        }
    }

    /// Release a passcode once its game stops being active.
    pub fn release_passcode(&self, code: &str) {
        self.passcode_claims.remove(code);
    }

    /// Gate serializing season activation toggles.
    pub fn season_gate(&self) -> &Mutex<()> {
        &self.season_gate
    }

    /// Gate serializing rating writes (incremental and bulk replay).
    pub fn rating_gate(&self) -> &Mutex<()> {
        &self.rating_gate
    }
}
