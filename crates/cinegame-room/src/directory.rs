//! The participant directory: who is in the room and how to reach them.
//!
//! Every participant is stored with a [`Route`] saying whether messages for
//! it go out over the network or into the bot harness. Outbound sends never
//! consult the stored route to choose between the two, though:
//! [`ParticipantDirectory::resolve_for_send`] decides by the id alone, so a
//! bot id can never leak onto the network (or vice versa) even if the
//! directory is stale or empty.
//!
//! # Threading
//!
//! The directory has no lock. It is owned by the SDK and only mutated while
//! the host's `tick` applies transport, bot and chat events, all on one
//! logical thread. Worker tasks (chat filtering, HTTP) never touch it; their
//! results are applied by that same `tick`. Sharing a directory across
//! threads requires wrapping it yourself.

use std::collections::{BTreeMap, HashMap};

use cinegame_protocol::{BackendId, ConnectionHandle, ParticipantKind, Role};
use tracing::debug;

use crate::{BotHandle, DirectoryError, Participant};

/// How a participant is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Through the realtime server, on this connection.
    Network(ConnectionHandle),
    /// Through the in-process bot harness.
    Bot(BotHandle),
}

impl Route {
    pub fn kind(self) -> ParticipantKind {
        match self {
            Self::Network(_) => ParticipantKind::Real,
            Self::Bot(_) => ParticipantKind::Bot,
        }
    }
}

/// Where an outbound message for one participant should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRoute {
    /// To the bot harness. `None` if the bot isn't registered (yet).
    Bot(Option<BotHandle>),
    /// To the realtime server. `None` if no connection is mapped (yet).
    Network(Option<ConnectionHandle>),
}

#[derive(Debug, Clone)]
struct Entry {
    participant: Participant,
    route: Route,
}

/// Maps participant ids to participants and their routes.
#[derive(Debug, Default)]
pub struct ParticipantDirectory {
    entries: BTreeMap<BackendId, Entry>,
    by_handle: HashMap<ConnectionHandle, BackendId>,
}

impl ParticipantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a participant, or replaces the entry with the same id (e.g. a
    /// player reconnecting on a new connection). Returns the previous route.
    ///
    /// # Errors
    /// [`DirectoryError::RouteMismatch`] if the route's kind differs from
    /// the kind the id denotes.
    pub fn insert(
        &mut self,
        participant: Participant,
        route: Route,
    ) -> Result<Option<Route>, DirectoryError> {
        let id = participant.id;
        if route.kind() != id.kind() {
            return Err(DirectoryError::RouteMismatch {
                id,
                kind: id.kind(),
            });
        }

        let previous = self.entries.insert(id, Entry { participant, route });
        if let Some(Entry {
            route: Route::Network(old),
            ..
        }) = &previous
        {
            self.by_handle.remove(old);
        }
        if let Route::Network(handle) = route {
            // A handle belongs to one participant; drop a stale owner.
            match self.by_handle.insert(handle, id) {
                Some(stale) if stale != id => {
                    debug!(%handle, %stale, %id, "connection handle reassigned");
                    self.entries.remove(&stale);
                }
                _ => {}
            }
        }
        Ok(previous.map(|e| e.route))
    }

    /// Removes a participant. Returns it with its route.
    pub fn remove(&mut self, id: BackendId) -> Option<(Participant, Route)> {
        let entry = self.entries.remove(&id)?;
        if let Route::Network(handle) = entry.route {
            self.by_handle.remove(&handle);
        }
        Some((entry.participant, entry.route))
    }

    /// Removes whoever is mapped to a connection handle.
    pub fn remove_by_handle(&mut self, handle: ConnectionHandle) -> Option<Participant> {
        let id = self.by_handle.remove(&handle)?;
        self.entries.remove(&id).map(|e| e.participant)
    }

    /// Removes every network participant (e.g. on room exit). Returns their
    /// ids in ascending order.
    pub fn remove_all_network(&mut self) -> Vec<BackendId> {
        let ids: Vec<BackendId> = self
            .entries
            .iter()
            .filter(|(_, e)| matches!(e.route, Route::Network(_)))
            .map(|(id, _)| *id)
            .collect();
        for id in &ids {
            self.entries.remove(id);
        }
        self.by_handle.clear();
        ids
    }

    /// Updates the display name. Used once a filtered name is available.
    ///
    /// # Errors
    /// [`DirectoryError::NotFound`] if the id isn't registered.
    pub fn set_name(&mut self, id: BackendId, name: impl Into<String>) -> Result<(), DirectoryError> {
        let entry = self.entries.get_mut(&id).ok_or(DirectoryError::NotFound(id))?;
        entry.participant.name = name.into();
        Ok(())
    }

    /// Updates the avatar identifier.
    ///
    /// # Errors
    /// [`DirectoryError::NotFound`] if the id isn't registered.
    pub fn set_avatar(&mut self, id: BackendId, avatar: impl Into<String>) -> Result<(), DirectoryError> {
        let entry = self.entries.get_mut(&id).ok_or(DirectoryError::NotFound(id))?;
        entry.participant.avatar = Some(avatar.into());
        Ok(())
    }

    /// Picks the outbound route for `id`.
    ///
    /// Bot-kind ids always go to the bot harness and real-kind ids always go
    /// to the network, whatever the directory currently holds. The stored
    /// route only supplies the handle.
    pub fn resolve_for_send(&self, id: BackendId) -> SendRoute {
        let route = self.entries.get(&id).map(|e| e.route);
        match id.kind() {
            ParticipantKind::Bot => SendRoute::Bot(match route {
                Some(Route::Bot(handle)) => Some(handle),
                _ => None,
            }),
            ParticipantKind::Real => SendRoute::Network(match route {
                Some(Route::Network(handle)) => Some(handle),
                _ => None,
            }),
        }
    }

    pub fn id_for_handle(&self, handle: ConnectionHandle) -> Option<BackendId> {
        self.by_handle.get(&handle).copied()
    }

    pub fn get(&self, id: BackendId) -> Option<&Participant> {
        self.entries.get(&id).map(|e| &e.participant)
    }

    pub fn route(&self, id: BackendId) -> Option<Route> {
        self.entries.get(&id).map(|e| e.route)
    }

    pub fn contains(&self, id: BackendId) -> bool {
        self.entries.contains_key(&id)
    }

    /// All participants in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.entries.values().map(|e| &e.participant)
    }

    /// Every registered bot, in ascending id order.
    pub fn bots(&self) -> impl Iterator<Item = (BackendId, BotHandle)> + '_ {
        self.entries.iter().filter_map(|(id, e)| match e.route {
            Route::Bot(handle) => Some((*id, handle)),
            Route::Network(_) => None,
        })
    }

    /// How many participants have `role`.
    pub fn count_role(&self, role: Role) -> usize {
        self.entries
            .values()
            .filter(|e| e.participant.role == role)
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(id: i64) -> Participant {
        Participant {
            id: BackendId(id),
            name: format!("p{id}"),
            age: 30,
            gender: String::new(),
            avatar: None,
            app_version: None,
            role: Role::Player,
            supporting_id: None,
        }
    }

    fn handle(n: u64) -> ConnectionHandle {
        ConnectionHandle::new(n)
    }

    #[test]
    fn test_insert_network_maps_handle_both_ways() {
        let mut dir = ParticipantDirectory::new();
        dir.insert(participant(5), Route::Network(handle(10))).unwrap();
        assert_eq!(dir.id_for_handle(handle(10)), Some(BackendId(5)));
        assert_eq!(dir.route(BackendId(5)), Some(Route::Network(handle(10))));
        assert_eq!(dir.resolve_for_send(BackendId(5)), SendRoute::Network(Some(handle(10))));
    }

    #[test]
    fn test_insert_route_mismatch_is_rejected() {
        let mut dir = ParticipantDirectory::new();
        let err = dir
            .insert(participant(-1), Route::Network(handle(1)))
            .unwrap_err();
        assert!(matches!(err, DirectoryError::RouteMismatch { .. }));
        assert!(
            dir.insert(participant(1), Route::Bot(BotHandle::new(0)))
                .is_err()
        );
        assert!(dir.is_empty());
    }

    #[test]
    fn test_reinsert_rebinds_handle() {
        let mut dir = ParticipantDirectory::new();
        dir.insert(participant(5), Route::Network(handle(10))).unwrap();
        let prev = dir.insert(participant(5), Route::Network(handle(11))).unwrap();
        assert_eq!(prev, Some(Route::Network(handle(10))));
        assert_eq!(dir.id_for_handle(handle(10)), None);
        assert_eq!(dir.id_for_handle(handle(11)), Some(BackendId(5)));
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn test_handle_taken_by_new_id_evicts_stale_owner() {
        let mut dir = ParticipantDirectory::new();
        dir.insert(participant(5), Route::Network(handle(10))).unwrap();
        dir.insert(participant(6), Route::Network(handle(10))).unwrap();
        assert!(!dir.contains(BackendId(5)));
        assert_eq!(dir.id_for_handle(handle(10)), Some(BackendId(6)));
    }

    #[test]
    fn test_remove_by_handle() {
        let mut dir = ParticipantDirectory::new();
        dir.insert(participant(5), Route::Network(handle(10))).unwrap();
        let removed = dir.remove_by_handle(handle(10)).unwrap();
        assert_eq!(removed.id, BackendId(5));
        assert!(dir.is_empty());
        assert!(dir.remove_by_handle(handle(10)).is_none());
    }

    #[test]
    fn test_remove_all_network_keeps_bots() {
        let mut dir = ParticipantDirectory::new();
        dir.insert(participant(1), Route::Network(handle(1))).unwrap();
        dir.insert(participant(2), Route::Network(handle(2))).unwrap();
        dir.insert(participant(-1), Route::Bot(BotHandle::new(0))).unwrap();
        assert_eq!(dir.remove_all_network(), vec![BackendId(1), BackendId(2)]);
        assert_eq!(dir.len(), 1);
        assert_eq!(dir.bots().count(), 1);
        assert_eq!(dir.id_for_handle(handle(1)), None);
    }

    #[test]
    fn test_set_name_unknown_id() {
        let mut dir = ParticipantDirectory::new();
        assert!(matches!(
            dir.set_name(BackendId(3), "x"),
            Err(DirectoryError::NotFound(_))
        ));
    }

    #[test]
    fn test_count_role() {
        let mut dir = ParticipantDirectory::new();
        let mut spectator = participant(2);
        spectator.role = Role::Spectator;
        dir.insert(participant(1), Route::Network(handle(1))).unwrap();
        dir.insert(spectator, Route::Network(handle(2))).unwrap();
        assert_eq!(dir.count_role(Role::Player), 1);
        assert_eq!(dir.count_role(Role::Spectator), 1);
    }
}
