//! Connection registry
//!
//! Indexes live realtime connections by login session and by user so that
//! revocations can be pushed to exactly the sockets they affect. All three
//! indexes change together under one lock, and no lock is held while
//! delivering.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use depot_common::RealtimeConfig;
use depot_core::traits::SessionEventSink;
use depot_core::{RevocationReason, SessionId, UserId};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::auth::ConnectionIdentity;
use crate::protocol::{CloseCode, Outbound, ServerEvent};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique connection identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Registry size snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub sessions: usize,
    pub users: usize,
    pub sockets: usize,
}

struct Entry {
    identity: ConnectionIdentity,
    sender: mpsc::Sender<Outbound>,
}

#[derive(Default)]
struct RegistryState {
    connections: HashMap<ConnectionId, Entry>,
    by_session: HashMap<SessionId, HashSet<ConnectionId>>,
    by_user: HashMap<UserId, HashSet<ConnectionId>>,
}

impl RegistryState {
    fn senders<'a>(
        &'a self,
        ids: impl IntoIterator<Item = &'a ConnectionId>,
    ) -> Vec<(ConnectionId, &'a Entry)> {
        ids.into_iter()
            .filter_map(|id| self.connections.get(id).map(|entry| (*id, entry)))
            .collect()
    }
}

fn drop_member<K: std::hash::Hash + Eq>(
    index: &mut HashMap<K, HashSet<ConnectionId>>,
    key: &K,
    id: ConnectionId,
) {
    if let Some(ids) = index.get_mut(key) {
        ids.remove(&id);
        if ids.is_empty() {
            index.remove(key);
        }
    }
}

/// Live connections indexed by session and user
pub struct ConnectionRegistry {
    state: Mutex<RegistryState>,
    max_per_user: usize,
    reject_grace: Duration,
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new(max_per_user: usize, reject_grace: Duration) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            max_per_user,
            reject_grace,
        }
    }

    #[must_use]
    pub fn from_config(config: &RealtimeConfig) -> Self {
        Self::new(
            config.max_sockets_per_user,
            Duration::from_millis(config.reject_grace_ms),
        )
    }

    /// Create a registry wrapped in Arc
    #[must_use]
    pub fn new_shared(config: &RealtimeConfig) -> Arc<Self> {
        Arc::new(Self::from_config(config))
    }

    pub fn max_per_user(&self) -> usize {
        self.max_per_user
    }

    /// Index a connection under its session and user.
    ///
    /// Returns false when the user is already at the cap. The rejected
    /// connection is told why and closed after the grace delay; existing
    /// connections are left alone.
    pub fn register(
        &self,
        id: ConnectionId,
        identity: ConnectionIdentity,
        sender: mpsc::Sender<Outbound>,
    ) -> bool {
        {
            let mut state = self.state.lock();
            if state.connections.contains_key(&id) {
                return true;
            }

            let held = state.by_user.get(&identity.user_id).map_or(0, HashSet::len);
            if held < self.max_per_user {
                state.connections.insert(id, Entry { identity, sender });
                state
                    .by_session
                    .entry(identity.session_id)
                    .or_default()
                    .insert(id);
                state.by_user.entry(identity.user_id).or_default().insert(id);

                tracing::debug!(
                    connection_id = %id,
                    user_id = %identity.user_id,
                    session_id = %identity.session_id,
                    "Connection registered"
                );
                return true;
            }
        }

        tracing::warn!(
            connection_id = %id,
            user_id = %identity.user_id,
            limit = self.max_per_user,
            "Socket limit reached, rejecting connection"
        );
        self.reject(sender);
        false
    }

    fn reject(&self, sender: mpsc::Sender<Outbound>) {
        let notice = Outbound::Event(ServerEvent::socket_limit(self.max_per_user));
        if sender.try_send(notice).is_err() {
            tracing::debug!("Rejected connection already gone");
        }

        let grace = self.reject_grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let _ = sender.send(Outbound::Close(CloseCode::RateLimited)).await;
        });
    }

    /// Drop a connection from every index. Unknown ids are ignored.
    pub fn unregister(&self, id: ConnectionId) -> bool {
        let mut state = self.state.lock();
        let Some(entry) = state.connections.remove(&id) else {
            return false;
        };

        drop_member(&mut state.by_session, &entry.identity.session_id, id);
        drop_member(&mut state.by_user, &entry.identity.user_id, id);

        tracing::debug!(connection_id = %id, "Connection unregistered");
        true
    }

    /// Tell every connection of a session that it was revoked. Connections
    /// stay open. Returns how many were notified.
    pub fn emit_session_revoked(&self, session_id: SessionId, reason: &str) -> usize {
        let event = ServerEvent::session_revoked(session_id, reason);
        let targets: Vec<_> = {
            let state = self.state.lock();
            let Some(ids) = state.by_session.get(&session_id) else {
                return 0;
            };
            state
                .senders(ids)
                .into_iter()
                .map(|(id, entry)| (id, entry.sender.clone()))
                .collect()
        };

        deliver(targets, &event)
    }

    /// Fan a bulk revocation out to the user's connections whose session is
    /// in `revoked`, skipping `exclude`.
    pub fn emit_user_bulk_revoked(
        &self,
        user_id: UserId,
        revoked: &[SessionId],
        reason: &str,
        exclude: Option<SessionId>,
    ) -> usize {
        let revoked: HashSet<SessionId> = revoked.iter().copied().collect();
        let targets: Vec<_> = {
            let state = self.state.lock();
            let Some(ids) = state.by_user.get(&user_id) else {
                return 0;
            };
            state
                .senders(ids)
                .into_iter()
                .filter(|(_, entry)| {
                    let sid = entry.identity.session_id;
                    Some(sid) != exclude && revoked.contains(&sid)
                })
                .map(|(id, entry)| (id, entry.sender.clone(), entry.identity.session_id))
                .collect()
        };

        let mut sent = 0;
        for (id, sender, session_id) in targets {
            let event = ServerEvent::session_revoked(session_id, reason);
            sent += deliver(vec![(id, sender)], &event);
        }
        sent
    }

    pub fn stats(&self) -> RegistryStats {
        let state = self.state.lock();
        RegistryStats {
            sessions: state.by_session.len(),
            users: state.by_user.len(),
            sockets: state.connections.len(),
        }
    }
}

fn deliver(targets: Vec<(ConnectionId, mpsc::Sender<Outbound>)>, event: &ServerEvent) -> usize {
    let mut sent = 0;
    for (id, sender) in targets {
        match sender.try_send(Outbound::Event(event.clone())) {
            Ok(()) => sent += 1,
            Err(e) => {
                tracing::warn!(connection_id = %id, error = %e, "Failed to queue realtime event");
            }
        }
    }
    sent
}

impl SessionEventSink for ConnectionRegistry {
    fn session_revoked(&self, session_id: SessionId, reason: &RevocationReason) {
        let sent = self.emit_session_revoked(session_id, reason.as_str());
        tracing::debug!(session_id = %session_id, sent, "Session revocation fanned out");
    }

    fn user_bulk_revoked(
        &self,
        user_id: UserId,
        revoked: &[SessionId],
        reason: &RevocationReason,
        exclude: Option<SessionId>,
    ) {
        let sent = self.emit_user_bulk_revoked(user_id, revoked, reason.as_str(), exclude);
        tracing::debug!(user_id = %user_id, sent, "Bulk revocation fanned out");
    }
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("max_per_user", &self.max_per_user)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
