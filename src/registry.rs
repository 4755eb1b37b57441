use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::connection::{ConnId, Connection};
use crate::error::ChatError;

/// Live membership. Cheap to clone; every clone sees the same map.
///
/// No map reference escapes a method, so nothing here is held across an
/// `.await` and socket I/O never happens under a shard lock.
#[derive(Clone, Default)]
pub struct Registry {
    members: Arc<DashMap<ConnId, Connection>>,
    next_id: Arc<AtomicU64>,
}

impl Registry {
    pub fn next_id(&self) -> ConnId {
        ConnId::new(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    pub fn add(&self, conn: Connection) -> Result<(), ChatError> {
        match self.members.entry(conn.id()) {
            Entry::Occupied(_) => Err(ChatError::DuplicateConnection(conn.id())),
            Entry::Vacant(slot) => {
                slot.insert(conn);
                Ok(())
            }
        }
    }

    /// `None` if the connection was not (or no longer) registered.
    pub fn remove(&self, id: ConnId) -> Option<Connection> {
        self.members.remove(&id).map(|(_, conn)| conn)
    }

    #[cfg(test)]
    pub fn contains(&self, id: ConnId) -> bool {
        self.members.contains_key(&id)
    }

    /// Point-in-time copy of the members, minus `exclude`.
    pub fn snapshot_except(&self, exclude: Option<ConnId>) -> Vec<Connection> {
        self.members
            .iter()
            .filter(|entry| Some(*entry.key()) != exclude)
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    fn conn(registry: &Registry) -> Connection {
        let (local, _remote) = tokio::io::duplex(64);
        Connection::new(registry.next_id(), local, CancellationToken::new())
    }

    #[test]
    fn ids_are_monotonic() {
        let registry = Registry::default();
        assert_eq!(registry.next_id(), ConnId::new(1));
        assert_eq!(registry.next_id(), ConnId::new(2));
        assert_eq!(registry.clone().next_id(), ConnId::new(3));
    }

    #[tokio::test]
    async fn add_rejects_duplicates() {
        let registry = Registry::default();
        let a = conn(&registry);

        registry.add(a.clone()).unwrap();
        let err = registry.add(a.clone()).unwrap_err();

        assert!(matches!(err, ChatError::DuplicateConnection(id) if id == a.id()));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn remove_is_a_noop_when_absent() {
        let registry = Registry::default();
        let a = conn(&registry);
        registry.add(a.clone()).unwrap();

        assert!(registry.remove(a.id()).is_some());
        assert!(registry.remove(a.id()).is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn snapshot_skips_excluded() {
        let registry = Registry::default();
        let a = conn(&registry);
        let b = conn(&registry);
        let c = conn(&registry);
        for m in [&a, &b, &c] {
            registry.add(m.clone()).unwrap();
        }

        let mut ids: Vec<_> = registry
            .snapshot_except(Some(b.id()))
            .iter()
            .map(Connection::id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec![a.id(), c.id()]);

        assert_eq!(registry.snapshot_except(None).len(), 3);
    }

    #[tokio::test]
    async fn snapshot_is_detached_from_later_mutation() {
        let registry = Registry::default();
        let a = conn(&registry);
        registry.add(a.clone()).unwrap();

        let snapshot = registry.snapshot_except(None);
        registry.remove(a.id());

        assert_eq!(snapshot.len(), 1);
        assert!(registry.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_adds_and_removes_stay_consistent() {
        let registry = Registry::default();

        let mut handles = Vec::new();
        for i in 0..64 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let c = conn(&registry);
                registry.add(c.clone()).unwrap();
                if i % 2 == 0 {
                    registry.remove(c.id());
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(registry.len(), 32);
    }
}
