//! Per-key turn serialization

use dashmap::DashMap;
use dpe_artifact::ArtifactKey;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per artifact key
///
/// Turns on the same key run one at a time; different keys never wait on
/// each other. An entry lives only while some turn holds or waits on it.
#[derive(Debug, Default)]
pub(crate) struct KeyLocks {
    locks: DashMap<ArtifactKey, Arc<Mutex<()>>>,
}

impl KeyLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`
    pub(crate) async fn acquire(&self, key: &ArtifactKey) -> KeyGuard<'_> {
        // clone out of the map so no shard guard is held across the await
        let lock = Arc::clone(self.locks.entry(key.clone()).or_default().value());
        let guard = lock.lock_owned().await;
        KeyGuard {
            locks: self,
            key: key.clone(),
            guard: Some(guard),
        }
    }

    /// Keys currently held or waited on
    pub(crate) fn len(&self) -> usize {
        self.locks.len()
    }
}

/// Exclusive access to one key, released on drop
#[derive(Debug)]
pub(crate) struct KeyGuard<'a> {
    locks: &'a KeyLocks,
    key: ArtifactKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // the map's own reference is the last one once no turn holds or waits
        self.locks
            .locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpe_artifact::DiagramKind;
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_waits_other_key_does_not() {
        let locks = KeyLocks::new();
        let a = ArtifactKey::new("o", "c", DiagramKind::Class);
        let b = ArtifactKey::new("o", "c", DiagramKind::Sequence);

        let held = locks.acquire(&a).await;
        let blocked = tokio::time::timeout(Duration::from_millis(50), locks.acquire(&a)).await;
        assert!(blocked.is_err());

        let other = tokio::time::timeout(Duration::from_millis(50), locks.acquire(&b)).await;
        assert!(other.is_ok());

        drop(held);
        assert!(tokio::time::timeout(Duration::from_millis(50), locks.acquire(&a))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn released_keys_leave_no_entry() {
        let locks = KeyLocks::new();
        for n in 0..100 {
            let key = ArtifactKey::new("o", format!("c{n}"), DiagramKind::Class);
            let _guard = locks.acquire(&key).await;
            assert_eq!(locks.len(), 1);
        }
        assert_eq!(locks.len(), 0);

        let a = ArtifactKey::new("o", "c", DiagramKind::Class);
        let b = ArtifactKey::new("o", "c", DiagramKind::Sequence);
        let first = locks.acquire(&a).await;
        let second = locks.acquire(&b).await;
        assert_eq!(locks.len(), 2);
        drop(first);
        drop(second);
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn waiting_turn_keeps_the_entry() {
        let locks = Arc::new(KeyLocks::new());
        let key = ArtifactKey::new("o", "c", DiagramKind::Class);

        let held = locks.acquire(&key).await;
        let waiter = {
            let locks = Arc::clone(&locks);
            let key = key.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(&key).await;
            })
        };
        // let the waiter register on the mutex before releasing
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(held);
        assert_eq!(locks.len(), 1);

        waiter.await.unwrap();
        assert_eq!(locks.len(), 0);
    }
}
