//! In-memory StateRepository implementation for tests and local runs.

use std::collections::BTreeMap;
use std::sync::RwLock;

use game_core::GameState;

use crate::repository::{RepositoryError, Result, StateRepository};

/// Keeps every snapshot in a map guarded by a lock.
#[derive(Default)]
pub struct InMemoryStateRepo {
    states: RwLock<BTreeMap<u64, GameState>>,
}

impl InMemoryStateRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the repository with `state` under its own nonce.
    pub fn with_state(state: GameState) -> Self {
        let mut states = BTreeMap::new();
        states.insert(state.nonce, state);
        Self {
            states: RwLock::new(states),
        }
    }
}

impl StateRepository for InMemoryStateRepo {
    fn save(&self, nonce: u64, state: &GameState) -> Result<()> {
        let mut states = self
            .states
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        states.insert(nonce, state.clone());
        Ok(())
    }

    fn load(&self, nonce: u64) -> Result<Option<GameState>> {
        let states = self
            .states
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(states.get(&nonce).cloned())
    }

    fn exists(&self, nonce: u64) -> bool {
        self.states
            .read()
            .map(|states| states.contains_key(&nonce))
            .unwrap_or(false)
    }

    fn delete(&self, nonce: u64) -> Result<()> {
        let mut states = self
            .states
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        states.remove(&nonce);
        Ok(())
    }

    fn list_nonces(&self) -> Result<Vec<u64>> {
        let states = self
            .states
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(states.keys().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_at(nonce: u64) -> GameState {
        let mut state = GameState::new();
        state.nonce = nonce;
        state
    }

    #[test]
    fn latest_snapshot_wins() {
        let repo = InMemoryStateRepo::new();
        for nonce in [3, 1, 2] {
            repo.save(nonce, &state_at(nonce)).unwrap();
        }

        assert_eq!(repo.list_nonces().unwrap(), vec![1, 2, 3]);
        assert_eq!(repo.load_latest().unwrap().map(|s| s.nonce), Some(3));
    }

    #[test]
    fn prune_keeps_recent_snapshots() {
        let repo = InMemoryStateRepo::with_state(state_at(0));
        for nonce in 1..=4 {
            repo.save(nonce, &state_at(nonce)).unwrap();
        }

        assert_eq!(repo.prune_before(3).unwrap(), 3);
        assert!(!repo.exists(2));
        assert!(repo.exists(3));
        assert_eq!(repo.list_nonces().unwrap(), vec![3, 4]);
    }

    #[test]
    fn empty_repository_has_no_latest() {
        let repo = InMemoryStateRepo::new();
        assert!(repo.load_latest().unwrap().is_none());
        assert!(repo.load(0).unwrap().is_none());
    }
}
