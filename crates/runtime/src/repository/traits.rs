//! Repository contract for saving and loading game state snapshots.

use game_core::GameState;

use super::Result;

/// Persistence for [`GameState`] snapshots indexed by nonce.
pub trait StateRepository: Send + Sync {
    fn save(&self, nonce: u64, state: &GameState) -> Result<()>;

    fn load(&self, nonce: u64) -> Result<Option<GameState>>;

    fn exists(&self, nonce: u64) -> bool;

    fn delete(&self, nonce: u64) -> Result<()>;

    /// All stored nonces in ascending order.
    fn list_nonces(&self) -> Result<Vec<u64>>;

    /// Most recent snapshot, if any.
    fn load_latest(&self) -> Result<Option<GameState>> {
        match self.list_nonces()?.last() {
            Some(&nonce) => self.load(nonce),
            None => Ok(None),
        }
    }

    /// Deletes every snapshot older than `keep_from`. Returns how many were removed.
    fn prune_before(&self, keep_from: u64) -> Result<usize> {
        let mut deleted = 0;
        for nonce in self.list_nonces()? {
            if nonce >= keep_from {
                break;
            }
            self.delete(nonce)?;
            deleted += 1;
        }
        Ok(deleted)
    }
}
