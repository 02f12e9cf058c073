use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use fhe::Coprocessor;
use game_core::{DecryptionResponse, RequestId};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{DecryptionOracle, DecryptionRequest, OracleError};

/// When the relayer hands a signed response back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RelayMode {
    /// As soon as the request is accepted.
    #[default]
    Immediate,
    /// After a fixed delay.
    Delayed(Duration),
    /// Only when [`KmsRelayer::release`] is called.
    Manual,
}

type Held = BTreeMap<RequestId, (DecryptionResponse, mpsc::Sender<DecryptionResponse>)>;

/// Oracle backed by the coprocessor's KMS.
///
/// Decrypts and signs at submission time, then relays according to its
/// [`RelayMode`]. Request ids start at 1 and never repeat.
pub struct KmsRelayer {
    coprocessor: Arc<Coprocessor>,
    mode: RelayMode,
    last_id: AtomicU64,
    held: Mutex<Held>,
}

impl KmsRelayer {
    pub fn new(coprocessor: Arc<Coprocessor>, mode: RelayMode) -> Self {
        Self {
            coprocessor,
            mode,
            last_id: AtomicU64::new(0),
            held: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn mode(&self) -> RelayMode {
        self.mode
    }

    /// Request ids whose responses are being held back.
    pub fn pending_ids(&self) -> Result<Vec<RequestId>, OracleError> {
        Ok(self.held()?.keys().copied().collect())
    }

    /// Delivers one held response. Returns `false` if nothing was held under `request_id`.
    pub async fn release(&self, request_id: RequestId) -> Result<bool, OracleError> {
        let entry = self.held()?.remove(&request_id);
        match entry {
            Some((response, reply_to)) => {
                deliver(response, reply_to).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Delivers every held response in request order.
    pub async fn release_all(&self) -> Result<usize, OracleError> {
        let drained = std::mem::take(&mut *self.held()?);
        let count = drained.len();
        for (response, reply_to) in drained.into_values() {
            deliver(response, reply_to).await;
        }
        Ok(count)
    }

    /// Forgets a held response without delivering it.
    pub fn drop_response(&self, request_id: RequestId) -> Result<bool, OracleError> {
        Ok(self.held()?.remove(&request_id).is_some())
    }

    fn held(&self) -> Result<MutexGuard<'_, Held>, OracleError> {
        self.held
            .lock()
            .map_err(|_| OracleError::Unavailable("relayer queue lock poisoned".to_string()))
    }

    fn next_id(&self) -> RequestId {
        RequestId(self.last_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl DecryptionOracle for KmsRelayer {
    async fn submit(
        &self,
        request: DecryptionRequest,
        reply_to: mpsc::Sender<DecryptionResponse>,
    ) -> Result<RequestId, OracleError> {
        let request_id = self.next_id();
        let response = self
            .coprocessor
            .public_decrypt(request_id, &request.handles)?;

        info!(
            %request_id,
            round_id = %request.round_id,
            handles = request.handles.len(),
            mode = ?self.mode,
            "decryption request accepted"
        );

        match self.mode {
            RelayMode::Immediate => {
                tokio::spawn(deliver(response, reply_to));
            }
            RelayMode::Delayed(delay) => {
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    deliver(response, reply_to).await;
                });
            }
            RelayMode::Manual => {
                self.held()?.insert(request_id, (response, reply_to));
            }
        }

        Ok(request_id)
    }
}

async fn deliver(response: DecryptionResponse, reply_to: mpsc::Sender<DecryptionResponse>) {
    let request_id = response.request_id;
    if reply_to.send(response).await.is_err() {
        warn!(%request_id, "decryption response dropped, receiver closed");
    } else {
        debug!(%request_id, "decryption response relayed");
    }
}
