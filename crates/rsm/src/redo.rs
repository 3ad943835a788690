//! Durable progress records.
//!
//! The driver owns exactly two keys in the store: `rsm_done`, the last
//! successfully applied instance id, and `rsm_done_redo`, the hazard marker
//! bracketing an apply in flight. Both values are 4-byte big-endian signed
//! integers.

use crate::{Error, Result};
use rsm_storage::Store;
use std::sync::Arc;
use tracing::warn;

/// Key of the last successfully applied instance id.
pub const DONE_KEY: &[u8] = b"rsm_done";

/// Key of the redo hazard marker.
pub const REDO_KEY: &[u8] = b"rsm_done_redo";

/// Encodes an instance id into its durable form.
pub(crate) fn encode_id(id: i32) -> Vec<u8> {
    id.to_be_bytes().to_vec()
}

/// Decodes a durable id record; `None` when it is not exactly 4 bytes.
pub(crate) fn decode_id(bytes: &[u8]) -> Option<i32> {
    let arr: [u8; 4] = bytes.try_into().ok()?;
    Some(i32::from_be_bytes(arr))
}

/// Durably advances the applied pointer.
pub(crate) async fn write_done(store: &Arc<dyn Store>, id: i32) -> Result<()> {
    store.put(DONE_KEY, encode_id(id)).await?;
    Ok(())
}

/// Reads the applied pointer. Absent means nothing was ever applied; a
/// malformed record is an error, since treating it as absent would re-run
/// every applied instance.
pub(crate) async fn read_done(store: &Arc<dyn Store>) -> Result<Option<i32>> {
    match store.get(DONE_KEY).await? {
        None => Ok(None),
        Some(bytes) => decode_id(&bytes).map(Some).ok_or_else(|| {
            Error::Corrupt(format!(
                "applied-pointer record has {} bytes, expected 4",
                bytes.len()
            ))
        }),
    }
}

/// The write-ahead hazard marker for the apply in flight.
///
/// `write(id)` records the applied pointer as it stood *before* the apply
/// began; its presence after a crash tells recovery that the pointer may or
/// may not have advanced.
pub struct RedoLog {
    store: Arc<dyn Store>,
}

impl RedoLog {
    /// Creates a redo log over `store`.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Atomically records `id` as the in-flight marker.
    pub async fn write(&self, id: i32) -> Result<()> {
        self.store.put(REDO_KEY, encode_id(id)).await?;
        Ok(())
    }

    /// Removes the marker. Idempotent.
    pub async fn clear(&self) -> Result<()> {
        self.store.remove(REDO_KEY).await?;
        Ok(())
    }

    /// Reads the marker. A present-but-malformed record is logged and
    /// treated as absent.
    pub async fn read(&self) -> Result<Option<i32>> {
        match self.store.get(REDO_KEY).await? {
            None => Ok(None),
            Some(bytes) => match decode_id(&bytes) {
                Some(id) => Ok(Some(id)),
                None => {
                    warn!(
                        len = bytes.len(),
                        "malformed redo record, treating as absent"
                    );
                    Ok(None)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsm_storage::MemoryStore;

    fn store() -> Arc<dyn Store> {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn id_codec_is_big_endian() {
        assert_eq!(encode_id(1), vec![0, 0, 0, 1]);
        assert_eq!(encode_id(-1), vec![0xff, 0xff, 0xff, 0xff]);
        assert_eq!(decode_id(&[0, 0, 0, 1]), Some(1));
        assert_eq!(decode_id(&[0xff, 0xff, 0xff, 0xff]), Some(-1));
        assert_eq!(decode_id(&[0, 0, 1]), None);
        assert_eq!(decode_id(&[]), None);
    }

    #[tokio::test]
    async fn write_read_clear() {
        let store = store();
        let redo = RedoLog::new(store.clone());

        assert_eq!(redo.read().await.unwrap(), None);

        redo.write(4).await.unwrap();
        assert_eq!(redo.read().await.unwrap(), Some(4));
        assert_eq!(store.get(REDO_KEY).await.unwrap(), Some(vec![0, 0, 0, 4]));

        redo.clear().await.unwrap();
        assert_eq!(redo.read().await.unwrap(), None);

        // Idempotent clear
        redo.clear().await.unwrap();
    }

    #[tokio::test]
    async fn malformed_redo_reads_as_absent() {
        let store = store();
        store.put(REDO_KEY, vec![1, 2]).await.unwrap();

        let redo = RedoLog::new(store);
        assert_eq!(redo.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn malformed_done_is_an_error() {
        let store = store();
        store.put(DONE_KEY, vec![1, 2, 3]).await.unwrap();

        assert!(matches!(
            read_done(&store).await,
            Err(Error::Corrupt(_))
        ));
    }

    #[tokio::test]
    async fn done_round_trip() {
        let store = store();
        assert_eq!(read_done(&store).await.unwrap(), None);

        write_done(&store, 9).await.unwrap();
        assert_eq!(read_done(&store).await.unwrap(), Some(9));
        assert_eq!(store.get(DONE_KEY).await.unwrap(), Some(vec![0, 0, 0, 9]));
    }
}
