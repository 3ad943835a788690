//! Driver facade: intake on one side, the apply loop on the other.

use crate::apply::ApplyLoop;
use crate::config::DriverConfig;
use crate::coordinator::{Coordinator, StateTransfer};
use crate::input::Input;
use crate::pending::{PendingMap, SubmitHandle};
use crate::redo::{self, RedoLog};
use crate::sequence::Sequence;
use crate::{Error, Result};
use bytes::Bytes;
use parking_lot::Mutex;
use rsm_storage::Store;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

/// State shared between the driver facade and its apply loop.
pub(crate) struct Shared {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) coordinator: Arc<dyn Coordinator>,
    pub(crate) sequence: Arc<dyn Sequence>,
    pub(crate) pending: Arc<PendingMap>,
    pub(crate) config: DriverConfig,
    /// Highest id applied and durably recorded; -1 before the first apply
    pub(crate) done: AtomicI32,
    /// Highest id the cluster is known to have reached (advisory)
    pub(crate) max: AtomicI32,
    /// Cooperative stop flag, observed at the top of each loop iteration
    pub(crate) stop: AtomicBool,
    /// Serializes id allocation against the loop's sequence resync
    pub(crate) alloc_lock: Mutex<()>,
}

impl Shared {
    pub(crate) fn done(&self) -> i32 {
        self.done.load(Ordering::Acquire)
    }
}

/// The replicated state machine driver.
///
/// Producer threads share the driver to allocate inputs and submit them;
/// one spawned apply loop folds decided slots into application state in
/// strict id order. See the crate docs for the full lifecycle.
pub struct Driver {
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
    running: AtomicBool,
}

impl Driver {
    /// Creates a driver over its collaborators. Nothing runs until
    /// [`start`](Self::start).
    pub fn new(
        store: Arc<dyn Store>,
        coordinator: Arc<dyn Coordinator>,
        sequence: Arc<dyn Sequence>,
        config: DriverConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                coordinator,
                sequence,
                pending: Arc::new(PendingMap::new()),
                config,
                done: AtomicI32::new(-1),
                max: AtomicI32::new(-1),
                stop: AtomicBool::new(false),
                alloc_lock: Mutex::new(()),
            }),
            task: Mutex::new(None),
            running: AtomicBool::new(false),
        }
    }

    /// Recovers progress from the store and spawns the apply loop onto the
    /// current tokio runtime.
    pub async fn start(&self, transfer: Arc<dyn StateTransfer>) -> Result<()> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(Error::AlreadyRunning);
        }

        if let Err(e) = self.recover().await {
            self.running.store(false, Ordering::Release);
            return Err(e);
        }

        self.shared.stop.store(false, Ordering::Release);
        let handle = tokio::spawn(ApplyLoop::new(self.shared.clone(), transfer).run());
        *self.task.lock() = Some(handle);
        Ok(())
    }

    /// Requests cooperative shutdown and waits for the loop to observe it.
    /// An in-flight transform is not interrupted.
    pub async fn stop(&self) -> Result<()> {
        let handle = self.task.lock().take().ok_or(Error::NotRunning)?;
        self.shared.stop.store(true, Ordering::Release);
        if let Err(e) = handle.await {
            error!(error = %e, "apply loop task failed");
        }
        self.running.store(false, Ordering::Release);
        Ok(())
    }

    /// Returns whether the apply loop has been started and not yet stopped.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Allocates a fresh instance id and request token around `content`.
    ///
    /// Ids are strictly increasing within a run and never reused.
    pub fn new_state(&self, content: impl Into<Bytes>) -> Input {
        let id = {
            let _alloc = self.shared.alloc_lock.lock();
            self.shared.sequence.next()
        };
        Input::new(id, Uuid::new_v4(), content)
    }

    /// Hands `input` to the consensus layer and returns the handle its
    /// output will arrive on, in apply order.
    ///
    /// The handle is registered before coordination so a fast decision
    /// cannot outrun it. Submitting an id the allocator has not issued yet
    /// is a precondition violation.
    pub async fn submit(&self, input: &Input) -> Result<SubmitHandle> {
        let next = self.shared.sequence.current();
        if input.id > next {
            return Err(Error::Precondition(format!(
                "id {} has not been allocated yet (next is {next})",
                input.id
            )));
        }

        let frame = input.to_bytes()?;
        let handle = self.shared.pending.get_or_create(input.id);
        self.shared.coordinator.coordinate(input.id, frame).await?;
        Ok(handle)
    }

    /// Highest id whose transform has returned and whose durable record is
    /// written; -1 before the first apply.
    pub fn done(&self) -> i32 {
        self.shared.done.load(Ordering::Acquire)
    }

    /// Highest id the coordinator has observed in the cluster. Advisory.
    pub fn max(&self) -> i32 {
        self.shared.max.load(Ordering::Acquire)
    }

    /// Allows the coordinator to drop slots strictly below `before`.
    /// `before` must not exceed [`done`](Self::done).
    pub async fn forget(&self, before: i32) -> Result<()> {
        let done = self.done();
        if before > done {
            return Err(Error::Precondition(format!(
                "cannot forget up to {before}: applied pointer is {done}"
            )));
        }
        self.shared.coordinator.forget(before).await
    }

    /// Restores `done` from the store: the redo marker wins when present,
    /// since it holds the applied pointer as of the interrupted apply; the
    /// transform's idempotence makes re-driving that instance safe.
    async fn recover(&self) -> Result<()> {
        let redo_log = RedoLog::new(self.shared.store.clone());
        let done = match redo_log.read().await? {
            Some(id) => {
                info!(redo = id, "recovering from an interrupted apply");
                id
            }
            None => redo::read_done(&self.shared.store).await?.unwrap_or(-1),
        };

        self.shared.done.store(done, Ordering::Release);
        {
            let _alloc = self.shared.alloc_lock.lock();
            self.shared.sequence.set(done + 1);
        }
        info!(done, "progress recovered");
        Ok(())
    }
}
