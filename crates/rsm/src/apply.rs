//! The apply loop: single consumer of decided slots.
//!
//! Exactly one loop task runs per driver. It alone writes the applied
//! pointer, the redo marker, and the resynced sequence, which is what keeps
//! apply order strictly ascending with no gaps.

use crate::coordinator::StateTransfer;
use crate::driver::Shared;
use crate::input::Input;
use crate::redo::{self, RedoLog};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

pub(crate) struct ApplyLoop {
    shared: Arc<Shared>,
    transfer: Arc<dyn StateTransfer>,
    redo: RedoLog,
    /// Applies since the last forget hint. In-memory only; restarts reset it.
    applied_since_forget: u32,
}

impl ApplyLoop {
    pub(crate) fn new(shared: Arc<Shared>, transfer: Arc<dyn StateTransfer>) -> Self {
        let redo = RedoLog::new(shared.store.clone());
        Self {
            shared,
            transfer,
            redo,
            applied_since_forget: 0,
        }
    }

    pub(crate) async fn run(mut self) {
        info!(done = self.shared.done(), "apply loop started");
        while !self.shared.stop.load(Ordering::Acquire) {
            self.tick().await;
        }
        info!(done = self.shared.done(), "apply loop stopped");
    }

    /// One iteration: try to apply exactly one instance, `done + 1`.
    async fn tick(&mut self) {
        let target = self.shared.done() + 1;

        let decided = match timeout(
            self.shared.config.instance_wait(),
            self.shared.coordinator.instance(target),
        )
        .await
        {
            // Not decided locally within the bound: peers may be ahead.
            Err(_) => {
                self.catch_up(target).await;
                return;
            }
            Ok(Err(e)) => {
                warn!(slot = target, error = %e, "fetching decided slot failed");
                return;
            }
            Ok(Ok(bytes)) => bytes,
        };

        let input = match Input::from_bytes(&decided) {
            Ok(input) => input,
            Err(e) => {
                // An undecodable decided slot means this node has diverged
                // from the cluster's view; skipping it would break
                // exactly-once, so the process cannot continue.
                error!(slot = target, error = %e, "decided slot cannot be decoded, aborting");
                std::process::exit(1);
            }
        };

        self.apply(target, input).await;
    }

    /// Steps an instance through redo pre-write, transform, publish and
    /// durable advance. Any transient failure leaves the redo marker in
    /// place and retries the same instance on the next iteration.
    async fn apply(&mut self, target: i32, input: Input) {
        if let Err(e) = self.redo.write(self.shared.done()).await {
            warn!(slot = target, error = %e, "redo pre-write failed");
            return;
        }

        let output = match self.transfer.transform(input.clone()).await {
            Ok(output) => output,
            Err(e) => {
                warn!(id = input.id, error = %e, "transform failed, will retry");
                return;
            }
        };

        self.shared.pending.complete(input.id, output);

        if let Err(e) = redo::write_done(&self.shared.store, target).await {
            warn!(slot = target, error = %e, "durable advance failed, will retry");
            return;
        }
        self.shared.done.store(target, Ordering::Release);
        debug!(done = target, "instance applied");

        self.sync_max_and_sequence().await;
        self.maybe_forget().await;

        if let Err(e) = self.redo.clear().await {
            warn!(slot = target, error = %e, "redo clear failed");
        }
    }

    /// Asks peers for every slot in `[target, max]`. Does not advance
    /// `done`; the decided values arrive through `instance` as usual.
    async fn catch_up(&mut self, target: i32) {
        let max = match self.shared.coordinator.max().await {
            Ok(max) => max,
            Err(e) => {
                warn!(error = %e, "reading cluster max failed");
                return;
            }
        };
        self.shared.max.store(max, Ordering::Release);

        if target > max {
            return;
        }
        debug!(from = target, to = max, "catching up");
        for id in target..=max {
            if let Err(e) = self.shared.coordinator.learn(id).await {
                warn!(id, error = %e, "learn hint failed");
            }
        }
    }

    /// Refreshes `max` and moves the allocator past every id the cluster
    /// has already decided, so a local allocation can never collide with a
    /// remote one.
    async fn sync_max_and_sequence(&self) {
        let max = match self.shared.coordinator.max().await {
            Ok(max) => max,
            Err(e) => {
                warn!(error = %e, "reading cluster max failed");
                return;
            }
        };
        self.shared.max.store(max, Ordering::Release);

        let _alloc = self.shared.alloc_lock.lock();
        if max >= self.shared.sequence.current() {
            self.shared.sequence.set(max + 1);
        }
    }

    async fn maybe_forget(&mut self) {
        self.applied_since_forget += 1;
        if self.applied_since_forget <= self.shared.config.forget_threshold {
            return;
        }
        self.applied_since_forget = 0;

        let done = self.shared.done();
        match self.shared.coordinator.forget(done).await {
            Ok(()) => debug!(done, "released slots below applied pointer"),
            Err(e) => warn!(done, error = %e, "periodic forget failed"),
        }
    }
}
