// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::core::{BoundedQueue, Datum, NodeId, Result};

/// Sent to the coordinator whenever a worker thread finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WorkerExit {
    pub node: NodeId,
    pub worker_index: usize,
}

/// Per-worker bookkeeping released when the worker ends, however it ends.
///
/// Dropping the guard releases the worker's producer registration on every
/// outbound queue, which is what closes downstream queues once a whole
/// upstream pool has finished.
pub(crate) struct WorkerGuard {
    node: NodeId,
    worker_index: usize,
    outbound: Vec<Arc<BoundedQueue<Datum>>>,
    live_workers: Arc<AtomicUsize>,
    exit_tx: crossbeam_channel::Sender<WorkerExit>,
}

impl WorkerGuard {
    pub fn new(
        node: NodeId,
        worker_index: usize,
        outbound: Vec<Arc<BoundedQueue<Datum>>>,
        live_workers: Arc<AtomicUsize>,
        exit_tx: crossbeam_channel::Sender<WorkerExit>,
    ) -> Self {
        live_workers.fetch_add(1, Ordering::AcqRel);
        Self {
            node,
            worker_index,
            outbound,
            live_workers,
            exit_tx,
        }
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        for queue in &self.outbound {
            queue.release_producer();
        }
        self.live_workers.fetch_sub(1, Ordering::AcqRel);
        tracing::trace!("[{}] Worker {} exited", self.node, self.worker_index);
        // The coordinator may already have stopped listening.
        let _ = self.exit_tx.send(WorkerExit {
            node: self.node.clone(),
            worker_index: self.worker_index,
        });
    }
}

/// Spawn a named worker thread that owns `guard` for its whole life.
///
/// If the OS refuses the thread, the closure and its guard are dropped here,
/// so bookkeeping stays balanced.
pub(crate) fn spawn_worker<F>(name: String, guard: WorkerGuard, body: F) -> Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    let handle = std::thread::Builder::new().name(name).spawn(move || {
        let _guard = guard;
        body();
    })?;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Take;

    #[test]
    fn test_guard_releases_and_reports_exit() {
        let queue = Arc::new(BoundedQueue::unbounded("down"));
        queue.register_producers(1);
        let live = Arc::new(AtomicUsize::new(0));
        let (exit_tx, exit_rx) = crossbeam_channel::unbounded();

        let guard = WorkerGuard::new(
            NodeId::parse("up").unwrap(),
            0,
            vec![queue.clone()],
            live.clone(),
            exit_tx,
        );
        assert_eq!(live.load(Ordering::SeqCst), 1);

        let handle = spawn_worker("up-0".into(), guard, || {}).unwrap();
        handle.join().unwrap();

        assert_eq!(live.load(Ordering::SeqCst), 0);
        assert_eq!(exit_rx.recv().unwrap().worker_index, 0);
        assert!(queue.is_closed());
        assert_eq!(queue.take(), Take::Closed);
    }

    #[test]
    fn test_worker_thread_is_named() {
        let live = Arc::new(AtomicUsize::new(0));
        let (exit_tx, _exit_rx) = crossbeam_channel::unbounded();
        let guard = WorkerGuard::new(NodeId::parse("proc").unwrap(), 3, Vec::new(), live, exit_tx);
        let (name_tx, name_rx) = crossbeam_channel::bounded(1);
        spawn_worker("proc-3".into(), guard, move || {
            let _ = name_tx.send(std::thread::current().name().map(str::to_owned));
        })
        .unwrap()
        .join()
        .unwrap();
        assert_eq!(name_rx.recv().unwrap().as_deref(), Some("proc-3"));
    }
}
