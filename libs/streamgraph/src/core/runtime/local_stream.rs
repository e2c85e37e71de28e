// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Lifecycle coordinator for one in-process stream graph.
//!
//! `start()` wires one inbound queue per consumer node, runs setup hooks in
//! topological order, spawns every worker pool and then blocks on the
//! coordinator loop until all workers have exited. Completion propagates
//! through producer registration: when a provider finishes, its guard releases
//! the downstream queues, which close once drained, and so on down to the
//! writers.
//!
//! `stop()` asks providers to cease generation and gives the graph
//! `shutdown_timeout` to drain. Past that, every queue is aborted (buffered
//! datums are discarded) and workers exit after their in-flight datum.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Condvar, Mutex};

use super::{Completion, NodeReport, RunId, RunReport, RuntimeStatus};
use crate::core::executor::{
    run_consumer_loop, run_provider_loop, spawn_worker, ConsumerStage, NodeCounters, RunSignals,
    WorkerContext, WorkerExit, WorkerGuard,
};
use crate::core::graph::StageLogic;
use crate::core::observability::{MetricsSink, QueueMonitor, QueueSnapshot};
use crate::core::{
    BoundedQueue, Datum, NodeId, NodeKind, Result, StreamConfig, StreamError, StreamGraph,
    TimeoutSupervisor,
};

/// Extra time `stop()` waits for the coordinator beyond its own drain and
/// force windows.
const STOP_ACK_GRACE: Duration = Duration::from_secs(1);

const MIN_METRICS_INTERVAL: Duration = Duration::from_millis(1);

/// A node after queues are wired, before its workers start.
struct PreparedNode {
    id: NodeId,
    parallelism: usize,
    stage: StageLogic,
    inbound: Option<Arc<BoundedQueue<Datum>>>,
    outbound: Vec<Arc<BoundedQueue<Datum>>>,
    counters: Arc<NodeCounters>,
}

impl PreparedNode {
    fn kind(&self) -> NodeKind {
        self.stage.kind()
    }

    fn setup(&mut self) -> Result<()> {
        match &mut self.stage {
            StageLogic::Provider { provider, .. } => provider.setup(),
            StageLogic::Processor(processor) => processor.setup(),
            StageLogic::Writer(writer) => writer.setup(),
        }
    }

    fn teardown(&mut self) {
        match &mut self.stage {
            StageLogic::Provider { provider, .. } => provider.teardown(),
            StageLogic::Processor(processor) => processor.teardown(),
            StageLogic::Writer(writer) => writer.teardown(),
        }
    }
}

/// Counters and teardown handle kept by the coordinator for each node.
struct RunningNode {
    id: NodeId,
    kind: NodeKind,
    parallelism: usize,
    counters: Arc<NodeCounters>,
    consumer: Option<ConsumerStage>,
}

/// A built stream graph that can run exactly once.
///
/// `LocalStream` is `Sync`: share it through an `Arc` to call
/// [`stop`](Self::stop) from another thread while [`start`](Self::start)
/// blocks.
pub struct LocalStream {
    run_id: RunId,
    config: StreamConfig,
    graph: Mutex<Option<StreamGraph>>,
    metrics_sink: Option<Arc<dyn MetricsSink>>,
    status: Mutex<RuntimeStatus>,
    status_changed: Condvar,
    stop_tx: Sender<()>,
    stop_rx: Receiver<()>,
    live_workers: Arc<AtomicUsize>,
    monitor: Mutex<Option<Arc<QueueMonitor>>>,
}

impl LocalStream {
    pub(crate) fn new(
        graph: StreamGraph,
        config: StreamConfig,
        metrics_sink: Option<Arc<dyn MetricsSink>>,
    ) -> Self {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
        Self {
            run_id: RunId::new(),
            config,
            graph: Mutex::new(Some(graph)),
            metrics_sink,
            status: Mutex::new(RuntimeStatus::Initial),
            status_changed: Condvar::new(),
            stop_tx,
            stop_rx,
            live_workers: Arc::new(AtomicUsize::new(0)),
            monitor: Mutex::new(None),
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn status(&self) -> RuntimeStatus {
        *self.status.lock()
    }

    /// Worker threads currently running.
    pub fn live_workers(&self) -> usize {
        self.live_workers.load(Ordering::Acquire)
    }

    /// Instantaneous state of every inbound queue. Empty before start.
    pub fn queue_snapshots(&self) -> Vec<QueueSnapshot> {
        self.monitor
            .lock()
            .as_ref()
            .map(|monitor| monitor.snapshots())
            .unwrap_or_default()
    }

    // =========================================================================
    // Start
    // =========================================================================

    /// Run the graph, blocking until it completes naturally or is stopped.
    pub fn start(&self) -> Result<RunReport> {
        {
            let mut status = self.status.lock();
            if *status != RuntimeStatus::Initial {
                return Err(StreamError::AlreadyStarted);
            }
            *status = RuntimeStatus::Starting;
        }
        let Some(graph) = self.graph.lock().take() else {
            return Err(StreamError::AlreadyStarted);
        };

        let result = self.run(graph);
        if let Err(e) = &result {
            tracing::warn!("[{}] Stream failed to start: {}", self.run_id, e);
        }
        self.set_status(RuntimeStatus::Stopped);
        result
    }

    fn run(&self, graph: StreamGraph) -> Result<RunReport> {
        let started_at = Instant::now();
        tracing::info!(
            "[{}] Starting stream: {} nodes, {} edges",
            self.run_id,
            graph.node_count(),
            graph.edge_count()
        );

        let mut prepared = self.wire(graph)?;
        self.setup_stages(&mut prepared)?;

        let queues: Vec<(NodeId, Arc<BoundedQueue<Datum>>)> = prepared
            .iter()
            .filter_map(|node| node.inbound.clone().map(|q| (node.id.clone(), q)))
            .collect();
        let monitor = Arc::new(QueueMonitor::new(queues));
        *self.monitor.lock() = Some(monitor.clone());

        let signals = Arc::new(RunSignals::new());
        let (exit_tx, exit_rx) = crossbeam_channel::unbounded();
        let mut handles = Vec::new();
        let running = match self.spawn_all(prepared, &signals, exit_tx, &mut handles) {
            Ok(running) => running,
            Err(e) => {
                signals.force();
                abort_queues(&monitor);
                join_all(&self.run_id, handles);
                return Err(e);
            }
        };

        self.set_status(RuntimeStatus::Started);
        tracing::info!(
            "[{}] Stream started with {} workers",
            self.run_id,
            handles.len()
        );

        let (completion, discarded, exited) =
            self.coordinate(&signals, &exit_rx, &monitor, handles.len());

        join_finished(&self.run_id, handles, exited, &exit_rx, self.config.shutdown_timeout);

        for node in &running {
            if let Some(stage) = &node.consumer {
                stage.teardown();
            }
        }
        self.publish_metrics(&monitor);

        let report = RunReport {
            run_id: self.run_id.clone(),
            completion,
            elapsed: started_at.elapsed(),
            discarded,
            nodes: running
                .iter()
                .map(|node| NodeReport {
                    node_id: node.id.clone(),
                    kind: node.kind,
                    parallelism: node.parallelism,
                    received: node.counters.received(),
                    emitted: node.counters.emitted(),
                    failed: node.counters.failed(),
                })
                .collect(),
        };
        tracing::info!(
            "[{}] Stream finished ({:?}) in {:?}",
            self.run_id,
            report.completion,
            report.elapsed
        );
        Ok(report)
    }

    /// Create one inbound queue per consumer node and connect every node to
    /// the queues of its downstreams.
    fn wire(&self, graph: StreamGraph) -> Result<Vec<PreparedNode>> {
        let downstreams: HashMap<NodeId, Vec<NodeId>> = graph
            .nodes()
            .map(|node| {
                let ids = graph.downstreams(node.id()).into_iter().cloned().collect();
                (node.id().clone(), ids)
            })
            .collect();
        let worker_counts: HashMap<NodeId, usize> = graph
            .nodes()
            .map(|node| (node.id().clone(), node.parallelism()))
            .collect();

        let mut queues: HashMap<NodeId, Arc<BoundedQueue<Datum>>> = HashMap::new();
        let mut prepared = Vec::with_capacity(graph.node_count());
        for node in graph.into_sorted_nodes()? {
            let (id, parallelism, upstreams, stage) = node.into_parts();
            let inbound = if stage.kind() == NodeKind::Provider {
                None
            } else {
                let queue = Arc::new(BoundedQueue::new(id.as_str(), self.config.queue_capacity));
                let producers: usize = upstreams
                    .iter()
                    .map(|up| worker_counts.get(up).copied().unwrap_or(0))
                    .sum();
                queue.register_producers(producers);
                queues.insert(id.clone(), queue.clone());
                Some(queue)
            };
            prepared.push(PreparedNode {
                id,
                parallelism,
                stage,
                inbound,
                outbound: Vec::new(),
                counters: Arc::new(NodeCounters::default()),
            });
        }

        for node in &mut prepared {
            node.outbound = downstreams
                .get(&node.id)
                .into_iter()
                .flatten()
                .filter_map(|down| queues.get(down).cloned())
                .collect();
            tracing::debug!(
                "[{}] Wired {} with {} outbound edge(s)",
                node.id,
                node.kind(),
                node.outbound.len()
            );
        }
        Ok(prepared)
    }

    /// Run setup hooks in topological order, unwinding on the first failure.
    fn setup_stages(&self, prepared: &mut [PreparedNode]) -> Result<()> {
        for i in 0..prepared.len() {
            if let Err(e) = prepared[i].setup() {
                let node = prepared[i].id.to_string();
                tracing::warn!("[{}] Setup failed: {}", node, e);
                for done in prepared[..i].iter_mut().rev() {
                    done.teardown();
                }
                return Err(StreamError::StageSetup {
                    node,
                    reason: e.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Spawn consumers first, downstream to upstream, then providers.
    ///
    /// Handles of every thread spawned so far are pushed to `handles`, also
    /// when a later spawn fails.
    fn spawn_all(
        &self,
        prepared: Vec<PreparedNode>,
        signals: &Arc<RunSignals>,
        exit_tx: Sender<WorkerExit>,
        handles: &mut Vec<JoinHandle<()>>,
    ) -> Result<Vec<RunningNode>> {
        let supervisor = TimeoutSupervisor::new(self.config.timeout);
        let mut running = Vec::with_capacity(prepared.len());
        let mut providers = Vec::new();

        for node in prepared.into_iter().rev() {
            let PreparedNode {
                id,
                parallelism,
                stage,
                inbound,
                outbound,
                counters,
            } = node;
            let kind = stage.kind();

            let (consumer, inbound) = match (stage, inbound) {
                (StageLogic::Processor(p), Some(q)) => (ConsumerStage::Processor(p), q),
                (StageLogic::Writer(w), Some(q)) => (ConsumerStage::Writer(w), q),
                (StageLogic::Provider { provider, mode }, _) => {
                    providers.push((id.clone(), provider, mode, outbound, counters.clone()));
                    running.push(RunningNode {
                        id,
                        kind,
                        parallelism,
                        counters,
                        consumer: None,
                    });
                    continue;
                }
                (_, None) => {
                    return Err(StreamError::Runtime(format!(
                        "consumer '{}' has no inbound queue",
                        id
                    )));
                }
            };

            for worker_index in 0..parallelism {
                let ctx = WorkerContext {
                    node: id.clone(),
                    worker_index,
                    outbound: outbound.clone(),
                    signals: signals.clone(),
                    supervisor,
                    counters: counters.clone(),
                };
                let guard = WorkerGuard::new(
                    id.clone(),
                    worker_index,
                    outbound.clone(),
                    self.live_workers.clone(),
                    exit_tx.clone(),
                );
                let inbound = inbound.clone();
                let stage = consumer.clone();
                handles.push(spawn_worker(
                    format!("{}-{}", id, worker_index),
                    guard,
                    move || run_consumer_loop(ctx, inbound, stage),
                )?);
            }
            running.push(RunningNode {
                id,
                kind,
                parallelism,
                counters,
                consumer: Some(consumer),
            });
        }

        for (id, provider, mode, outbound, counters) in providers {
            let ctx = WorkerContext {
                node: id.clone(),
                worker_index: 0,
                outbound: outbound.clone(),
                signals: signals.clone(),
                supervisor,
                counters,
            };
            let guard = WorkerGuard::new(
                id.clone(),
                0,
                outbound,
                self.live_workers.clone(),
                exit_tx.clone(),
            );
            handles.push(spawn_worker(format!("{}-0", id), guard, move || {
                run_provider_loop(ctx, provider, mode)
            })?);
        }

        running.reverse();
        Ok(running)
    }

    // =========================================================================
    // Coordination
    // =========================================================================

    /// Block until every worker has exited or a forced shutdown fires.
    ///
    /// Returns how the run ended, how many buffered datums were discarded and
    /// how many workers had exited.
    fn coordinate(
        &self,
        signals: &RunSignals,
        exit_rx: &Receiver<WorkerExit>,
        monitor: &QueueMonitor,
        expected_workers: usize,
    ) -> (Completion, u64, usize) {
        let metrics_tick = match self.metrics_sink {
            Some(_) => crossbeam_channel::tick(self.config.metrics_interval.max(MIN_METRICS_INTERVAL)),
            None => crossbeam_channel::never(),
        };
        let mut exited = 0;
        let mut completion = Completion::Natural;
        let mut drain_deadline: Option<Instant> = None;

        while exited < expected_workers {
            let deadline = match drain_deadline {
                Some(at) => crossbeam_channel::at(at),
                None => crossbeam_channel::never(),
            };
            crossbeam_channel::select! {
                recv(exit_rx) -> msg => match msg {
                    Ok(exit) => {
                        exited += 1;
                        tracing::trace!(
                            "[{}] Worker {}-{} exited ({}/{})",
                            self.run_id,
                            exit.node,
                            exit.worker_index,
                            exited,
                            expected_workers
                        );
                    }
                    Err(_) => break,
                },
                recv(self.stop_rx) -> _ => {
                    if drain_deadline.is_none() {
                        tracing::info!(
                            "[{}] Stop requested, draining for up to {:?}",
                            self.run_id,
                            self.config.shutdown_timeout
                        );
                        signals.request_stop();
                        self.set_status(RuntimeStatus::Stopping);
                        completion = Completion::Stopped;
                        drain_deadline = Some(Instant::now() + self.config.shutdown_timeout);
                    }
                },
                recv(metrics_tick) -> _ => self.publish_metrics(monitor),
                recv(deadline) -> _ => {
                    tracing::warn!(
                        "[{}] Drain exceeded {:?}, forcing shutdown of {} worker(s)",
                        self.run_id,
                        self.config.shutdown_timeout,
                        expected_workers - exited
                    );
                    signals.force();
                    let discarded = abort_queues(monitor);
                    if discarded > 0 {
                        tracing::warn!(
                            "[{}] Discarded {} buffered datum(s)",
                            self.run_id,
                            discarded
                        );
                    }
                    return (Completion::Forced, discarded, exited);
                },
            }
        }

        if completion == Completion::Natural {
            tracing::debug!("[{}] All providers exhausted and queues drained", self.run_id);
        }
        (completion, 0, exited)
    }

    fn publish_metrics(&self, monitor: &QueueMonitor) {
        let Some(sink) = &self.metrics_sink else {
            return;
        };
        for snapshot in monitor.snapshots() {
            sink.record(&snapshot);
        }
        sink.flush();
    }

    fn set_status(&self, next: RuntimeStatus) {
        let mut status = self.status.lock();
        // A drain that is already underway is never reported as Started again.
        if *status == RuntimeStatus::Stopped
            || (*status == RuntimeStatus::Stopping && next == RuntimeStatus::Started)
        {
            return;
        }
        tracing::debug!("[{}] {:?} -> {:?}", self.run_id, *status, next);
        *status = next;
        self.status_changed.notify_all();
    }

    // =========================================================================
    // Stop
    // =========================================================================

    /// Stop the stream, returning once it has shut down.
    ///
    /// Before `start()` the request is remembered and the run ends as soon as
    /// it begins. After the run has finished this does nothing. The wait is
    /// bounded: a stage that never returns cannot wedge the caller.
    pub fn stop(&self) {
        let status = self.status();
        if status == RuntimeStatus::Stopped {
            return;
        }
        // Full channel means a stop is already pending.
        let _ = self.stop_tx.try_send(());
        if status == RuntimeStatus::Initial {
            tracing::info!("[{}] Stop requested before start", self.run_id);
            return;
        }

        let deadline = Instant::now() + self.config.shutdown_timeout * 2 + STOP_ACK_GRACE;
        let mut status = self.status.lock();
        while *status != RuntimeStatus::Stopped {
            if self
                .status_changed
                .wait_until(&mut status, deadline)
                .timed_out()
            {
                tracing::warn!(
                    "[{}] Stream did not acknowledge stop in time (status {:?})",
                    self.run_id,
                    *status
                );
                break;
            }
        }
    }
}

impl std::fmt::Debug for LocalStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStream")
            .field("run_id", &self.run_id)
            .field("status", &self.status())
            .field("live_workers", &self.live_workers())
            .finish()
    }
}

fn abort_queues(monitor: &QueueMonitor) -> u64 {
    monitor
        .queues()
        .map(|(_, queue)| queue.abort() as u64)
        .sum()
}

fn join_all(run_id: &RunId, handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        if handle.join().is_err() {
            tracing::warn!("[{}] Worker thread panicked", run_id);
        }
    }
}

/// Join workers, giving stragglers one more shutdown window to finish their
/// in-flight datum. Threads still busy after that are detached.
fn join_finished(
    run_id: &RunId,
    handles: Vec<JoinHandle<()>>,
    mut exited: usize,
    exit_rx: &Receiver<WorkerExit>,
    window: Duration,
) {
    let deadline = Instant::now() + window;
    while exited < handles.len() {
        match exit_rx.recv_deadline(deadline) {
            Ok(_) => exited += 1,
            Err(_) => break,
        }
    }
    // Exit messages are sent just before a thread ends.
    let settle = Instant::now() + Duration::from_millis(50);
    while Instant::now() < settle && handles.iter().any(|h| !h.is_finished()) {
        std::thread::sleep(Duration::from_millis(1));
    }

    let (finished, stuck): (Vec<_>, Vec<_>) = handles.into_iter().partition(|h| h.is_finished());
    join_all(run_id, finished);
    for handle in stuck {
        tracing::warn!(
            "[{}] Worker {:?} still inside stage logic after forced shutdown, detaching",
            run_id,
            handle.thread().name()
        );
    }
}
