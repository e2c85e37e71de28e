// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Worker thread main loops.
//!
//! Provider workers poll their provider and fan each datum out to every
//! downstream queue. Processor and writer workers compete for items on the
//! node's inbound queue until it is closed and drained.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::{fan_out, NodeCounters, RunSignals};
use crate::core::{
    BoundedQueue, Datum, NodeId, Processor, Provider, ReadMode, Result, Take, TimeoutSupervisor,
    Writer,
};

/// Everything a worker shares with the rest of its run.
pub(crate) struct WorkerContext {
    pub node: NodeId,
    pub worker_index: usize,
    pub outbound: Vec<Arc<BoundedQueue<Datum>>>,
    pub signals: Arc<RunSignals>,
    pub supervisor: TimeoutSupervisor,
    pub counters: Arc<NodeCounters>,
}

/// Stage logic driven by a consumer worker.
#[derive(Clone)]
pub(crate) enum ConsumerStage {
    Processor(Arc<dyn Processor>),
    Writer(Arc<dyn Writer>),
}

impl ConsumerStage {
    pub fn teardown(&self) {
        match self {
            ConsumerStage::Processor(p) => p.teardown(),
            ConsumerStage::Writer(w) => w.teardown(),
        }
    }
}

/// Run a provider until it is exhausted, idles past the timeout, or the run
/// is stopped. Provider teardown happens here, on the worker thread.
pub(crate) fn run_provider_loop(
    ctx: WorkerContext,
    mut provider: Box<dyn Provider>,
    mode: ReadMode,
) {
    let id = &ctx.node;
    tracing::debug!("[{}] Provider started ({})", id, mode.description());

    let poll_interval = ctx.supervisor.idle_poll_interval();
    let mut idle = ctx.supervisor.idle_watch();

    loop {
        if ctx.signals.stop_requested() {
            tracing::debug!("[{}] Stop requested, provider ceasing generation", id);
            break;
        }

        let batch = match guarded(id, || mode.read_from(provider.as_mut())) {
            Some(batch) => batch,
            None => {
                ctx.counters.record_failed();
                Vec::new()
            }
        };

        if batch.is_empty() {
            if mode.is_finite() && !provider.is_running() {
                tracing::debug!("[{}] Provider exhausted", id);
                break;
            }
            if idle.is_expired() {
                tracing::warn!(
                    "[{}] Provider timed out after {:?} without data, treating as exhausted",
                    id,
                    idle.idle_for()
                );
                break;
            }
            std::thread::sleep(poll_interval);
            continue;
        }

        let produced = batch.len() as u64;
        tracing::trace!("[{}] Read batch of {}", id, produced);
        for datum in batch {
            if let Err(e) = fan_out(datum, &ctx.outbound) {
                tracing::debug!("[{}] Outbound closed, provider exiting: {}", id, e);
                return finish_provider(&ctx, provider);
            }
            ctx.counters.record_emitted(1);
        }
        idle.record_activity();
    }

    finish_provider(&ctx, provider);
}

fn finish_provider(ctx: &WorkerContext, mut provider: Box<dyn Provider>) {
    let id = &ctx.node;
    if guarded(id, || {
        provider.teardown();
        Ok(())
    })
    .is_none()
    {
        tracing::warn!("[{}] Provider teardown failed", id);
    }
    tracing::debug!(
        "[{}] Provider finished, emitted {}",
        id,
        ctx.counters.emitted()
    );
}

/// Run a processor or writer worker until its inbound queue is closed and
/// drained, or the run is forced to stop.
pub(crate) fn run_consumer_loop(
    ctx: WorkerContext,
    inbound: Arc<BoundedQueue<Datum>>,
    stage: ConsumerStage,
) {
    let id = &ctx.node;
    tracing::trace!("[{}] Worker {} waiting for input", id, ctx.worker_index);

    let take_timeout = ctx.supervisor.take_timeout();
    loop {
        let datum = match inbound.take_timeout(take_timeout) {
            Take::Item(datum) => datum,
            Take::TimedOut => {
                if ctx.signals.is_forced() {
                    break;
                }
                continue;
            }
            Take::Closed => break,
        };
        ctx.counters.record_received();
        tracing::trace!("[{}] Worker {} took {}", id, ctx.worker_index, datum.identity());

        match &stage {
            ConsumerStage::Processor(processor) => {
                let Some(outputs) = guarded(id, || processor.process(datum)) else {
                    ctx.counters.record_failed();
                    continue;
                };
                for output in outputs {
                    if let Err(e) = fan_out(output, &ctx.outbound) {
                        tracing::debug!("[{}] Outbound closed, dropping output: {}", id, e);
                        break;
                    }
                    ctx.counters.record_emitted(1);
                }
            }
            ConsumerStage::Writer(writer) => {
                if guarded(id, || writer.write(datum)).is_none() {
                    ctx.counters.record_failed();
                }
            }
        }

        if ctx.signals.is_forced() {
            break;
        }
    }

    tracing::trace!("[{}] Worker {} done", id, ctx.worker_index);
}

/// Run stage logic, isolating both returned errors and panics.
fn guarded<T>(id: &NodeId, f: impl FnOnce() -> Result<T>) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            tracing::warn!("[{}] Stage execution error, datum dropped: {}", id, e);
            None
        }
        Err(payload) => {
            tracing::warn!(
                "[{}] Stage panicked, datum dropped: {}",
                id,
                panic_message(payload.as_ref())
            );
            None
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}
