//! Pooled offloaded computation.
//!
//! Each target name owns a pool of isolated units. A unit is a spawned
//! task looping over a job channel; the actual compute function runs on
//! the blocking thread pool so CPU work never stalls the async runtime.
//!
//! Pool rules:
//!
//! - units are created lazily, up to `max_units_per_target`;
//! - at capacity, tasks queue for the next unit to free;
//! - a per-task timeout abandons the stuck unit (the blocking closure
//!   cannot be interrupted) and frees its slot for a fresh one; the
//!   caller always gets an error;
//! - a unit panic is caught at the join point and delivered as an
//!   error, with the unit kept alive for the next job.

use super::{ComputeFn, ServiceInner};
use clockwork_effect::{ComputeEffect, Dispatch, EffectError};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Erased terminal-outcome callback: success or error, exactly once.
type Deliver = Box<dyn FnOnce(Result<Value, EffectError>) + Send>;

struct Job {
    payload: Value,
    reply: oneshot::Sender<Result<Value, EffectError>>,
}

struct UnitSlot {
    id: u64,
    busy: bool,
    job_tx: mpsc::UnboundedSender<Job>,
    task: JoinHandle<()>,
}

struct PendingTask {
    payload: Value,
    timeout: Option<Duration>,
    deliver: Deliver,
}

/// Per-target pool bookkeeping.
///
/// Mutated only under the service's pool mutex, from submission and
/// completion handlers.
#[derive(Default)]
pub(crate) struct TargetPool {
    units: Vec<UnitSlot>,
    pending: VecDeque<PendingTask>,
    next_unit: u64,
}

impl TargetPool {
    pub(crate) fn abort_units(&self) {
        for unit in &self.units {
            unit.task.abort();
        }
    }

    #[cfg(test)]
    pub(crate) fn unit_count(&self) -> usize {
        self.units.len()
    }
}

enum Placement {
    Run(u64, mpsc::UnboundedSender<Job>, PendingTask),
    Queued,
    Fail(PendingTask),
}

/// Entry point for one compute effect.
pub(crate) fn submit<M: Send + 'static>(
    inner: Arc<ServiceInner>,
    effect: ComputeEffect<M>,
    dispatch: Dispatch<M>,
) {
    let ComputeEffect {
        task_id,
        target,
        payload,
        timeout,
        on_success,
        on_error,
    } = effect;

    let func = inner.targets.lock().get(&target).cloned();
    let Some(func) = func else {
        // Never silently discard a malformed submission: the effect's
        // own error mapping answers the caller synchronously.
        warn!(%task_id, target = %target, "unknown compute target");
        dispatch.send(on_error(EffectError::UnknownTarget { target }));
        return;
    };

    debug!(%task_id, target = %target, "compute submitted");
    let deliver: Deliver = Box::new(move |outcome| match outcome {
        Ok(value) => dispatch.send(on_success(value)),
        Err(err) => dispatch.send(on_error(err)),
    });
    let task = PendingTask {
        payload,
        timeout,
        deliver,
    };

    let placement = {
        let mut pools = inner.pools.lock();
        let pool = pools.entry(target.clone()).or_default();
        place(pool, task, Some(&func), &inner, &target)
    };
    settle(inner, target, placement);
}

/// Finds a home for a task: an idle unit, a freshly created unit, or
/// the pending queue. Must be called with the pool mutex held.
fn place(
    pool: &mut TargetPool,
    task: PendingTask,
    func: Option<&Arc<ComputeFn>>,
    inner: &Arc<ServiceInner>,
    target: &str,
) -> Placement {
    if let Some(idx) = pool.units.iter().position(|u| !u.busy) {
        let slot = &mut pool.units[idx];
        slot.busy = true;
        return Placement::Run(slot.id, slot.job_tx.clone(), task);
    }

    if pool.units.len() < inner.max_units_per_target {
        let Some(func) = func else {
            return Placement::Fail(task);
        };
        let id = pool.next_unit;
        pool.next_unit += 1;
        let slot = spawn_unit(inner, target, func.clone(), id);
        let job_tx = slot.job_tx.clone();
        pool.units.push(slot);
        debug!(target = %target, unit = id, units = pool.units.len(), "compute unit created");
        return Placement::Run(id, job_tx, task);
    }

    debug!(target = %target, queued = pool.pending.len() + 1, "pool at capacity, task queued");
    pool.pending.push_back(task);
    Placement::Queued
}

fn settle(inner: Arc<ServiceInner>, target: String, placement: Placement) {
    match placement {
        Placement::Run(unit_id, job_tx, task) => start_job(inner, target, unit_id, job_tx, task),
        Placement::Queued => {}
        Placement::Fail(task) => {
            (task.deliver)(Err(EffectError::UnknownTarget { target }));
        }
    }
}

fn spawn_unit(
    inner: &Arc<ServiceInner>,
    target: &str,
    func: Arc<ComputeFn>,
    id: u64,
) -> UnitSlot {
    let (job_tx, mut job_rx) = mpsc::unbounded_channel::<Job>();
    let target = target.to_string();
    let task = inner.handle.spawn(async move {
        while let Some(job) = job_rx.recv().await {
            let func = func.clone();
            let payload = job.payload;
            let joined = tokio::task::spawn_blocking(move || func(payload)).await;
            let outcome = match joined {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(message)) => Err(EffectError::Compute {
                    target: target.clone(),
                    message,
                }),
                Err(join_err) => Err(EffectError::Compute {
                    target: target.clone(),
                    message: join_failure(join_err),
                }),
            };
            // Receiver gone means the watchdog already timed out.
            let _ = job.reply.send(outcome);
        }
    });

    UnitSlot {
        id,
        busy: true,
        job_tx,
        task,
    }
}

fn join_failure(err: tokio::task::JoinError) -> String {
    if err.is_panic() {
        match err.into_panic().downcast::<String>() {
            Ok(text) => format!("unit panicked: {text}"),
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(text) => format!("unit panicked: {text}"),
                Err(_) => "unit panicked".to_string(),
            },
        }
    } else {
        err.to_string()
    }
}

enum JobEnd {
    Done(Result<Value, EffectError>),
    UnitLost,
    TimedOut,
}

fn start_job(
    inner: Arc<ServiceInner>,
    target: String,
    unit_id: u64,
    job_tx: mpsc::UnboundedSender<Job>,
    task: PendingTask,
) {
    let PendingTask {
        payload,
        timeout,
        deliver,
    } = task;

    let (reply_tx, reply_rx) = oneshot::channel();
    if job_tx
        .send(Job {
            payload,
            reply: reply_tx,
        })
        .is_err()
    {
        warn!(target = %target, unit = unit_id, "compute unit unavailable");
        remove_unit(&inner, &target, unit_id);
        deliver(Err(EffectError::Compute {
            target: target.clone(),
            message: "compute unit unavailable".into(),
        }));
        pump(inner, target);
        return;
    }

    let handle = inner.handle.clone();
    handle.spawn(async move {
        let deadline = async {
            match timeout {
                Some(duration) => tokio::time::sleep(duration).await,
                None => std::future::pending().await,
            }
        };

        let end = tokio::select! {
            reply = reply_rx => match reply {
                Ok(result) => JobEnd::Done(result),
                Err(_) => JobEnd::UnitLost,
            },
            () = deadline => JobEnd::TimedOut,
        };

        match end {
            JobEnd::Done(result) => {
                deliver(result);
                release_unit(&inner, &target, unit_id);
            }
            JobEnd::UnitLost => {
                warn!(target = %target, unit = unit_id, "compute unit lost mid-task");
                deliver(Err(EffectError::Compute {
                    target: target.clone(),
                    message: "compute unit lost".into(),
                }));
                remove_unit(&inner, &target, unit_id);
            }
            JobEnd::TimedOut => {
                let after_ms = timeout.map(|d| d.as_millis() as u64).unwrap_or_default();
                // The blocking closure cannot be interrupted; the unit
                // is abandoned and its slot freed for a fresh one.
                warn!(target = %target, unit = unit_id, after_ms, "compute task timed out, unit replaced");
                deliver(Err(EffectError::Timeout { after_ms }));
                remove_unit(&inner, &target, unit_id);
            }
        }

        pump(inner, target);
    });
}

fn release_unit(inner: &Arc<ServiceInner>, target: &str, unit_id: u64) {
    let mut pools = inner.pools.lock();
    if let Some(pool) = pools.get_mut(target) {
        if let Some(slot) = pool.units.iter_mut().find(|u| u.id == unit_id) {
            slot.busy = false;
        }
    }
}

fn remove_unit(inner: &Arc<ServiceInner>, target: &str, unit_id: u64) {
    let mut pools = inner.pools.lock();
    if let Some(pool) = pools.get_mut(target) {
        if let Some(pos) = pool.units.iter().position(|u| u.id == unit_id) {
            let slot = pool.units.remove(pos);
            slot.task.abort();
        }
    }
}

/// Drains the pending queue into whatever capacity is free.
fn pump(inner: Arc<ServiceInner>, target: String) {
    loop {
        let func = inner.targets.lock().get(&target).cloned();
        let placement = {
            let mut pools = inner.pools.lock();
            let Some(pool) = pools.get_mut(&target) else {
                return;
            };
            // Capacity check before the pop keeps the queue FIFO: a
            // popped task must never be re-queued behind its peers.
            let has_capacity = pool.units.iter().any(|u| !u.busy)
                || pool.units.len() < inner.max_units_per_target;
            if !has_capacity {
                return;
            }
            let Some(task) = pool.pending.pop_front() else {
                return;
            };
            place(pool, task, func.as_ref(), &inner, &target)
        };

        settle(inner.clone(), target.clone(), placement);
    }
}
