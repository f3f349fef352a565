//! The supervisor thread: sole owner of every simulator child process.
//!
//! ```text
//! Controller                     Supervisor thread
//!     |--Adopt{slot, child}------>| tracked.push
//!     |--Stop{slot, reply}------->| SIGTERM, deadline = now + grace
//!     |   blocks on reply         | ...poll every `poll_interval`...
//!     |<--StopOutcome-------------| exited, or deadline passed → SIGKILL
//!     |--Shutdown{reply}--------->| stop every child, exit when none remain
//! ```
//!
//! Every state change is applied under the run's mutex, so readers never
//! observe a half-updated run.

use std::process::{Child, ExitStatus};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use afsim_core::{RunState, SimulationRun};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::RunError;
use crate::process::{describe, terminate};

/// Shared handle to one run record.
pub(crate) type RunSlot = Arc<Mutex<SimulationRun>>;

pub(crate) fn lock(slot: &RunSlot) -> MutexGuard<'_, SimulationRun> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// What a stop request achieved.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StopOutcome {
    /// The run after the request was handled.
    pub run: SimulationRun,
    /// The run was RUNNING when the request arrived.
    pub was_running: bool,
    /// Set when the process outlived the grace period and was killed.
    pub escalated_after: Option<Duration>,
}

impl StopOutcome {
    /// A request that found the run already finished.
    pub(crate) fn unchanged(run: SimulationRun) -> Self {
        Self {
            run,
            was_running: false,
            escalated_after: None,
        }
    }

    /// Final state of the run.
    pub fn state(&self) -> RunState {
        self.run.state()
    }

    /// The timeout warning, if the stop had to escalate.
    pub fn timeout(&self) -> Option<RunError> {
        self.escalated_after.map(|grace| RunError::StopTimeout {
            id: self.run.id(),
            grace,
        })
    }
}

pub(crate) enum Request {
    Adopt { slot: RunSlot, child: Child },
    Stop { slot: RunSlot, reply: Sender<StopOutcome> },
    Shutdown { reply: Sender<Vec<StopOutcome>> },
}

struct PendingStop {
    deadline: Instant,
    replies: Vec<Sender<StopOutcome>>,
}

struct Tracked {
    slot: RunSlot,
    child: Child,
    stop: Option<PendingStop>,
}

enum Ended {
    Exited(ExitStatus),
    Killed(Option<ExitStatus>),
    Lost(std::io::Error),
}

pub(crate) struct Supervisor {
    rx: Receiver<Request>,
    poll_interval: Duration,
    grace: Duration,
    tracked: Vec<Tracked>,
    draining: bool,
    disconnected: bool,
    shutdown_reply: Option<Sender<Vec<StopOutcome>>>,
    stopped_in_drain: Vec<StopOutcome>,
}

impl Supervisor {
    pub(crate) fn new(rx: Receiver<Request>, poll_interval: Duration, grace: Duration) -> Self {
        Self {
            rx,
            poll_interval,
            grace,
            tracked: Vec::new(),
            draining: false,
            disconnected: false,
            shutdown_reply: None,
            stopped_in_drain: Vec::new(),
        }
    }

    /// Serve requests and poll children until shut down with nothing left.
    pub(crate) fn run(mut self) {
        loop {
            if self.disconnected {
                thread::sleep(self.poll_interval);
            } else {
                match self.rx.recv_timeout(self.poll_interval) {
                    Ok(request) => self.handle(request),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => {
                        self.disconnected = true;
                        self.begin_drain();
                    }
                }
            }
            self.reap(Instant::now());
            if self.draining && self.tracked.is_empty() {
                if let Some(reply) = self.shutdown_reply.take() {
                    let _ = reply.send(std::mem::take(&mut self.stopped_in_drain));
                }
                info!("run supervisor exiting");
                return;
            }
        }
    }

    fn handle(&mut self, request: Request) {
        match request {
            Request::Adopt { slot, child } => {
                let mut tracked = Tracked {
                    slot,
                    child,
                    stop: None,
                };
                if self.draining {
                    Self::signal(&mut tracked, self.grace, None);
                }
                self.tracked.push(tracked);
            }
            Request::Stop { slot, reply } => {
                let id = lock(&slot).id();
                let grace = self.grace;
                match self.tracked.iter_mut().find(|t| lock(&t.slot).id() == id) {
                    Some(tracked) => Self::signal(tracked, grace, Some(reply)),
                    None => {
                        let _ = reply.send(StopOutcome::unchanged(lock(&slot).clone()));
                    }
                }
            }
            Request::Shutdown { reply } => {
                self.shutdown_reply = Some(reply);
                self.begin_drain();
            }
        }
    }

    fn begin_drain(&mut self) {
        if !self.draining {
            info!(running = self.tracked.len(), "run supervisor draining");
        }
        self.draining = true;
        let grace = self.grace;
        for tracked in &mut self.tracked {
            Self::signal(tracked, grace, None);
        }
    }

    /// SIGTERM on the first request; later requests just wait for the
    /// same deadline.
    fn signal(tracked: &mut Tracked, grace: Duration, reply: Option<Sender<StopOutcome>>) {
        let stop = tracked.stop.get_or_insert_with(|| {
            let id = lock(&tracked.slot).id();
            match terminate(&mut tracked.child) {
                Ok(()) => info!(run = %id, "SIGTERM sent"),
                // Usually the process already exited; the next poll reaps it.
                Err(e) => warn!(run = %id, error = %e, "could not signal simulator"),
            }
            PendingStop {
                deadline: Instant::now() + grace,
                replies: Vec::new(),
            }
        });
        stop.replies.extend(reply);
    }

    fn reap(&mut self, now: Instant) {
        for mut tracked in std::mem::take(&mut self.tracked) {
            let overdue = tracked
                .stop
                .as_ref()
                .is_some_and(|stop| now >= stop.deadline);
            let ended = match tracked.child.try_wait() {
                Ok(Some(status)) => Ended::Exited(status),
                Ok(None) if overdue => {
                    if let Err(e) = tracked.child.kill() {
                        warn!(error = %e, "SIGKILL failed");
                    }
                    Ended::Killed(tracked.child.wait().ok())
                }
                Ok(None) => {
                    self.tracked.push(tracked);
                    continue;
                }
                Err(e) => Ended::Lost(e),
            };
            self.finish(tracked, ended);
        }
    }

    fn finish(&mut self, tracked: Tracked, ended: Ended) {
        let Tracked { slot, stop, .. } = tracked;
        let mut run = lock(&slot);
        let id = run.id();
        let escalated = matches!(ended, Ended::Killed(_));
        let (code, message) = match &ended {
            Ended::Exited(status) | Ended::Killed(Some(status)) => describe(*status),
            Ended::Killed(None) => (None, "simulator killed".to_string()),
            Ended::Lost(e) => (None, format!("lost track of simulator process: {e}")),
        };

        let applied = match (&stop, &ended) {
            (_, Ended::Lost(_)) => {
                error!(run = %id, "{message}");
                run.fail(code, message)
            }
            (Some(_), _) => {
                let result = run.stop(code);
                if escalated {
                    let warning = RunError::StopTimeout {
                        id,
                        grace: self.grace,
                    };
                    warn!(run = %id, "{warning}");
                    run.push_warning(warning.to_string());
                } else {
                    info!(run = %id, exit_code = ?code, "simulation stopped");
                }
                result
            }
            (None, Ended::Exited(status)) if status.success() => {
                info!(run = %id, "simulation completed");
                run.complete(code)
            }
            (None, _) => {
                warn!(run = %id, "{message}");
                run.fail(code, message)
            }
        };
        if let Err(e) = applied {
            error!(run = %id, error = %e, "run state not updated");
        }

        if let Some(stop) = stop {
            let outcome = StopOutcome {
                run: run.clone(),
                was_running: true,
                escalated_after: escalated.then_some(self.grace),
            };
            for reply in stop.replies {
                let _ = reply.send(outcome.clone());
            }
            if self.draining {
                self.stopped_in_drain.push(outcome);
            }
        }
    }
}
