//! Request/response dispatch for route recomputation.

use std::{
    collections::{BTreeMap, VecDeque},
    sync::Arc,
    thread::JoinHandle,
    time::Duration,
};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use grid_defence_core::CellCoord;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{solve, WalkGrid};

/// Where route requests are computed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Computed on the calling thread at submission time.
    #[default]
    Inline,
    /// Computed on a dedicated worker thread.
    Worker,
}

/// Identifier correlating a response with its request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    /// Numeric value of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// A computed route.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathResponse {
    /// Request this answers.
    pub id: RequestId,
    /// Cells from the requested start to the goal, or the direct two-point
    /// line when the goal was unreachable.
    pub route: Vec<CellCoord>,
    /// Whether a real route was found.
    pub reached: bool,
}

#[derive(Clone, Debug)]
struct Job {
    id: RequestId,
    grid: Arc<WalkGrid>,
    start: CellCoord,
    goal: CellCoord,
}

impl Job {
    fn run(&self) -> PathResponse {
        match solve(&self.grid, self.start, self.goal) {
            Some(route) => PathResponse {
                id: self.id,
                route,
                reached: true,
            },
            None => {
                warn!(
                    start = ?self.start,
                    goal = ?self.goal,
                    "no route to goal, using direct line"
                );
                PathResponse {
                    id: self.id,
                    route: vec![self.start, self.goal],
                    reached: false,
                }
            }
        }
    }
}

struct Worker {
    jobs: Option<Sender<Job>>,
    responses: Receiver<PathResponse>,
    handle: Option<JoinHandle<()>>,
    outstanding: BTreeMap<RequestId, Job>,
}

enum Backend {
    Inline,
    Worker(Worker),
}

/// Dispatches A* requests and hands back responses through [`poll`].
///
/// Both modes deliver results the same way: inline results are queued at
/// submission and surface on the next poll, worker results surface whenever
/// the thread finishes them. If the worker thread cannot be started, or dies,
/// outstanding requests are computed inline instead.
///
/// [`poll`]: PathfindingService::poll
pub struct PathfindingService {
    next_id: u64,
    ready: VecDeque<PathResponse>,
    backend: Backend,
}

impl std::fmt::Debug for PathfindingService {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("PathfindingService")
            .field("mode", &self.mode())
            .field("next_id", &self.next_id)
            .field("ready", &self.ready.len())
            .finish()
    }
}

impl PathfindingService {
    /// Creates a service in the requested mode.
    #[must_use]
    pub fn new(mode: Mode) -> Self {
        let backend = match mode {
            Mode::Inline => Backend::Inline,
            Mode::Worker => match spawn_worker() {
                Ok(worker) => Backend::Worker(worker),
                Err(error) => {
                    warn!(%error, "pathfinding worker unavailable, computing inline");
                    Backend::Inline
                }
            },
        };

        Self {
            next_id: 0,
            ready: VecDeque::new(),
            backend,
        }
    }

    /// Mode the service is actually running in.
    #[must_use]
    pub fn mode(&self) -> Mode {
        match self.backend {
            Backend::Inline => Mode::Inline,
            Backend::Worker(_) => Mode::Worker,
        }
    }

    /// Queues a route request and returns its identifier.
    pub fn submit(&mut self, grid: Arc<WalkGrid>, start: CellCoord, goal: CellCoord) -> RequestId {
        let id = RequestId(self.next_id);
        self.next_id += 1;
        let job = Job {
            id,
            grid,
            start,
            goal,
        };

        if let Backend::Worker(worker) = &mut self.backend {
            let sent = worker
                .jobs
                .as_ref()
                .map(|jobs| jobs.send(job.clone()).is_ok())
                .unwrap_or(false);
            if sent {
                let _ = worker.outstanding.insert(id, job);
                return id;
            }
            self.fall_back_inline();
        }

        self.ready.push_back(job.run());
        id
    }

    /// Moves every finished response into `out`.
    pub fn poll(&mut self, out: &mut Vec<PathResponse>) {
        let mut disconnected = false;
        if let Backend::Worker(worker) = &mut self.backend {
            loop {
                match worker.responses.try_recv() {
                    Ok(response) => {
                        let _ = worker.outstanding.remove(&response.id);
                        self.ready.push_back(response);
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        disconnected = true;
                        break;
                    }
                }
            }
        }
        if disconnected {
            self.fall_back_inline();
        }

        out.extend(self.ready.drain(..));
    }

    /// Blocks until at least one response is available or `timeout` elapses,
    /// then behaves like [`PathfindingService::poll`].
    pub fn wait(&mut self, timeout: Duration, out: &mut Vec<PathResponse>) {
        let mut disconnected = false;
        if self.ready.is_empty() {
            if let Backend::Worker(worker) = &mut self.backend {
                if !worker.outstanding.is_empty() {
                    match worker.responses.recv_timeout(timeout) {
                        Ok(response) => {
                            let _ = worker.outstanding.remove(&response.id);
                            self.ready.push_back(response);
                        }
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => disconnected = true,
                    }
                }
            }
        }
        if disconnected {
            self.fall_back_inline();
        }
        self.poll(out);
    }

    /// Number of requests submitted to the worker and not yet answered.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        match &self.backend {
            Backend::Inline => 0,
            Backend::Worker(worker) => worker.outstanding.len(),
        }
    }

    fn fall_back_inline(&mut self) {
        let backend = std::mem::replace(&mut self.backend, Backend::Inline);
        if let Backend::Worker(mut worker) = backend {
            warn!(
                outstanding = worker.outstanding.len(),
                "pathfinding worker lost, computing inline"
            );
            while let Ok(response) = worker.responses.try_recv() {
                let _ = worker.outstanding.remove(&response.id);
                self.ready.push_back(response);
            }
            for job in std::mem::take(&mut worker.outstanding).into_values() {
                self.ready.push_back(job.run());
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        drop(self.jobs.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("pathfinding worker panicked");
            }
        }
    }
}

fn spawn_worker() -> std::io::Result<Worker> {
    let (job_sender, job_receiver) = unbounded::<Job>();
    let (response_sender, response_receiver) = unbounded::<PathResponse>();

    let handle = std::thread::Builder::new()
        .name("pathfinding".to_owned())
        .spawn(move || {
            for job in job_receiver.iter() {
                if response_sender.send(job.run()).is_err() {
                    break;
                }
            }
            debug!("pathfinding worker stopped");
        })?;

    Ok(Worker {
        jobs: Some(job_sender),
        responses: response_receiver,
        handle: Some(handle),
        outstanding: BTreeMap::new(),
    })
}
