//! Greedy simplification loop.
//!
//! The decimator owns the mesh, the candidate queue, the face hierarchy and
//! the quadric data. Each step dequeues the cheapest candidate, drops it when
//! it went stale or would break the manifold, and otherwise executes it and
//! prices the edges around the survivor again.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle -> Initializing -> Simplifying -> Done
//! ```
//!
//! Initialization runs on [`Decimator::initialize`] or on the first
//! [`Decimator::step`] / [`Decimator::run`], whichever comes first.

use std::time::{Duration, Instant};

use decimator_config::DecimationConfig;
use topology::{Mesh, MeshBuffers, VertexId};
use tracing::{debug, error, info, trace};

use crate::DecimateError;
use crate::collapse::{EdgeCollapse, SharedData};
use crate::face_bvh::{FaceBvh, build_face_bvh};
use crate::queue::{BinaryHeapQueue, PriorityQueue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecimatorState {
    Idle,
    Initializing,
    Simplifying,
    Done,
}

/// Why the loop stopped
#[derive(Debug, Clone, PartialEq)]
pub enum TerminationReason {
    FaceTarget,
    VertexTarget,
    MaxOperations,
    MaxError,
    Timeout,
    QueueExhausted,
    /// A collapse failed and the loop was abandoned
    Aborted(String),
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FaceTarget => write!(f, "face target reached"),
            Self::VertexTarget => write!(f, "vertex target reached"),
            Self::MaxOperations => write!(f, "operation limit reached"),
            Self::MaxError => write!(f, "error limit exceeded"),
            Self::Timeout => write!(f, "time limit exceeded"),
            Self::QueueExhausted => write!(f, "no candidates left"),
            Self::Aborted(reason) => write!(f, "aborted: {}", reason),
        }
    }
}

/// What one call to [`Decimator::step`] did
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// A collapse was executed
    Collapsed,
    /// The candidate was stale or failed the link condition
    Discarded,
    /// The candidate would have created an intersection
    Rejected,
    Finished(TerminationReason),
}

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq)]
pub struct DecimationReport {
    pub initial_vertices: usize,
    pub initial_faces: usize,
    pub final_vertices: usize,
    pub final_faces: usize,
    pub operations: usize,
    /// Priority of the last dequeued candidate
    pub final_error: f32,
    pub elapsed: Duration,
    pub reason: TerminationReason,
}

/// Progress snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecimationStatus {
    pub vertices: usize,
    pub faces: usize,
    pub bvh_nodes: usize,
    pub queued: usize,
    pub operations: usize,
    pub current_error: f32,
}

impl std::fmt::Display for DecimationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "vertices: {}, faces: {}, bvh nodes: {}, queued: {}, operations: {}, error: {:e}",
            self.vertices, self.faces, self.bvh_nodes, self.queued, self.operations, self.current_error
        )
    }
}

/// Edge-collapse decimator over a priority queue `Q`
pub struct Decimator<Q = BinaryHeapQueue<EdgeCollapse>> {
    mesh: Mesh,
    config: DecimationConfig,
    queue: Q,
    shared: Option<SharedData>,
    bvh: Option<FaceBvh>,
    state: DecimatorState,
    operations: usize,
    current_error: f32,
    started: Option<Instant>,
    initial_vertices: usize,
    initial_faces: usize,
    reason: Option<TerminationReason>,
}

impl Decimator {
    /// Decimator over a binary heap.
    pub fn new(mesh: Mesh, config: DecimationConfig) -> Result<Self, DecimateError> {
        Self::with_queue(mesh, config, BinaryHeapQueue::new())
    }
}

impl<Q: PriorityQueue<EdgeCollapse>> Decimator<Q> {
    /// Decimator over a caller-provided queue. The configuration is
    /// validated here; nothing else happens until the first step.
    pub fn with_queue(mesh: Mesh, config: DecimationConfig, queue: Q) -> Result<Self, DecimateError> {
        config.validate()?;
        Ok(Self {
            initial_vertices: mesh.vertex_count(),
            initial_faces: mesh.face_count(),
            mesh,
            config,
            queue,
            shared: None,
            bvh: None,
            state: DecimatorState::Idle,
            operations: 0,
            current_error: 0.0,
            started: None,
            reason: None,
        })
    }

    pub fn state(&self) -> DecimatorState {
        self.state
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn into_mesh(self) -> Mesh {
        self.mesh
    }

    pub fn operations(&self) -> usize {
        self.operations
    }

    /// Build the face hierarchy, the quadrics and the seeded queue.
    /// Does nothing once initialized.
    pub fn initialize(&mut self) -> Result<(), DecimateError> {
        if self.state != DecimatorState::Idle {
            return Ok(());
        }
        self.state = DecimatorState::Initializing;
        let start = Instant::now();

        let collapse = &self.config.collapse;
        let bvh = build_face_bvh(&self.mesh, collapse.prevent_intersection, &self.config.bvh)?;
        self.queue.clear();
        let shared = SharedData::init(&mut self.mesh, collapse, &mut self.queue);

        self.initial_vertices = self.mesh.vertex_count();
        self.initial_faces = self.mesh.face_count();
        self.current_error = self.queue.first_priority().unwrap_or(0.0);
        self.bvh = Some(bvh);
        self.shared = Some(shared);
        self.started = Some(Instant::now());
        self.state = DecimatorState::Simplifying;

        debug!("decimate: initialized in {:?}", start.elapsed());
        info!(
            "decimate: {} vertices, {} faces, {} candidates",
            self.initial_vertices,
            self.initial_faces,
            self.queue.len()
        );
        Ok(())
    }

    /// Run one iteration of the loop.
    ///
    /// Errors come only from initialization. A failing collapse aborts the
    /// run and is reported as [`TerminationReason::Aborted`].
    pub fn step(&mut self) -> Result<StepOutcome, DecimateError> {
        self.initialize()?;
        if self.state == DecimatorState::Done {
            let reason = self.reason.clone().unwrap_or(TerminationReason::QueueExhausted);
            return Ok(StepOutcome::Finished(reason));
        }
        if let Some(reason) = self.goal_reached() {
            return Ok(self.finish(reason));
        }
        let Some((candidate, priority)) = self.queue.dequeue() else {
            return Ok(self.finish(TerminationReason::QueueExhausted));
        };
        self.current_error = priority;

        let (Some(shared), Some(bvh)) = (self.shared.as_mut(), self.bvh.as_mut()) else {
            return Ok(self.finish(TerminationReason::Aborted("decimator not initialized".to_string())));
        };
        if !candidate.is_up_to_date(&self.mesh) {
            trace!("decimate: stale candidate {:?}", candidate.pair());
            return Ok(StepOutcome::Discarded);
        }
        if !candidate.is_feasible(&self.mesh, shared) {
            trace!("decimate: infeasible candidate {:?}", candidate.pair());
            return Ok(StepOutcome::Discarded);
        }

        match candidate.execute(&mut self.mesh, shared, bvh) {
            Ok(true) => {
                candidate.update_heap(&mut self.mesh, shared, &mut self.queue);
                self.operations += 1;
                let interval = self.config.progress_interval;
                if interval > 0 && self.operations % interval == 0 {
                    info!("decimate: {}", self.status());
                }
                Ok(StepOutcome::Collapsed)
            }
            Ok(false) => Ok(StepOutcome::Rejected),
            Err(e) => {
                error!("decimate: collapse of {:?} failed: {}", candidate.pair(), e);
                Ok(self.finish(TerminationReason::Aborted(e.to_string())))
            }
        }
    }

    /// Step until a termination condition holds.
    pub fn run(&mut self) -> Result<DecimationReport, DecimateError> {
        loop {
            if let StepOutcome::Finished(reason) = self.step()? {
                let report = DecimationReport {
                    initial_vertices: self.initial_vertices,
                    initial_faces: self.initial_faces,
                    final_vertices: self.mesh.vertex_count(),
                    final_faces: self.mesh.face_count(),
                    operations: self.operations,
                    final_error: self.current_error,
                    elapsed: self.elapsed(),
                    reason,
                };
                return Ok(report);
            }
        }
    }

    pub fn status(&self) -> DecimationStatus {
        DecimationStatus {
            vertices: self.mesh.vertex_count(),
            faces: self.mesh.face_count(),
            bvh_nodes: self.bvh.as_ref().map_or(0, |bvh| bvh.node_count()),
            queued: self.queue.len(),
            operations: self.operations,
            current_error: self.current_error,
        }
    }

    /// The first up-to-date queued candidate joining `a` and `b`, in either
    /// orientation.
    pub fn queued_candidate(&self, a: VertexId, b: VertexId) -> Option<EdgeCollapse> {
        self.queue
            .iter()
            .find(|c| {
                let pair = c.pair();
                ((pair.v0 == a && pair.v1 == b) || (pair.v0 == b && pair.v1 == a)) && c.is_up_to_date(&self.mesh)
            })
            .copied()
    }

    fn elapsed(&self) -> Duration {
        self.started.map_or(Duration::ZERO, |s| s.elapsed())
    }

    /// First satisfied termination condition. Zero disables a condition.
    fn goal_reached(&self) -> Option<TerminationReason> {
        let targets = &self.config.targets;
        if targets.face_count > 0 && self.mesh.face_count() <= targets.face_count {
            return Some(TerminationReason::FaceTarget);
        }
        if targets.vertex_count > 0 && self.mesh.vertex_count() <= targets.vertex_count {
            return Some(TerminationReason::VertexTarget);
        }
        if targets.max_operations > 0 && self.operations > targets.max_operations {
            return Some(TerminationReason::MaxOperations);
        }
        if targets.max_error > 0.0 && self.current_error > targets.max_error {
            return Some(TerminationReason::MaxError);
        }
        if targets.max_seconds > 0.0 && self.elapsed().as_secs_f32() > targets.max_seconds {
            return Some(TerminationReason::Timeout);
        }
        if self.queue.is_empty() {
            return Some(TerminationReason::QueueExhausted);
        }
        None
    }

    fn finish(&mut self, reason: TerminationReason) -> StepOutcome {
        self.state = DecimatorState::Done;
        self.reason = Some(reason.clone());
        info!(
            "decimate: {} after {} operations in {:?}, {} -> {} faces",
            reason,
            self.operations,
            self.elapsed(),
            self.initial_faces,
            self.mesh.face_count()
        );
        StepOutcome::Finished(reason)
    }
}

/// Decimate indexed buffers in one call.
pub fn decimate(
    buffers: &MeshBuffers,
    config: &DecimationConfig,
) -> Result<(MeshBuffers, DecimationReport), DecimateError> {
    let mesh = Mesh::from_buffers(buffers)?;
    let mut decimator = Decimator::new(mesh, config.clone())?;
    let report = decimator.run()?;
    Ok((decimator.mesh().to_buffers(), report))
}
