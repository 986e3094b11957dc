// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Cycle Scheduler - Application Layer
//!
//! Drives the repeating research cycle and owns the Idle / Running /
//! Completed state machine.
//!
//! ```text
//!            start                terminal marker
//!   Idle ───────────► Running ─────────────────────► Completed
//!    ▲                  │                                │
//!    └────── stop ──────┘                                │
//!    └──────────────────────── reset ────────────────────┘
//! ```
//!
//! A cycle body runs: lifecycle check, parallel specialist phase, output
//! filtering, the sequential architect phase, payload application and
//! persistence. The context mutex is released while specialists run and held
//! for the rest of the cycle, so tool effects are strictly sequential.
//!
//! Every `start` bumps an epoch. A cycle only continues while the running
//! flag is set and its captured epoch is still current; both are checked
//! after each asynchronous boundary. A stale cycle left over from a
//! stop/start pair therefore abandons instead of mutating the new run.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Scheduling, cancellation and the mission control surface

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::application::mission::{MissionContext, MissionServices, NodeView};
use crate::application::persistence::PersistenceManager;
use crate::application::specialist::{run_specialist_phase, SpecialistOutcome};
use crate::application::tool_dispatch::ArchitectPhase;
use crate::application::tool_effects::ToolTable;
use crate::domain::agent::AgentId;
use crate::domain::events::MissionEvent;
use crate::domain::llm::OracleError;
use crate::domain::repository::RepositoryError;
use crate::domain::stagnation::BiasWarning;
use crate::domain::synthesis::{ResearchVector, SynthesisError};
use crate::infrastructure::event_bus::EventBus;
use conclave_cortex::GraphError;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Why a cycle did not finish
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("Oracle failure: {0}")]
    Oracle(#[from] OracleError),

    #[error("Malformed architect synthesis: {0}")]
    MalformedSynthesis(#[from] SynthesisError),

    #[error("Cycle abandoned: mission is no longer running")]
    Abandoned,
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Mission is already running")]
    AlreadyRunning,

    #[error("Mission is completed; reset it before starting again")]
    MissionCompleted,

    #[error("Reset requires explicit confirmation")]
    ConfirmationRequired,

    #[error("No mission snapshot to resume from")]
    NoSnapshot,

    #[error("Persistence error: {0}")]
    Persistence(#[from] RepositoryError),

    #[error("Snapshot could not be restored: {0}")]
    Restore(#[from] GraphError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Running,
    Completed,
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SchedulerState::Idle => "idle",
            SchedulerState::Running => "running",
            SchedulerState::Completed => "completed",
        };
        f.write_str(label)
    }
}

/// Point-in-time view of the mission for the control surface
#[derive(Debug, Clone, Serialize)]
pub struct MissionStatus {
    pub state: SchedulerState,
    pub cycle: u64,
    pub objective: String,
    pub research_vector: Option<ResearchVector>,
    pub node_count: usize,
    pub invalidated_count: usize,
    pub stagnation_counter: u32,
    pub stagnation_threshold: u32,
    pub intervention_armed: bool,
    pub bias_warning: Option<BiasWarning>,
    pub focus_history: Vec<String>,
    pub active_agents: Vec<AgentId>,
    pub last_error: Option<String>,
}

impl MissionStatus {
    fn capture(ctx: &MissionContext) -> Self {
        Self {
            state: SchedulerState::Idle,
            cycle: ctx.cycle,
            objective: ctx.objective.clone(),
            research_vector: ctx.research_vector.clone(),
            node_count: ctx.graph.len(),
            invalidated_count: ctx.graph.mark_invalidated().len(),
            stagnation_counter: ctx.detector.counter(),
            stagnation_threshold: ctx.detector.threshold(),
            intervention_armed: ctx.detector.needs_intervention(),
            bias_warning: ctx.detector.bias().cloned(),
            focus_history: ctx.detector.focus_history(),
            active_agents: ctx.registry.active().iter().map(|a| a.id.clone()).collect(),
            last_error: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentStatus {
    pub id: AgentId,
    pub mission_prompt: String,
    pub tools: Vec<String>,
    pub reactive: bool,
    pub permanent: bool,
    pub creation_cycle: u64,
    pub lifespan_cycles: Option<u64>,
    pub nodes_created: u64,
    pub average_promise: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphView {
    pub node_count: usize,
    pub invalidated_count: usize,
    pub nodes: Vec<NodeView>,
}

/// Proof that [`CycleScheduler::begin`] moved the mission to Running
#[derive(Debug)]
pub struct StartTicket {
    epoch: u64,
    token: CancellationToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleOutcome {
    Continue,
    Completed,
    Abandoned,
    Halted,
}

struct Control {
    state: SchedulerState,
    last_error: Option<String>,
    timer: Option<CancellationToken>,
}

struct SchedulerInner {
    // Lock order: context, then status_cache or control. Never the reverse.
    context: Mutex<MissionContext>,
    control: Mutex<Control>,
    status_cache: Mutex<MissionStatus>,
    services: MissionServices,
    tools: ToolTable,
    persistence: PersistenceManager,
    events: EventBus,
    interval: Duration,
    running: AtomicBool,
    epoch: AtomicU64,
}

/// Cheap to clone; all clones drive the same mission
#[derive(Clone)]
pub struct CycleScheduler {
    inner: Arc<SchedulerInner>,
}

impl CycleScheduler {
    pub fn new(
        context: MissionContext,
        services: MissionServices,
        tools: ToolTable,
        persistence: PersistenceManager,
        interval: Duration,
    ) -> Self {
        let events = context.events().clone();
        let status = MissionStatus::capture(&context);
        Self {
            inner: Arc::new(SchedulerInner {
                context: Mutex::new(context),
                control: Mutex::new(Control {
                    state: SchedulerState::Idle,
                    last_error: None,
                    timer: None,
                }),
                status_cache: Mutex::new(status),
                services,
                tools,
                persistence,
                events,
                interval: interval.max(MIN_INTERVAL),
                running: AtomicBool::new(false),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub async fn state(&self) -> SchedulerState {
        self.inner.control.lock().await.state
    }

    /// Idle → Running. Cycle 1 runs before this returns; later cycles run on
    /// the interval timer in the background.
    pub async fn start(&self) -> Result<(), SchedulerError> {
        let ticket = self.begin().await?;
        self.run_first_cycle(ticket).await;
        Ok(())
    }

    /// The Idle → Running transition alone. Callers that must not wait for
    /// cycle 1 claim the transition here and hand the ticket to
    /// [`run_first_cycle`](Self::run_first_cycle) on another task.
    pub async fn begin(&self) -> Result<StartTicket, SchedulerError> {
        let mut control = self.inner.control.lock().await;
        match control.state {
            SchedulerState::Running => return Err(SchedulerError::AlreadyRunning),
            SchedulerState::Completed => return Err(SchedulerError::MissionCompleted),
            SchedulerState::Idle => {}
        }
        let token = CancellationToken::new();
        control.state = SchedulerState::Running;
        control.last_error = None;
        control.timer = Some(token.clone());
        let epoch = self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.running.store(true, Ordering::SeqCst);
        drop(control);

        info!(
            interval_seconds = self.inner.interval.as_secs(),
            "Mission scheduler started"
        );
        self.inner.events.publish(MissionEvent::SchedulerStarted { started_at: Utc::now() });
        Ok(StartTicket { epoch, token })
    }

    /// Run cycle 1 for a claimed start, then hand over to the interval timer
    pub async fn run_first_cycle(&self, ticket: StartTicket) {
        let StartTicket { epoch, token } = ticket;
        if self.inner.run_cycle(epoch).await == CycleOutcome::Continue && self.inner.is_current(epoch) {
            let inner = self.inner.clone();
            tokio::spawn(async move { inner.run_timer(epoch, token).await });
        }
    }

    /// Running → Idle. In-flight work notices on its next running check.
    ///
    /// Returns false when the mission was not running.
    pub async fn stop(&self) -> bool {
        let mut control = self.inner.control.lock().await;
        if control.state != SchedulerState::Running {
            return false;
        }
        self.inner.running.store(false, Ordering::SeqCst);
        control.state = SchedulerState::Idle;
        if let Some(timer) = control.timer.take() {
            timer.cancel();
        }
        drop(control);

        info!("Mission scheduler stopped");
        self.inner.events.publish(MissionEvent::SchedulerStopped { stopped_at: Utc::now() });
        true
    }

    /// Back to a fresh mission and delete persisted state. A running mission
    /// is stopped first.
    pub async fn reset(&self, confirm: bool) -> Result<(), SchedulerError> {
        if !confirm {
            return Err(SchedulerError::ConfirmationRequired);
        }
        self.stop().await;

        let mut ctx = self.inner.context.lock().await;
        ctx.reset();
        self.inner.persistence.purge().await?;
        *self.inner.status_cache.lock().await = MissionStatus::capture(&ctx);
        {
            let mut control = self.inner.control.lock().await;
            control.state = SchedulerState::Idle;
            control.last_error = None;
        }
        drop(ctx);

        metrics::gauge!("conclave_knowledge_nodes").set(0.0);
        metrics::gauge!("conclave_stagnation_counter").set(0.0);
        info!("Mission reset");
        self.inner.events.publish(MissionEvent::MissionReset { reset_at: Utc::now() });
        Ok(())
    }

    /// Load the persisted snapshot into memory without starting.
    ///
    /// Returns how many nodes were re-embedded.
    pub async fn restore(&self) -> Result<usize, SchedulerError> {
        let snapshot = self
            .inner
            .persistence
            .load()
            .await?
            .ok_or(SchedulerError::NoSnapshot)?;

        let mut ctx = self.inner.context.lock().await;
        match self.inner.control.lock().await.state {
            SchedulerState::Running => return Err(SchedulerError::AlreadyRunning),
            // a completed mission only comes back through reset
            SchedulerState::Completed => return Err(SchedulerError::MissionCompleted),
            SchedulerState::Idle => {}
        }
        let indexed = ctx.restore(snapshot).await?;
        *self.inner.status_cache.lock().await = MissionStatus::capture(&ctx);
        {
            let mut control = self.inner.control.lock().await;
            if control.state == SchedulerState::Idle {
                control.last_error = None;
            }
        }
        metrics::gauge!("conclave_knowledge_nodes").set(ctx.graph.len() as f64);
        metrics::gauge!("conclave_stagnation_counter").set(ctx.detector.counter() as f64);
        Ok(indexed)
    }

    /// Restore from the snapshot, then start
    pub async fn resume(&self) -> Result<usize, SchedulerError> {
        let indexed = self.restore().await?;
        self.start().await?;
        Ok(indexed)
    }

    /// Never waits for a running cycle; falls back to the view captured at
    /// the end of the last cycle.
    pub async fn status(&self) -> MissionStatus {
        let mut status = match self.inner.context.try_lock() {
            Ok(ctx) => {
                let status = MissionStatus::capture(&ctx);
                *self.inner.status_cache.lock().await = status.clone();
                status
            }
            Err(_) => self.inner.status_cache.lock().await.clone(),
        };
        let control = self.inner.control.lock().await;
        status.state = control.state;
        status.last_error = control.last_error.clone();
        status
    }

    pub async fn graph_view(&self) -> GraphView {
        let ctx = self.inner.context.lock().await;
        let nodes = ctx.node_views();
        GraphView {
            node_count: nodes.len(),
            invalidated_count: nodes.iter().filter(|n| n.invalidated).count(),
            nodes,
        }
    }

    pub async fn agents_view(&self) -> Vec<AgentStatus> {
        let ctx = self.inner.context.lock().await;
        ctx.registry
            .active()
            .iter()
            .map(|agent| {
                let metric = ctx.registry.metric(&agent.id).copied().unwrap_or_default();
                AgentStatus {
                    id: agent.id.clone(),
                    mission_prompt: agent.mission_prompt.clone(),
                    tools: agent.required_tools.iter().cloned().collect(),
                    reactive: agent.reactive,
                    permanent: agent.permanent,
                    creation_cycle: agent.creation_cycle,
                    lifespan_cycles: agent.lifespan_cycles,
                    nodes_created: metric.nodes_created,
                    average_promise: metric.average_promise(),
                }
            })
            .collect()
    }

    /// Read access to the mission state; waits for a running cycle
    pub async fn with_context<R>(&self, f: impl FnOnce(&MissionContext) -> R) -> R {
        let ctx = self.inner.context.lock().await;
        f(&ctx)
    }
}

impl SchedulerInner {
    fn is_current(&self, epoch: u64) -> bool {
        self.running.load(Ordering::SeqCst) && self.epoch.load(Ordering::SeqCst) == epoch
    }

    fn check(&self, epoch: u64) -> Result<(), CycleError> {
        if self.is_current(epoch) {
            Ok(())
        } else {
            Err(CycleError::Abandoned)
        }
    }

    async fn run_timer(&self, epoch: u64, token: CancellationToken) {
        let mut tick = interval(self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately; cycle 1 already ran
        tick.tick().await;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    if !self.is_current(epoch) || self.run_cycle(epoch).await != CycleOutcome::Continue {
                        break;
                    }
                }
                _ = token.cancelled() => {
                    debug!("Cycle timer cancelled");
                    break;
                }
            }
        }
        debug!("Cycle timer for epoch {} exited", epoch);
    }

    async fn run_cycle(&self, epoch: u64) -> CycleOutcome {
        let mut cycle = 0;
        match self.cycle_body(epoch, &mut cycle).await {
            Ok(outcome) => outcome,
            Err(CycleError::Abandoned) => {
                info!("Cycle {} abandoned after stop", cycle);
                self.events.publish(MissionEvent::CycleAbandoned {
                    cycle,
                    abandoned_at: Utc::now(),
                });
                CycleOutcome::Abandoned
            }
            Err(e) => {
                self.halt(epoch, cycle, &e).await;
                CycleOutcome::Halted
            }
        }
    }

    async fn cycle_body(&self, epoch: u64, cycle: &mut u64) -> Result<CycleOutcome, CycleError> {
        let tasks = {
            let mut ctx = self.context.lock().await;
            self.check(epoch)?;
            ctx.cycle += 1;
            *cycle = ctx.cycle;
            metrics::counter!("conclave_cycles_total").increment(1);
            info!("Cycle {} started", ctx.cycle);
            ctx.publish(MissionEvent::CycleStarted {
                cycle: ctx.cycle,
                started_at: Utc::now(),
            });

            ctx.run_lifecycle_check();
            ctx.prepare_specialist_tasks().await
        };

        let results = run_specialist_phase(tasks, &self.services, || self.is_current(epoch))
            .await
            .ok_or(CycleError::Abandoned)?;
        self.check(epoch)?;
        let outputs = results.into_iter().collect::<Result<Vec<SpecialistOutcome>, _>>()?;

        let mut ctx = self.context.lock().await;
        self.check(epoch)?;
        let outputs: Vec<SpecialistOutcome> = outputs
            .into_iter()
            .filter(|o| !o.content.trim().is_empty())
            .collect();
        for output in &outputs {
            ctx.record_output(&output.agent_id, output.content.clone());
        }

        let phase = ArchitectPhase {
            tools: &self.tools,
            services: &self.services,
            max_rounds: ctx.settings().max_tool_rounds,
        };
        let payload = phase.run(&mut ctx, &outputs, || self.is_current(epoch)).await?;
        self.check(epoch)?;

        let applied = ctx.apply_payload(&payload).await;
        self.check(epoch)?;
        info!(
            "Cycle {} synthesis applied: {} node(s) added, {} update(s) skipped, {} relation(s) dropped",
            cycle,
            applied.nodes_added.len(),
            applied.skipped_updates,
            applied.dropped_relations
        );
        *self.status_cache.lock().await = MissionStatus::capture(&ctx);

        if applied.terminal {
            {
                let mut control = self.control.lock().await;
                self.running.store(false, Ordering::SeqCst);
                control.state = SchedulerState::Completed;
                if let Some(timer) = control.timer.take() {
                    timer.cancel();
                }
            }
            if let Err(e) = self.persistence.clear().await {
                warn!("Failed to delete snapshot of completed mission: {}", e);
            }
            drop(ctx);

            info!("Mission completed at cycle {}: {}", cycle, payload.summary);
            self.events.publish(MissionEvent::MissionCompleted {
                cycle: *cycle,
                summary: payload.summary,
                completed_at: Utc::now(),
            });
            return Ok(CycleOutcome::Completed);
        }

        if let Err(e) = self.persistence.save(&ctx.to_snapshot()).await {
            warn!("Failed to persist snapshot for cycle {}: {}", cycle, e);
        }
        drop(ctx);

        self.events.publish(MissionEvent::CycleCompleted {
            cycle: *cycle,
            summary: payload.summary,
            strategic_focus: payload.strategic_focus,
            completed_at: Utc::now(),
        });
        Ok(CycleOutcome::Continue)
    }

    /// Oracle failures and malformed payloads stop the mission
    async fn halt(&self, epoch: u64, cycle: u64, cause: &CycleError) {
        error!("Chaos in cycle {}: {}. Halting the mission scheduler", cycle, cause);
        let mut control = self.control.lock().await;
        if self.epoch.load(Ordering::SeqCst) != epoch || control.state != SchedulerState::Running {
            return;
        }
        self.running.store(false, Ordering::SeqCst);
        control.state = SchedulerState::Idle;
        control.last_error = Some(cause.to_string());
        if let Some(timer) = control.timer.take() {
            timer.cancel();
        }
        drop(control);

        self.events.publish(MissionEvent::SchedulerHalted {
            error: cause.to_string(),
            halted_at: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::MissionSettings;
    use crate::domain::llm::{GenerationOracle, GenerationRequest, GenerationResponse, GroundedAnswer, OracleSet};
    use crate::infrastructure::kv_store::InMemoryKeyValueStore;
    use crate::infrastructure::sandbox::DisabledSandbox;
    use async_trait::async_trait;
    use conclave_cortex::HashingEmbedder;

    /// Specialists get prose; the architect (identified by its tool
    /// declarations) gets a fixed payload.
    struct FixedOracle {
        payload: String,
    }

    #[async_trait]
    impl GenerationOracle for FixedOracle {
        async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, OracleError> {
            if request.tools.is_empty() && request.response_schema.is_none() {
                Ok(GenerationResponse::text("a small observation"))
            } else {
                Ok(GenerationResponse::text(self.payload.clone()))
            }
        }

        async fn grounded_search(&self, _query: &str) -> Result<GroundedAnswer, OracleError> {
            Ok(GroundedAnswer::default())
        }
    }

    struct FailingOracle;

    #[async_trait]
    impl GenerationOracle for FailingOracle {
        async fn generate(&self, _request: &GenerationRequest) -> Result<GenerationResponse, OracleError> {
            Err(OracleError::Network("connection refused".into()))
        }

        async fn grounded_search(&self, _query: &str) -> Result<GroundedAnswer, OracleError> {
            Err(OracleError::Network("connection refused".into()))
        }
    }

    fn scheduler(oracle: Arc<dyn GenerationOracle>) -> (CycleScheduler, PersistenceManager) {
        let persistence = PersistenceManager::new(Arc::new(InMemoryKeyValueStore::new()));
        let context = MissionContext::new(
            MissionSettings::default(),
            Arc::new(HashingEmbedder::default()),
            EventBus::new(512),
        );
        let services = MissionServices {
            oracles: OracleSet::uniform(oracle),
            sandbox: Arc::new(DisabledSandbox),
        };
        let scheduler = CycleScheduler::new(
            context,
            services,
            ToolTable::standard(),
            persistence.clone(),
            Duration::from_secs(3600),
        );
        (scheduler, persistence)
    }

    fn fixed(payload: &str) -> Arc<dyn GenerationOracle> {
        Arc::new(FixedOracle {
            payload: payload.to_string(),
        })
    }

    #[tokio::test]
    async fn test_start_runs_first_cycle_and_persists() {
        let (scheduler, persistence) = scheduler(fixed(
            r#"{"summary":"progress","strategic_focus":"SIEVES","stagnation_level":0,
                "knowledge_updates":[{"type":"CONCEPT","content":"admissible tuples"}]}"#,
        ));

        scheduler.start().await.unwrap();

        let status = scheduler.status().await;
        assert_eq!(status.state, SchedulerState::Running);
        assert_eq!(status.cycle, 1);
        assert_eq!(status.node_count, 1);
        assert_eq!(persistence.load().await.unwrap().unwrap().cycle_counter, 1);
        assert!(matches!(scheduler.start().await, Err(SchedulerError::AlreadyRunning)));

        assert!(scheduler.stop().await);
        assert!(!scheduler.stop().await);
        assert_eq!(scheduler.state().await, SchedulerState::Idle);
    }

    #[tokio::test]
    async fn test_terminal_marker_completes_mission() {
        let (scheduler, persistence) = scheduler(fixed(
            r#"{"summary":"[MISSION_COMPLETE] bound proven","strategic_focus":"SIEVES","stagnation_level":0}"#,
        ));

        scheduler.start().await.unwrap();

        assert_eq!(scheduler.state().await, SchedulerState::Completed);
        assert!(persistence.load().await.unwrap().is_none());
        assert!(matches!(scheduler.start().await, Err(SchedulerError::MissionCompleted)));

        scheduler.reset(true).await.unwrap();
        assert_eq!(scheduler.state().await, SchedulerState::Idle);
    }

    #[tokio::test]
    async fn test_stale_snapshot_cannot_reopen_completed_mission() {
        let (scheduler, persistence) = scheduler(fixed(
            r#"{"summary":"[MISSION_COMPLETE] done","strategic_focus":"SIEVES","stagnation_level":0}"#,
        ));
        let stale = scheduler.with_context(|ctx| ctx.to_snapshot()).await;
        scheduler.start().await.unwrap();
        persistence.save(&stale).await.unwrap();

        assert!(matches!(scheduler.restore().await, Err(SchedulerError::MissionCompleted)));
        assert!(matches!(scheduler.resume().await, Err(SchedulerError::MissionCompleted)));
        assert_eq!(scheduler.state().await, SchedulerState::Completed);
    }

    #[tokio::test]
    async fn test_begin_claims_running_before_first_cycle() {
        let (scheduler, _) = scheduler(fixed(
            r#"{"summary":"progress","strategic_focus":"SIEVES","stagnation_level":0}"#,
        ));

        let ticket = scheduler.begin().await.unwrap();
        assert_eq!(scheduler.state().await, SchedulerState::Running);
        assert!(matches!(scheduler.begin().await, Err(SchedulerError::AlreadyRunning)));

        scheduler.run_first_cycle(ticket).await;
        assert_eq!(scheduler.status().await.cycle, 1);
        assert!(scheduler.stop().await);
    }

    #[tokio::test]
    async fn test_oracle_failure_halts_to_idle() {
        let (scheduler, persistence) = scheduler(Arc::new(FailingOracle));
        let mut rx = scheduler.events().subscribe();

        scheduler.start().await.unwrap();

        let status = scheduler.status().await;
        assert_eq!(status.state, SchedulerState::Idle);
        assert!(status.last_error.unwrap().contains("connection refused"));
        assert!(persistence.load().await.unwrap().is_none());

        let mut halted = false;
        while let Ok(event) = rx.try_recv() {
            halted |= matches!(event, MissionEvent::SchedulerHalted { .. });
        }
        assert!(halted);
    }

    #[tokio::test]
    async fn test_malformed_payload_halts() {
        let (scheduler, _) = scheduler(fixed("I could not decide on anything this cycle."));

        scheduler.start().await.unwrap();

        let status = scheduler.status().await;
        assert_eq!(status.state, SchedulerState::Idle);
        assert!(status.last_error.unwrap().starts_with("Malformed architect synthesis"));
        assert_eq!(status.node_count, 0);
    }

    #[tokio::test]
    async fn test_reset_requires_confirmation() {
        let (scheduler, _) = scheduler(fixed("{}"));
        assert!(matches!(
            scheduler.reset(false).await,
            Err(SchedulerError::ConfirmationRequired)
        ));
    }

    #[tokio::test]
    async fn test_resume_without_snapshot() {
        let (scheduler, _) = scheduler(fixed("{}"));
        assert!(matches!(scheduler.resume().await, Err(SchedulerError::NoSnapshot)));
        assert_eq!(scheduler.state().await, SchedulerState::Idle);
    }

    #[tokio::test]
    async fn test_agents_view_lists_seeds() {
        let (scheduler, _) = scheduler(fixed("{}"));
        let agents = scheduler.agents_view().await;
        assert_eq!(agents.len(), 6);
        assert!(agents.iter().all(|a| a.permanent));
        assert_eq!(agents.iter().filter(|a| a.reactive).count(), 2);
    }
}
