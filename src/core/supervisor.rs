//! # Supervisor: keeps one Producer and one Consumer alive until stopped.
//!
//! The [`Supervisor`] owns the [`BoundedChannel`], the topic list and the shared
//! [`StageChain`]. It spawns each worker as its own tokio task, awaits their completion
//! through a [`JoinSet`] and replaces any worker that exits while the state is `running`.
//!
//! ```text
//! run()
//!   ├─► listener: EventBus ──► AliveTracker::update() + SubscriberSet::emit()
//!   ├─► spawn Producer(child token)        spawn Consumer(child token)
//!   └─► loop select!
//!         ├─ token.cancelled()            → leave loop
//!         └─ join_next_with_id() = (task id → role, result)
//!               ├─ publish WorkerStopped / WorkerDied
//!               ├─ state != running?      → leave loop
//!               ├─ publish RespawnScheduled { delay = respawn.next(deaths) }
//!               ├─ spawn a fresh instance of `role`
//!               └─ pause(delay)           (cut short by cancellation)
//!
//! stop() (handle or OS signal)
//!   ├─► running → stopping, publish ShutdownRequested
//!   └─► token.cancel()  → both workers leave their loops cooperatively
//!
//! after the loop
//!   ├─► wait up to `grace` for live workers
//!   │      ├─ all joined → AllStoppedWithin
//!   │      └─ timeout    → abort, GraceExceeded { stuck }
//!   └─► state = stopped
//! ```
//!
//! ## Rules
//! - Restart is unconditional; [`Config::respawn`] only spaces the attempts out.
//! - A worker that stayed up for at least `respawn.max` counts as healthy: its next death
//!   starts the delay schedule over.
//! - A task that ends without reporting (aborted, or a panic outside `run`) is treated as a
//!   death of the role it was spawned for.
//! - A replacement reuses the same channel, topics and stage chain; a replacement Producer
//!   also inherits its predecessor's undelivered pending messages.
//! - Nothing is spawned once the state has left `running`.
//! - A supervisor runs once; build a new one to start again.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::{Mutex, broadcast};
use tokio::task::{Id, JoinError, JoinHandle, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::bus::BusRef;
use crate::channel::BoundedChannel;
use crate::config::Config;
use crate::core::shutdown;
use crate::core::state::{StateCell, SupervisorState};
use crate::core::{Role, SupervisorBuilder, WorkerRef};
use crate::error::{RuntimeError, TaskError};
use crate::events::{Event, EventBus, EventKind};
use crate::message::Message;
use crate::pipeline::{Consumer, Producer, StageChain, Topics, pause};
use crate::policies::BackoffPolicy;
use crate::subscribers::{AliveTracker, Subscribe, SubscriberSet, panic_message};

/// What a worker task reports when it ends: its result and how long it ran.
type Exit = (Result<(), TaskError>, Duration);

/// A joined task: its role, result and lifetime (unknown if the task never reported).
type Settled = (Role, Result<(), TaskError>, Option<Duration>);

/// Supervises the Producer/Consumer pair.
pub struct Supervisor {
    cfg: Config,
    bus: BusRef,
    channel: Arc<BoundedChannel<Message>>,
    topics: Topics,
    stages: Arc<StageChain>,
    events: EventBus,
    subscribers: Mutex<Vec<Arc<dyn Subscribe>>>,
    alive: Arc<AliveTracker>,
    state: Arc<StateCell>,
    token: CancellationToken,
    started: AtomicBool,
}

/// Cloneable remote control for a [`Supervisor`].
#[derive(Clone)]
pub struct SupervisorHandle {
    state: Arc<StateCell>,
    token: CancellationToken,
    events: EventBus,
}

impl SupervisorHandle {
    /// Requests a graceful stop.
    ///
    /// Returns `true` if this call moved the supervisor from `running` to `stopping`.
    pub fn stop(&self) -> bool {
        if !self
            .state
            .advance(SupervisorState::Running, SupervisorState::Stopping)
        {
            return false;
        }
        info!("shutdown requested");
        self.events.publish(Event::new(EventKind::ShutdownRequested));
        self.token.cancel();
        true
    }

    pub fn state(&self) -> SupervisorState {
        self.state.get()
    }
}

/// The workers currently owned by the run loop.
#[derive(Default)]
struct Crew {
    producer: Option<Arc<Producer>>,
    consumer: Option<Arc<Consumer>>,
    starts: HashMap<Role, u32>,
    deaths: HashMap<Role, u32>,
    running: BTreeSet<Role>,
    tasks: HashMap<Id, Role>,
}

impl Crew {
    /// Delay for the next respawn of `role`; a healthy run resets the schedule.
    fn next_delay(
        &mut self,
        role: Role,
        lived: Option<Duration>,
        policy: &BackoffPolicy,
    ) -> Duration {
        let deaths = self.deaths.entry(role).or_default();
        if lived.is_some_and(|lived| lived >= policy.max) {
            *deaths = 0;
        }
        let delay = policy.next(*deaths);
        *deaths = deaths.saturating_add(1);
        delay
    }

    /// Maps a joined task back to its role.
    fn settle(&mut self, joined: Result<(Id, Exit), JoinError>) -> Option<Settled> {
        match joined {
            Ok((id, (result, lived))) => {
                let role = self.tasks.remove(&id)?;
                Some((role, result, Some(lived)))
            }
            Err(e) => {
                let role = self.tasks.remove(&e.id())?;
                let error = if e.is_panic() {
                    format!("panicked: {}", panic_message(&*e.into_panic()))
                } else {
                    "task aborted".to_string()
                };
                Some((role, Err(TaskError::Fatal { error }), None))
            }
        }
    }

    fn shutdown(&self) {
        if let Some(p) = &self.producer {
            p.shutdown();
        }
        if let Some(c) = &self.consumer {
            c.shutdown();
        }
    }
}

impl Supervisor {
    /// Starts building a supervisor that reads from `bus`.
    pub fn builder(cfg: Config, bus: BusRef) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg, bus)
    }

    pub(crate) fn new_internal(
        cfg: Config,
        bus: BusRef,
        topics: Topics,
        stages: StageChain,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Self {
        let channel = Arc::new(BoundedChannel::new(cfg.channel_capacity_clamped()));
        let events = EventBus::new(cfg.bus_capacity_clamped());
        Self {
            cfg,
            bus,
            channel,
            topics,
            stages: Arc::new(stages),
            events,
            subscribers: Mutex::new(subscribers),
            alive: Arc::new(AliveTracker::new()),
            state: Arc::new(StateCell::default()),
            token: CancellationToken::new(),
            started: AtomicBool::new(false),
        }
    }

    /// Returns a handle that can stop this supervisor from any task.
    pub fn handle(&self) -> SupervisorHandle {
        SupervisorHandle {
            state: Arc::clone(&self.state),
            token: self.token.clone(),
            events: self.events.clone(),
        }
    }

    /// Shorthand for `handle().stop()`.
    pub fn stop(&self) -> bool {
        self.handle().stop()
    }

    pub fn state(&self) -> SupervisorState {
        self.state.get()
    }

    /// Liveness view fed by this supervisor's events.
    pub fn alive(&self) -> &Arc<AliveTracker> {
        &self.alive
    }

    /// Runtime event bus; subscribe before `run` to see every event.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// The stage chain shared by every Consumer instance; edits apply to the next message.
    pub fn stages(&self) -> &Arc<StageChain> {
        &self.stages
    }

    pub fn channel(&self) -> &Arc<BoundedChannel<Message>> {
        &self.channel
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Runs until an OS termination signal (or [`SupervisorHandle::stop`]).
    pub async fn run_until_signal(&self) -> Result<(), RuntimeError> {
        let handle = self.handle();
        let signals = tokio::spawn(async move {
            match shutdown::wait_for_shutdown_signal().await {
                Ok(()) => {
                    info!("termination signal received");
                    handle.stop();
                }
                Err(e) => error!(error = %e, "cannot listen for termination signals"),
            }
        });
        let res = self.run().await;
        signals.abort();
        res
    }

    /// Runs both workers until stopped, then drains them within the grace period.
    pub async fn run(&self) -> Result<(), RuntimeError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(RuntimeError::AlreadyStarted);
        }
        let listener_done = CancellationToken::new();
        let listener = self.subscriber_listener(listener_done.clone()).await;

        let mut set: JoinSet<Exit> = JoinSet::new();
        let mut crew = Crew::default();
        for role in Role::ALL {
            self.spawn_role(&mut set, &mut crew, role).await;
        }

        self.supervise(&mut set, &mut crew).await;

        crew.shutdown();
        let res = self.wait_all_with_grace(&mut set, &mut crew).await;
        self.state.finish();
        info!(state = %self.state.get(), "supervisor finished");

        listener_done.cancel();
        if tokio::time::timeout(self.cfg.grace, listener).await.is_err() {
            warn!("subscribers did not drain within grace");
        }
        res
    }

    async fn supervise(&self, set: &mut JoinSet<Exit>, crew: &mut Crew) {
        loop {
            let joined = tokio::select! {
                biased;
                _ = self.token.cancelled() => return,
                joined = set.join_next_with_id() => joined,
            };
            let Some(joined) = joined else {
                self.token.cancelled().await;
                return;
            };
            let Some((role, result, lived)) = crew.settle(joined) else {
                warn!("unknown worker task ended");
                continue;
            };
            self.report_exit(crew, role, &result);

            if self.state.get() != SupervisorState::Running {
                return;
            }
            let delay = crew.next_delay(role, lived, &self.cfg.respawn);
            warn!(%role, ?delay, "respawning");
            self.events.publish(
                Event::new(EventKind::RespawnScheduled)
                    .with_role(role)
                    .with_attempt(crew.starts.get(&role).copied().unwrap_or(0))
                    .with_delay(delay),
            );
            self.spawn_role(set, crew, role).await;
            if !pause(&self.token, delay).await {
                return;
            }
        }
    }

    fn report_exit(&self, crew: &mut Crew, role: Role, result: &Result<(), TaskError>) {
        crew.running.remove(&role);
        let attempt = crew.starts.get(&role).copied().unwrap_or(0);
        match result {
            Ok(()) => {
                info!(%role, attempt, "worker stopped");
                self.events.publish(
                    Event::new(EventKind::WorkerStopped)
                        .with_role(role)
                        .with_attempt(attempt),
                );
            }
            Err(e) => {
                warn!(%role, attempt, error = %e, label = e.as_label(), "worker died");
                self.events.publish(
                    Event::new(EventKind::WorkerDied)
                        .with_role(role)
                        .with_attempt(attempt)
                        .with_reason(e.to_string()),
                );
            }
        }
    }

    /// Builds a fresh instance of `role` and spawns it, unless the supervisor is stopping.
    async fn spawn_role(&self, set: &mut JoinSet<Exit>, crew: &mut Crew, role: Role) {
        if self.state.get() != SupervisorState::Running {
            debug!(%role, "not spawning; supervisor is stopping");
            return;
        }
        let worker: WorkerRef = match role {
            Role::Producer => {
                let carried = match crew.producer.take() {
                    Some(dead) => dead.take_pending().await,
                    None => Default::default(),
                };
                if !carried.is_empty() {
                    info!(pending = carried.len(), "handing pending messages to the new producer");
                }
                let producer = Arc::new(
                    Producer::new(
                        Arc::clone(&self.bus),
                        Arc::clone(&self.channel),
                        self.topics.clone(),
                        self.cfg.producer,
                    )
                    .with_token(self.token.child_token())
                    .with_events(self.events.clone())
                    .with_pending(carried),
                );
                crew.producer = Some(Arc::clone(&producer));
                producer
            }
            Role::Consumer => {
                let consumer = Arc::new(
                    Consumer::with_chain(
                        Arc::clone(&self.channel),
                        Arc::clone(&self.stages),
                        self.cfg.consumer,
                    )
                    .with_token(self.token.child_token()),
                );
                crew.consumer = Some(Arc::clone(&consumer));
                consumer
            }
        };

        let attempt = crew.starts.entry(role).or_default();
        *attempt += 1;
        info!(%role, attempt = *attempt, "starting worker");
        self.events.publish(
            Event::new(EventKind::WorkerStarting)
                .with_role(role)
                .with_attempt(*attempt),
        );
        crew.running.insert(role);

        let task = set.spawn(async move {
            let started = Instant::now();
            let res = match std::panic::AssertUnwindSafe(worker.run()).catch_unwind().await {
                Ok(res) => res,
                Err(panic) => Err(TaskError::Fatal {
                    error: format!("panicked: {}", panic_message(&*panic)),
                }),
            };
            (res, started.elapsed())
        });
        crew.tasks.insert(task.id(), role);
    }

    /// Waits for the remaining workers; aborts whatever is still running after `grace`.
    async fn wait_all_with_grace(
        &self,
        set: &mut JoinSet<Exit>,
        crew: &mut Crew,
    ) -> Result<(), RuntimeError> {
        let grace = self.cfg.grace;
        let drained = tokio::time::timeout(grace, async {
            while let Some(joined) = set.join_next_with_id().await {
                if let Some((role, result, _)) = crew.settle(joined) {
                    self.report_exit(crew, role, &result);
                }
            }
        })
        .await;

        match drained {
            Ok(()) => {
                info!("all workers stopped within grace");
                self.events.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_) => {
                set.abort_all();
                while set.join_next().await.is_some() {}
                let stuck: Vec<String> = crew.running.iter().map(|r| r.as_str().to_string()).collect();
                error!(?grace, ?stuck, "grace exceeded; workers aborted");
                self.events.publish(
                    Event::new(EventKind::GraceExceeded).with_reason(stuck.join(",")),
                );
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }

    /// Forwards events to the alive tracker and the subscriber set until `done`, then drains.
    async fn subscriber_listener(&self, done: CancellationToken) -> JoinHandle<()> {
        let mut rx = self.events.subscribe();
        let subs = SubscriberSet::new(
            std::mem::take(&mut *self.subscribers.lock().await),
            self.events.clone(),
        );
        let alive = Arc::clone(&self.alive);

        tokio::spawn(async move {
            loop {
                let received = tokio::select! {
                    biased;
                    received = rx.recv() => received,
                    _ = done.cancelled() => break,
                };
                match received {
                    Ok(ev) => {
                        alive.update(&ev).await;
                        subs.emit(&ev);
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "event listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            loop {
                match rx.try_recv() {
                    Ok(ev) => {
                        alive.update(&ev).await;
                        subs.emit(&ev);
                    }
                    Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                    Err(_) => break,
                }
            }
            subs.shutdown().await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doubling() -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_millis(100),
            max: Duration::from_millis(400),
            factor: 2.0,
            jitter: crate::policies::JitterPolicy::None,
        }
    }

    #[test]
    fn quick_deaths_grow_the_delay() {
        let mut crew = Crew::default();
        let policy = doubling();
        let quick = Some(Duration::from_millis(5));

        assert_eq!(crew.next_delay(Role::Consumer, quick, &policy), Duration::from_millis(100));
        assert_eq!(crew.next_delay(Role::Consumer, quick, &policy), Duration::from_millis(200));
        assert_eq!(crew.next_delay(Role::Consumer, None, &policy), Duration::from_millis(400));
        assert_eq!(crew.next_delay(Role::Consumer, quick, &policy), Duration::from_millis(400));
        // roles keep separate schedules
        assert_eq!(crew.next_delay(Role::Producer, quick, &policy), Duration::from_millis(100));
    }

    #[test]
    fn healthy_run_resets_the_schedule() {
        let mut crew = Crew::default();
        let policy = doubling();
        let quick = Some(Duration::from_millis(5));

        crew.next_delay(Role::Producer, quick, &policy);
        crew.next_delay(Role::Producer, quick, &policy);
        assert_eq!(
            crew.next_delay(Role::Producer, Some(policy.max), &policy),
            Duration::from_millis(100)
        );
        assert_eq!(crew.next_delay(Role::Producer, quick, &policy), Duration::from_millis(200));
    }

    #[tokio::test]
    async fn aborted_task_settles_as_a_death_of_its_role() {
        let mut crew = Crew::default();
        let mut set: JoinSet<Exit> = JoinSet::new();
        let task = set.spawn(async {
            std::future::pending::<()>().await;
            (Ok(()), Duration::ZERO)
        });
        crew.tasks.insert(task.id(), Role::Consumer);
        task.abort();

        let joined = set.join_next_with_id().await.unwrap();
        let (role, result, lived) = crew.settle(joined).unwrap();
        assert_eq!(role, Role::Consumer);
        assert!(matches!(result, Err(TaskError::Fatal { .. })));
        assert_eq!(lived, None);
        assert!(crew.tasks.is_empty());
    }

    #[tokio::test]
    async fn finished_task_reports_its_lifetime() {
        let mut crew = Crew::default();
        let mut set: JoinSet<Exit> = JoinSet::new();
        let task = set.spawn(async { (Ok(()), Duration::from_millis(7)) });
        crew.tasks.insert(task.id(), Role::Producer);

        let joined = set.join_next_with_id().await.unwrap();
        let (role, result, lived) = crew.settle(joined).unwrap();
        assert_eq!(role, Role::Producer);
        assert!(result.is_ok());
        assert_eq!(lived, Some(Duration::from_millis(7)));
    }
}
