//! # stationhub
//!
//! **stationhub** is the ingestion core of a small monitoring station: sensors publish
//! readings to a pub/sub bus, a supervised producer/consumer pipeline pulls them off the
//! bus and threads each one through an ordered chain of processing stages.
//!
//! ## Architecture
//! ```text
//!  SensorPublisher ──publish──► MessageBus
//!                                   │ get_message(poll_timeout)
//!                                   ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor                                                       │
//! │                                                                   │
//! │   Producer ──put──► BoundedChannel ──get──► Consumer              │
//! │     │ pending buffer     (capacity N)          │                  │
//! │     │ (channel full)                           ▼                  │
//! │     │                                Stage₁ → Stage₂ → …          │
//! │     │                                (false ends the chain)       │
//! │                                                                   │
//! │   JoinSet ──worker exited──► respawn, then BackoffPolicy cooldown │
//! │   EventBus ──► AliveTracker + SubscriberSet (LogWriter, …)        │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! running ──(stop / SIGINT / SIGTERM)──► stopping ──(workers joined)──► stopped
//!    └──(worker died)──► respawn ──► running
//! ```
//!
//! ## Features
//! | Area              | Description                                                | Key types                                    |
//! |-------------------|------------------------------------------------------------|----------------------------------------------|
//! | **Messages**      | Bus envelope and payload decoding                          | [`Message`], [`Payload`], [`decode_message`] |
//! | **Bus**           | Pub/sub capability and an in-memory broker                 | [`MessageBus`], [`MemoryBus`]                |
//! | **Pipeline**      | Producer, Consumer, stages, topics                         | [`Producer`], [`Consumer`], [`Stage`]        |
//! | **Supervision**   | Spawn, watch, respawn, graceful stop                       | [`Supervisor`], [`SupervisorHandle`]         |
//! | **Events**        | Runtime events and subscribers                             | [`Event`], [`Subscribe`], [`LogWriter`]      |
//! | **Stages**        | Built-in stages and the name registry                      | [`SensorsStage`], [`StageRegistry`]          |
//! | **Sensors**       | Simulated sensors publishing to the bus                    | [`SensorPublisher`], [`RandomIntegerSensor`] |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use stationhub::{Config, MemoryBus, MemoryStore, SensorsStage, Supervisor};
//!
//! #[tokio::main(flavor = "multi_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let broker = MemoryBus::new();
//!     let store = Arc::new(MemoryStore::new());
//!     let cfg = Config::default().with_interval(Duration::from_millis(10));
//!
//!     let sup = Supervisor::builder(cfg, Arc::new(broker.connect().await))
//!         .topics("sensors")?
//!         .stage(Arc::new(SensorsStage::new(store.clone())))?
//!         .build()?;
//!
//!     let handle = sup.handle();
//!     let run = tokio::spawn({
//!         let sup = sup.clone();
//!         async move { sup.run().await }
//!     });
//!
//!     while broker.subscribers("sensors").await == 0 {
//!         tokio::time::sleep(Duration::from_millis(5)).await;
//!     }
//!     broker.publish("sensors", r#"[{"name":"t","value":21.5}]"#).await;
//!     while store.documents("sensors").await.is_empty() {
//!         tokio::time::sleep(Duration::from_millis(5)).await;
//!     }
//!
//!     handle.stop();
//!     run.await??;
//!     Ok(())
//! }
//! ```

mod bus;
mod channel;
mod config;
mod core;
mod error;
mod events;
mod message;
mod pipeline;
mod policies;
mod sensors;
mod stages;
mod subscribers;

pub mod logging;

// ---- Public re-exports ----

pub use bus::{BusRef, MemoryBus, MemoryClient, MessageBus};
pub use channel::BoundedChannel;
pub use config::Config;
pub use self::core::{
    Role, Supervisor, SupervisorBuilder, SupervisorHandle, SupervisorState, Worker, WorkerRef,
    wait_for_shutdown_signal,
};
pub use error::{
    BusError, ChannelError, PipelineError, RuntimeError, StageError, StoreError, TaskError,
};
pub use events::{Event, EventBus, EventKind};
pub use message::{Message, MessageKind, Payload, decode_message};
pub use pipeline::{
    Consumer, ConsumerConfig, IntoTopics, Producer, ProducerConfig, Stage, StageChain, StageFn,
    StageRef, Topics,
};
pub use policies::{BackoffPolicy, JitterPolicy};
pub use sensors::{Measurement, RandomIntegerSensor, Sensor, SensorPublisher, now_timestamp};
pub use stages::{
    DebugStage, MemoryStore, SENSORS_TOPIC, SensorsStage, StageRegistry, Store, StoreRef,
};
pub use subscribers::{AliveTracker, LogWriter, Subscribe, SubscriberSet};
