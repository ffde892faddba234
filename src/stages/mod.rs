//! Built-in stages and what they need.
//!
//! - [`SensorsStage`] (`SensorsWorkflow`): persists sensor readings to a [`Store`].
//! - [`DebugStage`] (`DebugWorkflow`): logs and ends the chain.
//! - [`StageRegistry`]: resolves stage names into instances.

mod debug;
mod registry;
mod sensors;
mod store;

pub use debug::DebugStage;
pub use registry::StageRegistry;
pub use sensors::{SENSORS_TOPIC, SensorsStage};
pub use store::{MemoryStore, Store, StoreRef};
