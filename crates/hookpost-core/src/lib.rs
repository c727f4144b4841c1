//! Ingestion-and-fan-out core for hookpost
//!
//! Components, leaves first:
//! - [`registry`]: name → endpoint resolution, availability and provisioning
//! - [`ingest`]: normalize + persist one inbound hook under plan policy
//! - [`session`]: per-endpoint table of live inspector sessions
//! - [`broadcast`]: push each persisted hook to every live session
//! - [`sweeper`]: recurring deletion of expired records

pub mod broadcast;
pub mod error;
pub mod hook;
pub mod ingest;
pub mod plan;
pub mod registry;
pub mod reserved;
pub mod session;
pub mod sweeper;

pub use broadcast::Broadcaster;
pub use error::HookError;
pub use hook::{CapturedHook, HttpMethod, RawHook};
pub use ingest::HookIngestor;
pub use plan::{Plan, PlanPolicy};
pub use registry::{Availability, EndpointRegistry, TenantContext};
pub use session::{EventFrame, InspectorSession, SessionConfig, SessionManager};
pub use sweeper::ExpirySweeper;
