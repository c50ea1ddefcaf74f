//! Module abstractions.
//!
//! This module provides the building blocks every patchable module shares:
//! the [`Module`] trait, the [`ModuleRack`] that owns instances and routes
//! their messages, and the [`ModuleRegistry`] catalog.

pub mod context;
pub mod module_trait;
pub mod rack;
pub mod registry;

pub use context::TickContext;
pub use module_trait::{Message, Module, ModuleId, ModuleInfo, ModuleKind, Outbox, PortSpec};
pub use rack::{ModuleRack, DEFAULT_MAX_DELIVERIES_PER_SEND, DEFAULT_MAX_DISPATCH_DEPTH};
pub use registry::{ModuleFactory, ModuleRegistry};
