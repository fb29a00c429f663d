//! Task lifecycle management.
//!
//! - `TaskStore`: authoritative task storage with a single atomic update path
//! - `InMemoryTaskStore`: process-lifetime implementation
//! - `TaskManager`: the orchestrator driving an agent through submit, stream,
//!   resubscribe, cancel and push registration
//! - `are_modalities_compatible`: output mode negotiation

pub mod in_memory_task_store;
pub mod modality;
pub mod task_manager;
pub mod task_store;

pub use in_memory_task_store::InMemoryTaskStore;
pub use modality::are_modalities_compatible;
pub use task_manager::{with_history_limit, TaskManager};
pub use task_store::TaskStore;
