pub mod context;
pub mod resources;
pub mod service_registry;
pub mod task_scheduler;
pub mod tasks;

pub use context::AppContext;
pub use resources::AppResources;
pub use service_registry::AppServices;
pub use task_scheduler::{ScheduledTask, TaskScheduler};
pub use tasks::{AppTasks, TaskType};
