mod archive;
mod scheduler;
mod task;

pub use archive::build_archive;
pub use scheduler::Scheduler;
pub use task::{window_start, DispatchOutcome, DispatchTask};
