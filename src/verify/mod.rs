mod bot;
mod lookup;
pub mod replies;

pub use bot::spawn_bot;
pub use lookup::{lookup, LookupOutcome};
