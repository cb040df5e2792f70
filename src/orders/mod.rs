pub mod repository;
pub mod state_machine;

pub use repository::*;
pub use state_machine::*;
