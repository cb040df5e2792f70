pub mod engine;
pub mod validation;

pub use engine::*;
pub use validation::*;
