pub mod notifier;
pub mod policy;

pub use notifier::*;
pub use policy::*;
