pub mod event;
pub mod order;
pub mod provider;
pub mod quote;

pub use event::*;
pub use order::*;
pub use provider::*;
pub use quote::*;
