pub mod parser;
pub mod processor;
pub mod signature;

pub use parser::{ParseError, ParsedWebhook};
pub use processor::{WebhookAck, WebhookError, WebhookOutcome, WebhookProcessor};
pub use signature::{SignatureScheme, SignatureVerifier, VerificationMode};
