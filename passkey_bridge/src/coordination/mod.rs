mod errors;
mod orchestrator;
mod types;

pub use errors::CoordinationError;
pub use orchestrator::PasskeyOrchestrator;
pub use types::{InitRequest, InitResponse, VerifyRequest, VerifyResponse};
