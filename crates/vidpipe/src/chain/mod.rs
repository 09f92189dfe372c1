//! Stage chain: ordered remote calls with continuations.

pub mod executor;
pub mod transport;

pub use executor::{ChainOutcome, Next, StageChain, Step, StepOutcome};
pub use transport::{Endpoint, HttpTransport, StageResponse, Transport};
