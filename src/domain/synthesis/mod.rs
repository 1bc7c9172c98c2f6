pub mod circuit_breaker;
pub mod client;
pub mod error;
pub mod health;
pub mod language;
pub mod retry;

pub use circuit_breaker::{BreakerDecision, CircuitBreaker, CircuitBreakerConfig};
pub use client::{SegmentSynthesizer, SynthesisClient};
pub use error::SynthesisError;
pub use health::{HealthProbe, HealthStatus};
pub use language::LanguageConfig;
pub use retry::RetryPolicy;
