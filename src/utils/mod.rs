pub mod circuit_breaker;
pub mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitOpen, CircuitState, Transition};
pub use retry::{retry_on_transient, IsTransient, RetryConfig, RetryResult};
