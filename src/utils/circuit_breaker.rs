use std::time::{Duration, Instant};
use tokio::sync::Mutex;

// ============================================================================
// Circuit Breaker for broker calls
// ============================================================================
//
// Callers ask for permission before touching the broker and report the
// outcome afterwards, so a publish that reconnects in between still counts
// as a single call.
//
// States:
// - Closed:   calls pass through
// - Open:     calls rejected until `reset_timeout` has elapsed
// - HalfOpen: calls pass; `success_threshold` successes close the circuit,
//             any failure reopens it
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    /// Gauge encoding: 0=Closed, 1=Open, 2=HalfOpen.
    pub fn as_gauge(&self) -> i64 {
        match self {
            CircuitState::Closed => 0,
            CircuitState::Open => 1,
            CircuitState::HalfOpen => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening
    pub failure_threshold: u32,
    /// Time spent open before a trial call is let through
    pub reset_timeout: Duration,
    /// Trial successes needed to close again
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(30),
            success_threshold: 1,
        }
    }
}

/// A state change, reported so callers can log and count it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: CircuitState,
    pub to: CircuitState,
}

#[derive(Debug)]
pub struct CircuitOpen;

struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    opened_at: Option<Instant>,
}

pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            state: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                opened_at: None,
            }),
            config,
        }
    }

    /// Admits a call, moving Open -> HalfOpen once the reset timeout passed.
    pub async fn try_acquire(&self) -> Result<Option<Transition>, CircuitOpen> {
        let mut state = self.state.lock().await;

        if state.state != CircuitState::Open {
            return Ok(None);
        }

        let waited = state
            .opened_at
            .map(|at| at.elapsed() >= self.config.reset_timeout)
            .unwrap_or(true);

        if !waited {
            return Err(CircuitOpen);
        }

        tracing::info!("Circuit breaker transitioning to HalfOpen");
        state.state = CircuitState::HalfOpen;
        state.success_count = 0;
        Ok(Some(Transition {
            from: CircuitState::Open,
            to: CircuitState::HalfOpen,
        }))
    }

    pub async fn record_success(&self) -> Option<Transition> {
        let mut state = self.state.lock().await;
        state.failure_count = 0;

        if state.state != CircuitState::HalfOpen {
            return None;
        }

        state.success_count += 1;
        if state.success_count < self.config.success_threshold {
            return None;
        }

        tracing::info!(successes = state.success_count, "Circuit breaker closing");
        state.state = CircuitState::Closed;
        state.success_count = 0;
        state.opened_at = None;
        Some(Transition {
            from: CircuitState::HalfOpen,
            to: CircuitState::Closed,
        })
    }

    pub async fn record_failure(&self) -> Option<Transition> {
        let mut state = self.state.lock().await;
        state.failure_count += 1;

        let from = state.state;
        let open = match from {
            CircuitState::Closed => state.failure_count >= self.config.failure_threshold,
            CircuitState::HalfOpen => true,
            CircuitState::Open => false,
        };

        if !open {
            return None;
        }

        tracing::warn!(failures = state.failure_count, "Circuit breaker opening");
        state.state = CircuitState::Open;
        state.success_count = 0;
        state.opened_at = Some(Instant::now());
        Some(Transition {
            from,
            to: CircuitState::Open,
        })
    }

    pub async fn state(&self) -> CircuitState {
        self.state.lock().await.state
    }

    pub async fn failure_count(&self) -> u32 {
        self.state.lock().await.failure_count
    }
}
