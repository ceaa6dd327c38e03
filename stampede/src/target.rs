//! The seam between the engine and the system under test.
use stampede_core::RequestKind;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Why a single load-generation request counts as failed.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Connection-level failure: refused, reset, TLS, and the like.
    #[error("transport failure: {0}")]
    Transport(#[source] BoxError),

    #[error("server error (HTTP {0})")]
    ServerError(u16),
}

impl RequestError {
    pub fn transport<E: Into<BoxError>>(err: E) -> Self {
        Self::Transport(err.into())
    }

    /// Only 5xx responses count as failures; every other status is a served request.
    pub fn check_status(status: u16) -> Result<(), Self> {
        if (500..600).contains(&status) {
            Err(Self::ServerError(status))
        } else {
            Ok(())
        }
    }
}

/// Failures of the readiness probe or of the per-worker setup step.
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("target unreachable: {0}")]
    Unreachable(#[source] BoxError),

    #[error("could not build a client for the target: {0}")]
    Client(#[source] BoxError),

    #[error("setup step `{step}` failed: {source}")]
    Setup {
        step: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("setup step `{step}` answered with HTTP {status}")]
    UnexpectedStatus { step: &'static str, status: u16 },
}

/// A system under test, as seen by one worker.
///
/// Each worker builds its own `Target` on its own thread, so implementations need not be `Send`.
/// Requests of one worker run concurrently on a single thread and share the target and fixture
/// by reference.
#[allow(async_fn_in_trait)]
pub trait Target: 'static {
    /// Per-run state established by [`Target::setup`], e.g. a session and a resource to exercise.
    type Fixture: 'static;

    /// Any answer from the target means it is ready; errors are retried by the worker.
    async fn probe(&self) -> Result<(), TargetError>;

    async fn setup(&self) -> Result<Self::Fixture, TargetError>;

    /// Issue one request. No retries; the outcome is sampled as-is.
    async fn issue(&self, kind: RequestKind, fixture: &Self::Fixture) -> Result<(), RequestError>;
}
