//! Per-login cancellation scopes.
//!
//! Every sign-in opens a scope identified by a random id stored in the
//! session. Backend calls whose results would be written back into the
//! session run inside that scope; signing out cancels it so a late response
//! can never repopulate a signed-out session.

use std::future::Future;
use std::time::Duration;

use moka::sync::Cache;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Scopes idle longer than a session can live are forgotten.
const SCOPE_IDLE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Registry of live login scopes.
#[derive(Clone)]
pub struct ViewLifecycles {
    scopes: Cache<Uuid, CancellationToken>,
}

impl Default for ViewLifecycles {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewLifecycles {
    #[must_use]
    pub fn new() -> Self {
        Self {
            scopes: Cache::builder()
                .max_capacity(100_000)
                .time_to_idle(SCOPE_IDLE)
                .build(),
        }
    }

    /// Open a new scope and return its id.
    #[must_use]
    pub fn begin(&self) -> Uuid {
        let scope_id = Uuid::new_v4();
        self.scopes.insert(scope_id, CancellationToken::new());
        scope_id
    }

    /// Token for a scope.
    ///
    /// A scope the registry doesn't know (ended, or evicted while idle) is
    /// already cancelled; only `begin` opens scopes.
    #[must_use]
    pub fn token(&self, scope_id: Uuid) -> CancellationToken {
        self.scopes.get(&scope_id).unwrap_or_else(|| {
            let token = CancellationToken::new();
            token.cancel();
            token
        })
    }

    /// Whether a scope is open. Also keeps it from idling out.
    #[must_use]
    pub fn is_live(&self, scope_id: Uuid) -> bool {
        self.scopes
            .get(&scope_id)
            .is_some_and(|token| !token.is_cancelled())
    }

    /// Cancel a scope and everything still running inside it.
    pub fn end(&self, scope_id: Uuid) {
        if let Some(token) = self.scopes.remove(&scope_id) {
            token.cancel();
        }
    }

    /// Run `future` inside a scope.
    ///
    /// Returns `None` if the scope was ended before the future completed. A
    /// scope that is already gone never polls `future` at all.
    pub async fn run<F>(&self, scope_id: Uuid, future: F) -> Option<F::Output>
    where
        F: Future,
    {
        let token = self.token(scope_id);

        tokio::select! {
            biased;
            () = token.cancelled() => {
                tracing::debug!(%scope_id, "Scoped call cancelled");
                None
            }
            output = future => (!token.is_cancelled()).then_some(output),
        }
    }
}
