//! Local redirect listener for one interactive authorization.

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::flow::AuthorizationCodeFlow;
use crate::token::{ErrorResponse, Token, TokenStore};

/// State shared with the redirect handler for one flow.
pub(super) struct PendingExchange {
    flow: AuthorizationCodeFlow,
    state: String,
    store: Arc<dyn TokenStore>,
    completion: Mutex<Option<oneshot::Sender<Result<Token>>>>,
}

impl PendingExchange {
    pub(super) fn new(
        flow: AuthorizationCodeFlow,
        state: String,
        store: Arc<dyn TokenStore>,
        completion: oneshot::Sender<Result<Token>>,
    ) -> Self {
        Self {
            flow,
            state,
            store,
            completion: Mutex::new(Some(completion)),
        }
    }

    fn take_completion(&self) -> Option<oneshot::Sender<Result<Token>>> {
        self.completion.lock().ok()?.take()
    }

    /// Only the real redirect carries the `state` this flow sent out.
    fn expects(&self, query: &RedirectQuery) -> bool {
        query.state.as_deref() == Some(self.state.as_str())
    }

    /// Exchange, then persist. Only called once per flow.
    async fn redeem(&self, code: &str) -> Result<Token> {
        debug!("exchanging authorization code");
        let token = self.flow.exchange_code(code).await?;

        if let Err(e) = self.store.save(&token) {
            warn!(error = %e, "failed to store updated token");
        }

        Ok(token)
    }
}

#[derive(Debug, Deserialize)]
struct RedirectQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl RedirectQuery {
    fn authorization_code(self) -> Result<String> {
        if let Some(error) = self.error {
            return Err(ErrorResponse {
                error,
                error_description: self.error_description.unwrap_or_default(),
            }
            .into_error());
        }

        self.code
            .filter(|code| !code.is_empty())
            .ok_or_else(|| Error::InvalidResponse("redirect is missing the code parameter".into()))
    }
}

fn failure(status: StatusCode, error: &Error) -> (StatusCode, String) {
    (status, format!("authorization failed: {error}\n"))
}

async fn redirect_handler(
    State(exchange): State<Arc<PendingExchange>>,
    Query(query): Query<RedirectQuery>,
) -> (StatusCode, String) {
    // A request without the flow's state never consumes the completion.
    if !exchange.expects(&query) {
        debug!("ignoring redirect request without the expected state");
        return failure(StatusCode::BAD_REQUEST, &Error::StateMismatch);
    }

    let Some(completion) = exchange.take_completion() else {
        return (StatusCode::GONE, "authorization already handled\n".into());
    };

    let (outcome, response) = match query.authorization_code() {
        Ok(code) => {
            let outcome = exchange.redeem(&code).await;
            let response = match &outcome {
                Ok(_) => (StatusCode::OK, "OK\n".to_string()),
                Err(e @ (Error::Http(_) | Error::InvalidResponse(_))) => {
                    failure(StatusCode::BAD_GATEWAY, e)
                }
                Err(e) => failure(StatusCode::BAD_REQUEST, e),
            };
            (outcome, response)
        }
        Err(e) => {
            let response = failure(StatusCode::BAD_REQUEST, &e);
            (Err(e), response)
        }
    };

    if completion.send(outcome).is_err() {
        debug!("acquisition stopped waiting before the redirect completed");
    }
    response
}

/// Running redirect listener; stopped on [`shutdown`](Self::shutdown) or drop.
pub(super) struct RedirectListener {
    shutdown: CancellationToken,
    task: Option<JoinHandle<io::Result<()>>>,
}

impl RedirectListener {
    /// Serves `route` on an already bound listener until `shutdown` fires.
    pub(super) fn serve(
        listener: TcpListener,
        route: &str,
        exchange: Arc<PendingExchange>,
        shutdown: CancellationToken,
    ) -> Self {
        let router = Router::new()
            .route(route, get(redirect_handler))
            .with_state(exchange);
        let signal = shutdown.clone().cancelled_owned();

        let task = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(signal)
                .await
        });

        Self {
            shutdown,
            task: Some(task),
        }
    }

    /// Stops accepting connections and waits up to `grace` for in-flight
    /// requests to finish.
    pub(super) async fn shutdown(mut self, grace: Duration) {
        self.shutdown.cancel();
        let Some(task) = self.task.take() else {
            return;
        };

        match tokio::time::timeout(grace, task).await {
            Ok(Ok(Ok(()))) => debug!("redirect listener stopped"),
            Ok(Ok(Err(e))) => warn!(error = %e, "redirect listener failed"),
            Ok(Err(e)) => warn!(error = %e, "redirect listener task failed"),
            Err(_) => warn!(?grace, "redirect listener still busy after grace period"),
        }
    }
}

impl Drop for RedirectListener {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
