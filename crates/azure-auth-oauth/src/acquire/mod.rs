//! Token acquisition: cached token first, browser-delegated flow otherwise.
//!
//! ```text
//! get_token ─┬─ cached and valid ────────────────────────────────→ Token
//!            └─ bind listener ─ open browser ─ wait ─┬─ redirect ─→ Token (persisted)
//!                                                     ├─ cancel ───→ Error::Cancelled
//!                                                     └─ timeout ──→ Error::Timeout
//! ```
//!
//! The listener is shut down before `get_token` returns on every path.

mod browser;
mod listener;

pub use browser::{Browser, SystemBrowser};

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::AuthorizationConfig;
use crate::error::{Error, Result};
use crate::flow::{AuthorizationCodeFlow, OAuthClient, generate_state};
use crate::token::{Token, TokenStore};
use listener::{PendingExchange, RedirectListener};

/// Default time the redirect listener gets to finish in-flight requests.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Resolves a usable access token for one user.
pub struct TokenAcquirer {
    config: AuthorizationConfig,
    store: Arc<dyn TokenStore>,
    browser: Arc<dyn Browser>,
    timeout: Option<Duration>,
    shutdown_grace: Duration,
    flow_lock: Mutex<()>,
}

impl std::fmt::Debug for TokenAcquirer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAcquirer")
            .field("username", &self.config.username)
            .field("timeout", &self.timeout)
            .field("shutdown_grace", &self.shutdown_grace)
            .finish_non_exhaustive()
    }
}

impl TokenAcquirer {
    /// Creates an acquirer using `store` as its token cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is incomplete.
    pub fn new(config: AuthorizationConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
        config.validate()?;
        config.provider()?.validate()?;

        Ok(Self {
            config,
            store,
            browser: Arc::new(SystemBrowser),
            timeout: None,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            flow_lock: Mutex::new(()),
        })
    }

    /// Replaces the browser launcher.
    #[must_use]
    pub fn with_browser(mut self, browser: Arc<dyn Browser>) -> Self {
        self.browser = browser;
        self
    }

    /// Gives up on an interactive flow after `timeout`.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets how long the redirect listener may take to shut down.
    #[must_use]
    pub const fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &AuthorizationConfig {
        &self.config
    }

    /// Returns a valid token, running the browser flow if the cache has none.
    ///
    /// Cancelling `cancel` aborts a pending interactive flow.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Bind`] if the redirect listener cannot start,
    /// [`Error::Cancelled`] or [`Error::Timeout`] if no redirect arrived in
    /// time, and the exchange error if the provider rejected the code.
    #[instrument(skip_all, fields(user = %self.config.username))]
    pub async fn get_token(&self, cancel: &CancellationToken) -> Result<Token> {
        let _flow = self.flow_lock.lock().await;

        match self.store.load() {
            Some(token) if token.is_valid() => {
                debug!(expiry = ?token.expiry, "using cached token");
                return Ok(token);
            }
            Some(token) => debug!(expiry = ?token.expiry, "cached token expired"),
            None => {}
        }

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let token = self.acquire_interactively(cancel).await?;
        info!(expiry = ?token.expiry, "obtained new token");
        Ok(token)
    }

    async fn acquire_interactively(&self, cancel: &CancellationToken) -> Result<Token> {
        let redirect = self.config.redirect()?;
        let provider = self.config.provider()?;

        let listener = TcpListener::bind((redirect.host.as_str(), redirect.port))
            .await
            .map_err(|source| Error::Bind {
                addr: format!("{}:{}", redirect.host, redirect.port),
                source,
            })?;
        let redirect_uri = redirect.url_for_port(listener.local_addr()?.port());

        let mut client =
            OAuthClient::new(&self.config.client_id, provider).with_redirect_uri(&redirect_uri);
        if let Some(secret) = &self.config.client_secret {
            client = client.with_client_secret(secret);
        }
        let flow = AuthorizationCodeFlow::new(client).with_pkce();
        let state = generate_state();
        let auth_url = flow.authorization_url(None, Some(&state))?;

        let (completion, completed) = oneshot::channel();
        let exchange = Arc::new(PendingExchange::new(
            flow,
            state,
            Arc::clone(&self.store),
            completion,
        ));
        let listener = RedirectListener::serve(
            listener,
            &redirect.route(),
            exchange,
            cancel.child_token(),
        );
        debug!(%redirect_uri, "redirect listener started");

        self.open_browser(auth_url).await;

        let outcome = self.wait_for_redirect(completed, cancel).await;
        listener.shutdown(self.shutdown_grace).await;
        outcome
    }

    async fn open_browser(&self, url: Url) {
        let launcher = Arc::clone(&self.browser);
        let target = url.clone();
        let opened = tokio::task::spawn_blocking(move || launcher.open(&target))
            .await
            .unwrap_or_else(|e| Err(io::Error::other(e)));

        match opened {
            Ok(()) => debug!("opened authorization URL in browser"),
            Err(e) => {
                warn!(error = %e, "failed to launch browser");
                browser::print_manual_instructions(&url, &e);
            }
        }
    }

    async fn wait_for_redirect(
        &self,
        completed: oneshot::Receiver<Result<Token>>,
        cancel: &CancellationToken,
    ) -> Result<Token> {
        let deadline = async {
            match self.timeout {
                Some(timeout) => {
                    tokio::time::sleep(timeout).await;
                    timeout
                }
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            outcome = completed => outcome.unwrap_or(Err(Error::ListenerClosed)),
            () = cancel.cancelled() => {
                debug!("acquisition cancelled");
                Err(Error::Cancelled)
            }
            elapsed = deadline => Err(Error::Timeout(elapsed)),
        }
    }
}
