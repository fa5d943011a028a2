//! Refresh Coordinator
//!
//! Client-side session state with single-flight refresh: however many
//! requests hit an expired access token at once, one refresh call is made and
//! every caller waits on its result.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::auth::TokenPair;
use crate::client::{
    AuthEvent, ClientError, Listeners, RefreshTransport, RequestError, Subscription,
};

type RefreshFuture = Shared<BoxFuture<'static, Result<String, ClientError>>>;

// == Session State ==
struct InFlight {
    id: u64,
    future: RefreshFuture,
    /// Fires (or drops) when the session ends under the refresh
    _abort: oneshot::Sender<()>,
}

#[derive(Default)]
struct SessionState {
    access_token: Option<String>,
    refresh_token: Option<String>,
    in_flight: Option<InFlight>,
    next_flight: u64,
}

struct Inner {
    state: Mutex<SessionState>,
    transport: Arc<dyn RefreshTransport>,
    listeners: Listeners,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

enum Plan {
    /// Someone already refreshed past the stale token
    Current(String),
    Await(RefreshFuture),
    NoSession { had_access: bool },
}

// == Refresh Coordinator ==
/// Session-scoped token holder. Clones share the same session.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl RefreshCoordinator {
    /// Creates a coordinator with no session.
    ///
    /// # Arguments
    /// * `transport` - How refresh calls reach the server
    pub fn new(transport: Arc<dyn RefreshTransport>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(SessionState::default()),
                transport,
                listeners: Listeners::new(),
            }),
        }
    }

    // == Token State ==
    /// Installs a freshly issued pair (login) and notifies listeners.
    ///
    /// A refresh still running for the previous session is abandoned.
    pub fn set_tokens(&self, pair: TokenPair) {
        {
            let mut state = self.inner.lock();
            state.access_token = Some(pair.access_token);
            state.refresh_token = Some(pair.refresh_token);
            state.in_flight = None;
        }
        info!("session started");
        self.inner.listeners.emit(&AuthEvent::LoggedIn);
    }

    /// Logs out: forgets both tokens and fails any pending refresh with
    /// [`ClientError::SessionTerminated`].
    pub fn clear_tokens(&self) {
        let had_session = {
            let mut state = self.inner.lock();
            // Dropping the flight's abort sender wakes its waiters
            state.in_flight = None;
            let had_session = state.access_token.is_some() || state.refresh_token.is_some();
            state.access_token = None;
            state.refresh_token = None;
            had_session
        };

        if had_session {
            info!("session logged out");
            self.inner.listeners.emit(&AuthEvent::LoggedOut);
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner.lock().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.inner.lock().refresh_token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.lock().access_token.is_some()
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.lock().in_flight.is_some()
    }

    /// Registers a session listener; see [`Listeners::subscribe`].
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&AuthEvent) + Send + Sync + 'static,
    {
        self.inner.listeners.subscribe(listener)
    }

    // == Refresh ==
    /// Returns a fresh access token, refreshing at most once per expiry.
    ///
    /// `stale_access` is the token the caller saw rejected. If the session
    /// has already moved past it, the current token is returned without a
    /// network call. Otherwise the caller joins the in-flight refresh or
    /// starts one.
    ///
    /// # Arguments
    /// * `stale_access` - Access token the server rejected, if known
    pub async fn refresh(&self, stale_access: Option<&str>) -> Result<String, ClientError> {
        let plan = {
            let mut state = self.inner.lock();
            let in_flight = state.in_flight.as_ref().map(|flight| flight.future.clone());

            match (stale_access, state.access_token.clone()) {
                (Some(stale), Some(current)) if stale != current => Plan::Current(current),
                _ => match (in_flight, state.refresh_token.clone()) {
                    (Some(future), _) => Plan::Await(future),
                    (None, Some(refresh_token)) => {
                        Plan::Await(self.start_flight(&mut state, refresh_token))
                    }
                    (None, None) => {
                        let had_access = state.access_token.take().is_some();
                        Plan::NoSession { had_access }
                    }
                },
            }
        };

        match plan {
            Plan::Current(token) => Ok(token),
            Plan::Await(future) => future.await,
            Plan::NoSession { had_access } => {
                let err = ClientError::Unauthenticated;
                if had_access {
                    self.inner
                        .listeners
                        .emit(&AuthEvent::SessionExpired(err.clone()));
                }
                Err(err)
            }
        }
    }

    fn start_flight(&self, state: &mut SessionState, refresh_token: String) -> RefreshFuture {
        let id = state.next_flight;
        state.next_flight += 1;

        let (abort_tx, abort_rx) = oneshot::channel();
        let task = tokio::spawn(run_flight(
            Arc::clone(&self.inner),
            id,
            refresh_token,
            abort_rx,
        ));
        let future = async move {
            task.await
                .unwrap_or_else(|e| Err(ClientError::Transport(format!("refresh task failed: {e}"))))
        }
        .boxed()
        .shared();

        debug!(flight = id, "refresh started");
        state.in_flight = Some(InFlight {
            id,
            future: future.clone(),
            _abort: abort_tx,
        });
        future
    }

    // == Execute ==
    /// Runs an authenticated request, refreshing and retrying once on an
    /// expired access token.
    ///
    /// A second rejection is returned to the caller as is.
    ///
    /// # Arguments
    /// * `request` - Sends the request with the access token it is given
    pub async fn execute<T, F, Fut>(&self, request: F) -> Result<T, ClientError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, RequestError>>,
    {
        let token = self.access_token().ok_or(ClientError::Unauthenticated)?;

        match request(token.clone()).await {
            Ok(value) => Ok(value),
            Err(RequestError::Unauthorized) => {
                let fresh = self.refresh(Some(&token)).await?;
                match request(fresh).await {
                    Ok(value) => Ok(value),
                    Err(err) => Err(self.fail(err)),
                }
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Converts a request failure, ending the session when it is terminal.
    fn fail(&self, err: RequestError) -> ClientError {
        let err = ClientError::from(err);
        if err.is_terminal() {
            self.expire(&err);
        }
        err
    }

    fn expire(&self, err: &ClientError) {
        {
            let mut state = self.inner.lock();
            state.access_token = None;
            state.refresh_token = None;
            state.in_flight = None;
        }
        warn!(error = %err, "session expired");
        self.inner
            .listeners
            .emit(&AuthEvent::SessionExpired(err.clone()));
    }
}

// == Flight ==
/// Body of one refresh. Applies the outcome to the session exactly once,
/// unless the session ended or restarted while the call was pending.
async fn run_flight(
    inner: Arc<Inner>,
    id: u64,
    refresh_token: String,
    abort: oneshot::Receiver<()>,
) -> Result<String, ClientError> {
    let outcome = tokio::select! {
        result = inner.transport.refresh(&refresh_token) => result,
        _ = abort => Err(ClientError::SessionTerminated),
    };

    let event = {
        let mut state = inner.lock();
        if !state.in_flight.as_ref().is_some_and(|flight| flight.id == id) {
            debug!(flight = id, "refresh superseded");
            return Err(ClientError::SessionTerminated);
        }
        state.in_flight = None;

        match &outcome {
            Ok(pair) => {
                state.access_token = Some(pair.access_token.clone());
                state.refresh_token = Some(pair.refresh_token.clone());
                Some(AuthEvent::Refreshed)
            }
            Err(err) if err.is_terminal() => {
                state.access_token = None;
                state.refresh_token = None;
                Some(AuthEvent::SessionExpired(err.clone()))
            }
            // Transient: keep the tokens so a later attempt can retry
            Err(_) => None,
        }
    };

    match &event {
        Some(AuthEvent::Refreshed) => info!(flight = id, "access token refreshed"),
        Some(_) => warn!(flight = id, "refresh rejected, session expired"),
        None => warn!(flight = id, "refresh failed, tokens kept"),
    }
    if let Some(event) = event {
        inner.listeners.emit(&event);
    }

    outcome.map(|pair| pair.access_token)
}
