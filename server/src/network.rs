//! Server network layer: TCP listener, accept loop and shutdown

use crate::dispatch::Dispatcher;
use crate::error::ServerError;
use crate::logging::Logger;
use crate::registry::SessionRegistry;
use crate::session::{Session, SessionId};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;
use tokio::net::{lookup_host, TcpListener};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

/// Default game port
pub const DEFAULT_PORT: u16 = 17091;

/// Console message sent to new connections unless configured otherwise
pub const DEFAULT_WELCOME: &str = "Welcome to Growtopia Private Server!";

/// Back-off after a failed accept so a persistent error does not spin
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(10);

/// Listener address and greeting for a `Server`
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Text of the console message sent to every new connection
    pub welcome_message: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            welcome_message: DEFAULT_WELCOME.to_string(),
        }
    }
}

/// Game server owning the listener and the session registry.
///
/// Lifecycle: `initialize` binds the listener, then either `run` (returns
/// after the given stop condition completes) or `run_detached` (returns
/// immediately) starts the accept loop. `stop` closes the listener, waits
/// for the accept loop and disconnects every session.
pub struct Server {
    config: ServerConfig,
    log: Arc<dyn Logger>,
    registry: Arc<Mutex<SessionRegistry>>,
    dispatcher: Dispatcher,
    listener: StdMutex<Option<TcpListener>>,
    accept_task: StdMutex<Option<JoinHandle<()>>>,
    shutdown: watch::Sender<bool>,
}

impl Server {
    /// Creates a server with an empty registry. Nothing is bound until
    /// `initialize` runs.
    pub fn new(config: ServerConfig, log: Arc<dyn Logger>) -> Self {
        let registry = Arc::new(Mutex::new(SessionRegistry::new(Arc::clone(&log))));
        let dispatcher = Dispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&log),
            &config.welcome_message,
        );
        let (shutdown, _) = watch::channel(false);

        Self {
            config,
            log,
            registry,
            dispatcher,
            listener: StdMutex::new(None),
            accept_task: StdMutex::new(None),
            shutdown,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Binds and listens on the configured host and port.
    ///
    /// Returns the bound address, which differs from the configured one when
    /// port 0 is used.
    pub async fn initialize(&self) -> Result<SocketAddr, ServerError> {
        let target = format!("{}:{}", self.config.host, self.config.port);
        let addr = lookup_host(target.as_str())
            .await
            .map_err(|source| ServerError::Resolve {
                addr: target.clone(),
                source,
            })?
            .next()
            .ok_or_else(|| ServerError::Resolve {
                addr: target.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no addresses resolved",
                ),
            })?;

        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(source) => {
                self.log
                    .error(format_args!("Failed to bind {}: {}", addr, source));
                return Err(ServerError::Bind { addr, source });
            }
        };

        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { addr, source })?;
        self.log
            .info(format_args!("Server listening on {}", local_addr));

        *self.listener.lock().unwrap_or_else(PoisonError::into_inner) = Some(listener);
        Ok(local_addr)
    }

    /// Starts the accept loop on a background task and returns immediately
    pub fn run_detached(&self) -> Result<(), ServerError> {
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(ServerError::NotInitialized)?;

        let task = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&self.registry),
            self.dispatcher.clone(),
            Arc::clone(&self.log),
            self.shutdown.subscribe(),
        ));

        *self
            .accept_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(task);
        self.log.info(format_args!("Server started successfully"));
        Ok(())
    }

    /// Runs the accept loop until `stop_condition` completes, then stops
    pub async fn run<F>(&self, stop_condition: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        self.run_detached()?;
        stop_condition.await;
        self.stop().await;
        Ok(())
    }

    /// Shuts the server down. Idempotent.
    ///
    /// Raising the shutdown signal first aborts every in-flight session send
    /// and receive, so a broadcast blocked on a stalled peer releases the
    /// registry lock before `disconnect_all` needs it.
    pub async fn stop(&self) {
        if self.shutdown.send_replace(true) {
            return;
        }
        self.log.info(format_args!("Server shutting down"));

        // Never started: drop the listener directly
        self.listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let task = self
            .accept_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                self.log
                    .error(format_args!("Accept loop ended abnormally: {}", e));
            }
        }

        let closed = self.registry.lock().await.disconnect_all();
        self.log.info(format_args!(
            "Server stopped ({} session(s) disconnected)",
            closed
        ));
    }

    /// Number of currently registered sessions
    pub async fn session_count(&self) -> usize {
        self.registry.lock().await.len()
    }
}

/// Accepts connections until the shutdown signal fires, then drops the
/// listener
async fn accept_loop(
    listener: TcpListener,
    registry: Arc<Mutex<SessionRegistry>>,
    dispatcher: Dispatcher,
    log: Arc<dyn Logger>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut next_session_id: u32 = 1;

    loop {
        let accepted = tokio::select! {
            biased;
            _ = shutdown.wait_for(|stopped| *stopped) => break,
            accepted = listener.accept() => accepted,
        };

        let (stream, peer) = match accepted {
            Ok(connection) => connection,
            Err(e) => {
                log.error(format_args!("Failed to accept client connection: {}", e));
                tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                continue;
            }
        };

        log.info(format_args!("New client connected from: {}", peer.ip()));

        let id = SessionId(next_session_id);
        next_session_id = next_session_id.wrapping_add(1);
        let session = Arc::new(
            Session::new(id, stream, peer, Arc::clone(&log)).with_shutdown(shutdown.clone()),
        );

        // A broadcast stuck on a stalled peer can hold the registry lock
        // until shutdown aborts it
        let inserted = tokio::select! {
            biased;
            _ = shutdown.wait_for(|stopped| *stopped) => {
                session.disconnect();
                break;
            }
            inserted = async { registry.lock().await.insert(Arc::clone(&session)) } => inserted,
        };

        if !inserted {
            log.warning(format_args!("Rejected session {} from {}", id, peer));
            session.disconnect();
            continue;
        }

        tokio::spawn(dispatcher.clone().handle_session(session));
    }

    drop(listener);
    log.info(format_args!("Listener closed"));
}
