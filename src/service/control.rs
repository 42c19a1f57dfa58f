//! Control-channel accept and serve loop.
//!
//! Each accepted connection is driven by its own task with exclusively-owned
//! framing and handshake state; the session directory is the only shared
//! object. Connections that never complete a handshake are dropped after the
//! configured window so a silent peer cannot hold an accept slot open.

use crate::config::VoicenetConfig;
use crate::core::codec::FrameCodec;
use crate::directory::SessionDirectory;
use crate::error::{constants, Result, VoicenetError};
use crate::protocol::dispatcher::Dispatcher;
use crate::protocol::handshake::{rejection_for, ControlHandshake, Welcome};
use crate::protocol::message::ControlMessage;
use crate::protocol::version::VersionGate;
use crate::protocol::SessionId;
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::{debug, error, info, instrument, warn};

/// Everything a connection task needs, cloned per accept.
#[derive(Clone)]
struct ConnectionContext {
    connection_id: String,
    directory: Arc<SessionDirectory>,
    dispatcher: Dispatcher,
    gate: VersionGate,
    server_version: String,
    max_frame: usize,
    handshake_timeout: Duration,
    welcome_tx: Option<mpsc::Sender<Welcome>>,
}

/// Accept loop for the control channel.
pub struct ControlServer {
    directory: Arc<SessionDirectory>,
    dispatcher: Dispatcher,
    gate: VersionGate,
    server_version: String,
    max_frame: usize,
    handshake_timeout: Duration,
    shutdown_timeout: Duration,
    max_connections: usize,
    welcome_tx: Option<mpsc::Sender<Welcome>>,
    next_conn: AtomicU64,
}

impl ControlServer {
    /// Build a server around a shared directory and the gateway's dispatcher.
    ///
    /// # Errors
    /// Returns [`VoicenetError::ConfigError`] if the configured server
    /// version is not a valid version string.
    pub fn new(
        config: &VoicenetConfig,
        directory: Arc<SessionDirectory>,
        dispatcher: Dispatcher,
    ) -> Result<Self> {
        let gate = VersionGate::for_server_version(&config.server.server_version)?;
        Ok(Self {
            directory,
            dispatcher,
            gate,
            server_version: config.server.server_version.clone(),
            max_frame: config.framing.max_frame_bytes,
            handshake_timeout: config.server.handshake_timeout,
            shutdown_timeout: config.server.shutdown_timeout,
            max_connections: config.server.max_connections,
            welcome_tx: None,
            next_conn: AtomicU64::new(0),
        })
    }

    /// Deliver each new session's welcome payload to the gateway over a
    /// channel instead of a callback.
    pub fn with_welcome_channel(mut self, tx: mpsc::Sender<Welcome>) -> Self {
        self.welcome_tx = Some(tx);
        self
    }

    /// Run the accept loop until CTRL+C.
    pub async fn run(&self, listener: TcpListener) -> Result<()> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("Received CTRL+C signal, shutting down");
                let _ = shutdown_tx.send(()).await;
            }
        });

        self.run_with_shutdown(listener, shutdown_rx).await
    }

    /// Run the accept loop with an external shutdown channel.
    #[instrument(skip(self, listener, shutdown_rx))]
    pub async fn run_with_shutdown(
        &self,
        listener: TcpListener,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) -> Result<()> {
        info!(address = %listener.local_addr()?, "Control listener started");

        // Track active connections for graceful shutdown
        let active_connections = Arc::new(Mutex::new(0u32));

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Shutting down control listener. Waiting for connections to close...");

                    let deadline = tokio::time::sleep(self.shutdown_timeout);
                    tokio::pin!(deadline);

                    loop {
                        tokio::select! {
                            _ = &mut deadline => {
                                warn!("Shutdown timeout reached, forcing exit");
                                break;
                            }
                            _ = tokio::time::sleep(Duration::from_millis(250)) => {
                                let connections = *active_connections.lock().await;
                                if connections == 0 {
                                    info!("All connections closed, shutting down");
                                    break;
                                }
                                debug!(connections, "Waiting for connections to close");
                            }
                        }
                    }

                    return Ok(());
                }

                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, peer)) => {
                            {
                                let count = *active_connections.lock().await;
                                if count as usize >= self.max_connections {
                                    warn!(%peer, count, "Connection limit reached, refusing");
                                    drop(stream);
                                    continue;
                                }
                            }

                            let seq = self.next_conn.fetch_add(1, Ordering::Relaxed);
                            let ctx = ConnectionContext {
                                connection_id: format!("ctl-{peer}-{seq}"),
                                directory: Arc::clone(&self.directory),
                                dispatcher: self.dispatcher.clone(),
                                gate: self.gate.clone(),
                                server_version: self.server_version.clone(),
                                max_frame: self.max_frame,
                                handshake_timeout: self.handshake_timeout,
                                welcome_tx: self.welcome_tx.clone(),
                            };
                            let active_connections = active_connections.clone();

                            tokio::spawn(async move {
                                {
                                    let mut count = active_connections.lock().await;
                                    *count += 1;
                                }

                                let connection_id = ctx.connection_id.clone();
                                if let Err(e) = serve_connection(stream, ctx).await {
                                    debug!(connection_id = %connection_id, error = %e, "Connection ended with error");
                                }

                                let mut count = active_connections.lock().await;
                                *count -= 1;
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "Error accepting connection");
                        }
                    }
                }
            }
        }
    }
}

/// Connect to a control server, ready to send a handshake.
pub async fn connect(addr: &str) -> Result<Framed<TcpStream, FrameCodec>> {
    let stream = TcpStream::connect(addr).await?;
    Ok(Framed::new(stream, FrameCodec::new()))
}

/// Drive one control connection from accept to disconnect.
///
/// The session (if one was established) is always removed from the directory
/// on the way out, whatever ended the connection.
async fn serve_connection<S>(stream: S, ctx: ConnectionContext) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut framed = Framed::new(stream, FrameCodec::with_max_frame(ctx.max_frame));

    // The first frame must be a handshake and must arrive in time.
    let first = match timeout(ctx.handshake_timeout, framed.next()).await {
        Err(_) => {
            debug!(connection_id = %ctx.connection_id, "{}", constants::ERR_HANDSHAKE_TIMEOUT);
            return Err(VoicenetError::Timeout);
        }
        Ok(None) => return Err(VoicenetError::ConnectionClosed),
        Ok(Some(result)) => result?,
    };

    let mut handshake = ControlHandshake::new();
    let (ack, welcome) = match handshake.establish(
        &ctx.directory,
        &ctx.gate,
        &ctx.connection_id,
        &ctx.server_version,
        &first,
    ) {
        Ok(established) => established,
        Err(e) => {
            warn!(connection_id = %ctx.connection_id, error = %e, "Handshake rejected");
            let _ = framed.send(rejection_for(&e)).await;
            return Err(e);
        }
    };

    // From here on the session exists; whatever happens below, it must be
    // purged from the directory on the way out.
    let session_id = welcome.session_id;
    let session_io = async {
        framed.send(ack).await?;
        info!(
            connection_id = %ctx.connection_id,
            session_id,
            "Control session established"
        );

        if let Some(tx) = &ctx.welcome_tx {
            let _ = tx.send(welcome).await;
        }

        drive_established(&mut framed, session_id, &ctx).await
    };
    let result = session_io.await;

    ctx.directory.remove_session(session_id);
    result
}

/// Message loop for an established session.
async fn drive_established<S>(
    framed: &mut Framed<S, FrameCodec>,
    session_id: SessionId,
    ctx: &ConnectionContext,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    while let Some(next) = framed.next().await {
        // Frame-level errors (oversized header) are not recoverable: the
        // stream can no longer be trusted to be aligned.
        let message = next?;

        let reply = match message {
            ControlMessage::Ping => Some(ControlMessage::Pong),
            ControlMessage::Unknown => {
                debug!(session_id, "Ignoring unrecognized message kind");
                None
            }
            other => match ctx.dispatcher.dispatch(session_id, &other) {
                Ok(reply) => reply,
                Err(VoicenetError::UnexpectedMessage) => {
                    warn!(session_id, opcode = %other.opcode(), "No handler registered");
                    Some(ControlMessage::error(
                        constants::CODE_UNSUPPORTED_MESSAGE,
                        format!("no handler for {}", other.opcode()),
                    ))
                }
                Err(e) => {
                    warn!(session_id, error = %e, "Handler failed");
                    Some(ControlMessage::error(constants::CODE_INTERNAL, e.to_string()))
                }
            },
        };

        if let Some(reply) = reply {
            framed.send(reply).await?;
        }
    }

    debug!(session_id, "{}", constants::ERR_CONNECTION_CLOSED);
    Ok(())
}
