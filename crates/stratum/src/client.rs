use {
    super::*,
    actor::{ClientActor, ClientMessage},
    channel::TcpChannel,
    futures::StreamExt,
    snafu::ResultExt,
    std::time::{Duration, Instant},
    tokio::{
        io::{AsyncWriteExt, BufWriter},
        net::{
            TcpStream,
            tcp::{OwnedReadHalf, OwnedWriteHalf},
        },
        sync::mpsc,
    },
    tokio_util::codec::{FramedRead, LinesCodec},
    tracing::error,
};

pub use error::ClientError;

mod actor;
mod channel;
mod error;

pub type Result<T = (), E = ClientError> = std::result::Result<T, E>;

const CHANNEL_BUFFER_SIZE: usize = 32;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub address: String,
    pub login: String,
    pub password: String,
    /// Bounds the TCP connect and every outstanding request.
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(
        address: impl Into<String>,
        login: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            login: login.into(),
            password: password.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// `host:port` to dial. Accepts bare `host:port` as well as the `tcp://`
    /// and `stratum+tcp://` URL forms miners are usually configured with.
    pub fn endpoint(&self) -> Result<String> {
        let address = self.address.trim();

        let stripped = address.strip_prefix("stratum+").unwrap_or(address);
        let stripped = stripped.strip_prefix("tcp://").unwrap_or(stripped);

        if stripped.is_empty() || stripped.contains("://") {
            return Err(ClientError::UnsupportedAddress {
                address: address.to_owned(),
            });
        }

        Ok(stripped.to_owned())
    }
}

/// Handle to a session running on its own task. Cloning shares the session.
#[derive(Clone)]
pub struct Client {
    tx: mpsc::Sender<ClientMessage>,
    events: broadcast::Sender<Event>,
}

impl Client {
    /// Starts connecting in the background. The returned receiver is
    /// subscribed before anything happens, so it observes `Event::Open`.
    pub fn spawn(config: ClientConfig) -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let (events, receiver) = broadcast::channel(EVENT_CAPACITY);

        let session = ClientSession::new(
            TcpChannel::new(config.timeout),
            Credentials::new(config.login.clone(), config.password.clone()),
            events.clone(),
        );

        tokio::spawn(ClientActor::new(config, rx, session).run());

        (Self { tx, events }, receiver)
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// Submits `share` and waits for the pool's verdict.
    pub async fn submit_share(&self, share: Share) -> Result<ShareOutcome> {
        let (respond_to, rx) = oneshot::channel();

        self.tx
            .send(ClientMessage::SubmitShare { share, respond_to })
            .await
            .map_err(|_| ClientError::ChannelSend)?;

        let outcome = rx.await.context(error::ChannelRecvSnafu)?;

        outcome.await.context(error::ChannelRecvSnafu)
    }

    pub async fn current_job(&self) -> Result<Option<Arc<Job>>> {
        let (respond_to, rx) = oneshot::channel();

        self.tx
            .send(ClientMessage::CurrentJob { respond_to })
            .await
            .map_err(|_| ClientError::ChannelSend)?;

        rx.await.context(error::ChannelRecvSnafu)
    }

    /// Closes the session and waits until the connection is torn down.
    /// Closing an already stopped client is a no-op.
    pub async fn close(&self, reason: impl Into<String>) -> Result {
        let (respond_to, rx) = oneshot::channel();

        let message = ClientMessage::Close {
            reason: reason.into(),
            respond_to,
        };

        if self.tx.send(message).await.is_err() {
            debug!("Client already stopped");
            return Ok(());
        }

        if rx.await.is_err() {
            debug!("Client stopped before confirming close");
        }

        Ok(())
    }
}
