use super::*;

/// How often in-flight requests are checked against their deadline.
const EXPIRY_INTERVAL: Duration = Duration::from_millis(500);

type Reader = FramedRead<OwnedReadHalf, LinesCodec>;

type Writer = BufWriter<OwnedWriteHalf>;

pub(super) enum ClientMessage {
    SubmitShare {
        share: Share,
        respond_to: oneshot::Sender<oneshot::Receiver<ShareOutcome>>,
    },
    CurrentJob {
        respond_to: oneshot::Sender<Option<Arc<Job>>>,
    },
    Close {
        reason: String,
        respond_to: oneshot::Sender<()>,
    },
}

pub(super) struct ClientActor {
    config: ClientConfig,
    rx: mpsc::Receiver<ClientMessage>,
    session: ClientSession<TcpChannel>,
    close_waiters: Vec<oneshot::Sender<()>>,
}

impl ClientActor {
    pub(super) fn new(
        config: ClientConfig,
        rx: mpsc::Receiver<ClientMessage>,
        session: ClientSession<TcpChannel>,
    ) -> Self {
        Self {
            config,
            rx,
            session,
            close_waiters: Vec::new(),
        }
    }

    pub(super) async fn run(mut self) {
        self.session.on_lifecycle(Lifecycle::Open);

        let stream = match self.connect().await {
            Ok(stream) => stream,
            Err(err) => {
                error!("Failed to connect to {}: {err}", self.config.address);
                self.finish(err.to_string());
                return;
            }
        };

        let (reader, writer) = stream.into_split();
        let mut reader = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_MESSAGE_SIZE));
        let mut writer = BufWriter::new(writer);

        self.session.on_lifecycle(Lifecycle::Connect);

        let reason = self.serve(&mut reader, &mut writer).await;

        if let Err(err) = writer.shutdown().await {
            debug!("Failed to shut down writer: {err}");
        }

        self.session.on_lifecycle(Lifecycle::Disconnect);

        self.finish(reason);
    }

    async fn connect(&self) -> Result<TcpStream> {
        let endpoint = self.config.endpoint()?;

        let stream = tokio::time::timeout(self.config.timeout, TcpStream::connect(&endpoint))
            .await
            .context(error::TimeoutSnafu)?
            .context(error::IoSnafu)?;

        stream.set_nodelay(true).context(error::IoSnafu)?;

        info!("Connected to {endpoint}");

        Ok(stream)
    }

    /// Pumps the connection until the session or the socket closes and returns
    /// the reason.
    async fn serve(&mut self, reader: &mut Reader, writer: &mut Writer) -> String {
        let mut expiry = tokio::time::interval(EXPIRY_INTERVAL);
        expiry.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            if let Err(err) = self.flush(writer).await {
                error!("Write error: {err}");
                return err.to_string();
            }

            if let Some(reason) = self.session.channel().close_reason() {
                return reason.to_owned();
            }

            tokio::select! {
                biased;

                line = reader.next() => match line {
                    Some(Ok(line)) => self.handle_line(&line),
                    Some(Err(err)) => {
                        error!("Read error: {err}");
                        return format!("Read error: {err}");
                    }
                    None => return "Connection closed by pool".into(),
                },
                message = self.rx.recv() => match message {
                    Some(message) => self.handle_message(message),
                    None => self.session.close("Client dropped"),
                },
                _ = expiry.tick() => self.expire_requests(),
            }
        }
    }

    fn handle_line(&mut self, line: &str) {
        let message = match serde_json::from_str::<Message>(line) {
            Ok(message) => message,
            Err(err) => {
                warn!("Invalid JSON message: {line:?} - {err}");
                return;
            }
        };

        if let Message::Response { id, .. } = &message
            && !self.session.channel_mut().settle(id)
        {
            debug!("Response ID={id} was not in flight");
        }

        self.session.on_message(message);
    }

    fn handle_message(&mut self, message: ClientMessage) {
        match message {
            ClientMessage::SubmitShare { share, respond_to } => {
                let outcome = self.session.submit_share(&share);
                if respond_to.send(outcome).is_err() {
                    debug!("Submit response dropped: caller gave up");
                }
            }
            ClientMessage::CurrentJob { respond_to } => {
                let job = self.session.state().current_job().cloned();
                if respond_to.send(job).is_err() {
                    debug!("CurrentJob response dropped: caller gave up");
                }
            }
            ClientMessage::Close { reason, respond_to } => {
                self.session.close(reason);
                self.close_waiters.push(respond_to);
            }
        }
    }

    fn expire_requests(&mut self) {
        for id in self.session.channel_mut().expired(Instant::now()) {
            warn!("Request ID={id} expired");

            self.session.on_message(Message::Response {
                id,
                result: None,
                error: Some(json!([-1, "Request expired", null])),
            });
        }
    }

    async fn flush(&mut self, writer: &mut Writer) -> Result {
        let frames = self.session.channel_mut().take_outbound();

        if frames.is_empty() {
            return Ok(());
        }

        for frame in frames {
            writer
                .write_all(frame.as_bytes())
                .await
                .context(error::IoSnafu)?;
        }

        writer.flush().await.context(error::IoSnafu)
    }

    fn finish(mut self, reason: String) {
        self.session.on_lifecycle(Lifecycle::Close { reason });

        for respond_to in self.close_waiters.drain(..) {
            if respond_to.send(()).is_err() {
                debug!("Close response dropped: caller gave up");
            }
        }

        self.rx.close();
    }
}
