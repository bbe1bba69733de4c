use super::*;

/// [`RpcChannel`] over newline-delimited JSON-RPC. Frames are queued here and
/// written out by the actor after each step of the session.
pub(super) struct TcpChannel {
    timeout: Duration,
    id_counter: u64,
    outbound: Vec<String>,
    inflight: HashMap<Id, Instant>,
    close_reason: Option<String>,
}

impl TcpChannel {
    pub(super) fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            id_counter: 0,
            outbound: Vec::new(),
            inflight: HashMap::new(),
            close_reason: None,
        }
    }

    pub(super) fn take_outbound(&mut self) -> Vec<String> {
        std::mem::take(&mut self.outbound)
    }

    pub(super) fn close_reason(&self) -> Option<&str> {
        self.close_reason.as_deref()
    }

    /// Marks a request as answered. Returns false for ids this channel never
    /// sent or already settled.
    pub(super) fn settle(&mut self, id: &Id) -> bool {
        self.inflight.remove(id).is_some()
    }

    /// Removes and returns every request whose deadline is before `now`.
    pub(super) fn expired(&mut self, now: Instant) -> Vec<Id> {
        let expired = self
            .inflight
            .iter()
            .filter(|(_, deadline)| now > **deadline)
            .map(|(id, _)| id.clone())
            .collect::<Vec<_>>();

        for id in &expired {
            self.inflight.remove(id);
        }

        expired
    }

    fn next_id(&mut self) -> Id {
        let id = self.id_counter;
        self.id_counter += 1;
        Id::Number(id)
    }

    fn queue(&mut self, message: &Message) -> Result<(), ChannelError> {
        let frame = serde_json::to_string(message)
            .map_err(|source| ChannelError::Serialization { source })?
            + "\n";

        self.outbound.push(frame);

        Ok(())
    }
}

impl RpcChannel for TcpChannel {
    fn send_method(&mut self, method: Method, params: Value) -> Result<Id, ChannelError> {
        if self.close_reason.is_some() {
            return Err(ChannelError::Closed);
        }

        let id = self.next_id();

        self.queue(&Message::Request {
            id: id.clone(),
            method: method.to_string(),
            params,
        })?;

        self.inflight
            .insert(id.clone(), Instant::now() + self.timeout);

        Ok(id)
    }

    fn respond(&mut self, id: Id, result: Value) -> Result<(), ChannelError> {
        if self.close_reason.is_some() {
            return Err(ChannelError::Closed);
        }

        self.queue(&Message::Response {
            id,
            result: Some(result),
            error: None,
        })
    }

    fn close(&mut self, reason: &str) {
        if self.close_reason.is_none() {
            self.close_reason = Some(reason.to_owned());
        }
    }
}
