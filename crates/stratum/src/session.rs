//! The protocol engine: drives the subscribe/authorize handshake, validates
//! every inbound message and turns notifications into [`Job`]s.
//!
//! `ClientSession` does no I/O of its own. A transport implementing
//! [`RpcChannel`] carries its requests and feeds back one inbound message or
//! lifecycle signal at a time, so all session state is mutated from a single
//! place without locking.

use {
    super::*,
    share::Submit,
};

/// The transport underneath a session.
///
/// Implementations assign request ids and report replies through
/// [`ClientSession::on_message`] as [`Message::Response`] with the same id,
/// exactly once per request.
pub trait RpcChannel {
    fn send_method(&mut self, method: Method, params: Value) -> Result<Id, ChannelError>;

    /// Replies to an inbound call.
    fn respond(&mut self, id: Id, result: Value) -> Result<(), ChannelError>;

    /// Tears the connection down. Called at most once per session.
    fn close(&mut self, reason: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lifecycle {
    Open,
    Connect,
    Disconnect,
    Close { reason: String },
}

enum Pending {
    Subscribe,
    Authorize,
    Submit(oneshot::Sender<ShareOutcome>),
}

pub struct ClientSession<C> {
    channel: C,
    credentials: Credentials,
    state: SessionState,
    pending: HashMap<Id, Pending>,
    events: broadcast::Sender<Event>,
}

impl<C: RpcChannel> ClientSession<C> {
    pub fn new(channel: C, credentials: Credentials, events: broadcast::Sender<Event>) -> Self {
        Self {
            channel,
            credentials,
            state: SessionState::default(),
            pending: HashMap::new(),
            events,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    pub fn on_lifecycle(&mut self, signal: Lifecycle) {
        match signal {
            Lifecycle::Open => self.emit(Event::Open),
            Lifecycle::Connect => {
                self.emit(Event::Connect);

                if self.phase() == Phase::Closed {
                    return;
                }

                self.state.reset_connection();
                self.state.set_phase(Phase::AwaitingSubscribe);
                self.request(Method::Subscribe, json!([]), Pending::Subscribe);
            }
            Lifecycle::Disconnect => {
                self.emit(Event::Disconnect);
                self.abandon_pending("disconnected");

                if self.phase() != Phase::Closed {
                    self.state.reset_connection();
                    self.state.set_phase(Phase::Connecting);
                }
            }
            Lifecycle::Close { reason } => {
                self.abandon_pending(&reason);
                self.state.set_phase(Phase::Closed);
                self.emit(Event::Close { reason });
            }
        }
    }

    pub fn on_message(&mut self, message: Message) {
        if self.phase() == Phase::Closed {
            debug!("Ignoring inbound message on closed session");
            return;
        }

        match message {
            Message::Response { id, result, error } => self.on_response(id, result, error),
            Message::Notification { method, params } => {
                self.on_notification(Notification::parse(&method, params))
            }
            Message::Request { id, method, .. } => self.on_call(id, Call::parse(&method)),
        }
    }

    /// Sends `share` with `mining.submit`. The receiver resolves once the pool
    /// answers, or right away if the share cannot be sent. Failures never
    /// close the session.
    pub fn submit_share(&mut self, share: &Share) -> oneshot::Receiver<ShareOutcome> {
        let (tx, rx) = oneshot::channel();

        if self.phase() == Phase::Closed {
            resolve(tx, ShareOutcome::rejected("session closed"));
            return rx;
        }

        if let Some(subscription) = self.state.subscription()
            && share.extranonce2.len() != subscription.extranonce2_size
        {
            let reason = format!(
                "extranonce2 is {} bytes, expected {}",
                share.extranonce2.len(),
                subscription.extranonce2_size
            );
            resolve(tx, ShareOutcome::rejected(reason));
            return rx;
        }

        let params = match serde_json::to_value(Submit {
            login: &self.credentials.login,
            share,
        }) {
            Ok(params) => params,
            Err(err) => {
                resolve(tx, ShareOutcome::rejected(err.to_string()));
                return rx;
            }
        };

        match self.channel.send_method(Method::Submit, params) {
            Ok(id) => {
                debug!("Submitting share for job {} (id={id})", share.job_id);
                self.pending.insert(id, Pending::Submit(tx));
            }
            Err(err) => resolve(tx, ShareOutcome::rejected(err.to_string())),
        }

        rx
    }

    /// Closes the session for good. The channel's close is invoked once; later
    /// calls are ignored.
    pub fn close(&mut self, reason: impl Into<String>) {
        if self.phase() == Phase::Closed {
            return;
        }

        let reason = reason.into();

        warn!("Closing session: {reason}");

        self.state.set_phase(Phase::Closed);
        self.abandon_pending(&reason);
        self.channel.close(&reason);
    }

    fn on_response(&mut self, id: Id, result: Option<Value>, error: Option<Value>) {
        let Some(pending) = self.pending.remove(&id) else {
            warn!("Unmatched response ID={id}");
            return;
        };

        match pending {
            Pending::Subscribe => self.on_subscribe_response(result, error),
            Pending::Authorize => self.on_authorize_response(result, error),
            Pending::Submit(respond_to) => {
                let outcome = ShareOutcome::from_response(result.as_ref(), error.as_ref());
                debug!("Share {outcome}");
                resolve(respond_to, outcome);
            }
        }
    }

    fn on_subscribe_response(&mut self, result: Option<Value>, error: Option<Value>) {
        if let Some(error) = error {
            self.close(describe_error(&error));
            return;
        }

        let subscription = match Subscription::from_response(&result.unwrap_or_default()) {
            Ok(subscription) => subscription,
            Err(err) => {
                self.close(err.to_string());
                return;
            }
        };

        info!(
            "Subscribed: extranonce1={}, extranonce2_size={}",
            subscription.extranonce1, subscription.extranonce2_size
        );

        let early_jobs = self.state.subscribe(subscription);
        self.state.set_phase(Phase::AwaitingAuthorize);

        for params in early_jobs {
            self.issue_job(&params);
        }

        let params = json!([self.credentials.login, self.credentials.password]);
        self.request(Method::Authorize, params, Pending::Authorize);
    }

    fn on_authorize_response(&mut self, result: Option<Value>, error: Option<Value>) {
        if let Some(error) = error {
            self.close(describe_error(&error));
            return;
        }

        let result = result.unwrap_or_default();

        if let Err(err) = validate(&result, &schema::AUTHORIZE_RESPONSE) {
            self.close(err.to_string());
            return;
        }

        if !truthy(&result) {
            let reason = format!(
                "Authentication failed. May be incorrect login({}) or password({})",
                self.credentials.login, self.credentials.password
            );
            self.close(reason);
            return;
        }

        info!("Authorized as {}", self.credentials.login);

        self.state.set_phase(Phase::Ready);
    }

    fn on_notification(&mut self, notification: Notification) {
        match notification {
            Notification::SetDifficulty(params) => self.on_set_difficulty(&params),
            Notification::Notify(params) => self.on_notify(params),
            Notification::Unrecognized { method } => {
                self.close(format!("Pool sent unknown method \"{method}\""))
            }
        }
    }

    fn on_set_difficulty(&mut self, params: &Value) {
        if let Err(err) = validate(params, &schema::SET_DIFFICULTY) {
            self.close(err.to_string());
            return;
        }

        let difficulty = Difficulty::new(params[0].as_f64().unwrap_or_default());

        debug!("Difficulty set to {difficulty}");

        self.state.set_difficulty(difficulty);
    }

    fn on_notify(&mut self, params: Value) {
        if let Err(err) = validate(&params, &schema::NOTIFY) {
            self.close(err.to_string());
            return;
        }

        if self.state.subscription().is_none() {
            let clean_jobs = truthy(&params[8]);
            self.state.hold_early_job(params, clean_jobs);
            debug!(
                "Holding job until subscribed ({} held)",
                self.state.early_jobs()
            );
            return;
        }

        self.issue_job(&params);
    }

    fn issue_job(&mut self, params: &Value) {
        if self.phase() == Phase::Closed {
            return;
        }

        let Some(subscription) = self.state.subscription() else {
            return;
        };

        match Job::from_notify(params, subscription, self.state.difficulty()) {
            Ok(job) => {
                debug!(
                    "New job {} (clean_jobs={}, difficulty={})",
                    job.job_id, job.clean_jobs, job.difficulty
                );
                let job = self.state.install_job(job);
                self.emit(Event::Job(job));
            }
            Err(err) => self.close(err.to_string()),
        }
    }

    fn on_call(&mut self, id: Id, call: Call) {
        match call {
            Call::Ping => {
                if let Err(err) = self.channel.respond(id, json!("pong")) {
                    warn!("Failed to answer mining.ping: {err}");
                }
            }
            Call::Unrecognized { method } => warn!("Pool sent unknown call \"{method}\""),
        }
    }

    fn request(&mut self, method: Method, params: Value, pending: Pending) {
        if self.phase() == Phase::Closed {
            return;
        }

        match self.channel.send_method(method, params) {
            Ok(id) => {
                debug!("Sent {method} (id={id})");
                self.pending.insert(id, pending);
            }
            Err(err) => self.close(format!("Failed to send {method}: {err}")),
        }
    }

    fn abandon_pending(&mut self, reason: &str) {
        for (_, pending) in self.pending.drain() {
            if let Pending::Submit(respond_to) = pending {
                resolve(respond_to, ShareOutcome::rejected(reason));
            }
        }
    }

    fn emit(&self, event: Event) {
        if self.events.send(event).is_err() {
            debug!("Event dropped: no subscribers");
        }
    }
}

fn resolve(respond_to: oneshot::Sender<ShareOutcome>, outcome: ShareOutcome) {
    if respond_to.send(outcome).is_err() {
        debug!("Share outcome dropped: caller gave up");
    }
}

#[cfg(test)]
mod tests {
    use {super::*, pretty_assertions::assert_eq};

    const PREVHASH: &str = "4d16b6f85af6e2198f44ae2a6de67f78487ae5611b77c6c0440b921e00000000";

    #[derive(Default)]
    struct MockChannel {
        next_id: u64,
        sent: Vec<(Id, Method, Value)>,
        replies: Vec<(Id, Value)>,
        closed: Option<String>,
        close_calls: usize,
    }

    impl RpcChannel for MockChannel {
        fn send_method(&mut self, method: Method, params: Value) -> Result<Id, ChannelError> {
            if self.closed.is_some() {
                return Err(ChannelError::Closed);
            }

            let id = Id::Number(self.next_id);
            self.next_id += 1;
            self.sent.push((id.clone(), method, params));
            Ok(id)
        }

        fn respond(&mut self, id: Id, result: Value) -> Result<(), ChannelError> {
            self.replies.push((id, result));
            Ok(())
        }

        fn close(&mut self, reason: &str) {
            self.close_calls += 1;
            self.closed = Some(reason.into());
        }
    }

    type Session = ClientSession<MockChannel>;

    fn session() -> (Session, EventReceiver) {
        let (events, rx) = broadcast::channel(EVENT_CAPACITY);
        let session = ClientSession::new(
            MockChannel::default(),
            Credentials::new("slush.miner1", "hunter2"),
            events,
        );
        (session, rx)
    }

    fn last_sent(session: &Session) -> (Id, Method, Value) {
        session.channel().sent.last().cloned().unwrap()
    }

    fn closed(session: &Session) -> Option<&str> {
        session.channel().closed.as_deref()
    }

    fn reply(session: &mut Session, result: Value) {
        let (id, _, _) = last_sent(session);
        session.on_message(Message::Response {
            id,
            result: Some(result),
            error: None,
        });
    }

    fn reply_error(session: &mut Session, error: Value) {
        let (id, _, _) = last_sent(session);
        session.on_message(Message::Response {
            id,
            result: None,
            error: Some(error),
        });
    }

    fn notify(session: &mut Session, method: &str, params: Value) {
        session.on_message(Message::Notification {
            method: method.into(),
            params,
        });
    }

    fn handshake(session: &mut Session) {
        session.on_lifecycle(Lifecycle::Connect);
        reply(session, json!([true, "1234ABCD", 4]));
        reply(session, json!(true));
        assert_eq!(session.phase(), Phase::Ready);
    }

    fn job_params(job_id: &str, clean_jobs: bool) -> Value {
        json!([
            job_id,
            PREVHASH.to_uppercase(),
            "01000000010000000000000000000000000000000000000000000000000000000000000000FFFFFFFF20020862062F503253482F04B8864E5008",
            "072F736C7573682F000000000100F2052A010000001976A914D23FCDF86F7E756A64A7A9688EF9903327048ED988AC00000000",
            [PREVHASH.to_uppercase()],
            "2000000A",
            "1C2AC4AF",
            "504E86B9",
            clean_jobs
        ])
    }

    fn drain(rx: &mut EventReceiver) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn jobs(rx: &mut EventReceiver) -> Vec<Arc<Job>> {
        drain(rx)
            .into_iter()
            .filter_map(|event| match event {
                Event::Job(job) => Some(job),
                _ => None,
            })
            .collect()
    }

    fn share(job_id: &str, extranonce2: &str, nonce: u32) -> Share {
        Share {
            job_id: job_id.into(),
            extranonce2: extranonce2.parse().unwrap(),
            ntime: "504e86ed".parse().unwrap(),
            nonce: Nonce::from(nonce),
        }
    }

    #[test]
    fn connect_sends_subscribe_without_params() {
        let (mut session, mut rx) = session();

        session.on_lifecycle(Lifecycle::Open);
        session.on_lifecycle(Lifecycle::Connect);

        let (_, method, params) = last_sent(&session);
        assert_eq!(method, Method::Subscribe);
        assert_eq!(params, json!([]));
        assert_eq!(session.phase(), Phase::AwaitingSubscribe);
        assert_eq!(drain(&mut rx), vec![Event::Open, Event::Connect]);
    }

    #[test]
    fn subscribe_response_records_extranonce_and_authorizes() {
        let (mut session, _rx) = session();

        session.on_lifecycle(Lifecycle::Connect);
        reply(&mut session, json!([true, "1234ABCD", 4]));

        let subscription = session.state().subscription().unwrap();
        assert_eq!(subscription.extranonce1.to_hex(), "1234abcd");
        assert_eq!(subscription.extranonce2_size, 4);

        let (_, method, params) = last_sent(&session);
        assert_eq!(method, Method::Authorize);
        assert_eq!(params, json!(["slush.miner1", "hunter2"]));
        assert_eq!(session.phase(), Phase::AwaitingAuthorize);
    }

    #[test]
    fn invalid_subscribe_response_closes() {
        let (mut session, _rx) = session();

        session.on_lifecycle(Lifecycle::Connect);
        reply(&mut session, json!([true, "1234ABCD", 1]));

        assert_eq!(
            closed(&session),
            Some("invalid subscribe response data (invalid extranonce2 size (1 is below minimum 2))")
        );
        assert_eq!(session.phase(), Phase::Closed);
        assert_eq!(session.channel().sent.len(), 1);
        assert!(session.state().subscription().is_none());
    }

    #[test]
    fn subscribe_error_closes_with_rendered_error() {
        let (mut session, _rx) = session();

        session.on_lifecycle(Lifecycle::Connect);
        reply_error(&mut session, json!([20, "Other/Unknown", null]));

        assert_eq!(closed(&session), Some("#20 Other/Unknown"));
    }

    #[test]
    fn rejected_authorization_names_credentials() {
        let (mut session, _rx) = session();

        session.on_lifecycle(Lifecycle::Connect);
        reply(&mut session, json!([true, "1234ABCD", 4]));
        reply(&mut session, json!(false));

        let reason = closed(&session).unwrap();
        assert!(reason.contains("slush.miner1"), "{reason}");
        assert!(reason.contains("hunter2"), "{reason}");
        assert_eq!(session.phase(), Phase::Closed);
    }

    #[test]
    fn authorization_error_closes() {
        let (mut session, _rx) = session();

        session.on_lifecycle(Lifecycle::Connect);
        reply(&mut session, json!([true, "1234ABCD", 4]));
        reply_error(&mut session, json!([24, "Unauthorized worker", null]));

        assert_eq!(closed(&session), Some("#24 Unauthorized worker"));
    }

    #[test]
    fn accepted_authorization_is_ready() {
        let (mut session, _rx) = session();
        handshake(&mut session);
        assert_eq!(closed(&session), None);
    }

    #[test]
    fn zero_difficulty_is_accepted() {
        let (mut session, _rx) = session();
        handshake(&mut session);

        notify(&mut session, "mining.set_difficulty", json!([0]));

        assert_eq!(closed(&session), None);
        assert_eq!(session.state().difficulty().as_f64(), 0.0);
    }

    #[test]
    fn negative_difficulty_closes() {
        let (mut session, _rx) = session();
        handshake(&mut session);

        notify(&mut session, "mining.set_difficulty", json!([-2]));

        assert_eq!(
            closed(&session),
            Some("invalid set_difficulty data (invalid difficulty (-2 is below minimum 0))")
        );
        assert_eq!(session.state().difficulty(), Difficulty::default());
    }

    #[test]
    fn notify_emits_lower_cased_job() {
        let (mut session, mut rx) = session();
        handshake(&mut session);
        drain(&mut rx);

        notify(&mut session, "mining.notify", job_params("bf", false));

        let jobs = jobs(&mut rx);
        assert_eq!(jobs.len(), 1);

        let job = &jobs[0];
        assert_eq!(job.prevhash, PREVHASH);
        assert_eq!(job.merkle_branch, vec![PREVHASH.to_string()]);
        assert_eq!(job.version, "2000000a");
        assert_eq!(job.nbits, "1c2ac4af");
        assert_eq!(job.ntime, "504e86b9");
        assert!(job.coinb1.chars().all(|c| !c.is_ascii_uppercase()));
        assert!(job.coinb2.chars().all(|c| !c.is_ascii_uppercase()));
        assert_eq!(job.extranonce1.to_hex(), "1234abcd");
        assert_eq!(job.extranonce2_size, 4);
        assert_eq!(session.state().current_job(), Some(job));
    }

    #[test]
    fn short_merkle_node_closes_without_job() {
        let (mut session, mut rx) = session();
        handshake(&mut session);
        drain(&mut rx);

        let mut params = job_params("bf", false);
        params[4] = json!([&PREVHASH[..31]]);

        notify(&mut session, "mining.notify", params);

        assert!(closed(&session).unwrap().contains("invalid merkle node"));
        assert!(session.state().current_job().is_none());
        assert!(jobs(&mut rx).is_empty());
    }

    #[test]
    fn clean_job_supersedes_previous() {
        let (mut session, mut rx) = session();
        handshake(&mut session);
        drain(&mut rx);

        notify(&mut session, "mining.notify", job_params("1", false));
        notify(&mut session, "mining.notify", job_params("2", true));

        let jobs = jobs(&mut rx);
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].job_id, "1");
        assert!(!jobs[0].clean_jobs);

        let current = session.state().current_job().unwrap();
        assert_eq!(current.job_id, "2");
        assert!(current.clean_jobs);
        assert_eq!(current, &jobs[1]);
    }

    #[test]
    fn job_difficulty_is_a_snapshot() {
        let (mut session, mut rx) = session();
        handshake(&mut session);
        drain(&mut rx);

        notify(&mut session, "mining.notify", job_params("1", false));
        notify(&mut session, "mining.set_difficulty", json!([8]));
        notify(&mut session, "mining.notify", job_params("2", false));

        let jobs = jobs(&mut rx);
        assert_eq!(jobs[0].difficulty, Difficulty::new(1.0));
        assert_eq!(jobs[1].difficulty, Difficulty::new(8.0));
    }

    #[test]
    fn unknown_notification_closes() {
        let (mut session, _rx) = session();
        handshake(&mut session);

        notify(&mut session, "mining.set_extranonce", json!(["abcd", 4]));

        assert_eq!(
            closed(&session),
            Some("Pool sent unknown method \"mining.set_extranonce\"")
        );
    }

    #[test]
    fn ping_is_answered_and_unknown_calls_are_not() {
        let (mut session, _rx) = session();
        handshake(&mut session);

        session.on_message(Message::Request {
            id: Id::Number(77),
            method: "mining.ping".into(),
            params: json!([]),
        });

        session.on_message(Message::Request {
            id: Id::Number(78),
            method: "client.get_version".into(),
            params: json!([]),
        });

        assert_eq!(
            session.channel().replies,
            vec![(Id::Number(77), json!("pong"))]
        );
        assert_eq!(closed(&session), None);
    }

    #[test]
    fn submit_sends_positional_params() {
        let (mut session, _rx) = session();
        handshake(&mut session);

        let mut outcome = session.submit_share(&share("bf", "0000002a", 0xb2957c02));

        let (_, method, params) = last_sent(&session);
        assert_eq!(method, Method::Submit);
        assert_eq!(
            params,
            json!(["slush.miner1", "bf", "0000002a", "504e86ed", "b2957c02"])
        );

        reply(&mut session, json!(true));

        assert_eq!(outcome.try_recv().unwrap(), ShareOutcome::Accepted);
    }

    #[test]
    fn submit_error_is_rendered() {
        let (mut session, _rx) = session();
        handshake(&mut session);

        let mut outcome = session.submit_share(&share("bf", "0000002a", 1));
        reply_error(&mut session, json!([21, "Job not found", null]));

        assert_eq!(
            outcome.try_recv().unwrap(),
            ShareOutcome::rejected("#21 Job not found")
        );
        assert_eq!(session.phase(), Phase::Ready);
    }

    #[test]
    fn falsy_submit_result_is_unknown_error() {
        let (mut session, _rx) = session();
        handshake(&mut session);

        let mut outcome = session.submit_share(&share("bf", "0000002a", 1));
        reply(&mut session, json!(false));

        assert_eq!(
            outcome.try_recv().unwrap(),
            ShareOutcome::rejected("Unknown error")
        );
    }

    #[test]
    fn concurrent_submissions_are_independent() {
        let (mut session, mut rx) = session();
        handshake(&mut session);
        notify(&mut session, "mining.notify", job_params("1", false));
        notify(&mut session, "mining.notify", job_params("2", false));
        drain(&mut rx);

        let mut first = session.submit_share(&share("1", "00000001", 1));
        let (first_id, _, first_params) = last_sent(&session);

        let mut second = session.submit_share(&share("2", "00000002", 2));
        let (second_id, _, second_params) = last_sent(&session);

        assert_eq!(
            first_params,
            json!(["slush.miner1", "1", "00000001", "504e86ed", "00000001"])
        );
        assert_eq!(
            second_params,
            json!(["slush.miner1", "2", "00000002", "504e86ed", "00000002"])
        );

        session.on_message(Message::Response {
            id: second_id,
            result: None,
            error: Some(json!([23, "Low difficulty share", null])),
        });
        session.on_message(Message::Response {
            id: first_id,
            result: Some(json!(true)),
            error: None,
        });

        assert_eq!(first.try_recv().unwrap(), ShareOutcome::Accepted);
        assert_eq!(
            second.try_recv().unwrap(),
            ShareOutcome::rejected("#23 Low difficulty share")
        );

        assert_eq!(session.phase(), Phase::Ready);
        assert_eq!(session.state().difficulty(), Difficulty::default());
        assert_eq!(
            session.state().subscription().unwrap().extranonce1.to_hex(),
            "1234abcd"
        );
        assert_eq!(session.state().current_job().unwrap().job_id, "2");
    }

    #[test]
    fn wrong_extranonce2_width_is_rejected_locally() {
        let (mut session, _rx) = session();
        handshake(&mut session);
        let sent = session.channel().sent.len();

        let mut outcome = session.submit_share(&share("bf", "000001", 1));

        assert_eq!(
            outcome.try_recv().unwrap(),
            ShareOutcome::rejected("extranonce2 is 3 bytes, expected 4")
        );
        assert_eq!(session.channel().sent.len(), sent);
    }

    #[test]
    fn close_is_delegated_once_and_terminal() {
        let (mut session, mut rx) = session();
        handshake(&mut session);

        let mut outstanding = session.submit_share(&share("bf", "0000002a", 1));

        session.close("operator shutdown");
        session.close("again");

        assert_eq!(session.channel().close_calls, 1);
        assert_eq!(closed(&session), Some("operator shutdown"));
        assert_eq!(
            outstanding.try_recv().unwrap(),
            ShareOutcome::rejected("operator shutdown")
        );

        session.on_message(Message::Request {
            id: Id::Number(5),
            method: "mining.ping".into(),
            params: json!([]),
        });
        assert!(session.channel().replies.is_empty());

        let mut late = session.submit_share(&share("bf", "0000002a", 2));
        assert_eq!(
            late.try_recv().unwrap(),
            ShareOutcome::rejected("session closed")
        );

        session.on_lifecycle(Lifecycle::Close {
            reason: "operator shutdown".into(),
        });

        assert_eq!(
            drain(&mut rx).last(),
            Some(&Event::Close {
                reason: "operator shutdown".into()
            })
        );
    }

    #[test]
    fn early_jobs_are_replayed_after_subscribe() {
        let (mut session, mut rx) = session();

        session.on_lifecycle(Lifecycle::Connect);
        notify(&mut session, "mining.notify", job_params("early", true));
        notify(&mut session, "mining.set_difficulty", json!([4]));

        assert!(jobs(&mut rx).is_empty());
        assert_eq!(closed(&session), None);

        reply(&mut session, json!([true, "1234ABCD", 4]));

        let jobs = jobs(&mut rx);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].job_id, "early");
        assert_eq!(jobs[0].extranonce1.to_hex(), "1234abcd");
        assert_eq!(jobs[0].difficulty, Difficulty::new(4.0));

        let (_, method, _) = last_sent(&session);
        assert_eq!(method, Method::Authorize);
    }

    #[test]
    fn invalid_early_job_still_closes() {
        let (mut session, _rx) = session();

        session.on_lifecycle(Lifecycle::Connect);
        notify(&mut session, "mining.notify", json!(["early"]));

        assert_eq!(session.phase(), Phase::Closed);
    }

    #[test]
    fn jobs_between_subscribe_and_authorize_are_emitted() {
        let (mut session, mut rx) = session();

        session.on_lifecycle(Lifecycle::Connect);
        reply(&mut session, json!([true, "1234ABCD", 4]));
        notify(&mut session, "mining.notify", job_params("1", true));

        assert_eq!(session.phase(), Phase::AwaitingAuthorize);
        assert_eq!(jobs(&mut rx).len(), 1);
    }

    #[test]
    fn disconnect_rejects_outstanding_and_reconnect_resubscribes() {
        let (mut session, mut rx) = session();
        handshake(&mut session);
        notify(&mut session, "mining.notify", job_params("1", true));

        let mut outstanding = session.submit_share(&share("1", "0000002a", 1));

        session.on_lifecycle(Lifecycle::Disconnect);

        assert_eq!(
            outstanding.try_recv().unwrap(),
            ShareOutcome::rejected("disconnected")
        );
        assert_eq!(session.phase(), Phase::Connecting);
        assert!(session.state().subscription().is_none());
        assert!(session.state().current_job().is_none());

        session.on_lifecycle(Lifecycle::Connect);

        let (_, method, _) = last_sent(&session);
        assert_eq!(method, Method::Subscribe);
        assert_eq!(session.phase(), Phase::AwaitingSubscribe);

        let events = drain(&mut rx);
        assert!(events.contains(&Event::Disconnect));
        assert_eq!(events.last(), Some(&Event::Connect));
    }

    #[test]
    fn unmatched_response_is_ignored() {
        let (mut session, _rx) = session();
        handshake(&mut session);

        session.on_message(Message::Response {
            id: Id::Number(999),
            result: Some(json!(true)),
            error: None,
        });

        assert_eq!(session.phase(), Phase::Ready);
    }
}
