use super::*;

/// Login and password sent with `mining.authorize`. Kept in clear text; the
/// authentication failure message names both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl Credentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum Phase {
    #[default]
    Connecting,
    AwaitingSubscribe,
    AwaitingAuthorize,
    Ready,
    Closed,
}

/// Extranonce assignment from an accepted `mining.subscribe` response. Exists
/// only once the pool has answered, so anything holding one has a complete
/// extranonce context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subscription {
    pub extranonce1: Extranonce,
    pub extranonce2_size: usize,
}

impl Subscription {
    pub fn from_response(result: &Value) -> Result<Self, ValidationError> {
        validate(result, &schema::SUBSCRIBE_RESPONSE)?;

        let extranonce1 = hex::decode(result[1].as_str().unwrap_or_default()).unwrap_or_default();

        let extranonce2_size = result[2].as_f64().map_or(0, |size| size.trunc() as usize);

        Ok(Self {
            extranonce1: Extranonce::from(extranonce1),
            extranonce2_size,
        })
    }
}

/// Everything the session has learned from the pool on the current connection.
#[derive(Debug, Default)]
pub struct SessionState {
    phase: Phase,
    difficulty: Difficulty,
    subscription: Option<Subscription>,
    current_job: Option<Arc<Job>>,
    early_jobs: VecDeque<Value>,
}

impl SessionState {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn subscription(&self) -> Option<&Subscription> {
        self.subscription.as_ref()
    }

    pub fn current_job(&self) -> Option<&Arc<Job>> {
        self.current_job.as_ref()
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            debug!("Session phase {} -> {}", self.phase, phase);
            self.phase = phase;
        }
    }

    pub(crate) fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.difficulty = difficulty;
    }

    /// Records the extranonce assignment and hands back any jobs that arrived
    /// before it, oldest first.
    pub(crate) fn subscribe(&mut self, subscription: Subscription) -> VecDeque<Value> {
        self.subscription = Some(subscription);
        std::mem::take(&mut self.early_jobs)
    }

    /// Holds `mining.notify` params that arrived before the subscription.
    pub(crate) fn hold_early_job(&mut self, params: Value, clean_jobs: bool) {
        if clean_jobs {
            self.early_jobs.clear();
        }

        if self.early_jobs.len() == EARLY_JOB_LIMIT {
            self.early_jobs.pop_front();
            debug!("Dropped oldest job held for subscription");
        }

        self.early_jobs.push_back(params);
    }

    pub(crate) fn early_jobs(&self) -> usize {
        self.early_jobs.len()
    }

    pub(crate) fn install_job(&mut self, job: Job) -> Arc<Job> {
        let job = Arc::new(job);
        self.current_job = Some(job.clone());
        job
    }

    /// Forgets everything tied to the previous connection. Difficulty is kept
    /// until the pool sends a new one.
    pub(crate) fn reset_connection(&mut self) {
        self.subscription = None;
        self.current_job = None;
        self.early_jobs.clear();
    }
}
