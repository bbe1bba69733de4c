use super::*;

/// A candidate solution for one job, submitted once with `mining.submit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Share {
    pub job_id: String,
    pub extranonce2: Extranonce,
    pub ntime: Ntime,
    pub nonce: Nonce,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareOutcome {
    Accepted,
    Rejected { reason: String },
}

impl ShareOutcome {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Reads a `mining.submit` response.
    pub fn from_response(result: Option<&Value>, error: Option<&Value>) -> Self {
        if let Some(error) = error {
            return Self::rejected(describe_error(error));
        }

        match result {
            Some(result) if truthy(result) => Self::Accepted,
            _ => Self::rejected("Unknown error"),
        }
    }
}

impl Display for ShareOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted => write!(f, "accepted"),
            Self::Rejected { reason } => write!(f, "rejected: {reason}"),
        }
    }
}

/// `mining.submit` params: `[login, job_id, extranonce2, ntime, nonce]`.
pub(crate) struct Submit<'a> {
    pub(crate) login: &'a str,
    pub(crate) share: &'a Share,
}

impl Serialize for Submit<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(5))?;
        seq.serialize_element(self.login)?;
        seq.serialize_element(&self.share.job_id)?;
        seq.serialize_element(&self.share.extranonce2)?;
        seq.serialize_element(&self.share.ntime)?;
        seq.serialize_element(&self.share.nonce)?;
        seq.end()
    }
}
