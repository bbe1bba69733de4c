use super::*;

/// One unit of work from `mining.notify`, frozen together with the difficulty
/// and extranonce assignment in effect when it arrived. Hex fields are lower
/// case. Later session changes never reach an existing job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pub job_id: String,
    pub prevhash: String,
    pub coinb1: String,
    pub coinb2: String,
    pub merkle_branch: Vec<String>,
    pub version: String,
    pub nbits: String,
    pub ntime: String,
    pub clean_jobs: bool,
    pub difficulty: Difficulty,
    pub extranonce1: Extranonce,
    pub extranonce2_size: usize,
}

impl Job {
    pub fn from_notify(
        params: &Value,
        subscription: &Subscription,
        difficulty: Difficulty,
    ) -> Result<Self, ValidationError> {
        validate(params, &schema::NOTIFY)?;

        let hex = |i: usize| params[i].as_str().unwrap_or_default().to_ascii_lowercase();

        let merkle_branch = params[4]
            .as_array()
            .map(|branch| {
                branch
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_ascii_lowercase)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            job_id: params[0].as_str().unwrap_or_default().to_owned(),
            prevhash: hex(1),
            coinb1: hex(2),
            coinb2: hex(3),
            merkle_branch,
            version: hex(5),
            nbits: hex(6),
            ntime: hex(7),
            clean_jobs: truthy(&params[8]),
            difficulty,
            extranonce1: subscription.extranonce1.clone(),
            extranonce2_size: subscription.extranonce2_size,
        })
    }

    /// Coinbase transaction hex for a given extranonce2.
    pub fn coinbase(&self, extranonce2: &Extranonce) -> String {
        format!(
            "{}{}{}{}",
            self.coinb1, self.extranonce1, extranonce2, self.coinb2
        )
    }

    pub fn share(&self, extranonce2: Extranonce, ntime: Ntime, nonce: Nonce) -> Share {
        Share {
            job_id: self.job_id.clone(),
            extranonce2,
            ntime,
            nonce,
        }
    }
}
