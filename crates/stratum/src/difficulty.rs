use super::*;

/// Share difficulty assigned by `mining.set_difficulty`. Zero is legal and
/// means any nonce meets the share target.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Difficulty(f64);

impl Difficulty {
    pub const fn new(difficulty: f64) -> Self {
        Self(difficulty)
    }

    pub fn as_f64(self) -> f64 {
        self.0
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self(1.0)
    }
}

impl From<f64> for Difficulty {
    fn from(difficulty: f64) -> Self {
        Self(difficulty)
    }
}

impl From<Difficulty> for f64 {
    fn from(difficulty: Difficulty) -> f64 {
        difficulty.0
    }
}

impl Display for Difficulty {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
