use {
    derive_more::Display,
    rand::RngCore,
    serde::{
        Deserialize, Serialize, Serializer,
        de::{self, Deserializer},
        ser::SerializeSeq,
    },
    serde_json::{Value, json},
    serde_with::{DeserializeFromStr, SerializeDisplay},
    snafu::Snafu,
    std::{
        collections::{HashMap, VecDeque},
        fmt::{self, Display, Formatter},
        str::FromStr,
        sync::Arc,
    },
    tokio::sync::{broadcast, oneshot},
    tracing::{debug, info, warn},
};

pub use {
    difficulty::Difficulty,
    error::{ChannelError, RpcError, describe_error},
    event::{Event, EventReceiver},
    extranonce::Extranonce,
    job::Job,
    message::{Id, Message},
    method::{Call, Method, Notification},
    nonce::Nonce,
    ntime::Ntime,
    schema::{Field, Kind, Length, ValidationError, validate},
    session::{ClientSession, Lifecycle, RpcChannel},
    share::{Share, ShareOutcome},
    state::{Credentials, Phase, SessionState, Subscription},
};

#[cfg(feature = "client")]
pub use client::{Client, ClientConfig, ClientError};

/// Upper bound on one newline-delimited frame. A `mining.notify` may carry two
/// coinbase halves of up to 1 MiB each, hex-encoded.
#[cfg(feature = "client")]
pub const MAX_MESSAGE_SIZE: usize = 8 * 1024 * 1024;

/// Capacity of the broadcast channel carrying session events.
pub const EVENT_CAPACITY: usize = 64;

/// Most `mining.notify` messages held back while waiting for a subscription.
pub const EARLY_JOB_LIMIT: usize = 8;

mod difficulty;
mod error;
mod event;
mod extranonce;
mod job;
mod message;
mod method;
mod nonce;
mod ntime;
pub mod schema;
mod session;
mod share;
mod state;

#[cfg(feature = "client")]
mod client;

/// JSON truthiness as pools use it for boolean-ish results.
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
