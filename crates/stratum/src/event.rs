use super::*;

/// What a session reports to its observers. Connection signals pass straight
/// through from the channel; `Job` fires once per accepted `mining.notify`.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Open,
    Connect,
    Disconnect,
    Close { reason: String },
    Job(Arc<Job>),
}

pub type EventReceiver = broadcast::Receiver<Event>;
