use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Method {
    #[display("mining.subscribe")]
    Subscribe,
    #[display("mining.authorize")]
    Authorize,
    #[display("mining.submit")]
    Submit,
    #[display("mining.set_difficulty")]
    SetDifficulty,
    #[display("mining.notify")]
    Notify,
    #[display("mining.ping")]
    Ping,
}

impl Method {
    const ALL: [Method; 6] = [
        Method::Subscribe,
        Method::Authorize,
        Method::Submit,
        Method::SetDifficulty,
        Method::Notify,
        Method::Ping,
    ];
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.to_string() == s)
            .ok_or_else(|| s.to_owned())
    }
}

/// Server-to-client notification, keyed by method.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    SetDifficulty(Value),
    Notify(Value),
    Unrecognized { method: String },
}

impl Notification {
    pub fn parse(method: &str, params: Value) -> Self {
        match method.parse() {
            Ok(Method::SetDifficulty) => Self::SetDifficulty(params),
            Ok(Method::Notify) => Self::Notify(params),
            _ => Self::Unrecognized {
                method: method.to_owned(),
            },
        }
    }
}

/// Server-to-client call expecting a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Ping,
    Unrecognized { method: String },
}

impl Call {
    pub fn parse(method: &str) -> Self {
        match method.parse() {
            Ok(Method::Ping) => Self::Ping,
            _ => Self::Unrecognized {
                method: method.to_owned(),
            },
        }
    }
}
