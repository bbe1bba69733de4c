use super::*;

/// The `[code, message, data]` triple a pool puts in a response's error member.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        validate(value, &schema::RPC_ERROR)?;

        let null = Value::Null;
        let field = |i: usize| value.get(i).unwrap_or(&null);

        Ok(Self {
            code: field(0).as_f64().map_or(0, |code| code as i64),
            message: field(1).as_str().unwrap_or_default().to_owned(),
            data: Some(field(2).clone()).filter(|data| !data.is_null()),
        })
    }
}

impl Display for RpcError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.code, self.message)
    }
}

impl Serialize for RpcError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (&self.code, &self.message, &self.data).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RpcError {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(de::Error::custom)
    }
}

/// Renders a response error for humans: `#<code> <message>` when the triple is
/// well formed, otherwise the validation failure describing why it is not.
pub fn describe_error(error: &Value) -> String {
    match RpcError::from_value(error) {
        Ok(error) => error.to_string(),
        Err(err) => err.to_string(),
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ChannelError {
    #[snafu(display("Channel closed"))]
    Closed,

    #[snafu(display("Serialization error: {source}"))]
    Serialization { source: serde_json::Error },
}
