use super::*;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Clone)]
#[serde(untagged)]
pub enum Id {
    Null,
    Number(u64),
    String(String),
}

/// One JSON-RPC frame. The error member is kept raw so the session can run it
/// through the error schema itself and report malformed errors verbatim.
#[derive(Debug, Serialize, PartialEq, Clone)]
#[serde(untagged)]
pub enum Message {
    Request {
        id: Id,
        method: String,
        params: Value,
    },
    Response {
        id: Id,
        result: Option<Value>,
        error: Option<Value>,
    },
    Notification {
        method: String,
        params: Value,
    },
}

/// Pools send notifications with `"id": null`, which JSON-RPC would read as a
/// request. Anything carrying a method and a null or missing id is treated as a
/// notification; a method with a real id is an inbound call.
impl<'de> Deserialize<'de> for Message {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;

        let has_method = value.get("method").is_some();

        let is_notification =
            has_method && (value.get("id").is_none() || value.get("id") == Some(&Value::Null));

        let is_request = has_method && value.get("id").is_some();

        let is_response = value.get("result").is_some() || value.get("error").is_some();

        if is_response {
            #[derive(Deserialize)]
            struct Resp {
                id: Id,
                result: Option<Value>,
                error: Option<Value>,
            }

            let r: Resp = serde_json::from_value(value).map_err(de::Error::custom)?;

            Ok(Message::Response {
                id: r.id,
                result: r.result.filter(|result| !result.is_null()),
                error: r.error.filter(|error| !error.is_null()),
            })
        } else if is_notification {
            let method = value
                .get("method")
                .and_then(Value::as_str)
                .ok_or_else(|| de::Error::missing_field("method"))?
                .to_string();

            let params = value.get("params").cloned().unwrap_or(json!([]));

            Ok(Message::Notification { method, params })
        } else if is_request {
            #[derive(Deserialize)]
            struct Req {
                id: Id,
                method: String,
                #[serde(default)]
                params: Value,
            }

            let r: Req = serde_json::from_value(value).map_err(de::Error::custom)?;

            Ok(Message::Request {
                id: r.id,
                method: r.method,
                params: r.params,
            })
        } else {
            Err(de::Error::custom("unknown message format"))
        }
    }
}
