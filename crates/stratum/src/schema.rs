//! Positional field descriptors for every inbound Stratum message.
//!
//! Stratum payloads are JSON arrays whose meaning depends on position, so each
//! schema is a [`Field`] tree mirroring that layout. Validation is
//! all-or-nothing: the first violated constraint is reported with the full
//! field path, e.g. `invalid job data (invalid prevhash (length 31 bytes not in 32))`.

use super::*;

/// Largest coinbase half accepted in `mining.notify`, in bytes.
pub const MAX_COINBASE_PART: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Length {
    pub min: usize,
    pub max: usize,
}

impl Length {
    pub const UNBOUNDED: Self = Self::range(0, usize::MAX);

    pub const fn exact(n: usize) -> Self {
        Self { min: n, max: n }
    }

    pub const fn range(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub fn contains(self, n: usize) -> bool {
        (self.min..=self.max).contains(&n)
    }
}

impl Display for Length {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{}..={}", self.min, self.max)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kind {
    Any,
    /// Length counted in characters.
    String(Length),
    /// Case-insensitive hex, length counted in decoded bytes.
    Hex(Length),
    /// Inclusive bounds.
    Number { min: Option<f64>, max: Option<f64> },
    /// Every element matches the same field.
    Array(&'static Field),
    /// One field per position.
    Tuple(&'static [Field]),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub kind: Kind,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ValidationError {
    #[snafu(display("invalid {name} ({source})"))]
    Field {
        name: &'static str,
        source: Box<ValidationError>,
    },
    #[snafu(display("element {index}: {source}"))]
    Element {
        index: usize,
        source: Box<ValidationError>,
    },
    #[snafu(display("expected {expected}, got {actual}"))]
    Type {
        expected: &'static str,
        actual: &'static str,
    },
    #[snafu(display("length {len} {unit} not in {expected}"))]
    Size {
        len: usize,
        expected: Length,
        unit: &'static str,
    },
    #[snafu(display("invalid hex character {character:?}"))]
    HexCharacter { character: char },
    #[snafu(display("length {len} hex digits is odd"))]
    OddLength { len: usize },
    #[snafu(display("{value} is below minimum {min}"))]
    BelowMinimum { value: f64, min: f64 },
    #[snafu(display("{value} is above maximum {max}"))]
    AboveMaximum { value: f64, max: f64 },
    #[snafu(display("expected at least {expected} elements, got {len}"))]
    Arity { len: usize, expected: usize },
}

impl Field {
    pub const fn any(name: &'static str) -> Self {
        Self {
            name,
            kind: Kind::Any,
        }
    }

    pub const fn string(name: &'static str, length: Length) -> Self {
        Self {
            name,
            kind: Kind::String(length),
        }
    }

    pub const fn hex(name: &'static str, length: Length) -> Self {
        Self {
            name,
            kind: Kind::Hex(length),
        }
    }

    pub const fn number(name: &'static str, min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            name,
            kind: Kind::Number { min, max },
        }
    }

    pub const fn array(name: &'static str, item: &'static Field) -> Self {
        Self {
            name,
            kind: Kind::Array(item),
        }
    }

    pub const fn tuple(name: &'static str, items: &'static [Field]) -> Self {
        Self {
            name,
            kind: Kind::Tuple(items),
        }
    }

    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        self.check(value).map_err(|source| ValidationError::Field {
            name: self.name,
            source: Box::new(source),
        })
    }

    fn check(&self, value: &Value) -> Result<(), ValidationError> {
        match self.kind {
            Kind::Any => Ok(()),
            Kind::String(length) => {
                let len = expect_str(value, "string")?.chars().count();

                if !length.contains(len) {
                    return Err(ValidationError::Size {
                        len,
                        expected: length,
                        unit: "characters",
                    });
                }

                Ok(())
            }
            Kind::Hex(length) => {
                let s = expect_str(value, "hex string")?;

                if let Some(character) = s.chars().find(|c| !c.is_ascii_hexdigit()) {
                    return Err(ValidationError::HexCharacter { character });
                }

                if s.len() % 2 != 0 {
                    return Err(ValidationError::OddLength { len: s.len() });
                }

                let len = s.len() / 2;

                if !length.contains(len) {
                    return Err(ValidationError::Size {
                        len,
                        expected: length,
                        unit: "bytes",
                    });
                }

                Ok(())
            }
            Kind::Number { min, max } => {
                let n = value.as_f64().ok_or(ValidationError::Type {
                    expected: "number",
                    actual: type_name(value),
                })?;

                if let Some(min) = min
                    && n < min
                {
                    return Err(ValidationError::BelowMinimum { value: n, min });
                }

                if let Some(max) = max
                    && n > max
                {
                    return Err(ValidationError::AboveMaximum { value: n, max });
                }

                Ok(())
            }
            Kind::Array(item) => {
                let elements = expect_array(value)?;

                for (index, element) in elements.iter().enumerate() {
                    item.validate(element)
                        .map_err(|source| ValidationError::Element {
                            index,
                            source: Box::new(source),
                        })?;
                }

                Ok(())
            }
            Kind::Tuple(fields) => {
                let elements = expect_array(value)?;

                // Trailing `any` positions may be left off by the sender.
                let required = fields
                    .iter()
                    .rposition(|field| field.kind != Kind::Any)
                    .map_or(0, |i| i + 1);

                if elements.len() < required {
                    return Err(ValidationError::Arity {
                        len: elements.len(),
                        expected: required,
                    });
                }

                let null = Value::Null;

                for (field, element) in fields
                    .iter()
                    .zip(elements.iter().chain(std::iter::repeat(&null)))
                {
                    field.validate(element)?;
                }

                Ok(())
            }
        }
    }
}

/// Checks `value` against `schema`, reporting the first violation.
pub fn validate(value: &Value, schema: &Field) -> Result<(), ValidationError> {
    schema.validate(value)
}

fn expect_str<'a>(value: &'a Value, expected: &'static str) -> Result<&'a str, ValidationError> {
    value.as_str().ok_or(ValidationError::Type {
        expected,
        actual: type_name(value),
    })
}

fn expect_array(value: &Value) -> Result<&Vec<Value>, ValidationError> {
    value.as_array().ok_or(ValidationError::Type {
        expected: "array",
        actual: type_name(value),
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

static SUBSCRIBE_RESPONSE_FIELDS: [Field; 3] = [
    Field::any("subscriptions"),
    Field::hex("extranonce1", Length::range(1, 16)),
    Field::number("extranonce2 size", Some(2.0), Some(32.0)),
];

/// Result of `mining.subscribe`: `[subscriptions, extranonce1, extranonce2_size]`.
pub static SUBSCRIBE_RESPONSE: Field =
    Field::tuple("subscribe response data", &SUBSCRIBE_RESPONSE_FIELDS);

/// Result of `mining.authorize`, interpreted by truthiness.
pub static AUTHORIZE_RESPONSE: Field = Field::any("authorize response data");

static SET_DIFFICULTY_FIELDS: [Field; 1] = [Field::number("difficulty", Some(0.0), None)];

/// Params of `mining.set_difficulty`: `[difficulty]`.
pub static SET_DIFFICULTY: Field = Field::tuple("set_difficulty data", &SET_DIFFICULTY_FIELDS);

static MERKLE_NODE: Field = Field::hex("merkle node", Length::exact(32));

static NOTIFY_FIELDS: [Field; 9] = [
    Field::string("job_id", Length::range(1, 64)),
    Field::hex("prevhash", Length::exact(32)),
    Field::hex("coinb1", Length::range(1, MAX_COINBASE_PART)),
    Field::hex("coinb2", Length::range(1, MAX_COINBASE_PART)),
    Field::array("merkle branch", &MERKLE_NODE),
    Field::hex("version", Length::exact(4)),
    Field::hex("nbits", Length::exact(4)),
    Field::hex("ntime", Length::exact(4)),
    Field::any("clean_jobs"),
];

/// Params of `mining.notify`.
pub static NOTIFY: Field = Field::tuple("job data", &NOTIFY_FIELDS);

static RPC_ERROR_FIELDS: [Field; 3] = [
    Field::number("error code", None, None),
    Field::string("error text", Length::UNBOUNDED),
    Field::any("error data"),
];

/// Error member of a response: `[code, message, data]`.
pub static RPC_ERROR: Field = Field::tuple("result error data", &RPC_ERROR_FIELDS);
