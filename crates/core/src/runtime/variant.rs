use std::collections::BTreeMap;
use std::fmt;

/// An opaque tagged payload value.
///
/// User node bodies are duck-typed and dynamically shaped (spec §9 "Dynamic
/// typing & duck typing"); the runtime itself never inspects a `Variant`'s
/// content except to decide whether it is the EOS sentinel, which is a
/// distinct [`Frame`](super::port::Frame) variant rather than a `Variant` at
/// all. This is a deliberately small sum of interchange kinds, trimmed from
/// the teacher's `Variant` (which also carries `Regexp`/`Date`/JS-interop
/// members needed for Node-RED's JSONata and `vm`-eval surfaces — out of
/// scope here, see spec §1 and §9).
#[non_exhaustive]
#[derive(Default, Clone, Debug, PartialEq)]
pub enum Variant {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<Variant>),
    Object(BTreeMap<String, Variant>),
}

impl Variant {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Variant::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Variant::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Variant::Integer(i) => Some(*i as f64),
            Variant::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Variant>> {
        match self {
            Variant::Object(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Variant]> {
        match self {
            Variant::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Truthiness used by the `Conditional` builtin macro's `Truthy` kind.
    pub fn is_truthy(&self) -> bool {
        match self {
            Variant::Null => false,
            Variant::Bool(b) => *b,
            Variant::Integer(i) => *i != 0,
            Variant::Float(f) => *f != 0.0,
            Variant::String(s) => !s.is_empty(),
            Variant::Bytes(b) => !b.is_empty(),
            Variant::Array(a) => !a.is_empty(),
            Variant::Object(m) => !m.is_empty(),
        }
    }

    /// Index by mapping key or array position, used by the `GetAttribute`
    /// builtin macro (spec §6).
    pub fn get_attribute(&self, key: &Variant) -> Variant {
        match (self, key) {
            (Variant::Object(m), Variant::String(k)) => m.get(k).cloned().unwrap_or(Variant::Null),
            (Variant::Array(a), Variant::Integer(i)) => {
                if *i >= 0 { a.get(*i as usize).cloned().unwrap_or(Variant::Null) } else { Variant::Null }
            }
            _ => Variant::Null,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Null => write!(f, "null"),
            Variant::Bool(b) => write!(f, "{}", b),
            Variant::Integer(i) => write!(f, "{}", i),
            Variant::Float(x) => write!(f, "{}", x),
            Variant::String(s) => write!(f, "{}", s),
            Variant::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Variant::Array(_) => write!(f, "<array>"),
            Variant::Object(_) => write!(f, "<object>"),
        }
    }
}

impl From<serde_json::Value> for Variant {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Variant::Null,
            serde_json::Value::Bool(b) => Variant::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Variant::Integer(i)
                } else {
                    Variant::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Variant::String(s),
            serde_json::Value::Array(a) => Variant::Array(a.into_iter().map(Variant::from).collect()),
            serde_json::Value::Object(o) => {
                Variant::Object(o.into_iter().map(|(k, v)| (k, Variant::from(v))).collect())
            }
        }
    }
}

impl From<Variant> for serde_json::Value {
    fn from(v: Variant) -> Self {
        match v {
            Variant::Null => serde_json::Value::Null,
            Variant::Bool(b) => serde_json::Value::Bool(b),
            Variant::Integer(i) => serde_json::Value::Number(i.into()),
            Variant::Float(f) => {
                serde_json::Number::from_f64(f).map(serde_json::Value::Number).unwrap_or(serde_json::Value::Null)
            }
            Variant::String(s) => serde_json::Value::String(s),
            Variant::Bytes(b) => serde_json::Value::Array(
                b.into_iter().map(|byte| serde_json::Value::Number(byte.into())).collect(),
            ),
            Variant::Array(a) => serde_json::Value::Array(a.into_iter().map(serde_json::Value::from).collect()),
            Variant::Object(o) => {
                serde_json::Value::Object(o.into_iter().map(|(k, v)| (k, serde_json::Value::from(v))).collect())
            }
        }
    }
}

/// Decodes the `{type, value}` typed-value schema used by builtin macro
/// `macroData` (spec §6).
pub fn typed_value_from_json(type_name: &str, value: &serde_json::Value) -> crate::Result<Variant> {
    let v = match type_name {
        "null" => Variant::Null,
        "bool" | "boolean" => Variant::Bool(value.as_bool().unwrap_or(false)),
        "number" => {
            if let Some(i) = value.as_i64() {
                Variant::Integer(i)
            } else {
                Variant::Float(value.as_f64().unwrap_or(0.0))
            }
        }
        "string" => Variant::String(value.as_str().unwrap_or_default().to_string()),
        "array" | "object" | "json" => Variant::from(value.clone()),
        other => {
            return Err(crate::FlowError::BadArguments(format!("unsupported typed-value kind '{}'", other)).into())
        }
    };
    Ok(v)
}
