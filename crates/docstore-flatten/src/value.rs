/// Wire/persisted data type tag (§6 GLOSSARY, §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DataType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Null,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Integer => "integer",
            DataType::Number => "number",
            DataType::Boolean => "boolean",
            DataType::Array => "array",
            DataType::Object => "object",
            DataType::Null => "null",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "string" => DataType::String,
            "integer" => DataType::Integer,
            "number" => DataType::Number,
            "boolean" => DataType::Boolean,
            "array" => DataType::Array,
            "object" => DataType::Object,
            "null" => DataType::Null,
            _ => return None,
        })
    }
}

/// A scalar leaf value extracted by the flattener. Objects and arrays are
/// never emitted themselves — only their scalar leaves (§4.3).
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    Null,
}

impl TypedValue {
    pub fn data_type(&self) -> DataType {
        match self {
            TypedValue::String(_) => DataType::String,
            TypedValue::Integer(_) => DataType::Integer,
            TypedValue::Number(_) => DataType::Number,
            TypedValue::Boolean(_) => DataType::Boolean,
            TypedValue::Null => DataType::Null,
        }
    }

    /// Canonical text form for index storage (§4.3): booleans as
    /// `true`/`false`, numbers as their shortest round-trip decimal,
    /// strings verbatim, integers without a decimal point, null as the
    /// literal sentinel `"null"`.
    pub fn canonical_text(&self) -> String {
        match self {
            TypedValue::String(s) => s.clone(),
            TypedValue::Integer(i) => i.to_string(),
            TypedValue::Number(n) => {
                let mut s = format!("{n}");
                if !s.contains('.') && !s.contains('e') && !s.contains("inf") && !s.contains("NaN")
                {
                    s.push_str(".0");
                }
                s
            }
            TypedValue::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
            TypedValue::Null => "null".to_string(),
        }
    }

    pub fn from_json_scalar(value: &serde_json::Value) -> Option<TypedValue> {
        match value {
            serde_json::Value::String(s) => Some(TypedValue::String(s.clone())),
            serde_json::Value::Bool(b) => Some(TypedValue::Boolean(*b)),
            serde_json::Value::Null => Some(TypedValue::Null),
            serde_json::Value::Number(n) => {
                if n.is_i64() || n.is_u64() {
                    Some(TypedValue::Integer(n.as_i64().unwrap_or_else(|| n.as_u64().unwrap() as i64)))
                } else {
                    Some(TypedValue::Number(n.as_f64().unwrap_or(f64::NAN)))
                }
            }
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }
}
