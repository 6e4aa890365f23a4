/// A single-field condition compiled against one index table's `value` /
/// `value_numeric` columns (§4.5, §4.7).
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Equals,
    NotEquals,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
    IsNull,
    IsNotNull,
    Contains,
    StartsWith,
    EndsWith,
    Like,
}

impl Condition {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Equals" | "=" => Some(Condition::Equals),
            "NotEquals" | "!=" => Some(Condition::NotEquals),
            "LessThan" | "<" => Some(Condition::LessThan),
            "LessOrEqual" | "LessThanOrEqualTo" | "<=" => Some(Condition::LessOrEqual),
            "GreaterThan" | ">" => Some(Condition::GreaterThan),
            "GreaterOrEqual" | "GreaterThanOrEqualTo" | ">=" => Some(Condition::GreaterOrEqual),
            "IsNull" => Some(Condition::IsNull),
            "IsNotNull" => Some(Condition::IsNotNull),
            "Contains" => Some(Condition::Contains),
            "StartsWith" => Some(Condition::StartsWith),
            "EndsWith" => Some(Condition::EndsWith),
            "Like" | "LIKE" => Some(Condition::Like),
            _ => None,
        }
    }

    /// Whether this condition should compare against `value_numeric` rather
    /// than the canonical text column, to avoid lexicographic ordering on
    /// range comparisons (§9 value-canonicalization note).
    pub fn is_range(&self) -> bool {
        matches!(
            self,
            Condition::LessThan
                | Condition::LessOrEqual
                | Condition::GreaterThan
                | Condition::GreaterOrEqual
        )
    }
}

/// A structured per-field filter: `(field_path, condition, value)`.
#[derive(Debug, Clone)]
pub struct FieldFilter {
    pub field_path: String,
    pub condition: Condition,
    pub value: Option<String>,
}
