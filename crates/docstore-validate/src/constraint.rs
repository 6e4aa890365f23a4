use docstore_flatten::DataType;

/// One declared rule against a field path (§4.6). Constraints are a
/// whitelist of checks, not a closed schema — fields with no constraint
/// are never flagged.
#[derive(Debug, Clone)]
pub struct FieldConstraint {
    pub field_path: String,
    pub data_type: DataType,
    pub required: bool,
    pub nullable: bool,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub regex_pattern: Option<String>,
    pub allowed_values: Option<Vec<String>>,
    pub array_element_type: Option<DataType>,
}

impl FieldConstraint {
    pub fn new(field_path: impl Into<String>, data_type: DataType) -> Self {
        FieldConstraint {
            field_path: field_path.into(),
            data_type,
            required: false,
            nullable: true,
            min_value: None,
            max_value: None,
            min_length: None,
            max_length: None,
            regex_pattern: None,
            allowed_values: None,
            array_element_type: None,
        }
    }
}

/// Enforcement mode a collection applies its constraints under (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnforcementMode {
    None,
    Strict,
    Flexible,
    Partial,
}

impl EnforcementMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "None" => Some(EnforcementMode::None),
            "Strict" => Some(EnforcementMode::Strict),
            "Flexible" => Some(EnforcementMode::Flexible),
            "Partial" => Some(EnforcementMode::Partial),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EnforcementMode::None => "None",
            EnforcementMode::Strict => "Strict",
            EnforcementMode::Flexible => "Flexible",
            EnforcementMode::Partial => "Partial",
        }
    }
}
