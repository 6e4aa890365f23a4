mod constraint;
mod validator;

pub use constraint::{EnforcementMode, FieldConstraint};
pub use validator::{validate, ValidationError, ValidationOutcome};
