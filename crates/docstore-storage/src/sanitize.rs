use crate::error::StorageError;

/// Engine identifier length limits vary; SQL Server's 128 is the tightest
/// among the four dialects we support, so it is the bound we enforce
/// everywhere an identifier must be interpolated.
pub const MAX_IDENTIFIER_LEN: usize = 128;

const RESERVED_PREFIXES: &[&str] = &["sqlite_", "pg_", "information_schema", "sys_"];

/// Whitelist-sanitize a caller-supplied identifier (table or column name).
///
/// Restricts to `[A-Za-z0-9_]`, bounds length, and rejects reserved
/// prefixes. This is the *only* place caller-controlled strings are
/// permitted to reach SQL text directly — everything else must be a bound
/// parameter.
pub fn sanitize_identifier(raw: &str) -> Result<String, StorageError> {
    if raw.is_empty() {
        return Err(StorageError::InvalidIdentifier("empty identifier".into()));
    }

    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }

    if out.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
        out.insert(0, '_');
    }

    if out.len() > MAX_IDENTIFIER_LEN {
        out.truncate(MAX_IDENTIFIER_LEN);
    }

    let lower = out.to_ascii_lowercase();
    for prefix in RESERVED_PREFIXES {
        if lower.starts_with(prefix) {
            return Err(StorageError::InvalidIdentifier(format!(
                "identifier '{raw}' collides with reserved prefix '{prefix}'"
            )));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_for_clean_identifier() {
        assert_eq!(sanitize_identifier("user_address_city").unwrap(), "user_address_city");
    }

    #[test]
    fn dots_become_underscores() {
        assert_eq!(sanitize_identifier("user.address.city").unwrap(), "user_address_city");
    }

    #[test]
    fn leading_digit_gets_prefixed() {
        assert_eq!(sanitize_identifier("123abc").unwrap(), "_123abc");
    }

    #[test]
    fn rejects_reserved_prefix() {
        assert!(sanitize_identifier("sqlite_master").is_err());
        assert!(sanitize_identifier("pg_catalog").is_err());
    }

    #[test]
    fn rejects_empty() {
        assert!(sanitize_identifier("").is_err());
    }

    #[test]
    fn truncates_long_identifiers() {
        let long = "a".repeat(300);
        let sanitized = sanitize_identifier(&long).unwrap();
        assert_eq!(sanitized.len(), MAX_IDENTIFIER_LEN);
    }

    #[test]
    fn injection_attempt_is_neutralized() {
        let hostile = "a; DROP TABLE users; --";
        let sanitized = sanitize_identifier(hostile).unwrap();
        assert!(!sanitized.contains(';'));
        assert!(!sanitized.contains(' '));
        assert!(!sanitized.contains('-'));
    }
}
