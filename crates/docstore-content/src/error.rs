use std::fmt;

#[derive(Debug)]
pub enum ContentError {
    Io(String),
    /// A document row exists but its body file is missing. §4.2: this is a
    /// fatal integrity error, not a `NotFound`.
    MissingBody(String),
}

impl fmt::Display for ContentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentError::Io(msg) => write!(f, "content store I/O error: {msg}"),
            ContentError::MissingBody(id) => {
                write!(f, "integrity error: body missing for document {id}")
            }
        }
    }
}

impl std::error::Error for ContentError {}

impl From<std::io::Error> for ContentError {
    fn from(e: std::io::Error) -> Self {
        ContentError::Io(e.to_string())
    }
}
