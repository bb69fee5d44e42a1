//! Errors generated by the weft translator.
use crate::Id;

/// Convenience wrapper representing a possibly erroring computation.
pub type WeftResult<T> = std::result::Result<T, Error>;

/// An error surfaced by parsing or translation. Constructed through the
/// named constructors; the kind is deliberately private so callers report
/// errors instead of recovering from them.
pub struct Error {
    kind: Box<ErrorKind>,
}

/// Internal taxonomy of errors.
enum ErrorKind {
    /// A name was defined twice in one namespace.
    AlreadyBound(Id, String),
    /// A lookup found nothing.
    Undefined(Id, String),
    /// A recognized construct the translation does not support yet.
    Unimplemented(String),
    /// A translator-internal invariant was violated. These are defects, not
    /// user errors.
    Internal(String),
    /// The input file is invalid in some way.
    InvalidFile(String),
    /// Failed to parse the input program.
    Parse(String),
    /// Failed to write the output.
    Write(String),
}

impl Error {
    fn new(kind: ErrorKind) -> Self {
        Self { kind: Box::new(kind) }
    }

    pub fn already_bound(name: Id, bound_by: String) -> Self {
        Self::new(ErrorKind::AlreadyBound(name, bound_by))
    }

    pub fn undefined(name: Id, typ: String) -> Self {
        Self::new(ErrorKind::Undefined(name, typ))
    }

    pub fn unimplemented<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::Unimplemented(msg.to_string()))
    }

    pub fn internal<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::Internal(msg.to_string()))
    }

    pub fn invalid_file<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::InvalidFile(msg.to_string()))
    }

    pub fn parse_error<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::Parse(msg.to_string()))
    }

    pub fn write_error<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::Write(msg.to_string()))
    }

    pub fn is_already_bound(&self) -> bool {
        matches!(&*self.kind, ErrorKind::AlreadyBound(..))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(&*self.kind, ErrorKind::Undefined(..))
    }

    pub fn is_unimplemented(&self) -> bool {
        matches!(&*self.kind, ErrorKind::Unimplemented(..))
    }

    pub fn is_internal(&self) -> bool {
        matches!(&*self.kind, ErrorKind::Internal(..))
    }

    pub fn is_parse_error(&self) -> bool {
        matches!(&*self.kind, ErrorKind::Parse(..))
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ErrorKind::*;
        match &*self.kind {
            AlreadyBound(name, bound_by) => {
                write!(f, "name `{name}' is already bound by a {bound_by}")
            }
            Undefined(name, typ) => {
                write!(f, "undefined {typ} `{name}'")
            }
            Unimplemented(msg) => write!(f, "unimplemented: {msg}"),
            Internal(msg) => write!(f, "internal error: {msg}"),
            InvalidFile(msg) => write!(f, "invalid file: {msg}"),
            Parse(msg) => write!(f, "{msg}"),
            Write(msg) => write!(f, "write failed: {msg}"),
        }
    }
}

// The `Debug` output is what the user sees when an error escapes `main`, so
// render the message rather than the structure.
impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::invalid_file(err.to_string())
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(err: std::str::Utf8Error) -> Self {
        Error::invalid_file(err.to_string())
    }
}

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Error::write_error(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_render_without_structure() {
        let err = Error::already_bound("x".into(), "function".to_string());
        assert_eq!(
            err.to_string(),
            "name `x' is already bound by a function"
        );
        assert_eq!(format!("{err:?}"), err.to_string());
        assert_eq!(
            Error::undefined("y".into(), "channel".to_string()).to_string(),
            "undefined channel `y'"
        );
        assert_eq!(
            Error::internal("bad dispatch").to_string(),
            "internal error: bad dispatch"
        );
    }
}
