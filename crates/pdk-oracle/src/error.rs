use std::time::Duration;

use pdk_schemas::ParseError;

/// Failure of one oracle call. Scoped to a single adapter: the manager and
/// the orchestrator turn it into an empty decision for that strategy only.
#[derive(Debug)]
pub enum OracleError {
    /// Connection, DNS or TLS failure.
    Transport(String),
    /// No response within the allowed time.
    Timeout { after: Duration },
    /// Non-2xx status.
    Http { status: u16, message: String },
    /// 2xx response whose body is an API error or has an unexpected shape.
    Api(String),
    /// Text came back but no compliant decision could be extracted.
    Unparseable(ParseError),
    /// Adapter could not be built (unknown provider, missing key, bad URL)
    /// or manager registration was refused.
    Config(String),
}

impl OracleError {
    /// Short stable tag for logs and rule violations.
    pub fn kind(&self) -> &'static str {
        match self {
            OracleError::Transport(_) => "transport",
            OracleError::Timeout { .. } => "timeout",
            OracleError::Http { .. } => "http",
            OracleError::Api(_) => "api",
            OracleError::Unparseable(_) => "unparseable",
            OracleError::Config(_) => "config",
        }
    }
}

impl std::fmt::Display for OracleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OracleError::Transport(msg) => write!(f, "oracle transport error: {msg}"),
            OracleError::Timeout { after } => {
                write!(f, "oracle timed out after {}ms", after.as_millis())
            }
            OracleError::Http { status, message } => {
                write!(f, "oracle http error status={status} message={message}")
            }
            OracleError::Api(msg) => write!(f, "oracle api error: {msg}"),
            OracleError::Unparseable(e) => write!(f, "oracle output unparseable: {e}"),
            OracleError::Config(msg) => write!(f, "oracle config error: {msg}"),
        }
    }
}

impl std::error::Error for OracleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OracleError::Unparseable(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParseError> for OracleError {
    fn from(e: ParseError) -> Self {
        OracleError::Unparseable(e)
    }
}
