use std::error::Error;
use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
}

/// Renders an error followed by every `source()` below it, one per line.
///
/// # Usage
///
/// ```rust
/// use gigbook_core::format_error_chain;
///
/// let err = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
/// assert_eq!(format_error_chain(&err), "disk gone");
/// ```
///
/// Subscriber failures are logged through this, so a handler error built
/// with `anyhow::Context` shows every layer.
pub fn format_error_chain<E: Error + ?Sized>(error: &E) -> String {
    let mut chain = vec![error.to_string()];
    let mut source = error.source();

    while let Some(err) = source {
        chain.push(format!("  caused by: {}", err));
        source = err.source();
    }

    chain.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("subscriber rejected payload")]
    struct Outer(#[source] std::io::Error);

    #[test]
    fn chain_includes_sources() {
        let err = Outer(std::io::Error::new(std::io::ErrorKind::Other, "disk gone"));
        let text = format_error_chain(&err);
        assert_eq!(text, "subscriber rejected payload\n  caused by: disk gone");
    }

    #[test]
    fn chain_of_single_error_is_its_message() {
        let err = CoreError::Config("bad".to_string());
        assert_eq!(format_error_chain(&err), "config error: bad");
    }
}
