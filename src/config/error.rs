//! Configuration errors.

use thiserror::Error;

/// Configuration error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}, line {1}")]
    Syntax(String, usize),
}

impl Error {
    /// Attach the line number of the offending entry to a TOML error.
    pub fn config(source: &str, err: toml::de::Error) -> Self {
        let message = err.message().to_string();

        let Some(span) = err.span() else {
            return Self::Syntax(message, 0);
        };

        let line = source
            .char_indices()
            .take_while(|(i, _)| *i < span.start)
            .filter(|(_, c)| *c == '\n')
            .count()
            + 1;

        Self::Syntax(message, line)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_line_number() {
        let source = "host = \"localhost\"\nport = = 5432\n";
        let err = toml::from_str::<toml::Table>(source).unwrap_err();
        let err = Error::config(source, err);
        match err {
            Error::Syntax(_, line) => assert_eq!(line, 2),
            _ => panic!("expected syntax error"),
        }
    }
}
