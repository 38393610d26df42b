use serde::{Deserialize, Serialize};

/// The category of a `ContextError`, used by the callers to decide whether an error
/// can be tolerated (for example a single malformed line) or has to stop the conversion.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// A line is shorter than the end of a field it should contain.
    Bounds,
    /// A numeric or date field contains characters that cannot be decoded.
    Format,
    /// The records violate the layout contract of the document (an unexpected text line kind).
    Assembly,
    /// Reading the input or writing the output failed.
    Io,
    /// The PDF document could not be built or serialized.
    Render,
    /// The configuration file could not be read or parsed.
    Configuration,
    /// The input file contains no receipt records at all.
    EmptyInput,
}

/// A struct that represents an error with a context and possibly the propagated source error.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ContextError {
    pub kind: ErrorKind,
    pub context: String,
    pub source_error: Option<String>,
}

impl std::fmt::Display for ContextError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.source_error {
            Some(source_error) => write!(
                formatter,
                "{}: {}",
                self.context,
                minimize_first_letter(source_error.to_string()),
            ),
            None => write!(formatter, "{}", self.context),
        }
    }
}

impl std::error::Error for ContextError {}

impl ContextError {
    /// Create a new `ContextError` of the given kind with the given context.
    pub fn with_context<S: Into<String>>(kind: ErrorKind, context: S) -> ContextError {
        ContextError {
            kind,
            context: context.into(),
            source_error: None,
        }
    }

    /// Create a new `ContextError` of the given kind with the given context and source error.
    pub fn with_error<S: Into<String>>(
        kind: ErrorKind,
        context: S,
        error: &dyn std::error::Error,
    ) -> ContextError {
        ContextError {
            kind,
            context: context.into(),
            source_error: Some(error.to_string()),
        }
    }

    /// Wraps this error into a new context, keeping its kind and folding the current message
    /// into the source.
    pub fn in_context<S: Into<String>>(self, context: S) -> ContextError {
        let kind = self.kind;
        ContextError::with_error(kind, context, &self)
    }
}

/// Minimizes the first letter of a string, it is used for standardizing the error message.
fn minimize_first_letter(string: String) -> String {
    let mut characters = string.chars();
    match characters.next() {
        None => String::new(),
        Some(character) => character.to_lowercase().chain(characters).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_context_and_source() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "No such file");
        let error = ContextError::with_error(ErrorKind::Io, "Unable to open the input", &io_error);

        assert_eq!(error.to_string(), "Unable to open the input: no such file");
        assert_eq!(error.kind, ErrorKind::Io);
    }

    #[test]
    fn in_context_keeps_the_kind() {
        let error = ContextError::with_context(ErrorKind::Bounds, "Field ends at 27")
            .in_context("Line 3 is malformed");

        assert_eq!(error.kind, ErrorKind::Bounds);
        assert_eq!(error.to_string(), "Line 3 is malformed: field ends at 27");
    }
}
