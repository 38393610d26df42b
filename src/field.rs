use time::{Date, Month};

use crate::error::{ContextError, ErrorKind};

/// How the bytes of a field are to be interpreted once extracted from the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// The raw substring, kept as it is.
    Text,
    /// The substring with the surrounding whitespace removed.
    TrimmedText,
    /// A base-10 unsigned integer, possibly padded with blanks.
    Integer,
    /// A calendar date in the `YYYYMMDD` form.
    Date,
}

/// The position of a field in a fixed-width line, together with the way it has to be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// The name of the field, only used for diagnostics.
    pub name: &'static str,
    /// The zero-based byte offset of the first byte of the field.
    pub offset: usize,
    /// The length of the field in bytes.
    pub length: usize,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn new(name: &'static str, offset: usize, length: usize, kind: FieldKind) -> Self {
        FieldSpec {
            name,
            offset,
            length,
            kind,
        }
    }

    /// The offset of the first byte after the field.
    pub const fn end(&self) -> usize {
        self.offset + self.length
    }
}

/// Extracts `length` bytes starting at `offset`, failing with a bounds error if the line is too short.
pub fn slice(line: &[u8], offset: usize, length: usize) -> Result<&[u8], ContextError> {
    line.get(offset..offset + length).ok_or_else(|| {
        ContextError::with_context(
            ErrorKind::Bounds,
            format!(
                "The line is {} bytes long but the range {}..{} was requested",
                line.len(),
                offset,
                offset + length
            ),
        )
    })
}

/// Decodes bytes as Latin-1, where every byte maps to the code point of the same value.
pub fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&byte| byte as char).collect()
}

/// Extracts the field as text, trimming it only if the field is not declared as raw text.
pub fn text(line: &[u8], spec: &FieldSpec) -> Result<String, ContextError> {
    let bytes = slice(line, spec.offset, spec.length)
        .map_err(|error| error.in_context(format!("Unable to read the field {}", spec.name)))?;
    let text = latin1_to_string(bytes);

    match spec.kind {
        FieldKind::Text => Ok(text),
        _ => Ok(text.trim().to_string()),
    }
}

/// Extracts the field and decodes it as an integer.
pub fn integer(line: &[u8], spec: &FieldSpec) -> Result<u32, ContextError> {
    let text = text(line, spec)?;
    parse_integer(&text)
        .map_err(|error| error.in_context(format!("Unable to decode the field {}", spec.name)))
}

/// Extracts the field and decodes it as a `YYYYMMDD` date.
pub fn date(line: &[u8], spec: &FieldSpec) -> Result<Date, ContextError> {
    let text = text(line, spec)?;
    parse_date(&text)
        .map_err(|error| error.in_context(format!("Unable to decode the field {}", spec.name)))
}

/// Parses a base-10 integer made only of ASCII digits, ignoring the surrounding blanks.
pub fn parse_integer(text: &str) -> Result<u32, ContextError> {
    let digits = text.trim();
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(ContextError::with_context(
            ErrorKind::Format,
            format!("{:?} is not a decimal number", text),
        ));
    }

    digits.parse::<u32>().map_err(|error| {
        ContextError::with_error(
            ErrorKind::Format,
            format!("{:?} is not a valid number", text),
            &error,
        )
    })
}

/// Parses a date in the `YYYYMMDD` form, rejecting impossible calendar dates.
pub fn parse_date(text: &str) -> Result<Date, ContextError> {
    let format_error = || {
        ContextError::with_context(
            ErrorKind::Format,
            format!("{:?} is not a date in the YYYYMMDD form", text),
        )
    };
    if text.len() != 8 || !text.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(format_error());
    }

    let year = text[0..4].parse::<i32>().map_err(|_| format_error())?;
    let month = text[4..6].parse::<u8>().map_err(|_| format_error())?;
    let day = text[6..8].parse::<u8>().map_err(|_| format_error())?;
    let month = Month::try_from(month).map_err(|error| {
        ContextError::with_error(ErrorKind::Format, format!("Invalid month in {:?}", text), &error)
    })?;

    Date::from_calendar_date(year, month, day).map_err(|error| {
        ContextError::with_error(ErrorKind::Format, format!("Invalid date {:?}", text), &error)
    })
}

/// Formats a date as `DD/MM/YYYY`, the way dates are printed on the receipt.
pub fn format_date(date: &Date) -> String {
    format!(
        "{:02}/{:02}/{:04}",
        date.day(),
        u8::from(date.month()),
        date.year()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAME: FieldSpec = FieldSpec::new("name", 2, 6, FieldKind::TrimmedText);

    #[test]
    fn slice_fails_on_short_lines() {
        let error = slice(b"0123", 2, 3).unwrap_err();
        assert_eq!(error.kind, ErrorKind::Bounds);

        assert_eq!(slice(b"01234", 2, 3).unwrap(), b"234");
    }

    #[test]
    fn text_trims_unless_raw() {
        let line = b"XX  ab  YY";
        assert_eq!(text(line, &NAME).unwrap(), "ab");

        let raw = FieldSpec::new("raw", 2, 6, FieldKind::Text);
        assert_eq!(text(line, &raw).unwrap(), "  ab  ");
    }

    #[test]
    fn text_decodes_latin1() {
        let line = [b'X', b'X', b'C', b'a', b'f', 0xE8, b' ', b' '];
        assert_eq!(text(&line, &NAME).unwrap(), "Caf\u{e8}");
    }

    #[test]
    fn integers_accept_only_digits() {
        assert_eq!(parse_integer("000003").unwrap(), 3);
        assert_eq!(parse_integer("  42  ").unwrap(), 42);

        for invalid in ["", "      ", "12a456", "+12", "-1"] {
            assert_eq!(parse_integer(invalid).unwrap_err().kind, ErrorKind::Format);
        }
    }

    #[test]
    fn dates_follow_the_compact_form() {
        let date = parse_date("20240229").unwrap();
        assert_eq!(format_date(&date), "29/02/2024");

        for invalid in ["20230229", "20241301", "2024011", "2024O101", "        "] {
            assert_eq!(parse_date(invalid).unwrap_err().kind, ErrorKind::Format);
        }
    }

    #[test]
    fn integer_field_reports_the_field_name() {
        let spec = FieldSpec::new("accepted_count", 0, 3, FieldKind::Integer);
        let error = integer(b"1x3", &spec).unwrap_err();

        assert_eq!(error.kind, ErrorKind::Format);
        assert!(error.to_string().contains("accepted_count"));
    }
}
