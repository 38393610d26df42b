use time::Date;

/// The discriminator of the summary record of a receipt.
pub const SUMMARY_DISCRIMINATOR: u8 = b'P';
/// The discriminator of a document that has been accepted.
pub const ACCEPTED_DISCRIMINATOR: u8 = b'R';
/// The discriminator of a document that has been rejected.
pub const REJECTED_DISCRIMINATOR: u8 = b'Q';

/// The shape a line is decoded into, selected by its discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    Summary,
    Detail,
}

impl RecordType {
    /// Classifies a discriminator, returning `None` for the record types which are not rendered.
    pub fn from_discriminator(discriminator: u8) -> Option<RecordType> {
        match discriminator {
            SUMMARY_DISCRIMINATOR => Some(RecordType::Summary),
            ACCEPTED_DISCRIMINATOR | REJECTED_DISCRIMINATOR => Some(RecordType::Detail),
            _ => None,
        }
    }
}

/// The outcome of the processing of a single document, as printed in the closing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Accepted,
    Rejected,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Accepted => "acquisito",
            Outcome::Rejected => "scartato",
        }
    }
}

/// The kind of a row of the text table carried by the records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// The row belongs to the shared first page (`P`).
    FirstPage,
    /// A heading row (`T`), never expected in the text of a detail record.
    Heading,
    /// The end of the table (`F`), never stored.
    Terminator,
    /// Any other row, printed as body text.
    Body(char),
}

impl LineKind {
    pub fn from_byte(byte: u8) -> LineKind {
        match byte {
            b'P' => LineKind::FirstPage,
            b'T' => LineKind::Heading,
            b'F' => LineKind::Terminator,
            other => LineKind::Body(other as char),
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            LineKind::FirstPage => 'P',
            LineKind::Heading => 'T',
            LineKind::Terminator => 'F',
            LineKind::Body(character) => *character,
        }
    }
}

/// A row of free text belonging to a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLine {
    pub kind: LineKind,
    pub text: String,
}

/// The prefix shared by every line of the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// The identifier of the telematic transmission.
    pub protocol_id: String,
    /// The raw discriminator byte.
    pub record_type: u8,
}

/// The record describing the whole transmission (`P`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRecord {
    pub header: Header,
    pub supply_code: String,
    pub short_file_name: String,
    /// `None` when the date could not be decoded and the field policy is lenient.
    pub date: Option<Date>,
    pub accepted_count: u32,
    pub rejected_count: u32,
    pub version: u32,
    pub long_file_name: String,
    pub total_received: u32,
    pub title: String,
    pub text_lines: Vec<TextLine>,
}

/// The record describing a single accepted (`R`) or rejected (`Q`) document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRecord {
    pub header: Header,
    pub first_page: bool,
    pub protocol_sequence_number: String,
    pub receipt_sequence_number: String,
    pub fiscal_code: String,
    pub denomination: String,
    pub text_lines: Vec<TextLine>,
}

impl DetailRecord {
    pub fn outcome(&self) -> Outcome {
        if self.header.record_type == ACCEPTED_DISCRIMINATOR {
            Outcome::Accepted
        } else {
            Outcome::Rejected
        }
    }

    /// The rows to be printed on the shared first page.
    pub fn first_page_lines(&self) -> impl Iterator<Item = &TextLine> {
        self.text_lines
            .iter()
            .filter(|text_line| text_line.kind == LineKind::FirstPage)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Summary(SummaryRecord),
    Detail(DetailRecord),
}

impl Record {
    pub fn header(&self) -> &Header {
        match self {
            Record::Summary(summary) => &summary.header,
            Record::Detail(detail) => &detail.header,
        }
    }

    pub fn record_type(&self) -> RecordType {
        match self {
            Record::Summary(_) => RecordType::Summary,
            Record::Detail(_) => RecordType::Detail,
        }
    }
}
