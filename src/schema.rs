//! The fixed positions of the fields in the lines of an Entratel receipt file.
//!
//! Every record starts with the same header (the telematic protocol and the record type);
//! the rest of the line depends on the record type. Offsets are zero-based byte offsets.

use crate::field::{FieldKind, FieldSpec};

pub const PROTOCOL_ID: FieldSpec = FieldSpec::new("protocol_id", 0, 17, FieldKind::Text);
pub const RECORD_TYPE: FieldSpec = FieldSpec::new("record_type", 17, 1, FieldKind::Text);

pub const SUPPLY_CODE: FieldSpec = FieldSpec::new("supply_code", 27, 5, FieldKind::Text);
pub const SHORT_FILE_NAME: FieldSpec =
    FieldSpec::new("short_file_name", 38, 8, FieldKind::TrimmedText);
pub const RECEIVED_DATE: FieldSpec = FieldSpec::new("date", 46, 8, FieldKind::Date);
pub const ACCEPTED_COUNT: FieldSpec = FieldSpec::new("accepted_count", 54, 6, FieldKind::Integer);
pub const REJECTED_COUNT: FieldSpec = FieldSpec::new("rejected_count", 60, 6, FieldKind::Integer);
pub const LONG_FILE_NAME: FieldSpec =
    FieldSpec::new("long_file_name", 68, 47, FieldKind::TrimmedText);
pub const VERSION: FieldSpec = FieldSpec::new("version", 115, 6, FieldKind::Integer);
pub const TOTAL_RECEIVED: FieldSpec = FieldSpec::new("total_received", 121, 6, FieldKind::Integer);
pub const TITLE: FieldSpec = FieldSpec::new("title", 250, 150, FieldKind::TrimmedText);

pub const PROTOCOL_SEQUENCE_NUMBER: FieldSpec =
    FieldSpec::new("protocol_sequence_number", 18, 9, FieldKind::Text);
// Not assigned in the published layout, this is the gap before the fiscal code.
pub const RECEIPT_SEQUENCE_NUMBER: FieldSpec =
    FieldSpec::new("receipt_sequence_number", 27, 11, FieldKind::TrimmedText);
pub const FISCAL_CODE: FieldSpec = FieldSpec::new("fiscal_code", 38, 16, FieldKind::TrimmedText);
pub const DENOMINATION: FieldSpec =
    FieldSpec::new("denomination", 54, 60, FieldKind::TrimmedText);

/// The geometry of the repeated text rows at the end of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextTableLayout {
    /// The offset of the first row.
    pub start: usize,
    /// The width of each row: one byte for the kind followed by the text.
    pub row_width: usize,
    /// The maximum number of rows a record can carry.
    pub max_rows: usize,
}

impl TextTableLayout {
    /// The offset of the row with the given index.
    pub const fn row_offset(&self, index: usize) -> usize {
        self.start + index * self.row_width
    }

    /// The length of the text that follows the kind byte in each row.
    pub const fn text_length(&self) -> usize {
        self.row_width - 1
    }
}

/// The complete layout of one record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    pub fields: &'static [FieldSpec],
    pub text_table: TextTableLayout,
}

impl RecordLayout {
    /// The minimum length a line must have for all its fixed fields to be decoded.
    pub fn fields_end(&self) -> usize {
        self.fields.iter().map(FieldSpec::end).max().unwrap_or(0)
    }
}

pub const SUMMARY_LAYOUT: RecordLayout = RecordLayout {
    fields: &[
        PROTOCOL_ID,
        RECORD_TYPE,
        SUPPLY_CODE,
        SHORT_FILE_NAME,
        RECEIVED_DATE,
        ACCEPTED_COUNT,
        REJECTED_COUNT,
        LONG_FILE_NAME,
        VERSION,
        TOTAL_RECEIVED,
        TITLE,
    ],
    text_table: TextTableLayout {
        start: 400,
        row_width: 80,
        max_rows: 20,
    },
};

pub const DETAIL_LAYOUT: RecordLayout = RecordLayout {
    fields: &[
        PROTOCOL_ID,
        RECORD_TYPE,
        PROTOCOL_SEQUENCE_NUMBER,
        RECEIPT_SEQUENCE_NUMBER,
        FISCAL_CODE,
        DENOMINATION,
    ],
    text_table: TextTableLayout {
        start: 480,
        row_width: 80,
        max_rows: 19,
    },
};

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_disjoint(layout: &RecordLayout) {
        let mut fields = layout.fields.to_vec();
        fields.sort_by_key(|field| field.offset);
        for pair in fields.windows(2) {
            assert!(
                pair[0].end() <= pair[1].offset,
                "{} overlaps {}",
                pair[0].name,
                pair[1].name
            );
        }
        assert!(layout.fields_end() <= layout.text_table.start);
    }

    #[test]
    fn fields_do_not_overlap() {
        assert_disjoint(&SUMMARY_LAYOUT);
        assert_disjoint(&DETAIL_LAYOUT);
    }

    #[test]
    fn both_records_span_two_thousand_bytes() {
        for layout in [SUMMARY_LAYOUT, DETAIL_LAYOUT] {
            let table = layout.text_table;
            assert_eq!(table.row_offset(table.max_rows), 2000);
            assert_eq!(table.text_length(), 79);
        }
    }
}
