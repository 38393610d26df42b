use std::io::BufRead;

use time::Date;

use crate::{
    configuration::{FieldPolicy, MalformedLinePolicy},
    error::{ContextError, ErrorKind},
    field::{self, FieldSpec},
    record::{DetailRecord, Header, LineKind, Record, RecordType, SummaryRecord, TextLine},
    schema::{self, TextTableLayout},
    store::RecordStore,
};

/// Decodes the lines of a receipt file into records.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordParser {
    pub field_policy: FieldPolicy,
    pub malformed_lines: MalformedLinePolicy,
}

impl RecordParser {
    pub fn new(field_policy: FieldPolicy, malformed_lines: MalformedLinePolicy) -> Self {
        RecordParser {
            field_policy,
            malformed_lines,
        }
    }

    /// Reads every line of the given reader and collects the recognized records in file order.
    pub fn parse_reader<R: BufRead>(&self, reader: R) -> Result<RecordStore, ContextError> {
        let mut store = RecordStore::new();

        for (index, line) in reader.split(b'\n').enumerate() {
            let line_number = index + 1;
            let mut line = line.map_err(|error| {
                ContextError::with_error(
                    ErrorKind::Io,
                    format!("Unable to read the line {}", line_number),
                    &error,
                )
            })?;
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            match self.parse_line(&line, line_number) {
                Ok(Some(record)) => store.push(record),
                Ok(None) => {}
                Err(error) if error.kind == ErrorKind::Io => return Err(error),
                Err(error) => match self.malformed_lines {
                    MalformedLinePolicy::Abort => return Err(error),
                    MalformedLinePolicy::Skip => {
                        log::warn!("Skipping a malformed line: {}", error)
                    }
                },
            }
        }

        log::info!(
            "Parsed {} records ({} summary, {} detail)",
            store.len(),
            store.summaries().count(),
            store.details().count()
        );

        Ok(store)
    }

    /// Decodes a single line, returning `None` for empty lines and unknown record types.
    pub fn parse_line(
        &self,
        line: &[u8],
        line_number: usize,
    ) -> Result<Option<Record>, ContextError> {
        if line.is_empty() {
            log::debug!("Line {} is empty", line_number);
            return Ok(None);
        }

        self.decode_line(line)
            .map_err(|error| error.in_context(format!("Line {} is malformed", line_number)))
            .inspect(|record| match record {
                Some(record) => log::debug!("Line {}: {:?}", line_number, record),
                None => log::debug!("Line {} has an unknown record type", line_number),
            })
    }

    fn decode_line(&self, line: &[u8]) -> Result<Option<Record>, ContextError> {
        let header = decode_header(line)?;

        let record = match RecordType::from_discriminator(header.record_type) {
            Some(RecordType::Summary) => Record::Summary(self.decode_summary(line, header)?),
            Some(RecordType::Detail) => Record::Detail(self.decode_detail(line, header)?),
            None => return Ok(None),
        };

        Ok(Some(record))
    }

    fn decode_summary(&self, line: &[u8], header: Header) -> Result<SummaryRecord, ContextError> {
        Ok(SummaryRecord {
            header,
            supply_code: field::text(line, &schema::SUPPLY_CODE)?,
            short_file_name: field::text(line, &schema::SHORT_FILE_NAME)?,
            date: self.date(line, &schema::RECEIVED_DATE)?,
            accepted_count: self.integer(line, &schema::ACCEPTED_COUNT)?,
            rejected_count: self.integer(line, &schema::REJECTED_COUNT)?,
            long_file_name: field::text(line, &schema::LONG_FILE_NAME)?,
            version: self.integer(line, &schema::VERSION)?,
            total_received: self.integer(line, &schema::TOTAL_RECEIVED)?,
            title: field::text(line, &schema::TITLE)?,
            text_lines: decode_text_table(line, &schema::SUMMARY_LAYOUT.text_table)?,
        })
    }

    fn decode_detail(&self, line: &[u8], header: Header) -> Result<DetailRecord, ContextError> {
        let text_lines = decode_text_table(line, &schema::DETAIL_LAYOUT.text_table)?;
        let first_page = text_lines
            .iter()
            .any(|text_line| text_line.kind == LineKind::FirstPage);

        Ok(DetailRecord {
            header,
            first_page,
            protocol_sequence_number: field::text(line, &schema::PROTOCOL_SEQUENCE_NUMBER)?,
            receipt_sequence_number: field::text(line, &schema::RECEIPT_SEQUENCE_NUMBER)?,
            fiscal_code: field::text(line, &schema::FISCAL_CODE)?,
            denomination: field::text(line, &schema::DENOMINATION)?,
            text_lines,
        })
    }

    fn integer(&self, line: &[u8], spec: &FieldSpec) -> Result<u32, ContextError> {
        match field::integer(line, spec) {
            Err(error) if self.tolerates(&error) => {
                log::warn!("{}, using 0", error);
                Ok(0)
            }
            result => result,
        }
    }

    fn date(&self, line: &[u8], spec: &FieldSpec) -> Result<Option<Date>, ContextError> {
        match field::date(line, spec) {
            Ok(date) => Ok(Some(date)),
            Err(error) if self.tolerates(&error) => {
                log::warn!("{}, leaving it empty", error);
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    fn tolerates(&self, error: &ContextError) -> bool {
        error.kind == ErrorKind::Format && self.field_policy == FieldPolicy::Lenient
    }
}

/// Decodes the common prefix of every line.
pub fn decode_header(line: &[u8]) -> Result<Header, ContextError> {
    let protocol_id = field::text(line, &schema::PROTOCOL_ID)?;
    let record_type = field::slice(line, schema::RECORD_TYPE.offset, schema::RECORD_TYPE.length)
        .map_err(|error| error.in_context("Unable to read the record type"))?[0];

    Ok(Header {
        protocol_id,
        record_type,
    })
}

/// Decodes the repeated text rows of a record, stopping before the first terminator row.
pub fn decode_text_table(
    line: &[u8],
    layout: &TextTableLayout,
) -> Result<Vec<TextLine>, ContextError> {
    let mut text_lines = Vec::new();

    for index in 0..layout.max_rows {
        let offset = layout.row_offset(index);
        let row = field::slice(line, offset, layout.row_width)
            .map_err(|error| error.in_context(format!("Unable to read the text row {}", index)))?;

        let kind = LineKind::from_byte(row[0]);
        if kind == LineKind::Terminator {
            break;
        }
        text_lines.push(TextLine {
            kind,
            text: field::latin1_to_string(&row[1..]).trim().to_string(),
        });
    }

    Ok(text_lines)
}
