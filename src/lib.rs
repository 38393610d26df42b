//! Entratel-receipt converts the fixed-width receipt files returned by the Entratel telematic
//! service into the PDF notice "Comunicazione di Avvenuto Ricevimento".
//!
//! The conversion happens in two stages. The lines of the input are first decoded into records
//! by the `RecordParser`, which collects them in a `RecordStore`. The records are then laid out
//! by the `DocumentAssembler` on a `Canvas`, a cursor-based drawing surface on top of the
//! `PdfDocument` interface for the direct manipulation of PDF documents.
//! The whole pipeline is available through `convert_file`.
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write as _},
    path::{Path, PathBuf},
};

use error::{ContextError, ErrorKind};

/// This module contains the `ContextError` type which is the error type used throughout this library.
///
/// Every error carries an `ErrorKind`, so that the callers can tell a malformed line, which may be
/// skipped, from a failure that has to stop the conversion. If an error happened in a function
/// called inside this library, the message of the propagated error is kept as its source.
///
/// The `ContextError` type implements `std::fmt::Display` and `Debug`, so it can be explicitly printed out.
pub mod error;

/// The primitives for reading single fields out of a fixed-width line: byte ranges, Latin-1 text,
/// unsigned integers and dates.
pub mod field;

/// The offsets and lengths of every field of the summary and detail lines, and the layout of
/// their text tables.
pub mod schema;

/// The decoded records. A line is either a summary (`P`) or a detail, whose outcome is
/// accepted (`R`) or rejected (`Q`).
pub mod record;

/// The ordered collection of the decoded records.
pub mod store;

/// The `RecordParser`, which turns the lines of a receipt file into records according to the
/// configured policies for malformed lines and malformed fields.
pub mod parser;

/// The configuration of a conversion, loaded from a JSON file.
///
/// Every key is optional: a missing key takes its default value, a missing file means the
/// default configuration.
pub mod configuration;

/// The module were the `PdfDocument` interface for working with PDF documents is presented.
///
/// # Introduction
///
/// The main component of this module is the struct `PdfDocument`. It offers functions such as
/// `add_page`, `add_font`, `add_image`, `write_text_to_page`, `place_image_in_page`, `write_all`
/// and `save_to_bytes`, which allow the end user to interact with a PDF document in a meaningful
/// way while keeping the low-level object graph hidden below private methods.
///
/// Only the standard Courier fonts are supported, so no font file is ever embedded. The text is
/// encoded as WinAnsi, which covers the Latin-1 characters found in the receipts.
pub mod pdf;

/// The `Canvas`, a drawing surface where text is written in cells relative to a caret, with
/// automatic page breaks and page decorations (header and footer) drawn on every page.
pub mod canvas;

/// The layout of the receipt notice: the page decorations and the `DocumentAssembler`, which
/// visits the records once per section of the document.
pub mod assembler;

/// The path of the PDF produced for the given input: the same path with the `pdf` extension.
pub fn output_path_for(input_path: &Path) -> PathBuf {
    input_path.with_extension("pdf")
}

/// Reads the receipt file at `input_path`, lays out its records and writes the PDF document
/// to `output_path`. The output file is only created once the whole document has been built.
pub fn convert_file(
    input_path: &Path,
    output_path: &Path,
    configuration: &configuration::ReportConfiguration,
) -> Result<(), ContextError> {
    let input_file = File::open(input_path).map_err(|error| {
        ContextError::with_error(
            ErrorKind::Io,
            format!("Failed to open the input file {:?}", input_path),
            &error,
        )
    })?;

    let parser = parser::RecordParser::new(configuration.field_policy, configuration.malformed_lines);
    let store = parser
        .parse_reader(BufReader::new(input_file))
        .map_err(|error| error.in_context(format!("Failed to parse the file {:?}", input_path)))?;

    let mut pdf_document = assembler::render_receipt(&store, configuration)?;
    let pdf_document_bytes = pdf_document.save_to_bytes()?;

    let output_file = File::create(output_path).map_err(|error| {
        ContextError::with_error(
            ErrorKind::Io,
            format!("Failed to create the output file {:?}", output_path),
            &error,
        )
    })?;
    let mut writer = BufWriter::new(output_file);
    writer
        .write_all(&pdf_document_bytes)
        .and_then(|_| writer.flush())
        .map_err(|error| {
            ContextError::with_error(
                ErrorKind::Io,
                format!("Failed to write the output file {:?}", output_path),
                &error,
            )
        })?;
    log::info!("Saved the output file to the path: {:?}", output_path);

    Ok(())
}
