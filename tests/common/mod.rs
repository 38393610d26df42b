#![allow(dead_code)]

use std::path::{Path, PathBuf};

use entratel_receipt::configuration::ReportConfiguration;
use lopdf::Object;

pub const PROTOCOL_ID: &str = "24011512345678901";
pub const LINE_LENGTH: usize = 2000;

/// A blank fixed-width line where values are written at given offsets.
pub struct LineBuilder {
    bytes: Vec<u8>,
}

impl LineBuilder {
    pub fn new(record_type: char) -> Self {
        let mut builder = LineBuilder {
            bytes: vec![b' '; LINE_LENGTH],
        };
        builder.put(0, PROTOCOL_ID).put(17, &record_type.to_string());
        builder
    }

    pub fn put(&mut self, offset: usize, value: &str) -> &mut Self {
        let bytes = value.as_bytes();
        if self.bytes.len() < offset + bytes.len() {
            self.bytes.resize(offset + bytes.len(), b' ');
        }
        self.bytes[offset..offset + bytes.len()].copy_from_slice(bytes);
        self
    }

    pub fn row(&mut self, start: usize, index: usize, kind: char, text: &str) -> &mut Self {
        let offset = start + index * 80;
        self.put(offset, &kind.to_string()).put(offset + 1, text)
    }

    pub fn build(&self) -> Vec<u8> {
        self.bytes.clone()
    }
}

pub fn summary_line(title: &str, accepted: u32, rejected: u32) -> Vec<u8> {
    LineBuilder::new('P')
        .put(27, "I24A0")
        .put(38, "ABCD1234")
        .put(46, "20240115")
        .put(54, &format!("{:06}", accepted))
        .put(60, &format!("{:06}", rejected))
        .put(68, "ATTI-2024-0001.f24")
        .put(115, "000002")
        .put(121, &format!("{:06}", accepted + rejected))
        .put(250, title)
        .row(400, 0, 'D', "Si attesta la ricezione del file indicato.")
        .row(400, 1, 'F', "")
        .build()
}

pub fn detail_line(
    record_type: char,
    sequence: u32,
    denomination: &str,
    rows: &[(char, &str)],
) -> Vec<u8> {
    let mut builder = LineBuilder::new(record_type);
    builder
        .put(18, &format!("{:09}", sequence))
        .put(27, &format!("{:011}", sequence))
        .put(38, "RSSMRA80A01H501U")
        .put(54, denomination);
    for (index, (kind, text)) in rows.iter().enumerate() {
        builder.row(480, index, *kind, text);
    }
    if rows.len() < 19 {
        builder.row(480, rows.len(), 'F', "");
    }
    builder.build()
}

/// Joins the lines the way the receipts are delivered, with CRLF line endings.
pub fn receipt_file(lines: &[Vec<u8>]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for line in lines {
        bytes.extend_from_slice(line);
        bytes.extend_from_slice(b"\r\n");
    }
    bytes
}

pub fn write_receipt(directory: &Path, lines: &[Vec<u8>]) -> PathBuf {
    let input_path = directory.join("ricevuta.rel");
    std::fs::write(&input_path, receipt_file(lines)).unwrap();
    input_path
}

/// A configuration pointing at a logo that does not exist, with uncompressed streams.
pub fn plain_configuration(directory: &Path) -> ReportConfiguration {
    ReportConfiguration {
        logo_path: directory.join("missing-logo.png"),
        compress: false,
        ..ReportConfiguration::default()
    }
}

/// The strings shown on each page of a PDF file, in drawing order.
pub fn shown_texts(pdf_path: &Path) -> Vec<Vec<String>> {
    let document = lopdf::Document::load(pdf_path).unwrap();
    document
        .get_pages()
        .values()
        .map(|&page_id| {
            let content = document.get_page_content(page_id).unwrap();
            lopdf::content::Content::decode(&content)
                .unwrap()
                .operations
                .into_iter()
                .filter(|operation| operation.operator == "Tj")
                .flat_map(|operation| operation.operands)
                .filter_map(|operand| match operand {
                    Object::String(bytes, _) => {
                        Some(bytes.iter().map(|&byte| byte as char).collect())
                    }
                    _ => None,
                })
                .collect()
        })
        .collect()
}
