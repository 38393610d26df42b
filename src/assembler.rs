use std::rc::Rc;

use crate::{
    canvas::{Alignment, CaretMove, Canvas, PageDecorations},
    configuration::ReportConfiguration,
    error::{ContextError, ErrorKind},
    field::format_date,
    pdf::{BuiltinFont, ImageXObject, PdfDocument},
    record::{DetailRecord, LineKind, Record, SummaryRecord, TextLine},
    store::RecordStore,
};

/// The caption printed below the logo on every page.
pub const HEADER_CAPTION: &str = "SERVIZIO TELEMATICO ENTRATEL DI PRESENTAZIONE DELLE DICHIARAZIONI\nCOMUNICAZIONE DI AVVENUTO RICEVIMENTO (art. 3, comma 10, D.P.R. 322/1998)";
/// The caption of the closing page listing the documents.
pub const CLOSING_CAPTION: &str = "ELENCO DEI DOCUMENTI ACQUISITI E/O SCARTATI";

const BODY_FONT_SIZE: f32 = 8.0;
const CAPTION_FONT_SIZE: f32 = 8.0;
const PAGE_NUMBER_FONT_SIZE: f32 = 12.0;
const LOGO_POSITION: [f32; 2] = [85.0, 5.0];

const LABEL_WIDTH: f32 = 50.0;
const VALUE_WIDTH: f32 = 50.0;
const COUNT_WIDTH: f32 = 10.0;
/// The widths of the columns of the closing table: outcome, protocol, fiscal code, denomination.
const TABLE_COLUMN_WIDTHS: [f32; 4] = [20.0, 40.0, 40.0, 60.0];
const TABLE_COLUMN_TITLES: [&str; 4] = [
    "Esito",
    "Protocollo Documenti",
    "Codice Fiscale",
    "Denominazione",
];

/// The description of the documents of a supply, as printed on the closing page.
pub fn document_type_label(supply_code: &str) -> Option<&'static str> {
    match supply_code {
        "I24A0" => Some("Esito versamento F24"),
        _ => None,
    }
}

/// The logo and the caption at the top of every page, the page number at the bottom.
pub struct ReceiptDecorations {
    /// The index of the logo registered on the canvas, if any.
    pub logo: Option<usize>,
}

impl PageDecorations for ReceiptDecorations {
    fn header(&self, canvas: &mut Canvas) -> Result<(), ContextError> {
        if let Some(logo) = self.logo {
            let [x, y] = LOGO_POSITION;
            canvas.image(logo, x, y, 0.0, 0.0)?;
        }
        canvas.set_y(20.0);
        canvas.set_font(BuiltinFont::CourierBold, CAPTION_FONT_SIZE);
        canvas.multi_cell(0.0, 6.0, HEADER_CAPTION, Alignment::Center)
    }

    fn footer(&self, canvas: &mut Canvas) -> Result<(), ContextError> {
        canvas.set_font(BuiltinFont::CourierBold, PAGE_NUMBER_FONT_SIZE);
        canvas.set_y(-15.0);
        let page_number = canvas.page_number().to_string();
        canvas.cell(0.0, 10.0, &page_number, Alignment::Center, CaretMove::Right)
    }
}

/// Lays out the records of a receipt on a canvas. The records are visited once per section
/// of the document, in this order:
///
/// 1. the opening page of every summary record;
/// 2. the first-page rows of the detail records, appended to the current page;
/// 3. one page per detail record;
/// 4. the closing page of every summary record, listing all the detail records.
pub struct DocumentAssembler<'a> {
    store: &'a RecordStore,
}

impl<'a> DocumentAssembler<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        DocumentAssembler { store }
    }

    pub fn assemble(&self, canvas: &mut Canvas) -> Result<(), ContextError> {
        for summary in self.store.summaries() {
            self.open_document(canvas, summary)?;
        }
        log::debug!("Opening pages done, at page {}", canvas.page_number());

        for detail in self.store.details().filter(|detail| detail.first_page) {
            self.annotate_first_page(canvas, detail)?;
        }

        for detail in self.store.details() {
            self.add_detail_page(canvas, detail)?;
        }
        log::debug!("Detail pages done, at page {}", canvas.page_number());

        for summary in self.store.summaries() {
            self.add_closing_page(canvas, summary)?;
            for detail in self.store.details() {
                self.add_closing_row(canvas, detail)?;
            }
        }
        log::debug!("Closing pages done, at page {}", canvas.page_number());

        Ok(())
    }

    fn open_document(&self, canvas: &mut Canvas, summary: &SummaryRecord) -> Result<(), ContextError> {
        canvas.set_font(BuiltinFont::Courier, BODY_FONT_SIZE);
        canvas.add_page()?;
        canvas.ln(None);

        canvas.cell(0.0, 6.0, &summary.title, Alignment::Center, CaretMove::Below)?;
        for text_line in &summary.text_lines {
            canvas.cell(0.0, 5.0, &text_line.text, Alignment::Left, CaretMove::Below)?;
        }
        canvas.ln(None);

        let date = summary.date.as_ref().map(format_date).unwrap_or_default();
        canvas.cell(0.0, 5.0, &format!("Li, {}", date), Alignment::Left, CaretMove::Below)?;
        canvas.ln(None);

        Ok(())
    }

    fn annotate_first_page(&self, canvas: &mut Canvas, detail: &DetailRecord) -> Result<(), ContextError> {
        if !canvas.has_page() {
            log::warn!("There is no summary record, the first-page rows get a page of their own");
            canvas.add_page()?;
        }
        canvas.set_font(BuiltinFont::Courier, BODY_FONT_SIZE);
        canvas.ln(None);

        for text_line in &detail.text_lines {
            ensure_expected_kind(detail, text_line)?;
        }
        for text_line in detail.first_page_lines() {
            canvas.cell(0.0, 6.0, &text_line.text, Alignment::Left, CaretMove::Below)?;
        }

        Ok(())
    }

    fn add_detail_page(&self, canvas: &mut Canvas, detail: &DetailRecord) -> Result<(), ContextError> {
        canvas.set_font(BuiltinFont::Courier, BODY_FONT_SIZE);
        canvas.add_page()?;
        canvas.ln(None);

        for text_line in &detail.text_lines {
            ensure_expected_kind(detail, text_line)?;
            canvas.cell(0.0, 6.0, &text_line.text, Alignment::Left, CaretMove::Below)?;
        }

        Ok(())
    }

    fn add_closing_page(&self, canvas: &mut Canvas, summary: &SummaryRecord) -> Result<(), ContextError> {
        canvas.set_font(BuiltinFont::Courier, BODY_FONT_SIZE);
        canvas.add_page()?;
        canvas.ln(None);

        canvas.cell(0.0, 6.0, CLOSING_CAPTION, Alignment::Center, CaretMove::Below)?;
        canvas.ln(None);

        let rows = [
            ("PROTOCOLLO DI RICEZIONE:", summary.header.protocol_id.as_str()),
            ("NOME DEL FILE:", summary.long_file_name.as_str()),
            (
                "TIPO DOCUMENTO:",
                document_type_label(&summary.supply_code).unwrap_or_default(),
            ),
        ];
        for (label, value) in rows {
            canvas.cell(LABEL_WIDTH, 5.0, label, Alignment::Left, CaretMove::Right)?;
            canvas.cell(VALUE_WIDTH, 5.0, value, Alignment::Left, CaretMove::Right)?;
            canvas.ln(None);
        }

        let counts = [
            ("DOCUMENTI ACQUISITI:", summary.accepted_count),
            ("DOCUMENTI SCARTATI:", summary.rejected_count),
        ];
        for (label, count) in counts {
            canvas.cell(LABEL_WIDTH, 5.0, label, Alignment::Left, CaretMove::Right)?;
            canvas.cell(COUNT_WIDTH, 5.0, &count.to_string(), Alignment::Right, CaretMove::Right)?;
            canvas.ln(None);
        }

        canvas.ln(None);
        for (width, title) in TABLE_COLUMN_WIDTHS.iter().zip(TABLE_COLUMN_TITLES) {
            canvas.cell(*width, 5.0, title, Alignment::Left, CaretMove::Right)?;
        }

        Ok(())
    }

    fn add_closing_row(&self, canvas: &mut Canvas, detail: &DetailRecord) -> Result<(), ContextError> {
        canvas.set_font(BuiltinFont::Courier, BODY_FONT_SIZE);
        canvas.ln(None);

        let values = [
            detail.outcome().label(),
            detail.protocol_sequence_number.as_str(),
            detail.fiscal_code.as_str(),
            detail.denomination.as_str(),
        ];
        for (width, value) in TABLE_COLUMN_WIDTHS.iter().zip(values) {
            canvas.cell(*width, 5.0, value, Alignment::Left, CaretMove::Right)?;
        }

        Ok(())
    }
}

/// Only the heading rows are out of place in the text of a detail record; finding one means
/// the file does not follow the layout the document is built on.
fn ensure_expected_kind(detail: &DetailRecord, text_line: &TextLine) -> Result<(), ContextError> {
    if text_line.kind == LineKind::Heading {
        return Err(ContextError::with_context(
            ErrorKind::Assembly,
            format!(
                "The document {} of the protocol {} carries an unexpected {:?} line: {:?}",
                detail.protocol_sequence_number,
                detail.header.protocol_id,
                text_line.kind.as_char(),
                text_line.text
            ),
        ));
    }

    Ok(())
}

/// Creates the canvas for the given records, with the logo (when available) and the page decorations.
pub fn receipt_canvas(
    store: &RecordStore,
    configuration: &ReportConfiguration,
) -> Result<Canvas, ContextError> {
    let identifier = store
        .summaries()
        .next()
        .map(|summary| summary.header.protocol_id.clone())
        .or_else(|| store.iter().next().map(|record| record.header().protocol_id.clone()))
        .ok_or_else(|| {
            ContextError::with_context(
                ErrorKind::EmptyInput,
                "The input contains no receipt records",
            )
        })?;
    let mut canvas = Canvas::new(identifier);

    if let Some(date) = store.summaries().find_map(|summary| summary.date) {
        canvas.document_mut().creation_date = date.midnight().assume_utc();
    }

    let logo = if configuration.logo_path.exists() {
        let image = ImageXObject::from_path(&configuration.logo_path)?;
        Some(canvas.register_image(image))
    } else {
        log::warn!(
            "The logo {:?} does not exist, the pages will be drawn without it",
            configuration.logo_path
        );
        None
    };
    canvas.set_decorations(Rc::new(ReceiptDecorations { logo }));

    Ok(canvas)
}

/// Lays out the records and finalizes the PDF document.
pub fn render_receipt(
    store: &RecordStore,
    configuration: &ReportConfiguration,
) -> Result<PdfDocument, ContextError> {
    let mut canvas = receipt_canvas(store, configuration)?;
    DocumentAssembler::new(store).assemble(&mut canvas)?;

    let instance_id = match store.iter().next() {
        Some(Record::Summary(summary)) if !summary.short_file_name.is_empty() => {
            summary.short_file_name.clone()
        }
        Some(record) => record.header().protocol_id.clone(),
        None => String::new(),
    };
    let mut document = canvas.finish(instance_id)?;
    log::info!("Laid out {} pages", document.page_count());

    if configuration.compress {
        document.optimize();
    }

    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        canvas::TextPlacement,
        parser::{
            tests::{detail_line, summary_line},
            RecordParser,
        },
    };

    fn store_of(lines: &[Vec<u8>]) -> RecordStore {
        let parser = RecordParser::default();
        lines
            .iter()
            .enumerate()
            .filter_map(|(index, line)| parser.parse_line(line, index + 1).unwrap())
            .collect()
    }

    fn configuration_without_logo() -> ReportConfiguration {
        ReportConfiguration {
            logo_path: "does/not/exist/logo.png".into(),
            ..ReportConfiguration::default()
        }
    }

    fn assembled(store: &RecordStore) -> Result<Canvas, ContextError> {
        let mut canvas = receipt_canvas(store, &configuration_without_logo())?;
        DocumentAssembler::new(store).assemble(&mut canvas)?;
        Ok(canvas)
    }

    fn on_page<'c>(canvas: &'c Canvas, page_number: usize) -> Vec<&'c TextPlacement> {
        canvas
            .text_placements()
            .iter()
            .filter(|placement| placement.page_number == page_number)
            .collect()
    }

    fn page_of(canvas: &Canvas, text: &str) -> Option<usize> {
        canvas
            .text_placements()
            .iter()
            .find(|placement| placement.text == text)
            .map(|placement| placement.page_number)
    }

    #[test]
    fn one_summary_and_two_rejections() {
        let store = store_of(&[
            summary_line("000003", "000001", "TEST"),
            detail_line('Q', "000000001", &[('D', "Documento uno")]),
            detail_line('Q', "000000002", &[('D', "Documento due")]),
        ]);
        let canvas = assembled(&store).unwrap();
        assert_eq!(canvas.page_number(), 4);

        let title = on_page(&canvas, 1)
            .into_iter()
            .find(|placement| placement.text == "TEST")
            .unwrap();
        assert_eq!(title.alignment, Alignment::Center);
        assert!(((title.x + title.end_x()) / 2.0 - 105.0).abs() < 1e-3);
        assert_eq!(page_of(&canvas, "Li, 15/01/2024"), Some(1));

        assert_eq!(page_of(&canvas, "Documento uno"), Some(2));
        assert_eq!(page_of(&canvas, "Documento due"), Some(3));

        let closing_page = on_page(&canvas, 4);
        assert!(closing_page.iter().any(|placement| placement.text == CLOSING_CAPTION));
        for count in ["3", "1"] {
            let placement = closing_page
                .iter()
                .find(|placement| placement.text == count && placement.alignment == Alignment::Right)
                .unwrap();
            assert!((placement.end_x() - 69.0).abs() < 1e-3);
        }
        assert_eq!(
            closing_page
                .iter()
                .filter(|placement| placement.text == "scartato")
                .count(),
            2
        );
        assert!(closing_page
            .iter()
            .any(|placement| placement.text == "Esito versamento F24"));
    }

    #[test]
    fn sections_follow_the_pass_order_not_the_file_order() {
        let store = store_of(&[
            detail_line('R', "000000001", &[('D', "Primo documento")]),
            summary_line("000001", "000000", "RICEVUTA"),
        ]);
        let canvas = assembled(&store).unwrap();

        assert_eq!(page_of(&canvas, "RICEVUTA"), Some(1));
        assert_eq!(page_of(&canvas, "Primo documento"), Some(2));
        assert_eq!(page_of(&canvas, CLOSING_CAPTION), Some(3));
        assert_eq!(page_of(&canvas, "acquisito"), Some(3));
    }

    #[test]
    fn first_page_rows_are_appended_to_the_opening_page() {
        let store = store_of(&[
            summary_line("000001", "000000", "RICEVUTA"),
            detail_line(
                'R',
                "000000001",
                &[('P', "Annotazione di prima pagina"), ('D', "Corpo")],
            ),
        ]);
        let canvas = assembled(&store).unwrap();

        assert_eq!(canvas.page_number(), 3);
        assert_eq!(page_of(&canvas, "Annotazione di prima pagina"), Some(1));
        // The detail page repeats every row, the first-page ones included.
        let detail_page: Vec<&str> = on_page(&canvas, 2)
            .iter()
            .map(|placement| placement.text.as_str())
            .collect();
        assert!(detail_page.contains(&"Annotazione di prima pagina"));
        assert!(detail_page.contains(&"Corpo"));
    }

    #[test]
    fn heading_rows_in_details_are_fatal() {
        let store = store_of(&[
            summary_line("000001", "000000", "RICEVUTA"),
            detail_line('Q', "000000001", &[('T', "Intestazione")]),
        ]);

        let error = assembled(&store).err().unwrap();
        assert_eq!(error.kind, ErrorKind::Assembly);
        assert!(error.to_string().contains("000000001"));
    }

    #[test]
    fn empty_stores_are_rejected() {
        let error = render_receipt(&RecordStore::new(), &configuration_without_logo())
            .err()
            .unwrap();
        assert_eq!(error.kind, ErrorKind::EmptyInput);
    }

    #[test]
    fn every_page_carries_the_caption_and_its_number() {
        let store = store_of(&[
            summary_line("000000", "000001", "RICEVUTA"),
            detail_line('Q', "000000001", &[('D', "Documento")]),
        ]);
        let document = render_receipt(&store, &configuration_without_logo()).unwrap();
        assert_eq!(document.page_count(), 3);

        let canvas = assembled(&store).unwrap();
        for page_number in 1..=2 {
            let page = on_page(&canvas, page_number);
            assert!(page.iter().any(|placement| {
                placement.text == "SERVIZIO TELEMATICO ENTRATEL DI PRESENTAZIONE DELLE DICHIARAZIONI"
                    && placement.font.font == BuiltinFont::CourierBold
            }));
            assert!(page
                .iter()
                .any(|placement| placement.text == page_number.to_string() && placement.y > 280.0));
        }
    }

    #[test]
    fn document_types_are_labelled_by_supply_code() {
        assert_eq!(document_type_label("I24A0"), Some("Esito versamento F24"));
        assert_eq!(document_type_label("730A0"), None);
    }
}
