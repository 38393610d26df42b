use lopdf::{content::Operation, Object, StringFormat};
use std::{collections::BTreeSet, io::BufWriter, mem, path::Path};
use time::OffsetDateTime;

use crate::error::{ContextError, ErrorKind};

/// Converts millimeters to points. This function is used in order to present the data
/// in the format required by the PDF specification, while the layout is expressed in
/// millimeters which are easier to reason about.
pub fn millimeters_to_points(millimeters: f32) -> f32 {
    millimeters * 2.834646
}

/// Converts points to millimeters, the inverse of `millimeters_to_points`.
pub fn points_to_millimeters(points: f32) -> f32 {
    points / 2.834646
}

/// The fonts of the PDF base-14 set which are used by the receipt. They need no embedding
/// since every PDF reader ships them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BuiltinFont {
    Courier,
    CourierBold,
}

impl BuiltinFont {
    /// The PostScript name of the font, as expected by the `BaseFont` key.
    pub fn base_font(&self) -> &'static str {
        match self {
            BuiltinFont::Courier => "Courier",
            BuiltinFont::CourierBold => "Courier-Bold",
        }
    }

    /// The advance width of a glyph in thousandths of the font size. Both fonts are monospaced.
    pub fn glyph_width(&self, _character: char) -> f32 {
        600.0
    }

    /// The width in millimeters of the given text when written with this font at the given size.
    pub fn text_width(&self, text: &str, font_size: f32) -> f32 {
        let units: f32 = text
            .chars()
            .map(|character| self.glyph_width(character))
            .sum();
        points_to_millimeters(units * font_size / 1000.0)
    }

    /// Constructs the font dictionary to be inserted into the PDF document.
    fn to_dictionary(self) -> lopdf::Dictionary {
        use lopdf::Object::*;
        lopdf::Dictionary::from_iter(vec![
            ("Type", Name("Font".into())),
            ("Subtype", Name("Type1".into())),
            ("BaseFont", Name(self.base_font().into())),
            ("Encoding", Name("WinAnsiEncoding".into())),
        ])
    }
}

/// Encodes the text for a simple font with the `WinAnsiEncoding`. Latin-1 characters are kept
/// as they are, anything else is replaced by a question mark.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|character| match u32::from(character) {
            code @ (0x20..=0x7E | 0xA0..=0xFF) => code as u8,
            _ => {
                log::warn!(
                    "The character {:?} cannot be written with the built-in fonts, replacing it",
                    character
                );
                b'?'
            }
        })
        .collect()
}

/// The low-level image representation for a PDF document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageXObject {
    /// Width of the image in pixels.
    pub width: u32,
    /// Height of the image in pixels.
    pub height: u32,
    /// The RGB samples of the image, 8 bits per component.
    pub rgb_data: Vec<u8>,
    /// The alpha channel of the image, `None` if the image is fully opaque.
    pub alpha_data: Option<Vec<u8>>,
}

impl ImageXObject {
    /// Loads and decodes an image (in our case a PNG) from the given path.
    pub fn from_path(image_path: &Path) -> Result<Self, ContextError> {
        let image = image::open(image_path).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Render,
                format!("Failed to load the image {:?}", image_path),
                &error,
            )
        })?;

        Ok(Self::from_dynamic_image(&image))
    }

    /// Splits the decoded image into the color samples and the soft mask expected by the PDF format.
    pub fn from_dynamic_image(image: &image::DynamicImage) -> Self {
        let rgba_image = image.to_rgba8();
        let (width, height) = rgba_image.dimensions();

        let mut rgb_data = Vec::with_capacity((width * height * 3) as usize);
        let mut alpha_data = Vec::with_capacity((width * height) as usize);
        for pixel in rgba_image.pixels() {
            rgb_data.extend_from_slice(&pixel.0[..3]);
            alpha_data.push(pixel.0[3]);
        }
        let is_opaque = alpha_data.iter().all(|&alpha| alpha == u8::MAX);

        ImageXObject {
            width,
            height,
            rgb_data,
            alpha_data: if is_opaque { None } else { Some(alpha_data) },
        }
    }

    /// Inserts the image (and its soft mask, if any) into the document, returning the object ID of the image.
    fn insert_into_document(&self, inner_document: &mut lopdf::Document) -> lopdf::ObjectId {
        use lopdf::Object::*;

        let image_dictionary = |color_space: &str| {
            lopdf::Dictionary::from_iter(vec![
                ("Type", Name("XObject".into())),
                ("Subtype", Name("Image".into())),
                ("Width", Integer(i64::from(self.width))),
                ("Height", Integer(i64::from(self.height))),
                ("ColorSpace", Name(color_space.into())),
                ("BitsPerComponent", Integer(8)),
            ])
        };

        let mut dictionary = image_dictionary("DeviceRGB");
        if let Some(alpha_data) = &self.alpha_data {
            let soft_mask = lopdf::Stream::new(image_dictionary("DeviceGray"), alpha_data.clone());
            dictionary.set("SMask", Reference(inner_document.add_object(soft_mask)));
        }

        inner_document.add_object(lopdf::Stream::new(dictionary, self.rgb_data.clone()))
    }
}

/// The representation of a PDF page: its size and the content operations drawn on it.
#[derive(Debug, Clone)]
pub struct PdfPage {
    /// The number of the page in the document, starting from 1.
    pub(crate) number: usize,
    /// Page width in points.
    pub width: f32,
    /// Page height in points.
    pub height: f32,
    /// The content stream operations of the page.
    pub(crate) operations: Vec<Operation>,
    /// The indices of the images drawn on the page.
    pub(crate) images: BTreeSet<usize>,
}

/// This struct represents the actual PDF document on a high-level. It is an interface to the actual underlying
/// `lopdf::Document` with the addition of the PDF pages, the document ID, the fonts and the images used in the document.
///
/// Positions are expressed in millimeters from the bottom-left corner of the page, as in the PDF format.
pub struct PdfDocument {
    fonts: Vec<BuiltinFont>,
    images: Vec<ImageXObject>,
    /// The underlying PDF document: this is a low-level interface and shouldn't be directly interacted with
    /// unless strictly necessary.
    pub inner_document: lopdf::Document,
    /// The identifier of the document, it is used to in order to set the PDF `ID` tag.
    pub identifier: String,
    /// The date written in the document information dictionary.
    pub creation_date: OffsetDateTime,
    pub(crate) pages: Vec<PdfPage>,
}

impl PdfDocument {
    /// Create a new `PdfDocument` by defaulting the underlying PDF document to version 1.5
    /// of the PDF specification and customly specifying the PDF identifier.
    pub fn new(pdf_document_identifier: String) -> Self {
        PdfDocument {
            fonts: Vec::new(),
            images: Vec::new(),
            inner_document: lopdf::Document::with_version("1.5"),
            identifier: pdf_document_identifier,
            creation_date: OffsetDateTime::UNIX_EPOCH,
            pages: Vec::new(),
        }
    }

    /// Adds a page of given width and height in millimeters, returning the index of the page.
    pub fn add_page(&mut self, page_width: f32, page_height: f32) -> usize {
        self.pages.push(PdfPage {
            number: self.pages.len() + 1,
            width: millimeters_to_points(page_width),
            height: millimeters_to_points(page_height),
            operations: Vec::new(),
            images: BTreeSet::new(),
        });

        self.pages.len() - 1
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Registers a built-in font, returning its index. Registering the same font twice returns the same index.
    pub fn add_font(&mut self, font: BuiltinFont) -> usize {
        match self.fonts.iter().position(|registered| *registered == font) {
            Some(font_index) => font_index,
            None => {
                self.fonts.push(font);
                self.fonts.len() - 1
            }
        }
    }

    /// Registers an image, returning its index to be used with `place_image_in_page`.
    pub fn add_image(&mut self, image: ImageXObject) -> usize {
        self.images.push(image);
        self.images.len() - 1
    }

    /// Writes the text with the given font at the caret position (the baseline, in millimeters) of the page.
    pub fn write_text_to_page(
        &mut self,
        page_index: usize,
        text: &str,
        font_index: usize,
        font_size: f32,
        caret_position: [f32; 2],
    ) -> Result<(), ContextError> {
        if font_index >= self.fonts.len() {
            return Err(ContextError::with_context(
                ErrorKind::Render,
                format!("Failed to find the font {}", font_index),
            ));
        }
        let [x, y] = caret_position;

        self.add_operations_to_page(
            page_index,
            vec![
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![
                        Object::Name(font_resource_name(font_index).into_bytes()),
                        Object::Real(font_size),
                    ],
                ),
                Operation::new(
                    "Td",
                    vec![
                        Object::Real(millimeters_to_points(x)),
                        Object::Real(millimeters_to_points(y)),
                    ],
                ),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        encode_win_ansi(text),
                        StringFormat::Hexadecimal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ],
        )
    }

    /// Draws a registered image with its bottom-left corner at the given position, scaled to the given size.
    pub fn place_image_in_page(
        &mut self,
        page_index: usize,
        image_index: usize,
        position: [f32; 2],
        size: [f32; 2],
    ) -> Result<(), ContextError> {
        if image_index >= self.images.len() {
            return Err(ContextError::with_context(
                ErrorKind::Render,
                format!("Failed to find the image {}", image_index),
            ));
        }
        let [x, y] = position;
        let [width, height] = size;

        self.add_operations_to_page(
            page_index,
            vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(millimeters_to_points(width)),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(millimeters_to_points(height)),
                        Object::Real(millimeters_to_points(x)),
                        Object::Real(millimeters_to_points(y)),
                    ],
                ),
                Operation::new(
                    "Do",
                    vec![Object::Name(image_resource_name(image_index).into_bytes())],
                ),
                Operation::new("Q", vec![]),
            ],
        )?;
        self.get_mut_page(page_index)?.images.insert(image_index);

        Ok(())
    }

    /// Write the operations so far specified to the underlying PDF document and finalize it.
    /// The instance ID is the second element of the PDF `ID` array.
    pub fn write_all(&mut self, instance_id: String) -> Result<(), ContextError> {
        use lopdf::Object::*;
        use lopdf::StringFormat::*;

        let timestamp = to_pdf_timestamp_format(&self.creation_date);
        let document_info = lopdf::Dictionary::from_iter(vec![
            ("Trapped", "False".into()),
            ("CreationDate", String(timestamp.clone().into_bytes(), Literal)),
            ("ModDate", String(timestamp.into_bytes(), Literal)),
            (
                "Title",
                String(
                    "Comunicazione di avvenuto ricevimento".to_string().into_bytes(),
                    Literal,
                ),
            ),
            (
                "Creator",
                String(env!("CARGO_PKG_NAME").to_string().into_bytes(), Literal),
            ),
            (
                "Producer",
                String(env!("CARGO_PKG_NAME").to_string().into_bytes(), Literal),
            ),
            (
                "Identifier",
                String(self.identifier.clone().into_bytes(), Literal),
            ),
        ]);
        let document_info_id = self.inner_document.add_object(Dictionary(document_info));

        // Construct the catalog, required by the PDF specification
        let pages_id = self.inner_document.new_object_id();
        let catalog = lopdf::Dictionary::from_iter(vec![
            ("Type", "Catalog".into()),
            ("PageLayout", "OneColumn".into()),
            ("PageMode", "UseNone".into()),
            ("Pages", Reference(pages_id)),
        ]);
        let catalog_id = self.inner_document.add_object(catalog);

        self.inner_document
            .trailer
            .set("Root", Reference(catalog_id));
        self.inner_document
            .trailer
            .set("Info", Reference(document_info_id));
        self.inner_document.trailer.set(
            "ID",
            Array(vec![
                String(self.identifier.clone().into_bytes(), Literal),
                String(instance_id.into_bytes(), Literal),
            ]),
        );

        let fonts_dictionary = self.insert_fonts_into_document();
        let fonts_dictionary_id = self.inner_document.add_object(fonts_dictionary);
        let image_ids: Vec<lopdf::ObjectId> = self
            .images
            .iter()
            .map(|image| image.insert_into_document(&mut self.inner_document))
            .collect();

        let mut page_ids = Vec::<lopdf::Object>::new();
        for page in self.pages.iter() {
            let mut resource_dictionary =
                lopdf::Dictionary::from_iter(vec![("Font", Reference(fonts_dictionary_id))]);
            if !page.images.is_empty() {
                let xobjects_dictionary: lopdf::Dictionary = page
                    .images
                    .iter()
                    .map(|&image_index| {
                        (
                            image_resource_name(image_index),
                            Reference(image_ids[image_index]),
                        )
                    })
                    .collect();
                resource_dictionary.set("XObject", Dictionary(xobjects_dictionary));
            }

            let page_content = lopdf::content::Content {
                operations: page.operations.clone(),
            }
            .encode()
            .map_err(|error| {
                ContextError::with_error(
                    ErrorKind::Render,
                    format!("Failed to encode the content of the page {}", page.number),
                    &error,
                )
            })?;
            let page_content_id = self
                .inner_document
                .add_object(lopdf::Stream::new(lopdf::Dictionary::new(), page_content));

            let media_box = vec![
                Integer(0),
                Integer(0),
                Real(page.width),
                Real(page.height),
            ];
            let page_dictionary = lopdf::Dictionary::from_iter(vec![
                ("Type", "Page".into()),
                ("Rotate", Integer(0)),
                ("MediaBox", Array(media_box.clone())),
                ("CropBox", Array(media_box)),
                ("Parent", Reference(pages_id)),
                ("Resources", Dictionary(resource_dictionary)),
                ("Contents", Reference(page_content_id)),
            ]);
            page_ids.push(Reference(self.inner_document.add_object(page_dictionary)));
        }

        let pages = lopdf::Dictionary::from_iter(vec![
            ("Type", "Pages".into()),
            ("Count", Integer(self.pages.len() as i64)),
            ("Kids", Array(page_ids)),
        ]);
        self.inner_document
            .objects
            .insert(pages_id, Dictionary(pages));

        Ok(())
    }

    /// Optimize the PDF document (only superficially).
    pub fn optimize(&mut self) {
        self.inner_document.prune_objects();
        self.inner_document.delete_zero_length_streams();
        self.inner_document.renumber_objects();
        self.inner_document.compress();
    }

    /// Save the `PdfDocument` to bytes in order for it to be written to a file or further processed.
    pub fn save_to_bytes(&mut self) -> Result<Vec<u8>, ContextError> {
        let mut pdf_document_bytes = Vec::new();
        let mut writer = BufWriter::new(&mut pdf_document_bytes);
        self.inner_document.save_to(&mut writer).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Render,
                "Error while saving the PDF document to bytes",
                &error,
            )
        })?;
        mem::drop(writer);

        Ok(pdf_document_bytes)
    }

    /// Converts the fonts into a dictionary and inserts them into the document.
    fn insert_fonts_into_document(&mut self) -> lopdf::Dictionary {
        let mut font_dictionary = lopdf::Dictionary::new();

        for (font_index, font) in self.fonts.iter().enumerate() {
            let font_id = self.inner_document.add_object(font.to_dictionary());
            font_dictionary.set(font_resource_name(font_index), Object::Reference(font_id));
        }
        font_dictionary
    }

    fn add_operations_to_page(
        &mut self,
        page_index: usize,
        operations: Vec<Operation>,
    ) -> Result<(), ContextError> {
        self.get_mut_page(page_index)?.operations.extend(operations);

        Ok(())
    }

    fn get_mut_page(&mut self, page_index: usize) -> Result<&mut PdfPage, ContextError> {
        self.pages.get_mut(page_index).ok_or_else(|| {
            ContextError::with_context(
                ErrorKind::Render,
                format!("Failed to find the page with index {}", page_index),
            )
        })
    }
}

fn font_resource_name(font_index: usize) -> String {
    format!("F{font_index}")
}

fn image_resource_name(image_index: usize) -> String {
    format!("Im{image_index}")
}

/// Formats the given time so that it matches what the PDF specification expects.
/// An example of it is the following: D:20170505150224+02'00'.
fn to_pdf_timestamp_format(date: &OffsetDateTime) -> String {
    let offset = date.offset();
    let offset_sign = if offset.is_negative() { '-' } else { '+' };
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}{offset_sign}{:02}'{:02}'",
        date.year(),
        u8::from(date.month()),
        date.day(),
        date.hour(),
        date.minute(),
        date.second(),
        offset.whole_hours().abs(),
        offset.minutes_past_hour().abs(),
    )
}
