use std::{mem, rc::Rc};

use crate::{
    error::{ContextError, ErrorKind},
    pdf::{points_to_millimeters, BuiltinFont, ImageXObject, PdfDocument},
};

/// Width of an A4 page in millimeters.
pub const A4_WIDTH: f32 = 210.0;
/// Height of an A4 page in millimeters.
pub const A4_HEIGHT: f32 = 297.0;

/// The resolution at which images are drawn when no explicit size is given.
const IMAGE_DOTS_PER_INCH: f32 = 96.0;

/// Horizontal alignment of a text inside its cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
}

/// Where the caret is moved after a cell has been written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaretMove {
    /// To the right of the cell, on the same line.
    Right,
    /// To the beginning of the next line.
    NextLine,
    /// Below the cell, keeping its horizontal position.
    Below,
}

/// Margins of the page in millimeters. The bottom margin is the distance from the bottom edge
/// at which a new page is automatically started.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

/// The font used for the next cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSelection {
    pub font: BuiltinFont,
    /// The size of the font in points.
    pub size: f32,
}

/// A text written on the canvas, recorded with its position. Coordinates are in millimeters
/// from the top-left corner of the page, `y` being the baseline of the text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextPlacement {
    /// The number of the page, starting from 1.
    pub page_number: usize,
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub cell_x: f32,
    pub cell_width: f32,
    pub alignment: Alignment,
    pub font: FontSelection,
}

impl TextPlacement {
    /// The horizontal position where the text ends.
    pub fn end_x(&self) -> f32 {
        self.x + self.font.font.text_width(&self.text, self.font.size)
    }
}

/// What is drawn at the top and at the bottom of every page.
pub trait PageDecorations {
    fn header(&self, canvas: &mut Canvas) -> Result<(), ContextError>;
    fn footer(&self, canvas: &mut Canvas) -> Result<(), ContextError>;
}

/// A cursor-based drawing surface on top of a `PdfDocument`: text is written in cells placed
/// one after the other starting from the caret, pages are started explicitly or when the caret
/// reaches the bottom margin, and the page decorations are drawn on every page.
pub struct Canvas {
    document: PdfDocument,
    page_width: f32,
    page_height: f32,
    margins: Margins,
    /// The horizontal padding between the border of a cell and its text.
    cell_margin: f32,
    /// The position of the caret in millimeters from the top-left corner.
    caret: [f32; 2],
    /// The height of the last written cell, used by `ln` when no height is given.
    last_height: f32,
    current_page: Option<usize>,
    font: FontSelection,
    image_sizes: Vec<(u32, u32)>,
    decorations: Option<Rc<dyn PageDecorations>>,
    in_decoration: bool,
    journal: Vec<TextPlacement>,
}

impl Canvas {
    /// Creates an empty A4 portrait canvas with 10 mm margins and automatic page breaks 20 mm above the bottom edge.
    pub fn new(identifier: String) -> Self {
        Canvas {
            document: PdfDocument::new(identifier),
            page_width: A4_WIDTH,
            page_height: A4_HEIGHT,
            margins: Margins {
                top: 10.0,
                right: 10.0,
                bottom: 20.0,
                left: 10.0,
            },
            cell_margin: 1.0,
            caret: [10.0, 10.0],
            last_height: 0.0,
            current_page: None,
            font: FontSelection {
                font: BuiltinFont::Courier,
                size: 12.0,
            },
            image_sizes: Vec::new(),
            decorations: None,
            in_decoration: false,
            journal: Vec::new(),
        }
    }

    pub fn set_decorations(&mut self, decorations: Rc<dyn PageDecorations>) {
        self.decorations = Some(decorations);
    }

    pub fn document_mut(&mut self) -> &mut PdfDocument {
        &mut self.document
    }

    pub fn set_font(&mut self, font: BuiltinFont, size: f32) {
        self.font = FontSelection { font, size };
    }

    pub fn font(&self) -> FontSelection {
        self.font
    }

    pub fn page_width(&self) -> f32 {
        self.page_width
    }

    pub fn page_height(&self) -> f32 {
        self.page_height
    }

    /// The number of the current page, 0 if no page has been started yet.
    pub fn page_number(&self) -> usize {
        self.document.page_count()
    }

    pub fn has_page(&self) -> bool {
        self.current_page.is_some()
    }

    pub fn x(&self) -> f32 {
        self.caret[0]
    }

    pub fn y(&self) -> f32 {
        self.caret[1]
    }

    pub fn set_x(&mut self, x: f32) {
        self.caret[0] = if x < 0.0 { self.page_width + x } else { x };
    }

    /// Moves the caret to the given vertical position (measured from the bottom if negative)
    /// and back to the left margin.
    pub fn set_y(&mut self, y: f32) {
        self.caret[0] = self.margins.left;
        self.caret[1] = if y < 0.0 { self.page_height + y } else { y };
    }

    /// Every text written so far, in order.
    pub fn text_placements(&self) -> &[TextPlacement] {
        &self.journal
    }

    /// Registers an image, returning the index to be passed to `image`.
    pub fn register_image(&mut self, image: ImageXObject) -> usize {
        self.image_sizes.push((image.width, image.height));
        self.document.add_image(image)
    }

    /// Closes the current page (drawing its footer) and starts a new one (drawing its header).
    /// The font in use is preserved across the decorations.
    pub fn add_page(&mut self) -> Result<(), ContextError> {
        let font = self.font;
        if self.current_page.is_some() {
            self.decorate(|decorations, canvas| decorations.footer(canvas))?;
            self.font = font;
        }

        let page_index = self.document.add_page(self.page_width, self.page_height);
        self.current_page = Some(page_index);
        self.caret = [self.margins.left, self.margins.top];
        self.last_height = 0.0;
        log::trace!("Started the page {}", page_index + 1);

        self.decorate(|decorations, canvas| decorations.header(canvas))?;
        self.font = font;

        Ok(())
    }

    /// Performs a line break: the caret goes back to the left margin and down by the given
    /// height, or by the height of the last cell if none is given.
    pub fn ln(&mut self, height: Option<f32>) {
        self.caret[0] = self.margins.left;
        self.caret[1] += height.unwrap_or(self.last_height);
    }

    /// Writes a single-line cell at the caret. A width of zero extends the cell to the right margin.
    /// If the cell does not fit above the bottom margin a new page is started first.
    pub fn cell(
        &mut self,
        width: f32,
        height: f32,
        text: &str,
        alignment: Alignment,
        caret_move: CaretMove,
    ) -> Result<(), ContextError> {
        let mut page_index = self.require_page()?;
        if !self.in_decoration && self.caret[1] + height > self.page_height - self.margins.bottom {
            let x = self.caret[0];
            self.add_page()?;
            self.caret[0] = x;
            page_index = self.require_page()?;
        }

        let width = self.cell_width(width);
        let [cell_x, cell_y] = self.caret;

        if !text.is_empty() {
            let text_width = self.font.font.text_width(text, self.font.size);
            let x = match alignment {
                Alignment::Left => cell_x + self.cell_margin,
                Alignment::Center => cell_x + (width - text_width) / 2.0,
                Alignment::Right => cell_x + width - self.cell_margin - text_width,
            };
            let baseline = cell_y + 0.5 * height + 0.3 * points_to_millimeters(self.font.size);

            let font_index = self.document.add_font(self.font.font);
            self.document.write_text_to_page(
                page_index,
                text,
                font_index,
                self.font.size,
                [x, self.page_height - baseline],
            )?;
            self.journal.push(TextPlacement {
                page_number: page_index + 1,
                text: text.to_string(),
                x,
                y: baseline,
                cell_x,
                cell_width: width,
                alignment,
                font: self.font,
            });
        }

        self.last_height = height;
        match caret_move {
            CaretMove::Right => self.caret[0] += width,
            CaretMove::NextLine => {
                self.caret[0] = self.margins.left;
                self.caret[1] += height;
            }
            CaretMove::Below => self.caret[1] += height,
        }

        Ok(())
    }

    /// Writes a text over as many lines as needed, breaking at the newlines and wrapping the
    /// words that do not fit the width. The caret ends at the left margin below the last line.
    pub fn multi_cell(
        &mut self,
        width: f32,
        height: f32,
        text: &str,
        alignment: Alignment,
    ) -> Result<(), ContextError> {
        let width = self.cell_width(width);
        let start_x = self.caret[0];
        let available_width = width - 2.0 * self.cell_margin;

        for paragraph in text.split('\n') {
            for line in self.wrap_text(paragraph, available_width) {
                self.caret[0] = start_x;
                self.cell(width, height, &line, alignment, CaretMove::Below)?;
            }
        }
        self.caret[0] = self.margins.left;

        Ok(())
    }

    /// Draws a registered image with its top-left corner at the given position. When both
    /// sizes are zero the image is drawn at 96 dpi, when only one is zero the aspect ratio is kept.
    pub fn image(
        &mut self,
        image_index: usize,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Result<(), ContextError> {
        let page_index = self.require_page()?;
        let (pixel_width, pixel_height) =
            *self.image_sizes.get(image_index).ok_or_else(|| {
                ContextError::with_context(
                    ErrorKind::Render,
                    format!("Failed to find the image {}", image_index),
                )
            })?;
        let (pixel_width, pixel_height) = (pixel_width as f32, pixel_height as f32);

        let (width, height) = match (width > 0.0, height > 0.0) {
            (true, true) => (width, height),
            (true, false) => (width, width * pixel_height / pixel_width),
            (false, true) => (height * pixel_width / pixel_height, height),
            (false, false) => (
                pixel_width * 25.4 / IMAGE_DOTS_PER_INCH,
                pixel_height * 25.4 / IMAGE_DOTS_PER_INCH,
            ),
        };

        self.document.place_image_in_page(
            page_index,
            image_index,
            [x, self.page_height - y - height],
            [width, height],
        )
    }

    /// Draws the footer of the last page and finalizes the underlying PDF document.
    pub fn finish(mut self, instance_id: String) -> Result<PdfDocument, ContextError> {
        if self.current_page.is_some() {
            self.decorate(|decorations, canvas| decorations.footer(canvas))?;
        }
        self.document.write_all(instance_id)?;

        Ok(self.document)
    }

    fn cell_width(&self, width: f32) -> f32 {
        if width == 0.0 {
            self.page_width - self.margins.right - self.caret[0]
        } else {
            width
        }
    }

    fn require_page(&self) -> Result<usize, ContextError> {
        self.current_page.ok_or_else(|| {
            ContextError::with_context(
                ErrorKind::Render,
                "No page has been started, unable to draw",
            )
        })
    }

    fn decorate<F>(&mut self, draw: F) -> Result<(), ContextError>
    where
        F: FnOnce(&dyn PageDecorations, &mut Canvas) -> Result<(), ContextError>,
    {
        let Some(decorations) = self.decorations.clone() else {
            return Ok(());
        };

        self.in_decoration = true;
        let result = draw(decorations.as_ref(), self);
        self.in_decoration = false;

        result
    }

    fn wrap_text(&self, text: &str, available_width: f32) -> Vec<String> {
        let fits = |candidate: &str| {
            self.font.font.text_width(candidate, self.font.size) <= available_width
        };
        let mut lines = Vec::new();
        let mut current_line = String::new();

        for word in text.split_whitespace() {
            let candidate = if current_line.is_empty() {
                word.to_string()
            } else {
                format!("{current_line} {word}")
            };
            if fits(&candidate) {
                current_line = candidate;
                continue;
            }
            if !current_line.is_empty() {
                lines.push(mem::take(&mut current_line));
            }

            // The word alone is too wide, it is broken wherever the width is exceeded
            for character in word.chars() {
                current_line.push(character);
                if !fits(&current_line) && current_line.chars().count() > 1 {
                    current_line.pop();
                    lines.push(mem::take(&mut current_line));
                    current_line.push(character);
                }
            }
        }

        if !current_line.is_empty() || lines.is_empty() {
            lines.push(current_line);
        }
        lines
    }
}
