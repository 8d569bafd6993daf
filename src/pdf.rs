use lopdf::{content::Operation, Object, StringFormat};
use std::{collections::BTreeMap, io::BufWriter, mem, path::Path};
use time::OffsetDateTime;

use crate::{
    configuration::DocumentMetadata,
    error::ContextError,
    fonts::{self, StandardFont},
};

/// An RGB color, each component ranging from 0 to 1.
pub type Color = [f32; 3];

pub const BLACK: Color = [0.0, 0.0, 0.0];

/// The representation of a PDF page: its size and the content operations drawn onto it so far.
#[derive(Debug, Clone)]
pub struct PdfPage {
    /// The number of the page in the document, starting from 1.
    pub(crate) number: usize,
    /// Page width in points.
    pub width: f32,
    /// Page height in points.
    pub height: f32,
    /// The content operations of the page, in drawing order.
    pub(crate) operations: Vec<Operation>,
}

impl PdfPage {
    /// Encodes the operations of the page into a content stream. The stream is left uncompressed
    /// until `PdfDocument::optimize` is called.
    fn content_stream(&self) -> Result<lopdf::Stream, ContextError> {
        let content = lopdf::content::Content {
            operations: self.operations.clone(),
        };
        let encoded_content = content.encode().map_err(|error| {
            ContextError::with_error(
                format!("Failed to encode the content of page {}", self.number),
                &error,
            )
        })?;

        Ok(lopdf::Stream::new(lopdf::Dictionary::new(), encoded_content))
    }
}

/// This struct represents the PDF document on a high level. It is an interface to the underlying
/// `lopdf::Document` with the addition of the pages, the document ID and the fonts used in it.
///
/// Drawing happens through `write_text_to_page` and `draw_line_on_page`, in points and with the
/// origin in the bottom-left corner of the page; `write_all` then assembles the document structure
/// and `save_to_bytes` serializes it.
pub struct PdfDocument {
    /// The association between the fonts used in the document, their object and resource name.
    fonts: BTreeMap<StandardFont, (lopdf::ObjectId, String)>,
    /// The underlying PDF document. This is a low-level interface and shouldn't be interacted with
    /// unless strictly necessary, anyway this is why it is exposed to the user.
    pub inner_document: lopdf::Document,
    /// The identifier of the document, used in order to set the PDF `ID` tag.
    pub identifier: String,
    /// The pages of the PDF document.
    pub(crate) pages: Vec<PdfPage>,
    /// Whether `write_all` has already assembled the document.
    written: bool,
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("PdfDocument")
            .field("identifier", &self.identifier)
            .field("page_count", &self.pages.len())
            .field("fonts", &self.fonts.keys().collect::<Vec<_>>())
            .field("written", &self.written)
            .finish()
    }
}

impl PdfDocument {
    /// Create a new `PdfDocument` defaulting the underlying PDF document to version 1.5
    /// of the PDF specification.
    pub fn new<S: Into<String>>(pdf_document_identifier: S) -> Self {
        PdfDocument {
            fonts: BTreeMap::default(),
            inner_document: lopdf::Document::with_version("1.5"),
            identifier: pdf_document_identifier.into(),
            pages: Vec::new(),
            written: false,
        }
    }

    /// Adds an empty page of the given width and height in points, returning its index.
    pub fn add_page(&mut self, page_width: f32, page_height: f32) -> usize {
        self.pages.push(PdfPage {
            number: self.pages.len() + 1,
            width: page_width,
            height: page_height,
            operations: Vec::new(),
        });
        log::debug!(
            "Added page {} of size {}x{}",
            self.pages.len(),
            page_width,
            page_height
        );

        self.pages.len() - 1
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Registers the font in the document if it wasn't already and returns the name under which
    /// the page resources refer to it.
    pub fn add_font(&mut self, font: StandardFont) -> String {
        if let Some((_, resource_name)) = self.fonts.get(&font) {
            return resource_name.clone();
        }
        let resource_name = format!("F{}", self.fonts.len());
        let font_object_id = self.inner_document.new_object_id();
        self.fonts
            .insert(font, (font_object_id, resource_name.clone()));

        resource_name
    }

    /// Writes the text in the given font, size and color with its baseline starting at the given
    /// position. Empty text produces no operations at all.
    pub fn write_text_to_page(
        &mut self,
        page_index: usize,
        color: Color,
        text: &str,
        font: StandardFont,
        font_size: f32,
        position: [f32; 2],
    ) -> Result<(), ContextError> {
        if text.is_empty() {
            return Ok(());
        }
        let resource_name = self.add_font(font);
        let [x, y] = position;
        let [r, g, b] = color;

        self.add_operations_to_page(
            page_index,
            vec![
                Operation::new("BT", vec![]), // Begin text section
                Operation::new(
                    "Tf",
                    vec![
                        Object::Name(resource_name.into_bytes()),
                        Object::Real(font_size),
                    ],
                ),
                Operation::new("Td", vec![Object::Real(x), Object::Real(y)]),
                Operation::new(
                    "rg",
                    vec![Object::Real(r), Object::Real(g), Object::Real(b)],
                ),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        fonts::encode_win_ansi(text),
                        StringFormat::Literal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ],
        )
    }

    /// Strokes a straight line between the two points. The line is drawn in its own graphics
    /// state so that its width and color don't leak into the following operations.
    pub fn draw_line_on_page(
        &mut self,
        page_index: usize,
        color: Color,
        weight: f32,
        from: [f32; 2],
        to: [f32; 2],
    ) -> Result<(), ContextError> {
        let [r, g, b] = color;
        self.add_operations_to_page(
            page_index,
            vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "RG",
                    vec![Object::Real(r), Object::Real(g), Object::Real(b)],
                ),
                Operation::new("w", vec![Object::Real(weight)]),
                Operation::new("m", vec![Object::Real(from[0]), Object::Real(from[1])]),
                Operation::new("l", vec![Object::Real(to[0]), Object::Real(to[1])]),
                Operation::new("S", vec![]),
                Operation::new("Q", vec![]),
            ],
        )
    }

    /// Assembles the information dictionary, the catalog, the page tree and the font resources,
    /// then sets the trailer. The two halves of the trailer `ID` are the document identifier and
    /// the given instance ID, which keeps the output reproducible.
    pub fn write_all(
        &mut self,
        instance_id: &str,
        metadata: &DocumentMetadata,
    ) -> Result<(), ContextError> {
        use lopdf::Object::*;
        use lopdf::StringFormat::*;

        if self.written {
            return Err(ContextError::with_context(
                "The PDF document has already been written",
            ));
        }
        if self.pages.is_empty() {
            return Err(ContextError::with_context(
                "Unable to write a PDF document without pages",
            ));
        }

        let timestamp = to_pdf_timestamp_format(&metadata.creation_date);
        let literal = |value: &str| String(value.as_bytes().to_vec(), Literal);
        let document_info = lopdf::Dictionary::from_iter(vec![
            ("Trapped", Name("False".into())),
            ("CreationDate", literal(&timestamp)),
            ("ModDate", literal(&timestamp)),
            ("Title", text_string(&metadata.title)),
            ("Author", text_string(&metadata.author)),
            ("Creator", text_string(&metadata.creator)),
            ("Producer", text_string(&metadata.producer)),
            ("Subject", text_string(&metadata.subject)),
            ("Identifier", text_string(&self.identifier)),
            ("Keywords", text_string(&metadata.keywords)),
        ]);
        let document_info_id = self.inner_document.add_object(Dictionary(document_info));

        // Construct the catalog, required by the PDF specification
        let pages_id = self.inner_document.new_object_id();
        let catalog = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("Catalog".into())),
            ("PageLayout", Name("OneColumn".into())),
            ("PageMode", Name("UseNone".into())),
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
                String(instance_id.as_bytes().to_vec(), Literal),
            ]),
        );

        // All the pages share the same font resources
        let fonts_dictionary = self.insert_fonts_into_document();
        let fonts_dictionary_id = self.inner_document.add_object(fonts_dictionary);
        let resources = lopdf::Dictionary::from_iter(vec![
            ("Font", Reference(fonts_dictionary_id)),
            (
                "ProcSet",
                Array(vec![Name("PDF".into()), Name("Text".into())]),
            ),
        ]);
        let resources_id = self.inner_document.add_object(resources);

        let mut page_ids = Vec::<lopdf::Object>::new();
        for page in self.pages.iter() {
            let page_box = || {
                Array(vec![
                    Integer(0),
                    Integer(0),
                    Real(page.width),
                    Real(page.height),
                ])
            };
            let content_id = self.inner_document.add_object(page.content_stream()?);
            let page_dictionary = lopdf::Dictionary::from_iter(vec![
                ("Type", Name("Page".into())),
                ("Rotate", Integer(0)),
                ("MediaBox", page_box()),
                ("TrimBox", page_box()),
                ("CropBox", page_box()),
                ("Parent", Reference(pages_id)),
                ("Resources", Reference(resources_id)),
                ("Contents", Reference(content_id)),
            ]);
            let page_id = self.inner_document.add_object(page_dictionary);
            page_ids.push(Reference(page_id));
        }

        let pages = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("Pages".into())),
            ("Count", Integer(self.pages.len() as i64)),
            ("Kids", Array(page_ids)),
        ]);
        self.inner_document
            .objects
            .insert(pages_id, Dictionary(pages));
        self.written = true;
        log::debug!(
            "Assembled {} pages with {} fonts",
            self.pages.len(),
            self.fonts.len()
        );

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
            ContextError::with_error("Error while saving the PDF document to bytes", &error)
        })?;
        mem::drop(writer);

        Ok(pdf_document_bytes)
    }

    pub fn save_to_file(&mut self, pdf_file_path: &Path) -> Result<(), ContextError> {
        let pdf_document_bytes = self.save_to_bytes()?;
        std::fs::write(pdf_file_path, pdf_document_bytes).map_err(|error| {
            ContextError::with_error(
                format!("Failed to save the PDF document to {:?}", pdf_file_path),
                &error,
            )
        })?;
        log::info!("Saved the PDF document to {:?}", pdf_file_path);

        Ok(())
    }

    /// Converts the fonts into a dictionary and inserts them into the document.
    fn insert_fonts_into_document(&mut self) -> lopdf::Dictionary {
        let mut font_dictionary = lopdf::Dictionary::new();

        for (font, (font_object_id, resource_name)) in self.fonts.iter() {
            let font_object = lopdf::Dictionary::from_iter(vec![
                ("Type", Object::Name("Font".into())),
                ("Subtype", Object::Name("Type1".into())),
                (
                    "BaseFont",
                    Object::Name(font.base_font_name().as_bytes().to_vec()),
                ),
                ("Encoding", Object::Name("WinAnsiEncoding".into())),
            ]);
            self.inner_document
                .objects
                .insert(*font_object_id, Object::Dictionary(font_object));
            font_dictionary.set(resource_name.clone(), Object::Reference(*font_object_id));
        }

        font_dictionary
    }

    /// This function is responsible for adding the given operations to the specified page.
    fn add_operations_to_page(
        &mut self,
        page_index: usize,
        operations: Vec<Operation>,
    ) -> Result<(), ContextError> {
        let pdf_page = self
            .pages
            .get_mut(page_index)
            .ok_or(ContextError::with_context(format!(
                "Failed to find the page with index {}",
                page_index
            )))?;
        pdf_page.operations.extend(operations);

        Ok(())
    }
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

/// This function is used to optimize the PDF file by running ghostscript on it. The command which is run
/// is the following:
///
/// ```bash
/// $ gs -sDEVICE=pdfwrite -dCompatibilityLevel=1.5 -dPDFSETTINGS=/ebook -dNOPAUSE -dQUIET -dBATCH -sOutputFile=output.pdf input.pdf
/// ```
///
/// Ghostscript writes to an intermediate `.swp` file which is then renamed to the original path,
/// since it can't read and write the same file.
pub fn optimize_pdf_file_with_gs(pdf_path: &Path) -> Result<(), ContextError> {
    let mut swap_path = pdf_path.as_os_str().to_owned();
    swap_path.push(".swp");

    let mut output_argument = std::ffi::OsString::from("-sOutputFile=");
    output_argument.push(&swap_path);

    let status = std::process::Command::new("gs")
        .arg("-sDEVICE=pdfwrite")
        .arg("-dCompatibilityLevel=1.5")
        .arg("-dPDFSETTINGS=/ebook")
        .arg("-dNOPAUSE")
        .arg("-dQUIET")
        .arg("-dBATCH")
        .arg(output_argument)
        .arg(pdf_path)
        .status()
        .map_err(|error| ContextError::with_error("Unable to run the gs command", &error))?;
    if !status.success() {
        return Err(ContextError::with_context(format!(
            "gs failed with status {:?}",
            status
        )));
    }
    std::fs::rename(&swap_path, pdf_path).map_err(|error| {
        ContextError::with_error("Unable to rename the optimized PDF file", &error)
    })?;
    log::info!("Optimized {:?} with ghostscript", pdf_path);

    Ok(())
}

/// Encodes a text string of the information dictionary. ASCII is written as a literal string,
/// anything else as UTF-16BE with a byte order mark, since readers decode literal bytes with
/// PDFDocEncoding.
fn text_string(value: &str) -> Object {
    if value.is_ascii() {
        return Object::String(value.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    bytes.extend(value.encode_utf16().flat_map(u16::to_be_bytes));
    Object::String(bytes, StringFormat::Hexadecimal)
}
