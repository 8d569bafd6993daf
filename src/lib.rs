//! da2404 renders DA Form 2404, the equipment inspection and maintenance worksheet, to a PDF
//! document ready to be printed on letter paper.
//!
//! The form is described in the `form` module as a story of tables and paragraphs, which the
//! `template` module paginates and draws onto a `PdfDocument`. The same layout primitives can be
//! used on their own: a story is serializable, so that it can be written to a JSON file, edited
//! and rendered again.

/// Loading the rendering configuration from a JSON file.
///
/// All the fields of `RenderConfiguration` are optional. The defaults produce the plain form with
/// a single supplementary sheet, the document ID printed on it and a creation date set to the Unix
/// epoch, so that rendering twice gives the very same bytes.
pub mod configuration;

/// This module contains the `ContextError` type which is the error type used throughout this library.
///
/// The type doesn't try to enumerate every way in which rendering can fail: it carries a
/// human-readable context and, when the failure was propagated from another library, the message of
/// the original error. It implements `std::fmt::Display` and `Debug`, so it can be explicitly
/// printed out, and it is serializable.
pub mod error;

/// The base-14 Helvetica family, its advance widths and the WinAnsi encoding of the text.
pub mod fonts;

/// The sections of DA Form 2404.
///
/// # Introduction
///
/// Each function of this module returns the tables of one section of the paper form, with its exact
/// wording, column widths, rules and fonts. `story` assembles them into the complete form followed by
/// the configured number of supplementary sheets, and `create_2404` renders the result on a letter
/// page with the margins of the printed form.
pub mod form;

/// Parsing of the inline markup of paragraphs, such as `<b>`, `<i>`, `<font>` and `<br/>`.
pub mod markup;

/// Paragraphs of marked-up text and their greedy line wrapping.
pub mod paragraph;

/// The `PdfDocument` interface for drawing text and rules onto the pages of a PDF document.
///
/// # Introduction
///
/// The main component of this module is the struct `PdfDocument`, a thin layer over `lopdf`. It
/// offers `add_page`, `add_font`, `write_text_to_page`, `draw_line_on_page`, `write_all` and
/// `save_to_bytes`, which let the layout code draw in points without dealing with the PDF object
/// model. The fonts are never embedded: they are referenced by their base-14 name.
///
/// The documents produced here can be further reduced in size by running them through ghostscript,
/// which is what `optimize_pdf_file_with_gs` does. It relies on `gs` being installed, so it is
/// not cross-platform.
pub mod pdf;

/// Tables of text and paragraph cells, styled by commands applied to ranges of cells.
pub mod table;

/// Pagination of a story of flowables into the frame of a page.
pub mod template;

/// Conversions from millimeters to points and the standard page sizes.
pub mod units;
