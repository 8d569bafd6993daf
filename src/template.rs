use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{
    configuration::RenderConfiguration,
    error::ContextError,
    paragraph::{Paragraph, ParagraphLayout},
    pdf::PdfDocument,
    table::{Table, TableLayout},
    units::{mm, LETTER},
};

/// Space kept free between the margins and the flowables, on each side of the frame.
pub const FRAME_PADDING: f32 = 6.0;

const FIT_TOLERANCE: f32 = 1e-3;

/// A block of content placed top-down in the frame of a page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Flowable {
    /// Centered horizontally in the frame.
    Table(Table),
    /// Wrapped to the full width of the frame.
    Paragraph(Paragraph),
    Spacer { height: f32 },
    /// Moves the following flowables to a new page.
    PageBreak,
}

/// The sequence of flowables making up a document.
pub type Story = Vec<Flowable>;

impl From<Table> for Flowable {
    fn from(table: Table) -> Self {
        Flowable::Table(table)
    }
}

impl From<Paragraph> for Flowable {
    fn from(paragraph: Paragraph) -> Self {
        Flowable::Paragraph(paragraph)
    }
}

/// Serializes the story to pretty JSON indented by four spaces.
pub fn story_to_json(story: &Story) -> Result<Vec<u8>, ContextError> {
    let mut content_buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut content_buffer, formatter);
    story
        .serialize(&mut serializer)
        .map_err(|error| ContextError::with_error("Failed to serialize the story", &error))?;

    Ok(content_buffer)
}

pub fn read_story(story_path: &Path) -> Result<Story, ContextError> {
    let story_contents = std::fs::read(story_path).map_err(|error| {
        ContextError::with_error(format!("Failed to read the story {:?}", story_path), &error)
    })?;
    serde_json::from_slice(&story_contents).map_err(|error| {
        ContextError::with_error(format!("Failed to parse the story {:?}", story_path), &error)
    })
}

pub fn write_story(story: &Story, story_path: &Path) -> Result<(), ContextError> {
    std::fs::write(story_path, story_to_json(story)?).map_err(|error| {
        ContextError::with_error(format!("Failed to write the story {:?}", story_path), &error)
    })?;
    log::info!("Saved the story to {:?}", story_path);

    Ok(())
}

/// A flowable once laid out for the width of the frame.
enum Placed {
    Table(TableLayout),
    Paragraph(ParagraphLayout),
    Spacer(f32),
}

impl Placed {
    fn height(&self) -> f32 {
        match self {
            Placed::Table(layout) => layout.height(),
            Placed::Paragraph(layout) => layout.height(),
            Placed::Spacer(height) => *height,
        }
    }
}

/// A page layout with a single frame inside the margins, all the measures being in points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DocTemplate {
    pub page_size: [f32; 2],
    pub left_margin: f32,
    pub right_margin: f32,
    pub top_margin: f32,
    pub bottom_margin: f32,
}

impl DocTemplate {
    /// A template with one inch margins on every side.
    pub fn new(page_size: [f32; 2]) -> Self {
        DocTemplate {
            page_size,
            left_margin: 72.0,
            right_margin: 72.0,
            top_margin: 72.0,
            bottom_margin: 72.0,
        }
    }

    /// The letter page the form is printed on: 10mm margins, the bottom one being 4mm narrower.
    pub fn letter_form() -> Self {
        let margin = mm(10.0);
        DocTemplate {
            page_size: LETTER,
            left_margin: margin,
            right_margin: margin,
            top_margin: margin,
            bottom_margin: margin - mm(4.0),
        }
    }

    /// The width available to the flowables.
    pub fn frame_width(&self) -> f32 {
        self.page_size[0] - self.left_margin - self.right_margin - 2.0 * FRAME_PADDING
    }

    /// The height available to the flowables of a single page.
    pub fn frame_height(&self) -> f32 {
        self.page_size[1] - self.top_margin - self.bottom_margin - 2.0 * FRAME_PADDING
    }

    /// Lays out the story page after page and returns the assembled PDF document. A flowable that
    /// doesn't fit in what is left of the page moves to the next one as a whole.
    pub fn build(
        &self,
        story: &[Flowable],
        configuration: &RenderConfiguration,
    ) -> Result<PdfDocument, ContextError> {
        let [page_width, page_height] = self.page_size;
        let frame_left = self.left_margin + FRAME_PADDING;
        let frame_top = page_height - self.top_margin - FRAME_PADDING;
        let frame_bottom = self.bottom_margin + FRAME_PADDING;
        let frame_width = self.frame_width();
        if frame_width <= 0.0 || frame_top <= frame_bottom {
            return Err(ContextError::with_context(format!(
                "The margins leave no room for the frame on a {}x{} page",
                page_width, page_height
            )));
        }

        let mut pdf_document = PdfDocument::new(configuration.document_id.clone());
        let mut page_index = pdf_document.add_page(page_width, page_height);
        let mut cursor = frame_top;
        let mut page_is_empty = true;

        for (flowable_index, flowable) in story.iter().enumerate() {
            let placed = match flowable {
                Flowable::PageBreak => {
                    if !page_is_empty {
                        page_index = pdf_document.add_page(page_width, page_height);
                        cursor = frame_top;
                        page_is_empty = true;
                    }
                    continue;
                }
                Flowable::Table(table) => Placed::Table(table.layout(frame_width).map_err(
                    |error| {
                        ContextError::with_error(
                            format!("Failed to lay out the table at position {}", flowable_index),
                            &error,
                        )
                    },
                )?),
                Flowable::Paragraph(paragraph) => {
                    Placed::Paragraph(paragraph.layout(frame_width).map_err(|error| {
                        ContextError::with_error(
                            format!(
                                "Failed to lay out the paragraph at position {}",
                                flowable_index
                            ),
                            &error,
                        )
                    })?)
                }
                Flowable::Spacer { height } => Placed::Spacer(*height),
            };

            let height = placed.height();
            if height > frame_top - frame_bottom + FIT_TOLERANCE {
                return Err(ContextError::with_context(format!(
                    "The flowable at position {} is {:.2} points tall but the frame is only {:.2} points tall",
                    flowable_index,
                    height,
                    frame_top - frame_bottom
                )));
            }
            if cursor - height < frame_bottom - FIT_TOLERANCE && !page_is_empty {
                log::debug!(
                    "The flowable at position {} doesn't fit on page {}, moving it to the next one",
                    flowable_index,
                    page_index + 1
                );
                page_index = pdf_document.add_page(page_width, page_height);
                cursor = frame_top;
            }

            match &placed {
                Placed::Table(layout) => {
                    let x = frame_left + (frame_width - layout.width()) / 2.0;
                    layout.draw(&mut pdf_document, page_index, x, cursor)?;
                }
                Placed::Paragraph(layout) => {
                    layout.draw(&mut pdf_document, page_index, frame_left, cursor)?;
                }
                Placed::Spacer(_) => {}
            }
            cursor -= height;
            page_is_empty = false;
        }

        log::info!(
            "Laid out {} flowables on {} pages",
            story.len(),
            pdf_document.page_count()
        );
        pdf_document.write_all(configuration.instance_id(), &configuration.metadata)?;
        if configuration.compress {
            pdf_document.optimize();
        }

        Ok(pdf_document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paragraph::ParagraphStyle;

    fn block(height: f32) -> Flowable {
        Table::new(vec![vec!["".into()]])
            .with_row_heights(vec![height])
            .into()
    }

    fn small_template() -> DocTemplate {
        DocTemplate {
            page_size: [200.0, 200.0],
            left_margin: 10.0,
            right_margin: 10.0,
            top_margin: 10.0,
            bottom_margin: 10.0,
        }
    }

    #[test]
    fn letter_form_frame_matches_the_printed_form() {
        let template = DocTemplate::letter_form();
        assert!((template.frame_width() - 543.307).abs() < 1e-2);
        assert!((template.frame_height() - 734.646).abs() < 1e-2);
    }

    #[test]
    fn moves_whole_flowables_to_the_next_page() {
        let template = small_template();
        // The frame is 200 - 2 * 10 - 2 * 6 = 168 points tall
        let story = vec![block(100.0), block(60.0), block(10.0)];
        let pdf_document = template
            .build(&story, &RenderConfiguration::default())
            .unwrap();
        assert_eq!(pdf_document.page_count(), 2);
    }

    #[test]
    fn page_breaks_on_empty_pages_are_ignored() {
        let template = small_template();
        let story = vec![
            Flowable::PageBreak,
            block(10.0),
            Flowable::PageBreak,
            Flowable::PageBreak,
            block(10.0),
        ];
        let pdf_document = template
            .build(&story, &RenderConfiguration::default())
            .unwrap();
        assert_eq!(pdf_document.page_count(), 2);
    }

    #[test]
    fn empty_stories_still_produce_a_page() {
        let pdf_document = small_template()
            .build(&[], &RenderConfiguration::default())
            .unwrap();
        assert_eq!(pdf_document.page_count(), 1);
    }

    #[test]
    fn rejects_flowables_taller_than_the_frame() {
        let story = vec![block(10.0), Flowable::Spacer { height: 500.0 }];
        let error = small_template()
            .build(&story, &RenderConfiguration::default())
            .unwrap_err();
        assert!(error.context.contains("position 1"));
    }

    #[test]
    fn centers_tables_and_aligns_paragraphs_with_the_frame() {
        let story = vec![
            Table::new(vec![vec!["T".into()]])
                .with_column_widths(vec![100.0])
                .into(),
            Paragraph::new("P", ParagraphStyle::default()).into(),
        ];
        let pdf_document = small_template()
            .build(&story, &RenderConfiguration::default())
            .unwrap();
        let positions: Vec<(f32, f32)> = pdf_document.pages[0]
            .operations
            .iter()
            .filter(|operation| operation.operator == "Td")
            .map(|operation| {
                (
                    operation.operands[0].as_float().unwrap(),
                    operation.operands[1].as_float().unwrap(),
                )
            })
            .collect();
        // The frame spans 16..184, the table 50..150 and its text starts after 6 points of padding
        assert_eq!(positions[0].0, 56.0);
        assert_eq!(positions[0].1, 184.0 - 3.0 - 10.0);
        // The table is 12 + 3 + 3 points tall and the paragraph starts right below it
        assert_eq!(positions[1].0, 16.0);
        assert_eq!(positions[1].1, 184.0 - 18.0 - 10.0);
    }

    #[test]
    fn stories_round_trip_through_json() {
        let story: Story = vec![
            block(12.0),
            Flowable::Spacer { height: 4.0 },
            Flowable::PageBreak,
            Paragraph::new("<b>bold</b>", ParagraphStyle::new("Bold")).into(),
        ];
        let story_path =
            std::env::temp_dir().join(format!("da2404-story-{}.json", std::process::id()));
        write_story(&story, &story_path).unwrap();
        let json = std::fs::read_to_string(&story_path).unwrap();
        let parsed = read_story(&story_path).unwrap();
        std::fs::remove_file(&story_path).unwrap();

        assert_eq!(parsed, story);
        assert!(json.contains("\n    {\n        \"type\": \"pageBreak\""));
    }

    #[test]
    fn reading_a_missing_story_names_the_file() {
        let error = read_story(Path::new("missing-story.json")).unwrap_err();
        assert!(error.context.contains("missing-story.json"));
    }
}
