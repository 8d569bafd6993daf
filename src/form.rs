//! The sections of DA Form 2404, each built as one or more tables, and the story assembling them.

use crate::{
    configuration::RenderConfiguration,
    error::ContextError,
    fonts::StandardFont,
    paragraph::{Alignment, Paragraph, ParagraphStyle},
    pdf::PdfDocument,
    table::{Cell, Side, StyleCommand, Table, TableStyle, VerticalAlignment},
    template::{DocTemplate, Flowable, Story},
    units::{mm, LETTER, MILLIMETER},
};

/// Height of a row left blank for handwriting.
pub const BASE_INPUT_ROW_HEIGHT: f32 = 8.75 * MILLIMETER;

/// Blank item rows on the main page.
pub const MAIN_PAGE_ITEM_ROWS: usize = 13;

/// Blank item rows on a supplementary sheet.
pub const SUPPLEMENTARY_SHEET_ITEM_ROWS: usize = 27;

const FORM_NUMBER: &str = "DA FORM 2404, FEB 2011";
const FORM_VERSION: &str = "APD LC v1.00ES";

/// Width shared by all the tables of the form but the title.
pub fn base_table_width() -> f32 {
    (LETTER[0] - mm(11.0) * 2.0 - mm(1.0) - 2.0).floor()
}

/// The style every input table starts from: thin rules above and between the cells, a heavy rule
/// on the left edge, and small text tucked in the top-left corner of the cells.
pub fn base_input_style() -> Vec<StyleCommand> {
    vec![
        StyleCommand::line_above((0, 0), (-1, -1), 0.25),
        StyleCommand::inner_grid((0, 0), (-1, -1), 0.25),
        StyleCommand::line_before((0, 0), (0, -1), 1.0),
        StyleCommand::align((0, 0), (-1, -1), Alignment::Left),
        StyleCommand::vertical_align((0, 0), (-1, -1), VerticalAlignment::Top),
        StyleCommand::padding(Side::Top, (0, 0), (-1, -1), 0.0),
        StyleCommand::padding(Side::Left, (0, 0), (-1, -1), 2.0),
        StyleCommand::font_size((0, 0), (-1, -1), 8.0),
    ]
}

fn input_style<I: IntoIterator<Item = StyleCommand>>(extra_commands: I) -> TableStyle {
    let mut style = TableStyle::new(base_input_style());
    style.extend(extra_commands);
    style
}

fn paragraph_row(items: &[&str], style: &ParagraphStyle) -> Vec<Cell> {
    items
        .iter()
        .map(|item| Paragraph::new(*item, style.clone()).into())
        .collect()
}

fn text_style(name: &str, alignment: Alignment, font_size: f32, leading: f32) -> ParagraphStyle {
    ParagraphStyle::new(name)
        .with_alignment(alignment)
        .with_font_size(font_size)
        .with_leading(leading)
}

/// The boxed title of the form with the proponent line below it.
pub fn header() -> Table {
    let markup = "<font size=10 fontName=\"Helvetica-Bold\">\
                  EQUIPMENT INSPECTION AND MAINTENANCE WORKSHEET</font>\
                  <br/>\
                  <font size=7 fontName=\"Helvetica\">\
                  For use of this form, see DA PAM 750-8; the proponent agency is DCS, G-4.\
                  </font>";
    let style = ParagraphStyle::new("Main Heading")
        .with_alignment(Alignment::Center)
        .with_leading(10.0);

    Table::new(vec![vec![Paragraph::new(markup, style).into()]]).with_style(TableStyle::new([
        StyleCommand::line_above((0, 0), (0, 0), 1.0),
        StyleCommand::line_before((0, 0), (0, 0), 1.0),
        StyleCommand::line_after((0, 0), (0, 0), 1.0),
        StyleCommand::inner_grid((0, 0), (-1, -1), 0.25),
        StyleCommand::align((0, 0), (0, 0), Alignment::Center),
        StyleCommand::padding(Side::Top, (0, 0), (0, 0), 1.0),
    ]))
}

/// Items 1 to 6: organization, nomenclature, registration number, usage counters, date and type
/// of inspection.
pub fn header_data() -> Vec<Table> {
    let column_width = ((LETTER[0] - mm(10.0) * 2.0) / 2.0).floor() - mm(1.0) - 2.0;
    let first_line = Table::new(vec![vec![
        "1. ORGANIZATION".into(),
        "2. NOMENCLATURE AND MODEL".into(),
    ]])
    .with_column_widths(vec![column_width; 2])
    .with_uniform_row_height(BASE_INPUT_ROW_HEIGHT)
    .with_style(input_style([StyleCommand::line_after((1, 0), (1, 0), 1.0)]));

    let data_input = text_style("Data Input", Alignment::Left, 8.0, 8.0);
    let second_line = Table::new(vec![paragraph_row(
        &[
            "3. REGISTRATION/SERIAL/NSN",
            "4<i>a</i>. MILES",
            "<i>b</i>. HOURS",
            "<i>c</i>. ROUNDS FIRED",
            "<i>d</i>. HOT STARTS",
            "5. DATE",
            "6. TYPE INSPECTION",
        ],
        &data_input,
    )])
    .with_column_widths(vec![
        mm(50.0) + 5.0,
        mm(19.0),
        mm(19.0),
        mm(19.0),
        mm(19.0),
        mm(30.0),
        mm(34.0),
    ])
    .with_uniform_row_height(BASE_INPUT_ROW_HEIGHT)
    .with_style(input_style([StyleCommand::line_after((-1, 0), (-1, 0), 1.0)]));

    vec![first_line, second_line]
}

/// Item 7: the technical manuals the inspection refers to, and how to fill columns a to e.
pub fn applicable_reference() -> Vec<Table> {
    let width = base_table_width();
    let half = width / 2.0;

    let header_style = text_style("Data Input Applicable Reference", Alignment::Center, 8.0, 8.0);
    let header = Table::new(vec![vec![
        "7.".into(),
        Paragraph::new("APPLICABLE REFERENCE", header_style).into(),
    ]])
    .with_column_widths(vec![0.0, width])
    .with_row_heights(vec![11.0])
    .with_style(input_style([StyleCommand::line_after((1, 0), (1, 0), 1.0)]));

    let manuals = Table::new(vec![vec![
        "TM NUMBER".into(),
        "TM DATE".into(),
        "TM NUMBER".into(),
        "TM DATE".into(),
    ]])
    .with_column_widths(vec![half * 0.65, half * 0.35, half * 0.65, half * 0.35])
    .with_uniform_row_height(BASE_INPUT_ROW_HEIGHT)
    .with_style(input_style([StyleCommand::line_after((3, 0), (3, 0), 1.0)]));

    let instructions_style = text_style("Line 2 Text", Alignment::Left, 10.0, 10.0);
    let instructions = Table::new(vec![paragraph_row(
        &[
            "COLUMN a - Enter RM item number.<br/>\
             COLUMN b - Enter the applicable condition status symbol.<br/>\
             COLUMN c - Enter deficiencies and shortcomings.",
            "COLUMN d - Show corrective action for deficiency or shortcoming listed in Column c.<br/>\
             COLUMN e - Individual ascertaining completed corrective action initial in this column.",
        ],
        &instructions_style,
    )])
    .with_column_widths(vec![half, half])
    .with_style(input_style([
        StyleCommand::line_after((1, 0), (1, 0), 1.0),
        StyleCommand::padding(Side::Left, (0, 0), (1, 0), mm(4.0)),
        StyleCommand::padding(Side::Top, (0, 0), (1, 0), mm(1.0)),
        StyleCommand::padding(Side::Right, (0, 0), (1, 0), 0.0),
    ]));

    vec![header, manuals, instructions]
}

/// The legend of the condition status symbols and the certification statement.
pub fn status_symbols() -> Vec<Table> {
    let width = base_table_width();
    let half = width / 2.0;

    let header_style = text_style("Data Header Status Symbols", Alignment::Center, 10.0, 10.0);
    let header = Table::new(vec![vec![
        Paragraph::new("STATUS SYMBOLS", header_style).into()
    ]])
    .with_column_widths(vec![width])
    .with_style(input_style([StyleCommand::line_after((0, 0), (0, 0), 1.0)]));

    let legend_style = text_style("Status Symbols Text", Alignment::Left, 10.0, 11.0);
    // The legend sits right below the header, so it has no rule above
    let mut legend_commands: Vec<StyleCommand> = base_input_style().into_iter().skip(1).collect();
    legend_commands.extend([
        StyleCommand::line_after((1, 0), (1, 0), 1.0),
        StyleCommand::padding(Side::Left, (0, 0), (0, 0), mm(2.0)),
        StyleCommand::padding(Side::Left, (1, 0), (1, 0), mm(4.0)),
        StyleCommand::padding(Side::Top, (0, 0), (1, 0), mm(1.0)),
        StyleCommand::padding(Side::Right, (0, 0), (1, 0), 0.0),
    ]);
    let legend = Table::new(vec![paragraph_row(
        &[
            "\"X\" - Indicates a deficiency in the equipment that places it in an inoperable status.\
             <br/>\
             CIRCLED \"X\" - Indicates a deficiency, however, the equipment may be operated under specific \
             limitations as directed by higher authority or as prescribed locally, until corrective action \
             can be accomplished.\
             <br/>\
             HORIZONTAL DASH \"(-)\" - Indicates that a required inspection, component replacement, \
             maintenance operation check, or test flight is due but has not been accomplished, or an \
             overdue MWO has not been accomplished.\
             <br/>",
            "DIAGONAL \"(/)\" - Indicates a material defect other than a deficiency which must be \
             corrected to increase efficiency or to make the item completely serviceable.\
             <br/>\
             LAST NAME INITIAL IN BLACK, BLUE-BLACK INK, OR PENCIL - Indicates that a completely \
             satisfactory condition exists.\
             <br/>\
             FOR AIRCRAFT - Status symbols will be recorded in red.",
        ],
        &legend_style,
    )])
    .with_column_widths(vec![half, half])
    .with_style(TableStyle::new(legend_commands));

    let statement_style = text_style("Data End Status Symbols", Alignment::Center, 10.0, 10.0);
    let statement = Table::new(vec![vec![Paragraph::new(
        "<i>ALL INSPECTIONS AND EQUIPMENT CONDITIONS RECORDED ON THIS FORM HAVE BEEN DETERMINED \
         IN ACCORDANCE WITH DIAGNOSTIC PROCEDURES AND STANDARDS IN THE TM CITED HEREON.</i>",
        statement_style,
    )
    .into()]])
    .with_column_widths(vec![width])
    .with_style(input_style([StyleCommand::line_after((0, 0), (0, 0), 1.0)]));

    vec![header, legend, statement]
}

/// Items 8 to 10: who performed the inspection, who supervised it and how long it took.
pub fn signature() -> Table {
    let width = base_table_width();
    let signature_style = text_style("Signature Input", Alignment::Left, 8.0, 8.0);

    Table::new(vec![paragraph_row(
        &[
            "8<i>a</i>. SIGNATURE <font size=7><i>(Person(s) performing inspection)</i></font>",
            "8<i>b</i>. TIME",
            "9<i>a</i>. SIGNATURE <font size=7><i>(Maintenance Supervisor)</i></font>",
            "9<i>b</i>. TIME",
            "10. MANHOURS REQUIRED",
        ],
        &signature_style,
    )])
    .with_column_widths(
        [0.33, 0.11, 0.33, 0.11, 0.12]
            .iter()
            .map(|share| width * share)
            .collect(),
    )
    .with_row_heights(vec![BASE_INPUT_ROW_HEIGHT * 2.0])
    .with_style(input_style([
        StyleCommand::line_after((4, 0), (4, 0), 1.0),
        StyleCommand::padding(Side::Right, (4, 0), (4, 0), 0.0),
    ]))
}

fn item_column_widths() -> Vec<f32> {
    let width = base_table_width();
    [0.07, 0.07, 0.37, 0.37, 0.12]
        .iter()
        .map(|share| width * share)
        .collect()
}

fn item_header(heavy_top_rule: bool) -> Table {
    let font_size = 8.0;
    let header_style = text_style("Item Header", Alignment::Center, font_size, font_size);

    let mut style = TableStyle::new(base_input_style());
    if heavy_top_rule {
        style.extend([StyleCommand::line_above((0, 0), (-1, 0), 1.0)]);
    }
    style.extend([
        StyleCommand::line_after((4, 0), (4, 0), 1.0),
        StyleCommand::padding(Side::Left, (1, 0), (1, 0), 0.0),
        StyleCommand::padding(Side::Right, (1, 0), (1, 0), 0.0),
    ]);

    Table::new(vec![paragraph_row(
        &[
            "TM ITEM NO.<br/><i>a</i>",
            "<br/>STATUS<br/><br/><i>b</i>",
            "<br/>DEFICIENCIES AND SHORTCOMINGS<br/><br/><i>c</i>",
            "<br/>CORRECTIVE ACTION<br/><br/><i>d</i>",
            "INITIAL<br/>WHEN<br/>CORRECTED<br/><i>e</i>",
        ],
        &header_style,
    )])
    .with_column_widths(item_column_widths())
    .with_row_heights(vec![font_size * 4.0 + 4.0])
    .with_style(style)
}

fn blank_item_rows(rows: usize) -> Table {
    let blank_row = || (0..5).map(|_| Cell::from("")).collect::<Vec<_>>();
    Table::new((0..rows).map(|_| blank_row()).collect())
        .with_column_widths(item_column_widths())
        .with_uniform_row_height(BASE_INPUT_ROW_HEIGHT)
        .with_style(input_style([
            StyleCommand::line_after((4, 0), (4, -1), 1.0),
            StyleCommand::line_below((0, -1), (-1, -1), 1.0),
            StyleCommand::padding(Side::Left, (1, 0), (1, 0), 0.0),
            StyleCommand::padding(Side::Right, (1, 0), (1, 0), 0.0),
        ]))
}

/// The column headers of the item list followed by `rows` blank rows.
pub fn item_table(rows: usize) -> Vec<Table> {
    let mut tables = vec![item_header(false)];
    if rows > 0 {
        tables.push(blank_item_rows(rows));
    }
    tables
}

pub fn footer() -> Table {
    Table::new(vec![vec![
        FORM_NUMBER.into(),
        "PREVIOUS EDITIONS ARE OBSOLETE.".into(),
        FORM_VERSION.into(),
    ]])
    .with_column_widths(vec![base_table_width() / 3.0; 3])
    .with_style(TableStyle::new([
        StyleCommand::font_size((0, 0), (0, 0), 10.0),
        StyleCommand::font((0, 0), (0, 0), StandardFont::HelveticaBold),
        StyleCommand::font_size((1, 0), (1, 0), 8.0),
        StyleCommand::font_size((2, 0), (2, 0), 6.0),
        StyleCommand::align((0, 0), (0, 0), Alignment::Left),
        StyleCommand::align((1, 0), (1, 0), Alignment::Center),
        StyleCommand::align((2, 0), (2, 0), Alignment::Right),
        StyleCommand::padding(Side::Top, (0, 0), (2, 0), 1.0),
        StyleCommand::padding(Side::Left, (0, 0), (2, 0), 1.0),
        StyleCommand::padding(Side::Right, (0, 0), (2, 0), 1.0),
    ]))
}

/// A continuation page holding nothing but more item rows.
pub fn supplementary_sheet() -> Vec<Table> {
    let continuation_footer = Table::new(vec![vec![FORM_NUMBER.into(), FORM_VERSION.into()]])
        .with_column_widths(vec![base_table_width() / 2.0; 2])
        .with_style(TableStyle::new([
            StyleCommand::font_size((0, 0), (0, 0), 8.0),
            StyleCommand::font((0, 0), (0, 0), StandardFont::HelveticaBold),
            StyleCommand::font_size((1, 0), (1, 0), 6.0),
            StyleCommand::align((0, 0), (0, 0), Alignment::Left),
            StyleCommand::align((1, 0), (1, 0), Alignment::Right),
            StyleCommand::padding(Side::Top, (0, 0), (1, 0), 1.0),
            StyleCommand::padding(Side::Left, (0, 0), (1, 0), 1.0),
            StyleCommand::padding(Side::Right, (0, 0), (1, 0), 1.0),
        ]));

    vec![
        item_header(true),
        blank_item_rows(SUPPLEMENTARY_SHEET_ITEM_ROWS),
        continuation_footer,
    ]
}

/// The whole form: the main page followed by the configured number of supplementary sheets.
pub fn story(configuration: &RenderConfiguration) -> Story {
    let mut story: Story = Vec::new();
    story.push(header().into());
    story.extend(header_data().into_iter().map(Flowable::from));
    story.extend(applicable_reference().into_iter().map(Flowable::from));
    story.extend(status_symbols().into_iter().map(Flowable::from));
    story.push(signature().into());
    story.extend(
        item_table(MAIN_PAGE_ITEM_ROWS)
            .into_iter()
            .map(Flowable::from),
    );
    story.push(footer().into());
    for _ in 0..configuration.supplementary_sheets {
        story.push(Flowable::PageBreak);
        story.extend(supplementary_sheet().into_iter().map(Flowable::from));
    }

    story
}

/// Renders the form on letter paper.
pub fn create_2404(configuration: &RenderConfiguration) -> Result<PdfDocument, ContextError> {
    DocTemplate::letter_form()
        .build(&story(configuration), configuration)
        .map_err(|error| ContextError::with_error("Failed to build DA Form 2404", &error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_table_width_is_rounded_down() {
        assert_eq!(base_table_width(), 544.0);
        assert!((BASE_INPUT_ROW_HEIGHT - 24.803).abs() < 1e-3);
    }

    #[test]
    fn status_legend_drops_the_rule_above() {
        let legend = &status_symbols()[1];
        assert_eq!(legend.style.commands[0], base_input_style()[1]);
        assert_eq!(legend.style.commands.len(), base_input_style().len() - 1 + 5);
    }

    #[test]
    fn item_table_has_the_requested_rows() {
        let tables = item_table(MAIN_PAGE_ITEM_ROWS);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1].rows.len(), 13);
        assert_eq!(tables[1].row_heights.as_ref().map(Vec::len), Some(13));
        assert_eq!(item_table(0).len(), 1);
        assert_eq!(supplementary_sheet()[1].rows.len(), SUPPLEMENTARY_SHEET_ITEM_ROWS);
    }

    #[test]
    fn every_section_lays_out_in_the_frame() {
        let frame_width = DocTemplate::letter_form().frame_width();
        let mut tables = vec![header(), signature(), footer()];
        tables.extend(header_data());
        tables.extend(applicable_reference());
        tables.extend(status_symbols());
        tables.extend(item_table(MAIN_PAGE_ITEM_ROWS));
        tables.extend(supplementary_sheet());
        for table in &tables {
            let layout = table.layout(frame_width).unwrap();
            // The first line of the header data is a fraction of a point wider than the others
            assert!((layout.width() - base_table_width()).abs() < 1.0);
            assert!(layout.height() > 0.0);
        }
    }

    #[test]
    fn both_footers_are_one_line_of_default_leading() {
        let frame_width = DocTemplate::letter_form().frame_width();
        let continuation_footer = &supplementary_sheet()[2];
        for table in [&footer(), continuation_footer] {
            // One point above, three below and the default leading of 12 in between
            assert_eq!(table.layout(frame_width).unwrap().height(), 16.0);
        }
    }

    #[test]
    fn story_repeats_the_supplementary_sheet() {
        let configuration = RenderConfiguration {
            supplementary_sheets: 2,
            ..Default::default()
        };
        let story = story(&configuration);
        let page_breaks = story
            .iter()
            .filter(|flowable| matches!(flowable, Flowable::PageBreak))
            .count();
        assert_eq!(page_breaks, 2);
        assert_eq!(story.len(), 13 + 2 * 4);
    }

    #[test]
    fn main_page_and_sheet_each_fill_one_page() {
        let configuration = RenderConfiguration::default();
        let pdf_document = create_2404(&configuration).unwrap();
        assert_eq!(pdf_document.page_count(), 2);

        let configuration = RenderConfiguration {
            supplementary_sheets: 0,
            ..Default::default()
        };
        assert_eq!(create_2404(&configuration).unwrap().page_count(), 1);
    }
}
