//! Tables made of plain-text and paragraph cells, styled by an ordered list of commands which each
//! apply to a rectangular range of cells.
//!
//! Cell coordinates are `(column, row)` pairs. Negative indices count from the end, so that
//! `(-1, -1)` is the bottom-right cell whatever the size of the table.

use serde::{Deserialize, Serialize};

use crate::{
    error::ContextError,
    fonts::StandardFont,
    paragraph::{Alignment, Paragraph, ParagraphLayout},
    pdf::{Color, PdfDocument, BLACK},
};

/// An inclusive rectangle of cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRange {
    pub start: (i32, i32),
    pub end: (i32, i32),
}

/// A range once its negative indices have been resolved against the size of the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ResolvedRange {
    first_column: usize,
    last_column: usize,
    first_row: usize,
    last_row: usize,
}

impl CellRange {
    pub fn new(start: (i32, i32), end: (i32, i32)) -> Self {
        CellRange { start, end }
    }

    fn resolve(&self, columns: usize, rows: usize) -> Option<ResolvedRange> {
        let (first_column, last_column) = resolve_span(self.start.0, self.end.0, columns)?;
        let (first_row, last_row) = resolve_span(self.start.1, self.end.1, rows)?;
        Some(ResolvedRange {
            first_column,
            last_column,
            first_row,
            last_row,
        })
    }
}

fn resolve_span(start: i32, end: i32, length: usize) -> Option<(usize, usize)> {
    let resolve = |index: i32| {
        if index < 0 {
            length as i64 + i64::from(index)
        } else {
            i64::from(index)
        }
    };
    let start = resolve(start).max(0);
    let end = resolve(end).min(length as i64 - 1);
    if start > end {
        return None;
    }
    Some((start as usize, end as usize))
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VerticalAlignment {
    #[default]
    Top,
    Middle,
    Bottom,
}

/// Which edges of the cells in a range a line command strokes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Edges {
    /// The top edge of every row.
    Above,
    /// The bottom edge of every row.
    Below,
    /// The left edge of every column.
    Before,
    /// The right edge of every column.
    After,
    /// The edges between the cells, but not the outline.
    InnerGrid,
    /// The outline of the range.
    Box,
    /// The outline and the edges between the cells.
    Grid,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Side {
    Top,
    Bottom,
    Left,
    Right,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "directive", rename_all = "camelCase")]
pub enum Directive {
    Line {
        edges: Edges,
        weight: f32,
        #[serde(default)]
        color: Color,
    },
    Align {
        alignment: Alignment,
    },
    VerticalAlign {
        alignment: VerticalAlignment,
    },
    Padding {
        side: Side,
        amount: f32,
    },
    FontSize {
        size: f32,
    },
    Font {
        font: StandardFont,
        #[serde(default)]
        size: Option<f32>,
    },
    Leading {
        leading: f32,
    },
}

/// A directive applied to a range of cells.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StyleCommand {
    pub range: CellRange,
    #[serde(flatten)]
    pub directive: Directive,
}

impl StyleCommand {
    pub fn new(start: (i32, i32), end: (i32, i32), directive: Directive) -> Self {
        StyleCommand {
            range: CellRange::new(start, end),
            directive,
        }
    }

    pub fn line(edges: Edges, start: (i32, i32), end: (i32, i32), weight: f32) -> Self {
        Self::new(
            start,
            end,
            Directive::Line {
                edges,
                weight,
                color: BLACK,
            },
        )
    }

    pub fn line_above(start: (i32, i32), end: (i32, i32), weight: f32) -> Self {
        Self::line(Edges::Above, start, end, weight)
    }

    pub fn line_below(start: (i32, i32), end: (i32, i32), weight: f32) -> Self {
        Self::line(Edges::Below, start, end, weight)
    }

    pub fn line_before(start: (i32, i32), end: (i32, i32), weight: f32) -> Self {
        Self::line(Edges::Before, start, end, weight)
    }

    pub fn line_after(start: (i32, i32), end: (i32, i32), weight: f32) -> Self {
        Self::line(Edges::After, start, end, weight)
    }

    pub fn inner_grid(start: (i32, i32), end: (i32, i32), weight: f32) -> Self {
        Self::line(Edges::InnerGrid, start, end, weight)
    }

    pub fn align(start: (i32, i32), end: (i32, i32), alignment: Alignment) -> Self {
        Self::new(start, end, Directive::Align { alignment })
    }

    pub fn vertical_align(
        start: (i32, i32),
        end: (i32, i32),
        alignment: VerticalAlignment,
    ) -> Self {
        Self::new(start, end, Directive::VerticalAlign { alignment })
    }

    pub fn padding(side: Side, start: (i32, i32), end: (i32, i32), amount: f32) -> Self {
        Self::new(start, end, Directive::Padding { side, amount })
    }

    pub fn font_size(start: (i32, i32), end: (i32, i32), size: f32) -> Self {
        Self::new(start, end, Directive::FontSize { size })
    }

    pub fn font(start: (i32, i32), end: (i32, i32), font: StandardFont) -> Self {
        Self::new(start, end, Directive::Font { font, size: None })
    }

    pub fn leading(start: (i32, i32), end: (i32, i32), leading: f32) -> Self {
        Self::new(start, end, Directive::Leading { leading })
    }
}

/// The ordered list of commands styling a table. Later commands win over earlier ones.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableStyle {
    pub commands: Vec<StyleCommand>,
}

impl TableStyle {
    pub fn new<I: IntoIterator<Item = StyleCommand>>(commands: I) -> Self {
        TableStyle {
            commands: commands.into_iter().collect(),
        }
    }

    pub fn with(mut self, command: StyleCommand) -> Self {
        self.commands.push(command);
        self
    }
}

impl Extend<StyleCommand> for TableStyle {
    fn extend<I: IntoIterator<Item = StyleCommand>>(&mut self, commands: I) {
        self.commands.extend(commands);
    }
}

/// The style of a single cell after all the commands have been applied.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellStyle {
    pub font: StandardFont,
    pub font_size: f32,
    /// Distance between the baselines of plain text lines. `FontSize` leaves it untouched, a
    /// `Font` directive with a size resets it to 1.2 times that size.
    pub leading: f32,
    pub alignment: Alignment,
    pub vertical_alignment: VerticalAlignment,
    pub top_padding: f32,
    pub bottom_padding: f32,
    pub left_padding: f32,
    pub right_padding: f32,
}

impl Default for CellStyle {
    fn default() -> Self {
        CellStyle {
            font: StandardFont::Helvetica,
            font_size: 10.0,
            leading: 12.0,
            alignment: Alignment::Left,
            vertical_alignment: VerticalAlignment::Top,
            top_padding: 3.0,
            bottom_padding: 3.0,
            left_padding: 6.0,
            right_padding: 6.0,
        }
    }
}

impl CellStyle {
    fn apply(&mut self, directive: &Directive) {
        match directive {
            Directive::Line { .. } => {}
            Directive::Align { alignment } => self.alignment = *alignment,
            Directive::VerticalAlign { alignment } => self.vertical_alignment = *alignment,
            Directive::Padding { side, amount } => match side {
                Side::Top => self.top_padding = *amount,
                Side::Bottom => self.bottom_padding = *amount,
                Side::Left => self.left_padding = *amount,
                Side::Right => self.right_padding = *amount,
            },
            Directive::FontSize { size } => self.font_size = *size,
            Directive::Font { font, size } => {
                self.font = *font;
                if let Some(size) = size {
                    self.font_size = *size;
                    self.leading = 1.2 * *size;
                }
            }
            Directive::Leading { leading } => self.leading = *leading,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    /// Plain text set in the cell style; `\n` separates lines and no wrapping happens.
    Text(String),
    /// Marked-up text wrapped to the width of the cell.
    Paragraph(Paragraph),
}

impl From<&str> for Cell {
    fn from(text: &str) -> Self {
        Cell::Text(text.into())
    }
}

impl From<String> for Cell {
    fn from(text: String) -> Self {
        Cell::Text(text)
    }
}

impl From<Paragraph> for Cell {
    fn from(paragraph: Paragraph) -> Self {
        Cell::Paragraph(paragraph)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub rows: Vec<Vec<Cell>>,
    /// Width of each column; when unset the available width is split evenly.
    #[serde(default)]
    pub column_widths: Option<Vec<f32>>,
    /// Height of each row; when unset every row is as tall as its tallest cell.
    #[serde(default)]
    pub row_heights: Option<Vec<f32>>,
    #[serde(default)]
    pub style: TableStyle,
}

#[derive(Clone, Debug, PartialEq)]
enum CellContent {
    Text(Vec<String>),
    Paragraph(ParagraphLayout),
}

#[derive(Clone, Debug, PartialEq)]
struct LaidOutCell {
    style: CellStyle,
    content: CellContent,
}

impl LaidOutCell {
    fn content_height(&self) -> f32 {
        match &self.content {
            CellContent::Text(lines) => lines.len() as f32 * self.style.leading,
            CellContent::Paragraph(layout) => layout.height(),
        }
    }

    fn required_height(&self) -> f32 {
        self.content_height() + self.style.top_padding + self.style.bottom_padding
    }
}

/// A stroked segment, in coordinates relative to the top-left corner of the table with `y`
/// growing downwards.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineSegment {
    pub from: [f32; 2],
    pub to: [f32; 2],
    pub weight: f32,
    pub color: Color,
}

/// A table whose geometry has been fully computed for a given available width.
#[derive(Clone, Debug, PartialEq)]
pub struct TableLayout {
    /// Left edge of every column followed by the right edge of the last one.
    column_positions: Vec<f32>,
    /// Top edge of every row followed by the bottom edge of the last one, measured downwards.
    row_positions: Vec<f32>,
    cells: Vec<Vec<LaidOutCell>>,
    lines: Vec<LineSegment>,
}

impl Table {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Table {
            rows,
            column_widths: None,
            row_heights: None,
            style: TableStyle::default(),
        }
    }

    pub fn with_column_widths(mut self, column_widths: Vec<f32>) -> Self {
        self.column_widths = Some(column_widths);
        self
    }

    pub fn with_row_heights(mut self, row_heights: Vec<f32>) -> Self {
        self.row_heights = Some(row_heights);
        self
    }

    /// Gives every row the same height.
    pub fn with_uniform_row_height(self, row_height: f32) -> Self {
        let rows = self.rows.len();
        self.with_row_heights(vec![row_height; rows])
    }

    pub fn with_style(mut self, style: TableStyle) -> Self {
        self.style = style;
        self
    }

    pub fn column_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    fn validate(&self) -> Result<(), ContextError> {
        let columns = self.column_count();
        if self.rows.is_empty() || columns == 0 {
            return Err(ContextError::with_context("The table has no cells"));
        }
        if let Some((index, row)) = self
            .rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns)
        {
            return Err(ContextError::with_context(format!(
                "Row {} has {} cells while the first row has {}",
                index,
                row.len(),
                columns
            )));
        }
        if let Some(column_widths) = &self.column_widths {
            if column_widths.len() != columns {
                return Err(ContextError::with_context(format!(
                    "The table has {} columns but {} column widths",
                    columns,
                    column_widths.len()
                )));
            }
        }
        if let Some(row_heights) = &self.row_heights {
            if row_heights.len() != self.rows.len() {
                return Err(ContextError::with_context(format!(
                    "The table has {} rows but {} row heights",
                    self.rows.len(),
                    row_heights.len()
                )));
            }
        }
        Ok(())
    }

    /// Resolves the style of every cell, wraps the paragraphs to their column, sizes the rows and
    /// computes the segments stroked by the line commands.
    pub fn layout(&self, available_width: f32) -> Result<TableLayout, ContextError> {
        self.validate()?;
        let columns = self.column_count();
        let rows = self.rows.len();

        let column_widths = match &self.column_widths {
            Some(column_widths) => column_widths.clone(),
            None => vec![available_width / columns as f32; columns],
        };
        let column_positions = cumulative_positions(&column_widths);

        let mut styles = vec![vec![CellStyle::default(); columns]; rows];
        for command in &self.style.commands {
            if matches!(command.directive, Directive::Line { .. }) {
                continue;
            }
            let Some(range) = command.range.resolve(columns, rows) else {
                log::warn!("The style command {:?} applies to no cell", command);
                continue;
            };
            for row_styles in &mut styles[range.first_row..=range.last_row] {
                for style in &mut row_styles[range.first_column..=range.last_column] {
                    style.apply(&command.directive);
                }
            }
        }

        let mut cells = Vec::with_capacity(rows);
        for (row, row_cells) in self.rows.iter().enumerate() {
            let mut laid_out_row = Vec::with_capacity(columns);
            for (column, cell) in row_cells.iter().enumerate() {
                let style = styles[row][column];
                let content = match cell {
                    Cell::Text(text) => {
                        CellContent::Text(text.split('\n').map(str::to_string).collect())
                    }
                    Cell::Paragraph(paragraph) => {
                        let inner_width = (column_widths[column]
                            - style.left_padding
                            - style.right_padding)
                            .max(0.0);
                        let layout = paragraph.layout(inner_width).map_err(|error| {
                            ContextError::with_error(
                                format!("Failed to lay out the cell ({}, {})", column, row),
                                &error,
                            )
                        })?;
                        CellContent::Paragraph(layout)
                    }
                };
                laid_out_row.push(LaidOutCell { style, content });
            }
            cells.push(laid_out_row);
        }

        let row_heights = match &self.row_heights {
            Some(row_heights) => {
                for (row, (laid_out_row, row_height)) in cells.iter().zip(row_heights).enumerate() {
                    for (column, cell) in laid_out_row.iter().enumerate() {
                        if cell.required_height() > row_height + 1e-3 {
                            log::debug!(
                                "The content of the cell ({}, {}) needs {:.2} points but the row is {:.2} points tall",
                                column,
                                row,
                                cell.required_height(),
                                row_height
                            );
                        }
                    }
                }
                row_heights.clone()
            }
            None => cells
                .iter()
                .map(|laid_out_row| {
                    laid_out_row
                        .iter()
                        .map(LaidOutCell::required_height)
                        .fold(0.0, f32::max)
                })
                .collect(),
        };
        let row_positions = cumulative_positions(&row_heights);

        let mut layout = TableLayout {
            column_positions,
            row_positions,
            cells,
            lines: Vec::new(),
        };
        for command in &self.style.commands {
            if let Directive::Line {
                edges,
                weight,
                color,
            } = command.directive
            {
                match command.range.resolve(columns, rows) {
                    Some(range) => layout.push_lines(edges, range, weight, color),
                    None => log::warn!("The line command {:?} applies to no cell", command),
                }
            }
        }

        Ok(layout)
    }
}

fn cumulative_positions(sizes: &[f32]) -> Vec<f32> {
    let mut positions = Vec::with_capacity(sizes.len() + 1);
    let mut position = 0.0;
    positions.push(position);
    for size in sizes {
        position += size;
        positions.push(position);
    }
    positions
}

impl TableLayout {
    pub fn width(&self) -> f32 {
        self.column_positions.last().copied().unwrap_or(0.0)
    }

    pub fn height(&self) -> f32 {
        self.row_positions.last().copied().unwrap_or(0.0)
    }

    pub fn column_positions(&self) -> &[f32] {
        &self.column_positions
    }

    pub fn row_positions(&self) -> &[f32] {
        &self.row_positions
    }

    pub fn lines(&self) -> &[LineSegment] {
        &self.lines
    }

    fn push_lines(&mut self, edges: Edges, range: ResolvedRange, weight: f32, color: Color) {
        let left = self.column_positions[range.first_column];
        let right = self.column_positions[range.last_column + 1];
        let top = self.row_positions[range.first_row];
        let bottom = self.row_positions[range.last_row + 1];

        let mut horizontal = Vec::new();
        let mut vertical = Vec::new();
        match edges {
            Edges::Above => horizontal.extend(range.first_row..=range.last_row),
            Edges::Below => horizontal.extend(range.first_row + 1..=range.last_row + 1),
            Edges::Before => vertical.extend(range.first_column..=range.last_column),
            Edges::After => vertical.extend(range.first_column + 1..=range.last_column + 1),
            Edges::InnerGrid => {
                horizontal.extend(range.first_row + 1..=range.last_row);
                vertical.extend(range.first_column + 1..=range.last_column);
            }
            Edges::Box => {
                horizontal.extend([range.first_row, range.last_row + 1]);
                vertical.extend([range.first_column, range.last_column + 1]);
            }
            Edges::Grid => {
                horizontal.extend(range.first_row..=range.last_row + 1);
                vertical.extend(range.first_column..=range.last_column + 1);
            }
        }

        for row_edge in horizontal {
            let y = self.row_positions[row_edge];
            self.lines.push(LineSegment {
                from: [left, y],
                to: [right, y],
                weight,
                color,
            });
        }
        for column_edge in vertical {
            let x = self.column_positions[column_edge];
            self.lines.push(LineSegment {
                from: [x, top],
                to: [x, bottom],
                weight,
                color,
            });
        }
    }

    /// Draws the cell contents and then the lines, the top-left corner of the table being at
    /// `(x, top)` on the page.
    pub fn draw(
        &self,
        pdf_document: &mut PdfDocument,
        page_index: usize,
        x: f32,
        top: f32,
    ) -> Result<(), ContextError> {
        for (row, laid_out_row) in self.cells.iter().enumerate() {
            for (column, cell) in laid_out_row.iter().enumerate() {
                let left = x + self.column_positions[column];
                let right = x + self.column_positions[column + 1];
                let cell_top = top - self.row_positions[row];
                let cell_bottom = top - self.row_positions[row + 1];
                draw_cell(
                    pdf_document,
                    page_index,
                    cell,
                    [left, right],
                    [cell_top, cell_bottom],
                )?;
            }
        }

        for line in &self.lines {
            pdf_document.draw_line_on_page(
                page_index,
                line.color,
                line.weight,
                [x + line.from[0], top - line.from[1]],
                [x + line.to[0], top - line.to[1]],
            )?;
        }

        Ok(())
    }
}

fn draw_cell(
    pdf_document: &mut PdfDocument,
    page_index: usize,
    cell: &LaidOutCell,
    [left, right]: [f32; 2],
    [top, bottom]: [f32; 2],
) -> Result<(), ContextError> {
    let style = &cell.style;
    let content_height = cell.content_height();
    let content_top = match style.vertical_alignment {
        VerticalAlignment::Top => top - style.top_padding,
        VerticalAlignment::Bottom => bottom + style.bottom_padding + content_height,
        VerticalAlignment::Middle => {
            (top - style.top_padding + bottom + style.bottom_padding + content_height) / 2.0
        }
    };
    let inner_left = left + style.left_padding;
    let inner_width = right - style.right_padding - inner_left;

    match &cell.content {
        CellContent::Paragraph(layout) => {
            layout.draw(pdf_document, page_index, inner_left, content_top)
        }
        CellContent::Text(lines) => {
            let mut baseline = content_top - style.font_size;
            for line in lines {
                let line_width = style.font.text_width(line, style.font_size);
                pdf_document.write_text_to_page(
                    page_index,
                    BLACK,
                    line,
                    style.font,
                    style.font_size,
                    [
                        inner_left + style.alignment.offset(line_width, inner_width),
                        baseline,
                    ],
                )?;
                baseline -= style.leading;
            }
            Ok(())
        }
    }
}
