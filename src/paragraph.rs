use serde::{Deserialize, Serialize};

use crate::{
    error::ContextError,
    fonts::StandardFont,
    markup::{self, Fragment, Token},
    pdf::{Color, PdfDocument, BLACK},
};

/// Tolerance used when checking whether a word fits in the remaining width of a line.
const FIT_TOLERANCE: f32 = 1e-3;

/// Horizontal alignment of the lines of a paragraph, or of the text of a table cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

impl Alignment {
    /// Offset of a line of the given width inside the available width.
    pub fn offset(&self, line_width: f32, available_width: f32) -> f32 {
        match self {
            Alignment::Left => 0.0,
            Alignment::Center => (available_width - line_width) / 2.0,
            Alignment::Right => available_width - line_width,
        }
    }
}

/// The style a paragraph starts from; the inline markup can then change font and size.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParagraphStyle {
    pub name: String,
    pub font: StandardFont,
    pub font_size: f32,
    /// Distance between the baselines of two consecutive lines.
    pub leading: f32,
    pub alignment: Alignment,
    pub text_color: Color,
}

impl Default for ParagraphStyle {
    fn default() -> Self {
        ParagraphStyle {
            name: "Normal".into(),
            font: StandardFont::Helvetica,
            font_size: 10.0,
            leading: 12.0,
            alignment: Alignment::Left,
            text_color: BLACK,
        }
    }
}

impl ParagraphStyle {
    pub fn new<S: Into<String>>(name: S) -> Self {
        ParagraphStyle {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_leading(mut self, leading: f32) -> Self {
        self.leading = leading;
        self
    }

    pub fn with_font_size(mut self, font_size: f32) -> Self {
        self.font_size = font_size;
        self
    }

    pub fn with_font(mut self, font: StandardFont) -> Self {
        self.font = font;
        self
    }
}

/// A block of marked-up text which is wrapped to the width it is given.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    pub text: String,
    #[serde(default)]
    pub style: ParagraphStyle,
}

/// A fragment of text placed on a line, `x` being relative to the left edge of the paragraph.
#[derive(Clone, Debug, PartialEq)]
pub struct PositionedFragment {
    pub x: f32,
    pub text: String,
    pub font: StandardFont,
    pub font_size: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Line {
    pub width: f32,
    /// The largest font size found on the line.
    pub font_size: f32,
    pub fragments: Vec<PositionedFragment>,
}

/// The paragraph once wrapped to a specific width, ready to be drawn.
#[derive(Clone, Debug, PartialEq)]
pub struct ParagraphLayout {
    pub lines: Vec<Line>,
    pub leading: f32,
    pub text_color: Color,
}

/// A run of non-whitespace text, possibly made of fragments in different styles.
#[derive(Debug, Default)]
struct Word {
    pieces: Vec<Fragment>,
    width: f32,
    /// Width of the whitespace separating the word from the previous one, if any.
    space_before: Option<(f32, StandardFont, f32)>,
}

impl Word {
    fn push(&mut self, character: char, font: StandardFont, font_size: f32) {
        let mut buffer = [0u8; 4];
        self.width += font.text_width(character.encode_utf8(&mut buffer), font_size);
        match self.pieces.last_mut() {
            Some(piece) if piece.font == font && piece.font_size == font_size => {
                piece.text.push(character)
            }
            _ => self.pieces.push(Fragment {
                text: character.to_string(),
                font,
                font_size,
            }),
        }
    }
}

enum Item {
    Word(Word),
    Break,
}

impl Paragraph {
    pub fn new<S: Into<String>>(text: S, style: ParagraphStyle) -> Self {
        Paragraph {
            text: text.into(),
            style,
        }
    }

    /// Wraps the paragraph greedily into lines no wider than `width`. A word which is wider than
    /// `width` by itself is placed alone on its line and overflows it.
    pub fn layout(&self, width: f32) -> Result<ParagraphLayout, ContextError> {
        let tokens = markup::parse(&self.text, self.style.font, self.style.font_size).map_err(
            |error| {
                ContextError::with_error(
                    format!("Failed to parse the markup of the paragraph {:?}", self.text),
                    &error,
                )
            },
        )?;

        let mut lines = Vec::new();
        let mut current_line: Vec<Word> = Vec::new();
        let mut current_width = 0.0;

        for item in split_words(&tokens) {
            match item {
                Item::Break => {
                    lines.push(self.position_line(std::mem::take(&mut current_line), width));
                    current_width = 0.0;
                }
                Item::Word(word) => {
                    let space = word.space_before.map_or(0.0, |(space, _, _)| space);
                    if current_line.is_empty() {
                        current_width = word.width;
                        current_line.push(word);
                    } else if current_width + space + word.width <= width + FIT_TOLERANCE {
                        current_width += space + word.width;
                        current_line.push(word);
                    } else {
                        lines.push(self.position_line(std::mem::take(&mut current_line), width));
                        current_width = word.width;
                        current_line.push(word);
                    }
                }
            }
        }
        if !current_line.is_empty() {
            lines.push(self.position_line(current_line, width));
        }

        Ok(ParagraphLayout {
            lines,
            leading: self.style.leading,
            text_color: self.style.text_color,
        })
    }

    fn position_line(&self, words: Vec<Word>, available_width: f32) -> Line {
        let line_width: f32 = words
            .iter()
            .enumerate()
            .map(|(index, word)| {
                let space = match (index, word.space_before) {
                    (0, _) | (_, None) => 0.0,
                    (_, Some((space, _, _))) => space,
                };
                space + word.width
            })
            .sum();

        let mut x = self.style.alignment.offset(line_width, available_width);
        let mut font_size: f32 = if words.is_empty() {
            self.style.font_size
        } else {
            0.0
        };
        let mut fragments: Vec<PositionedFragment> = Vec::new();

        for (index, word) in words.into_iter().enumerate() {
            let mut pending_space = None;
            if index > 0 {
                if let Some((space, space_font, space_size)) = word.space_before {
                    pending_space = Some((space_font, space_size));
                    x += space;
                }
            }
            for (piece_index, piece) in word.pieces.into_iter().enumerate() {
                font_size = font_size.max(piece.font_size);
                let piece_width = piece.font.text_width(&piece.text, piece.font_size);
                let space_style = if piece_index == 0 { pending_space } else { None };

                match fragments.last_mut() {
                    // Text in the same style is merged, together with the space which precedes it
                    Some(last)
                        if last.font == piece.font
                            && last.font_size == piece.font_size
                            && space_style.map_or(true, |style| style == (piece.font, piece.font_size)) =>
                    {
                        if space_style.is_some() {
                            last.text.push(' ');
                        }
                        last.text.push_str(&piece.text);
                    }
                    _ => fragments.push(PositionedFragment {
                        x,
                        text: piece.text,
                        font: piece.font,
                        font_size: piece.font_size,
                    }),
                }
                x += piece_width;
            }
        }

        Line {
            width: line_width,
            font_size,
            fragments,
        }
    }
}

/// Splits the tokens into words and explicit breaks. Consecutive whitespace collapses into a
/// single space, measured in the style it was written in.
fn split_words(tokens: &[Token]) -> Vec<Item> {
    let mut items = Vec::new();
    let mut word = Word::default();
    let mut pending_space = None;

    for token in tokens {
        match token {
            Token::LineBreak => {
                if !word.pieces.is_empty() {
                    items.push(Item::Word(std::mem::take(&mut word)));
                }
                items.push(Item::Break);
                pending_space = None;
            }
            Token::Text(fragment) => {
                for character in fragment.text.chars() {
                    if character.is_whitespace() && character != '\u{a0}' {
                        if !word.pieces.is_empty() {
                            items.push(Item::Word(std::mem::take(&mut word)));
                        }
                        if pending_space.is_none() {
                            pending_space = Some((
                                fragment.font.text_width(" ", fragment.font_size),
                                fragment.font,
                                fragment.font_size,
                            ));
                        }
                    } else {
                        if word.pieces.is_empty() {
                            word.space_before = pending_space.take();
                        }
                        word.push(character, fragment.font, fragment.font_size);
                    }
                }
            }
        }
    }
    if !word.pieces.is_empty() {
        items.push(Item::Word(word));
    }

    items
}

impl ParagraphLayout {
    pub fn height(&self) -> f32 {
        self.lines.len() as f32 * self.leading
    }

    /// Width of the widest line.
    pub fn width(&self) -> f32 {
        self.lines
            .iter()
            .map(|line| line.width)
            .fold(0.0, f32::max)
    }

    /// Draws the paragraph with its top-left corner at `(x, top)`. The first baseline sits one
    /// font size below the top, the following ones are spaced by the leading.
    pub fn draw(
        &self,
        pdf_document: &mut PdfDocument,
        page_index: usize,
        x: f32,
        top: f32,
    ) -> Result<(), ContextError> {
        let Some(first_line) = self.lines.first() else {
            return Ok(());
        };
        let mut baseline = top - first_line.font_size;

        for line in &self.lines {
            for fragment in &line.fragments {
                pdf_document.write_text_to_page(
                    page_index,
                    self.text_color,
                    &fragment.text,
                    fragment.font,
                    fragment.font_size,
                    [x + fragment.x, baseline],
                )?;
            }
            baseline -= self.leading;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{distributions::Alphanumeric, Rng as _};

    fn line_texts(layout: &ParagraphLayout) -> Vec<String> {
        layout
            .lines
            .iter()
            .map(|line| {
                line.fragments
                    .iter()
                    .map(|fragment| fragment.text.as_str())
                    .collect::<Vec<_>>()
                    .join("|")
            })
            .collect()
    }

    #[test]
    fn wraps_words_greedily() {
        let style = ParagraphStyle::default();
        // Each "AAAA" is 4 * 6.67 = 26.68 points wide and a space is 2.78 points wide
        let paragraph = Paragraph::new("AAAA AAAA AAAA", style);
        let layout = paragraph.layout(60.0).unwrap();
        assert_eq!(line_texts(&layout), vec!["AAAA AAAA", "AAAA"]);
        assert_eq!(layout.height(), 24.0);
    }

    #[test]
    fn breaks_lines_explicitly_without_a_trailing_empty_line() {
        let style = ParagraphStyle::default().with_leading(8.0);
        let paragraph = Paragraph::new("<br/>STATUS<br/><br/><i>b</i><br/>", style);
        let layout = paragraph.layout(100.0).unwrap();
        assert_eq!(line_texts(&layout), vec!["", "STATUS", "", "b"]);
        assert_eq!(layout.height(), 32.0);
    }

    #[test]
    fn keeps_mixed_style_words_together() {
        let style = ParagraphStyle::default().with_font_size(8.0);
        let paragraph = Paragraph::new("4<i>a</i>. MILES", style);
        let layout = paragraph.layout(200.0).unwrap();
        assert_eq!(layout.lines.len(), 1);
        let fragments = &layout.lines[0].fragments;
        assert_eq!(fragments.len(), 3);
        assert_eq!(fragments[1].font, StandardFont::HelveticaOblique);
        assert_eq!(fragments[2].text, ". MILES");
        // The italic fragment starts right after the "4"
        assert!((fragments[1].x - 4.448).abs() < 1e-3);
    }

    #[test]
    fn centers_each_line() {
        let style = ParagraphStyle::default().with_alignment(Alignment::Center);
        let paragraph = Paragraph::new("STATUS SYMBOLS", style);
        let layout = paragraph.layout(200.0).unwrap();
        let line = &layout.lines[0];
        assert!((line.fragments[0].x - (200.0 - line.width) / 2.0).abs() < 1e-4);
    }

    #[test]
    fn overlong_words_sit_alone_on_their_line() {
        let paragraph = Paragraph::new("a DEFICIENCIES b", ParagraphStyle::default());
        let layout = paragraph.layout(20.0).unwrap();
        assert_eq!(line_texts(&layout), vec!["a", "DEFICIENCIES", "b"]);
        assert!(layout.width() > 20.0);
    }

    #[test]
    fn reports_malformed_markup() {
        let paragraph = Paragraph::new("<u>underlined</u>", ParagraphStyle::default());
        assert!(paragraph.layout(100.0).is_err());
    }

    #[test]
    fn random_text_never_overflows_unless_a_word_does() {
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let words: Vec<String> = (0..rng.gen_range(1..40))
                .map(|_| {
                    let length = rng.gen_range(1..12);
                    (&mut rng)
                        .sample_iter(&Alphanumeric)
                        .map(char::from)
                        .take(length)
                        .collect()
                })
                .collect();
            let width = rng.gen_range(40.0..300.0);
            let style = ParagraphStyle::default().with_font_size(rng.gen_range(6.0..12.0));
            let paragraph = Paragraph::new(words.join(" "), style.clone());
            let layout = paragraph.layout(width).unwrap();

            for line in &layout.lines {
                let single_word = line.fragments.len() == 1 && !line.fragments[0].text.contains(' ');
                assert!(line.width <= width + FIT_TOLERANCE || single_word);
                let measured = style.font.text_width(&line.fragments[0].text, style.font_size);
                assert!((measured - line.width).abs() < 1e-2);
            }
            let rejoined = line_texts(&layout).join(" ");
            assert_eq!(rejoined, words.join(" "));
        }
    }
}
