//! The inline markup understood by paragraphs: `<b>`, `<i>`, `<font size=.. fontName="..">`
//! and `<br/>`, together with the predefined XML entities.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::{error::ContextError, fonts::StandardFont};

/// A run of text set in a single font at a single size.
#[derive(Clone, Debug, PartialEq)]
pub struct Fragment {
    pub text: String,
    pub font: StandardFont,
    pub font_size: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Text(Fragment),
    LineBreak,
}

/// The text style in effect at some point of the markup.
#[derive(Clone, Copy, Debug)]
struct TextState {
    font: StandardFont,
    font_size: f32,
}

/// Parses the markup into a sequence of styled fragments and explicit line breaks, starting from
/// the given font and size. Adjacent text in the same style is merged into a single fragment.
pub fn parse(markup: &str, font: StandardFont, font_size: f32) -> Result<Vec<Token>, ContextError> {
    let escaped_markup = escape_lone_ampersands(markup);
    let mut reader = Reader::from_str(&escaped_markup);
    // Closing tags are matched against the style stack, `<br>` is never closed
    reader.check_end_names(false);

    let mut tokens = Vec::new();
    let mut open_tags: Vec<(String, TextState)> = Vec::new();
    let mut state = TextState { font, font_size };

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref element)) => {
                open_tag(element, &mut tokens, &mut open_tags, &mut state)?;
            }
            Ok(Event::Empty(ref element)) => {
                let depth = open_tags.len();
                open_tag(element, &mut tokens, &mut open_tags, &mut state)?;
                if open_tags.len() > depth {
                    if let Some((_, previous_state)) = open_tags.pop() {
                        state = previous_state;
                    }
                }
            }
            Ok(Event::End(ref element)) => {
                let closing = tag_name(element.name().as_ref());
                match open_tags.pop() {
                    Some((open, previous_state)) if open == closing => state = previous_state,
                    Some((open, _)) => {
                        return Err(ContextError::with_context(format!(
                            "Closing tag </{}> does not match the open tag <{}>",
                            closing, open
                        )))
                    }
                    None => {
                        return Err(ContextError::with_context(format!(
                            "Closing tag </{}> without a matching open tag",
                            closing
                        )))
                    }
                }
            }
            Ok(Event::Text(text)) => {
                let text = text.unescape().map_err(|error| {
                    ContextError::with_error(format!("Invalid entity in {:?}", markup), &error)
                })?;
                push_text(&mut tokens, &text, state);
            }
            Ok(Event::Eof) => break,
            Err(error) => {
                return Err(ContextError::with_error(
                    format!(
                        "Malformed markup at byte {} of {:?}",
                        reader.buffer_position(),
                        markup
                    ),
                    &error,
                ))
            }
            _ => {}
        }
    }

    if let Some((tag, _)) = open_tags.last() {
        return Err(ContextError::with_context(format!(
            "Unclosed tag <{}> in {:?}",
            tag, markup
        )));
    }

    Ok(tokens)
}

fn tag_name(name: &[u8]) -> String {
    String::from_utf8_lossy(name).to_ascii_lowercase()
}

/// Escapes the ampersands that don't start an entity, so that they are read as literal text.
fn escape_lone_ampersands(markup: &str) -> Cow<'_, str> {
    if !markup.contains('&') {
        return Cow::Borrowed(markup);
    }
    let mut pieces = markup.split('&');
    let mut escaped = String::with_capacity(markup.len());
    escaped.push_str(pieces.next().unwrap_or_default());
    for piece in pieces {
        let starts_entity = piece.split_once(';').is_some_and(|(name, _)| {
            !name.is_empty()
                && name
                    .chars()
                    .all(|character| character.is_ascii_alphanumeric() || character == '#')
        });
        escaped.push_str(if starts_entity { "&" } else { "&amp;" });
        escaped.push_str(piece);
    }
    Cow::Owned(escaped)
}

fn push_text(tokens: &mut Vec<Token>, text: &str, state: TextState) {
    if text.is_empty() {
        return;
    }
    if let Some(Token::Text(last)) = tokens.last_mut() {
        if last.font == state.font && last.font_size == state.font_size {
            last.text.push_str(text);
            return;
        }
    }
    tokens.push(Token::Text(Fragment {
        text: text.to_string(),
        font: state.font,
        font_size: state.font_size,
    }));
}

fn open_tag(
    element: &BytesStart<'_>,
    tokens: &mut Vec<Token>,
    open_tags: &mut Vec<(String, TextState)>,
    state: &mut TextState,
) -> Result<(), ContextError> {
    let name = tag_name(element.name().as_ref());
    match name.as_str() {
        "br" => tokens.push(Token::LineBreak),
        "b" => {
            open_tags.push((name, *state));
            state.font = state.font.with_bold(true);
        }
        "i" => {
            open_tags.push((name, *state));
            state.font = state.font.with_italic(true);
        }
        "font" => {
            open_tags.push((name, *state));
            // Bare values such as `size=10` are allowed, as in HTML
            for attribute in element.html_attributes() {
                let attribute = attribute.map_err(|error| {
                    ContextError::with_error("Invalid attribute of the <font> tag", &error)
                })?;
                let key = tag_name(attribute.key.as_ref());
                let value = attribute.unescape_value().map_err(|error| {
                    ContextError::with_error(
                        format!("Invalid value of the attribute {:?}", key),
                        &error,
                    )
                })?;
                match key.as_str() {
                    "size" => state.font_size = parse_font_size(&value)?,
                    "fontname" | "face" | "name" => state.font = StandardFont::from_name(&value)?,
                    other => log::warn!("Ignoring the unsupported font attribute {:?}", other),
                }
            }
        }
        _ => {
            return Err(ContextError::with_context(format!(
                "Unknown tag <{}>",
                name
            )))
        }
    }

    Ok(())
}

fn parse_font_size(value: &str) -> Result<f32, ContextError> {
    let font_size = value.trim().parse::<f32>().map_err(|error| {
        ContextError::with_error(format!("Invalid font size {:?}", value), &error)
    })?;
    if !font_size.is_finite() || font_size <= 0.0 {
        return Err(ContextError::with_context(format!(
            "The font size {:?} must be a positive number",
            value
        )));
    }
    Ok(font_size)
}
