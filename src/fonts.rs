use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization as _;

use crate::error::ContextError;

/// The members of the base-14 Helvetica family. These fonts are guaranteed to be available in every
/// PDF viewer, so they are referenced by name and never embedded into the document.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum StandardFont {
    #[default]
    #[serde(rename = "Helvetica")]
    Helvetica,
    #[serde(rename = "Helvetica-Bold")]
    HelveticaBold,
    #[serde(rename = "Helvetica-Oblique")]
    HelveticaOblique,
    #[serde(rename = "Helvetica-BoldOblique")]
    HelveticaBoldOblique,
}

/// Width used for the characters outside of the printable ASCII range.
const FALLBACK_WIDTH: u16 = 556;

/// Advance widths of Helvetica for the WinAnsi codes 32 to 126, taken from the Adobe AFM file.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Advance widths of Helvetica-Bold for the WinAnsi codes 32 to 126, taken from the Adobe AFM file.
#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// The characters WinAnsi places in the 0x80..=0x9F range, where Latin-1 has control codes.
const WIN_ANSI_SPECIALS: [(char, u8); 27] = [
    ('€', 0x80),
    ('‚', 0x82),
    ('ƒ', 0x83),
    ('„', 0x84),
    ('…', 0x85),
    ('†', 0x86),
    ('‡', 0x87),
    ('ˆ', 0x88),
    ('‰', 0x89),
    ('Š', 0x8A),
    ('‹', 0x8B),
    ('Œ', 0x8C),
    ('Ž', 0x8E),
    ('‘', 0x91),
    ('’', 0x92),
    ('“', 0x93),
    ('”', 0x94),
    ('•', 0x95),
    ('–', 0x96),
    ('—', 0x97),
    ('˜', 0x98),
    ('™', 0x99),
    ('š', 0x9A),
    ('›', 0x9B),
    ('œ', 0x9C),
    ('ž', 0x9E),
    ('Ÿ', 0x9F),
];

impl StandardFont {
    /// All the fonts of the family, in the order their resource names are assigned.
    pub const ALL: [StandardFont; 4] = [
        StandardFont::Helvetica,
        StandardFont::HelveticaBold,
        StandardFont::HelveticaOblique,
        StandardFont::HelveticaBoldOblique,
    ];

    /// The name under which PDF viewers know the font, to be used as `BaseFont`.
    pub fn base_font_name(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::HelveticaOblique => "Helvetica-Oblique",
            StandardFont::HelveticaBoldOblique => "Helvetica-BoldOblique",
        }
    }

    /// Parses a font from its PDF name, as found in the `fontName` attribute of the markup.
    pub fn from_name(name: &str) -> Result<Self, ContextError> {
        StandardFont::ALL
            .into_iter()
            .find(|font| font.base_font_name() == name)
            .ok_or_else(|| ContextError::with_context(format!("Unsupported font {:?}", name)))
    }

    pub fn is_bold(&self) -> bool {
        matches!(
            self,
            StandardFont::HelveticaBold | StandardFont::HelveticaBoldOblique
        )
    }

    pub fn is_italic(&self) -> bool {
        matches!(
            self,
            StandardFont::HelveticaOblique | StandardFont::HelveticaBoldOblique
        )
    }

    /// The font of the family with the same slant as this one but the given weight.
    pub fn with_bold(self, bold: bool) -> Self {
        Self::from_traits(bold, self.is_italic())
    }

    /// The font of the family with the same weight as this one but the given slant.
    pub fn with_italic(self, italic: bool) -> Self {
        Self::from_traits(self.is_bold(), italic)
    }

    fn from_traits(bold: bool, italic: bool) -> Self {
        match (bold, italic) {
            (false, false) => StandardFont::Helvetica,
            (true, false) => StandardFont::HelveticaBold,
            (false, true) => StandardFont::HelveticaOblique,
            (true, true) => StandardFont::HelveticaBoldOblique,
        }
    }

    /// Width of a single character in thousandths of an em. The oblique faces share the
    /// metrics of their upright counterparts.
    pub fn character_width(&self, character: char) -> u16 {
        let widths = if self.is_bold() {
            &HELVETICA_BOLD_WIDTHS
        } else {
            &HELVETICA_WIDTHS
        };
        match character as u32 {
            code @ 32..=126 => widths[(code - 32) as usize],
            _ => FALLBACK_WIDTH,
        }
    }

    /// Width in points of the text when set at the given font size.
    pub fn text_width(&self, text: &str, font_size: f32) -> f32 {
        let units: u32 = text
            .nfc()
            .map(|character| u32::from(self.character_width(character)))
            .sum();
        units as f32 * font_size / 1000.0
    }
}

/// Encodes the text as single bytes in the WinAnsi encoding, which is the one declared by the
/// font dictionaries. The text is normalized in the NFC form first so that decomposed accents still
/// find their precomposed code; characters without a code are replaced with a question mark.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.nfc()
        .map(|character| match win_ansi_code(character) {
            Some(code) => code,
            None => {
                log::warn!(
                    "Unable to find the character {:?} in the WinAnsi encoding",
                    character
                );
                b'?'
            }
        })
        .collect()
}

fn win_ansi_code(character: char) -> Option<u8> {
    match character as u32 {
        code @ (0x20..=0x7E | 0xA0..=0xFF) => Some(code as u8),
        _ => WIN_ANSI_SPECIALS
            .iter()
            .find(|(special, _)| *special == character)
            .map(|(_, code)| *code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng as _;

    #[test]
    fn measures_text_with_the_afm_widths() {
        // H = 722, i = 222
        assert!((StandardFont::Helvetica.text_width("Hi", 10.0) - 9.44).abs() < 1e-4);
        // H = 722, i = 278
        assert!((StandardFont::HelveticaBold.text_width("Hi", 10.0) - 10.0).abs() < 1e-4);
    }

    #[test]
    fn oblique_faces_share_the_upright_widths() {
        let text = "DEFICIENCIES AND SHORTCOMINGS";
        assert_eq!(
            StandardFont::Helvetica.text_width(text, 8.0),
            StandardFont::HelveticaOblique.text_width(text, 8.0)
        );
        assert_eq!(
            StandardFont::HelveticaBold.text_width(text, 8.0),
            StandardFont::HelveticaBoldOblique.text_width(text, 8.0)
        );
    }

    #[test]
    fn derives_variants_of_the_family() {
        assert_eq!(
            StandardFont::HelveticaBold.with_italic(true),
            StandardFont::HelveticaBoldOblique
        );
        assert_eq!(
            StandardFont::HelveticaBoldOblique.with_bold(false),
            StandardFont::HelveticaOblique
        );
        assert_eq!(
            StandardFont::from_name("Helvetica-Bold").unwrap(),
            StandardFont::HelveticaBold
        );
        assert!(StandardFont::from_name("Times-Roman").is_err());
    }

    #[test]
    fn encodes_latin_text_and_replaces_the_rest() {
        assert_eq!(encode_win_ansi("TM DATE"), b"TM DATE".to_vec());
        assert_eq!(encode_win_ansi("caf\u{e9} \u{2014}"), vec![b'c', b'a', b'f', 0xE9, b' ', 0x97]);
        // The decomposed form is normalized before encoding
        assert_eq!(encode_win_ansi("e\u{301}"), vec![0xE9]);
        assert_eq!(encode_win_ansi("\u{3042}"), b"?".to_vec());
    }

    #[test]
    fn random_text_encodes_to_one_byte_per_normalized_character() {
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let length = rng.gen_range(1..=200);
            let text = rand_utf8::rand_utf8(&mut rng, length).to_string();
            let normalized_length = text.nfc().count();
            assert_eq!(encode_win_ansi(&text).len(), normalized_length);
        }
    }
}
