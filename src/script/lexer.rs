//! Лексический разбор сценария
//!
//! Текст превращается в плоский список токенов трех видов: маркер слайда,
//! строка с меткой говорящего и обычная строка текста.

use lazy_static::lazy_static;
use regex::Regex;
use crate::script::{Speaker, SpeakerBindings};

lazy_static! {
    /// `[SLIDE 3]`, `**[slide 3]**`, а также незакрытое `[SLIDE 3`
    static ref SLIDE_MARKER: Regex = Regex::new(r"(?i)[*_]*\[[ \t]*slide[ \t]*(\d+)[ \t]*\]?[*_]*").unwrap();
    /// `Host: ...`, `**Host:** ...`, `**Host**: ...`, `Ведущий： ...`
    static ref SPEAKER_LABEL: Regex =
        Regex::new(r"^\s*[*_]*(?P<label>[^:：*\n]+?)[*_]*\s*[:：][*_]*\s*(?P<rest>.*)$").unwrap();
}

/// Токен сценария
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Маркер слайда с номером страницы (с единицы, не меньше 1)
    SlideMarker { page: usize },
    /// Строка, начинающаяся с метки говорящего
    SpeakerLabel { speaker: Speaker, content: &'a str },
    /// Строка без метки
    TextLine(&'a str),
}

/// Разбить текст на токены
pub fn tokenize<'a>(text: &'a str, bindings: &SpeakerBindings) -> Vec<Token<'a>> {
    let mut tokens = Vec::new();
    let mut block_start = 0;

    for caps in SLIDE_MARKER.captures_iter(text) {
        let Some(marker) = caps.get(0) else { continue };
        tokenize_block(&text[block_start..marker.start()], bindings, &mut tokens);
        block_start = marker.end();

        match caps[1].parse::<usize>() {
            Ok(page) => tokens.push(Token::SlideMarker { page: page.max(1) }),
            Err(e) => log::warn!("Ignoring slide marker {:?}: {}", marker.as_str(), e),
        }
    }
    tokenize_block(&text[block_start..], bindings, &mut tokens);

    tokens
}

fn tokenize_block<'a>(block: &'a str, bindings: &SpeakerBindings, tokens: &mut Vec<Token<'a>>) {
    for line in block.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        tokens.push(classify_line(line, bindings));
    }
}

/// Строка с меткой, которая не совпала ни с одной ролью, считается текстом
fn classify_line<'a>(line: &'a str, bindings: &SpeakerBindings) -> Token<'a> {
    if let Some(caps) = SPEAKER_LABEL.captures(line) {
        if let (Some(label), Some(rest)) = (caps.name("label"), caps.name("rest")) {
            if let Some(speaker) = bindings.resolve(label.as_str()) {
                return Token::SpeakerLabel {
                    speaker,
                    content: rest.as_str().trim(),
                };
            }
        }
    }
    Token::TextLine(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings() -> SpeakerBindings {
        SpeakerBindings::new("Host", "Expert")
    }

    #[test]
    fn test_tokenize_markers_and_labels() {
        let tokens = tokenize("[SLIDE 1]\nHost: Hello.\nmore text\n[slide 2]\nExpert: Hi.", &bindings());
        assert_eq!(
            tokens,
            vec![
                Token::SlideMarker { page: 1 },
                Token::SpeakerLabel { speaker: Speaker::Primary, content: "Hello." },
                Token::TextLine("more text"),
                Token::SlideMarker { page: 2 },
                Token::SpeakerLabel { speaker: Speaker::Secondary, content: "Hi." },
            ]
        );
    }

    #[test]
    fn test_emphasis_and_unclosed_markers() {
        let tokens = tokenize("**[SLIDE 3]**\n**Host:** Bold label.\n[SLIDE 4\n__Expert__: Underlined.", &bindings());
        assert_eq!(
            tokens,
            vec![
                Token::SlideMarker { page: 3 },
                Token::SpeakerLabel { speaker: Speaker::Primary, content: "Bold label." },
                Token::SlideMarker { page: 4 },
                Token::SpeakerLabel { speaker: Speaker::Secondary, content: "Underlined." },
            ]
        );
    }

    #[test]
    fn test_page_zero_is_clamped() {
        let tokens = tokenize("[SLIDE 0] Host: Zero.", &bindings());
        assert_eq!(tokens[0], Token::SlideMarker { page: 1 });
        assert_eq!(tokens[1], Token::SpeakerLabel { speaker: Speaker::Primary, content: "Zero." });
    }

    #[test]
    fn test_unknown_label_is_text() {
        let tokens = tokenize("Note: not a speaker\nhttps://example.com", &bindings());
        assert_eq!(
            tokens,
            vec![Token::TextLine("Note: not a speaker"), Token::TextLine("https://example.com")]
        );
    }

    #[test]
    fn test_underscore_inside_name() {
        let bindings = SpeakerBindings::new("Mary_Ann", "Jean_Luc");
        let tokens = tokenize("Mary_Ann: Hello.\n__Jean_Luc__: Bonjour.\n**Mary_Ann:** Again.", &bindings);
        assert_eq!(
            tokens,
            vec![
                Token::SpeakerLabel { speaker: Speaker::Primary, content: "Hello." },
                Token::SpeakerLabel { speaker: Speaker::Secondary, content: "Bonjour." },
                Token::SpeakerLabel { speaker: Speaker::Primary, content: "Again." },
            ]
        );
    }

    #[test]
    fn test_full_width_colon_and_keywords() {
        let tokens = tokenize("Primary：こんにちは。\nsecondary: Hello.", &bindings());
        assert_eq!(
            tokens,
            vec![
                Token::SpeakerLabel { speaker: Speaker::Primary, content: "こんにちは。" },
                Token::SpeakerLabel { speaker: Speaker::Secondary, content: "Hello." },
            ]
        );
    }
}
