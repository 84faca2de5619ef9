use regex::Regex;
use lazy_static::lazy_static;
use crate::error::BbdbError;

lazy_static! {
    pub static ref TOKEN_REGEX: Regex = Regex::new(
        r#"(?s)("(?:[^"\\]|\\.)*")|(;[^\n]*)|(\d+\b)|([A-Za-z][A-Za-z0-9_-]*)|([()\[\].])|(\s+)"#
    ).unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    String,
    Integer,
    Symbol,
    Nil,
    Dot,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Comment,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind:   TokenKind,
    /// Unescaped contents for strings, the raw text otherwise.
    pub text:   String,
    pub line:   usize,
    pub column: usize,
    pub offset: usize,
}

fn syntax_error(unexpected: &str, line: usize, column: usize, offset: usize) -> BbdbError {
    let shown: String = unexpected.chars().take(20).collect();
    BbdbError::Syntax {
        msg: format!("Unexpected text {}", serde_json::Value::String(shown)),
        line,
        column,
        offset,
    }
}

pub fn tokenize(text: &str) -> Result<Vec<Token>, BbdbError> {
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut column = 1;
    let mut last_end = 0;

    for caps in TOKEN_REGEX.captures_iter(text) {
        let Some(mat) = caps.get(0) else { continue };
        let start = mat.start();
        let part  = mat.as_str();

        if start > last_end {
            return Err(syntax_error(&text[last_end..start], line, column, last_end));
        }

        let kind = if caps.get(1).is_some() {
            Some(TokenKind::String)
        } else if caps.get(2).is_some() {
            Some(TokenKind::Comment)
        } else if caps.get(3).is_some() {
            Some(TokenKind::Integer)
        } else if caps.get(4).is_some() {
            Some(if part == "nil" { TokenKind::Nil } else { TokenKind::Symbol })
        } else if caps.get(5).is_some() {
            Some(match part {
                "(" => TokenKind::LeftParen,
                ")" => TokenKind::RightParen,
                "[" => TokenKind::LeftBracket,
                "]" => TokenKind::RightBracket,
                _   => TokenKind::Dot,
            })
        } else {
            None
        };

        if let Some(kind) = kind {
            let text = match kind {
                TokenKind::String => crate::utils::unescape(&part[1..part.len() - 1]),
                _ => part.to_string(),
            };
            tokens.push(Token { kind, text, line, column, offset: start });
        }

        // Strings and whitespace may span lines
        let newline_count = part.matches('\n').count();
        if newline_count > 0 {
            line += newline_count;
            if let Some(last_line_part) = part.split('\n').last() {
                column = last_line_part.chars().count() + 1;
            }
        } else {
            column += part.chars().count();
        }

        last_end = mat.end();
    }

    if last_end != text.len() {
        return Err(syntax_error(&text[last_end..], line, column, last_end));
    }

    tokens.push(Token {
        kind:   TokenKind::Eof,
        text:   String::new(),
        line,
        column,
        offset: text.len(),
    });
    Ok(tokens)
}
