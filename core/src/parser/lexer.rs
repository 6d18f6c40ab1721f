//! Hand-written lexer producing a flat token vector.

use bumpalo::Bump;

use super::error::{ParseError, ParseErrorKind};
use super::syntax::Span;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind<'a> {
    Number(f64),
    Str(&'a str),
    Ident(&'a str),

    // Keywords.
    Let,
    Var,
    Fn,
    Class,
    Interface,
    Type,
    Extends,
    New,
    This,
    If,
    Else,
    True,
    False,

    // Punctuation and operators.
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Dot,
    Question,
    Bang,
    Assign,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Pipe,
    Amp,
    FatArrow,

    Eof,
}

#[derive(Debug, Clone, Copy)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: TokenSpan,
}

/// Copyable span for tokens; converted to [`Span`] at use sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSpan {
    pub start: usize,
    pub end: usize,
}

impl TokenSpan {
    pub fn to_span(self) -> Span {
        Span::new(self.start, self.end)
    }
}

pub fn lex<'a>(arena: &'a Bump, source: &'a str) -> Result<Vec<Token<'a>>, ParseError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let start = i;
        let c = bytes[i];
        match c {
            b' ' | b'\t' | b'\r' | b'\n' => {
                i += 1;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'0'..=b'9' => {
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                if i < bytes.len()
                    && bytes[i] == b'.'
                    && bytes.get(i + 1).is_some_and(|b| b.is_ascii_digit())
                {
                    i += 1;
                    while i < bytes.len() && bytes[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                let text = &source[start..i];
                let value = text.parse::<f64>().map_err(|_| {
                    ParseError::new(ParseErrorKind::InvalidNumber {
                        text: text.to_string(),
                        span: Span::new(start, i),
                    })
                })?;
                tokens.push(Token {
                    kind: TokenKind::Number(value),
                    span: TokenSpan { start, end: i },
                });
            }
            b'"' => {
                i += 1;
                let mut text = String::new();
                loop {
                    if i >= bytes.len() || bytes[i] == b'\n' {
                        return Err(ParseError::new(ParseErrorKind::UnterminatedString {
                            span: Span::new(start, i),
                        }));
                    }
                    match bytes[i] {
                        b'"' => {
                            i += 1;
                            break;
                        }
                        b'\\' => {
                            let esc = bytes.get(i + 1).copied();
                            let replacement = match esc {
                                Some(b'n') => '\n',
                                Some(b't') => '\t',
                                Some(b'"') => '"',
                                Some(b'\\') => '\\',
                                _ => {
                                    return Err(ParseError::new(
                                        ParseErrorKind::InvalidEscape {
                                            span: Span::new(i, i + 2),
                                        },
                                    ));
                                }
                            };
                            text.push(replacement);
                            i += 2;
                        }
                        _ => {
                            // Copy the whole UTF-8 character, not just a byte.
                            let ch_len = source[i..]
                                .chars()
                                .next()
                                .map(char::len_utf8)
                                .unwrap_or(1);
                            text.push_str(&source[i..i + ch_len]);
                            i += ch_len;
                        }
                    }
                }
                tokens.push(Token {
                    kind: TokenKind::Str(arena.alloc_str(&text)),
                    span: TokenSpan { start, end: i },
                });
            }
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_')
                {
                    i += 1;
                }
                let text = &source[start..i];
                let kind = match text {
                    "let" => TokenKind::Let,
                    "var" => TokenKind::Var,
                    "fn" => TokenKind::Fn,
                    "class" => TokenKind::Class,
                    "interface" => TokenKind::Interface,
                    "type" => TokenKind::Type,
                    "extends" => TokenKind::Extends,
                    "new" => TokenKind::New,
                    "this" => TokenKind::This,
                    "if" => TokenKind::If,
                    "else" => TokenKind::Else,
                    "true" => TokenKind::True,
                    "false" => TokenKind::False,
                    _ => TokenKind::Ident(text),
                };
                tokens.push(Token {
                    kind,
                    span: TokenSpan { start, end: i },
                });
            }
            _ => {
                let two = bytes.get(i + 1).copied();
                let (kind, len) = match (c, two) {
                    (b'=', Some(b'=')) => (TokenKind::EqEq, 2),
                    (b'=', Some(b'>')) => (TokenKind::FatArrow, 2),
                    (b'!', Some(b'=')) => (TokenKind::NotEq, 2),
                    (b'<', Some(b'=')) => (TokenKind::Le, 2),
                    (b'>', Some(b'=')) => (TokenKind::Ge, 2),
                    (b'=', _) => (TokenKind::Assign, 1),
                    (b'!', _) => (TokenKind::Bang, 1),
                    (b'<', _) => (TokenKind::Lt, 1),
                    (b'>', _) => (TokenKind::Gt, 1),
                    (b'(', _) => (TokenKind::LParen, 1),
                    (b')', _) => (TokenKind::RParen, 1),
                    (b'{', _) => (TokenKind::LBrace, 1),
                    (b'}', _) => (TokenKind::RBrace, 1),
                    (b',', _) => (TokenKind::Comma, 1),
                    (b'.', _) => (TokenKind::Dot, 1),
                    (b'?', _) => (TokenKind::Question, 1),
                    (b'+', _) => (TokenKind::Plus, 1),
                    (b'-', _) => (TokenKind::Minus, 1),
                    (b'*', _) => (TokenKind::Star, 1),
                    (b'/', _) => (TokenKind::Slash, 1),
                    (b'|', _) => (TokenKind::Pipe, 1),
                    (b'&', _) => (TokenKind::Amp, 1),
                    _ => {
                        return Err(ParseError::new(ParseErrorKind::UnexpectedChar {
                            found: source[i..].chars().next().unwrap_or('\u{fffd}'),
                            span: Span::new(i, i + 1),
                        }));
                    }
                };
                tokens.push(Token {
                    kind,
                    span: TokenSpan {
                        start: i,
                        end: i + len,
                    },
                });
                i += len;
            }
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        span: TokenSpan {
            start: bytes.len(),
            end: bytes.len(),
        },
    });
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds<'a>(arena: &'a Bump, source: &'a str) -> Vec<TokenKind<'a>> {
        lex(arena, source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_numbers_and_operators() {
        let arena = Bump::new();
        assert_eq!(
            kinds(&arena, "1 + 2.5"),
            vec![
                TokenKind::Number(1.0),
                TokenKind::Plus,
                TokenKind::Number(2.5),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn distinguishes_compound_operators() {
        let arena = Bump::new();
        assert_eq!(
            kinds(&arena, "= == => <= < !="),
            vec![
                TokenKind::Assign,
                TokenKind::EqEq,
                TokenKind::FatArrow,
                TokenKind::Le,
                TokenKind::Lt,
                TokenKind::NotEq,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_keywords_and_idents() {
        let arena = Bump::new();
        assert_eq!(
            kinds(&arena, "let letx this"),
            vec![
                TokenKind::Let,
                TokenKind::Ident("letx"),
                TokenKind::This,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_string_escapes() {
        let arena = Bump::new();
        assert_eq!(
            kinds(&arena, r#""a\nb""#),
            vec![TokenKind::Str("a\nb"), TokenKind::Eof]
        );
    }

    #[test]
    fn rejects_unterminated_string() {
        let arena = Bump::new();
        assert!(lex(&arena, "\"abc").is_err());
    }

    #[test]
    fn skips_line_comments() {
        let arena = Bump::new();
        assert_eq!(
            kinds(&arena, "1 // comment\n2"),
            vec![TokenKind::Number(1.0), TokenKind::Number(2.0), TokenKind::Eof]
        );
    }
}
