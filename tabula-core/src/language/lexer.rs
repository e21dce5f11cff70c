use std::{fmt, sync::Arc};

use logos::Logos;

use super::Position;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    #[regex(r"//[^\n]*", logos::skip, allow_greedy = true)]
    #[regex(r"/\*([^*]|\*+[^*/])*\*+/", logos::skip, allow_greedy = true)]
    Comment,

    #[token("let")]
    Let,
    #[token("fmt")]
    Fmt,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("#include")]
    Include,

    #[regex("[A-Za-z][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
    #[regex("[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),
    #[regex(r"[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),
    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| unescape(lex.slice()))]
    Str(String),

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("!")]
    Bang,
    #[token("=")]
    Assign,
    #[token("==")]
    Eq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Comment => Ok(()),
            Token::Let => f.write_str("let"),
            Token::Fmt => f.write_str("fmt"),
            Token::True => f.write_str("true"),
            Token::False => f.write_str("false"),
            Token::Include => f.write_str("#include"),
            Token::Ident(name) => f.write_str(name),
            Token::Int(i) => write!(f, "{i}"),
            Token::Float(x) => write!(f, "{x}"),
            Token::Str(s) => write!(f, "{s:?}"),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Star => f.write_str("*"),
            Token::Slash => f.write_str("/"),
            Token::Percent => f.write_str("%"),
            Token::Bang => f.write_str("!"),
            Token::Assign => f.write_str("="),
            Token::Eq => f.write_str("=="),
            Token::NotEq => f.write_str("!="),
            Token::Lt => f.write_str("<"),
            Token::Gt => f.write_str(">"),
            Token::LtEq => f.write_str("<="),
            Token::GtEq => f.write_str(">="),
            Token::Comma => f.write_str(","),
            Token::Semicolon => f.write_str(";"),
            Token::Colon => f.write_str(":"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
        }
    }
}

/// Strips the quotes of a string literal and resolves its escapes
fn unescape(literal: &str) -> Option<String> {
    let inner = literal.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            '"' => out.push('"'),
            '\\' => out.push('\\'),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            _ => return None,
        }
    }
    Some(out)
}

/// A token together with where it starts
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub token: Token,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexErrorKind {
    #[error("unterminated string")]
    UnterminatedString,
    #[error("invalid escape sequence \\{0} in string")]
    InvalidEscape(char),
    #[error("invalid number {0}")]
    InvalidNumber(String),
    #[error("illegal character {0}")]
    IllegalCharacter(char),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind} at {pos}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub pos: Position,
}

/// Maps byte offsets to 1-based line and character columns
struct LineIndex<'src> {
    source: &'src str,
    line_starts: Vec<usize>,
    file: Arc<str>,
}
impl<'src> LineIndex<'src> {
    fn new(source: &'src str, file: Arc<str>) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            source,
            line_starts,
            file,
        }
    }

    fn position(&self, offset: usize) -> Position {
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let start = self.line_starts[line - 1];
        let column = self.source[start..offset].chars().count() + 1;
        Position::new(self.file.clone(), line, column)
    }
}

/// The lexemes of one source file plus the position just past its end
#[derive(Debug, Clone)]
pub struct Lexemes {
    pub lexemes: Vec<Lexeme>,
    pub eof: Position,
}

/// Splits `source` into lexemes, failing on the first character that
/// cannot start a token
pub fn tokenize(source: &str, file: Arc<str>) -> Result<Lexemes, LexError> {
    let index = LineIndex::new(source, file);
    let mut lexer = Token::lexer(source);
    let mut lexemes = Vec::new();

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let pos = index.position(span.start);
        match result {
            Ok(token) => lexemes.push(Lexeme { token, pos }),
            Err(()) => {
                let kind = classify(&source[span.start..], lexer.slice());
                return Err(LexError { kind, pos });
            }
        }
    }

    Ok(Lexemes {
        lexemes,
        eof: index.position(source.len()),
    })
}

/// Works out why lexing failed at the start of `rest`
fn classify(rest: &str, slice: &str) -> LexErrorKind {
    let mut chars = rest.chars();
    match chars.next() {
        Some('"') => {
            while let Some(c) = chars.next() {
                match c {
                    '\n' | '"' => break,
                    '\\' => match chars.next() {
                        Some('"' | '\\' | 'n' | 't') => {}
                        Some('\n') | None => break,
                        Some(other) => return LexErrorKind::InvalidEscape(other),
                    },
                    _ => {}
                }
            }
            LexErrorKind::UnterminatedString
        }
        Some(c) if c.is_ascii_digit() => LexErrorKind::InvalidNumber(slice.to_string()),
        Some(c) => LexErrorKind::IllegalCharacter(c),
        None => LexErrorKind::IllegalCharacter('\0'),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        tokenize(source, Arc::from(""))
            .unwrap()
            .lexemes
            .into_iter()
            .map(|l| l.token)
            .collect()
    }

    fn lex_err(source: &str) -> String {
        tokenize(source, Arc::from("")).unwrap_err().to_string()
    }

    #[test]
    fn statement() {
        assert_eq!(
            lex("let A1 = SUM(B1:B3) * 2.5;"),
            vec![
                Token::Let,
                Token::Ident("A1".into()),
                Token::Assign,
                Token::Ident("SUM".into()),
                Token::LParen,
                Token::Ident("B1".into()),
                Token::Colon,
                Token::Ident("B3".into()),
                Token::RParen,
                Token::Star,
                Token::Float(2.5),
                Token::Semicolon,
            ]
        );
    }

    #[test]
    fn two_character_operators() {
        assert_eq!(
            lex("== != <= >= = ! < >"),
            vec![
                Token::Eq,
                Token::NotEq,
                Token::LtEq,
                Token::GtEq,
                Token::Assign,
                Token::Bang,
                Token::Lt,
                Token::Gt,
            ]
        );
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            lex("let letter fmt true falsey"),
            vec![
                Token::Let,
                Token::Ident("letter".into()),
                Token::Fmt,
                Token::True,
                Token::Ident("falsey".into()),
            ]
        );
    }

    #[test]
    fn strings_and_escapes() {
        assert_eq!(
            lex(r#""a \"quoted\" \\ word\n""#),
            vec![Token::Str("a \"quoted\" \\ word\n".into())]
        );
        assert_eq!(lex(r#""""#), vec![Token::Str(String::new())]);
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            lex("1 // one\n/* two\n **/ 3"),
            vec![Token::Int(1), Token::Int(3)]
        );
    }

    #[test]
    fn include_directive() {
        assert_eq!(
            lex(r#"#include "lib.tbl";"#),
            vec![
                Token::Include,
                Token::Str("lib.tbl".into()),
                Token::Semicolon
            ]
        );
    }

    #[test]
    fn positions() {
        let lexed = tokenize("let x = 1;\n  let y = \"é\" + 2;", Arc::from("a.tbl")).unwrap();
        let plus = &lexed.lexemes[9];
        assert_eq!(plus.token, Token::Plus);
        assert_eq!(plus.pos.to_string(), "a.tbl:2:15");
        assert_eq!(lexed.eof.to_string(), "a.tbl:2:19");
    }

    #[test]
    fn errors() {
        assert_eq!(lex_err("let x = \"abc"), "unterminated string at input:1:9");
        assert_eq!(lex_err("let x = \"ab\ncd\""), "unterminated string at input:1:9");
        assert_eq!(
            lex_err(r#"let x = "a\qb";"#),
            "invalid escape sequence \\q in string at input:1:9"
        );
        assert_eq!(lex_err("let x = 1 @ 2"), "illegal character @ at input:1:11");
        assert_eq!(lex_err("\n  #"), "illegal character # at input:2:3");
        assert_eq!(
            lex_err("99999999999999999999"),
            "invalid number 99999999999999999999 at input:1:1"
        );
    }
}
