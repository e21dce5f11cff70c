use std::{collections::HashSet, sync::Arc};

use crate::{
    Error,
    cell::{CellIdx, MAX_RANGE_CELLS, canonical_name, expand_range, range_len},
};

use super::{
    Position,
    ast::{Expr, ExprKind, InfixOp, PrefixOp, Statement, Target},
    lexer::{Lexeme, Token, tokenize},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    Equals,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Call,
}

fn precedence(token: &Token) -> Precedence {
    match token {
        Token::Eq | Token::NotEq => Precedence::Equals,
        Token::Lt | Token::Gt | Token::LtEq | Token::GtEq => Precedence::LessGreater,
        Token::Plus | Token::Minus => Precedence::Sum,
        Token::Star | Token::Slash | Token::Percent => Precedence::Product,
        Token::LParen | Token::Colon => Precedence::Call,
        _ => Precedence::Lowest,
    }
}

fn infix_op(token: &Token) -> Option<InfixOp> {
    Some(match token {
        Token::Plus => InfixOp::Add,
        Token::Minus => InfixOp::Sub,
        Token::Star => InfixOp::Mul,
        Token::Slash => InfixOp::Div,
        Token::Percent => InfixOp::Rem,
        Token::Eq => InfixOp::Eq,
        Token::NotEq => InfixOp::NotEq,
        Token::Lt => InfixOp::Lt,
        Token::Gt => InfixOp::Gt,
        Token::LtEq => InfixOp::LtEq,
        Token::GtEq => InfixOp::GtEq,
        _ => return None,
    })
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyntaxErrorKind {
    #[error("expected an identifier, but got {0}")]
    ExpectedIdent(String),
    #[error("expected {expected}, but got {got}")]
    Expected { expected: &'static str, got: String },
    #[error("expected right paren, but got {0}")]
    ExpectedRParen(String),
    #[error("expected prefix, but got {0}")]
    ExpectedPrefix(String),
    #[error("unexpected {0}")]
    Unexpected(String),
    #[error("range must contain valid cell references (like A1:B2), got {0}:{1}")]
    InvalidRange(String, String),
    #[error("range {0}:{1} names more than {max} cells", max = MAX_RANGE_CELLS)]
    RangeTooLarge(String, String),
}

/// Expands `start:end` unless it names more than [MAX_RANGE_CELLS] cells
fn bounded_range(start: CellIdx, end: CellIdx) -> Result<Vec<CellIdx>, SyntaxErrorKind> {
    match range_len(start, end) {
        Some(len) if len <= MAX_RANGE_CELLS => Ok(expand_range(start, end)),
        _ => Err(SyntaxErrorKind::RangeTooLarge(start.name(), end.name())),
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind} at {pos}")]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub pos: Position,
}

/// An `#include` directive, resolved by the script loader
#[derive(Debug, Clone, PartialEq)]
pub struct Include {
    pub path: String,
    pub pos: Position,
}

/// The result of parsing one source file, before includes are resolved
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFile {
    pub statements: Vec<Statement>,
    pub includes: Vec<Include>,
    pub identifiers: Vec<String>,
}

/// Parses one source file. Include directives are collected, not followed.
pub fn parse_source(source: &str, file: Arc<str>) -> Result<ParsedFile, Error> {
    let lexed = tokenize(source, file)?;
    let parser = Parser {
        lexemes: lexed.lexemes,
        eof: lexed.eof,
        cursor: 0,
        parsed: ParsedFile::default(),
        seen: HashSet::new(),
    };
    Ok(parser.parse()?)
}

struct Parser {
    lexemes: Vec<Lexeme>,
    eof: Position,
    cursor: usize,
    parsed: ParsedFile,
    seen: HashSet<String>,
}

type ParseResult<T> = Result<T, SyntaxError>;

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.lexemes.get(self.cursor).map(|l| &l.token)
    }

    fn peek_pos(&self) -> Position {
        self.lexemes
            .get(self.cursor)
            .map(|l| l.pos.clone())
            .unwrap_or_else(|| self.eof.clone())
    }

    fn advance(&mut self) -> Option<Lexeme> {
        let lexeme = self.lexemes.get(self.cursor).cloned();
        if lexeme.is_some() {
            self.cursor += 1;
        }
        lexeme
    }

    /// Rendering of the current lexeme for error messages
    fn describe_current(&self) -> String {
        self.peek()
            .map(Token::to_string)
            .unwrap_or_else(|| "EOF".to_string())
    }

    fn error(&self, kind: SyntaxErrorKind) -> SyntaxError {
        SyntaxError {
            kind,
            pos: self.peek_pos(),
        }
    }

    fn record(&mut self, name: &str) {
        if self.seen.insert(name.to_string()) {
            self.parsed.identifiers.push(name.to_string());
        }
    }

    fn parse(mut self) -> ParseResult<ParsedFile> {
        while let Some(token) = self.peek() {
            match token {
                Token::Semicolon => {
                    self.advance();
                }
                Token::Include => self.parse_include()?,
                Token::Let | Token::Fmt => self.parse_assignment()?,
                _ => {
                    let expr = self.parse_expression(Precedence::Lowest)?;
                    self.parsed.statements.push(Statement::Expr(expr));
                    self.end_statement()?;
                }
            }
        }
        Ok(self.parsed)
    }

    /// A statement ends with `;`, or with the end of the file
    fn end_statement(&mut self) -> ParseResult<()> {
        match self.peek() {
            None => Ok(()),
            Some(Token::Semicolon) => {
                self.advance();
                Ok(())
            }
            Some(_) => Err(self.error(SyntaxErrorKind::Unexpected(self.describe_current()))),
        }
    }

    fn parse_include(&mut self) -> ParseResult<()> {
        self.advance();
        let pos = self.peek_pos();
        let Some(Token::Str(path)) = self.peek().cloned() else {
            return Err(self.error(SyntaxErrorKind::Expected {
                expected: "include path string",
                got: self.describe_current(),
            }));
        };
        self.advance();
        if let Some(Token::Semicolon) = self.peek() {
            self.advance();
        }
        self.parsed.includes.push(Include { path, pos });
        Ok(())
    }

    fn parse_assignment(&mut self) -> ParseResult<()> {
        let is_fmt = matches!(self.advance().map(|l| l.token), Some(Token::Fmt));
        let targets = self.parse_targets()?;

        if self.peek() != Some(&Token::Assign) {
            return Err(self.error(SyntaxErrorKind::Expected {
                expected: "=",
                got: self.describe_current(),
            }));
        }
        self.advance();

        let value = self.parse_expression(Precedence::Lowest)?;
        self.end_statement()?;

        for target in targets {
            let value = value.clone();
            self.parsed.statements.push(if is_fmt {
                Statement::Fmt { target, value }
            } else {
                Statement::Let { target, value }
            });
        }
        Ok(())
    }

    /// `ident`, `cell:cell`, or a comma separated list of both, expanded to
    /// one target per name
    fn parse_targets(&mut self) -> ParseResult<Vec<Target>> {
        let mut targets = Vec::new();
        loop {
            let pos = self.peek_pos();
            let name = self.expect_ident()?;

            if self.peek() == Some(&Token::Colon) {
                self.advance();
                let end = self.expect_ident()?;
                let cells = match (CellIdx::parse(&name), CellIdx::parse(&end)) {
                    (Some(start), Some(end)) => bounded_range(start, end),
                    _ => Err(SyntaxErrorKind::InvalidRange(name, end)),
                };
                let cells = match cells {
                    Ok(cells) => cells,
                    Err(kind) => return Err(SyntaxError { kind, pos }),
                };
                for cell in cells {
                    let name = cell.name();
                    self.record(&name);
                    targets.push(Target {
                        name,
                        pos: pos.clone(),
                    });
                }
            } else {
                let name = canonical_name(&name);
                self.record(&name);
                targets.push(Target { name, pos });
            }

            if self.peek() != Some(&Token::Comma) {
                return Ok(targets);
            }
            self.advance();
        }
    }

    fn expect_ident(&mut self) -> ParseResult<String> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error(SyntaxErrorKind::ExpectedIdent(self.describe_current()))),
        }
    }

    fn parse_expression(&mut self, prec: Precedence) -> ParseResult<Expr> {
        let mut left = self.parse_prefix()?;

        while let Some(token) = self.peek() {
            if prec >= precedence(token) {
                break;
            }
            let Some(lexeme) = self.advance() else {
                break;
            };
            left = self.parse_infix(left, lexeme)?;
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> ParseResult<Expr> {
        let pos = self.peek_pos();
        let Some(lexeme) = self.advance() else {
            return Err(SyntaxError {
                kind: SyntaxErrorKind::ExpectedPrefix("EOF".to_string()),
                pos,
            });
        };

        let kind = match lexeme.token {
            Token::Int(i) => ExprKind::Int(i),
            Token::Float(x) => ExprKind::Float(x),
            Token::Str(s) => ExprKind::Str(s),
            // `true()` and `false()` name the builtins
            token @ (Token::True | Token::False) if self.peek() == Some(&Token::LParen) => {
                ExprKind::Ident(token.to_string())
            }
            Token::True => ExprKind::Bool(true),
            Token::False => ExprKind::Bool(false),
            Token::Ident(name) => {
                let name = canonical_name(&name);
                // function names are not references
                if self.peek() != Some(&Token::LParen) {
                    self.record(&name);
                }
                ExprKind::Ident(name)
            }
            Token::Minus => {
                let operand = self.parse_expression(Precedence::Prefix)?;
                return Ok(Expr::prefix(PrefixOp::Neg, operand, pos));
            }
            Token::Bang => {
                let operand = self.parse_expression(Precedence::Prefix)?;
                return Ok(Expr::prefix(PrefixOp::Not, operand, pos));
            }
            Token::LParen => {
                let inner = self.parse_expression(Precedence::Lowest)?;
                if self.peek() != Some(&Token::RParen) {
                    return Err(self.error(SyntaxErrorKind::ExpectedRParen(self.describe_current())));
                }
                self.advance();
                return Ok(inner);
            }
            other => {
                return Err(SyntaxError {
                    kind: SyntaxErrorKind::ExpectedPrefix(other.to_string()),
                    pos,
                });
            }
        };

        Ok(Expr::new(kind, pos))
    }

    fn parse_infix(&mut self, left: Expr, lexeme: Lexeme) -> ParseResult<Expr> {
        let pos = lexeme.pos;
        match lexeme.token {
            Token::LParen => self.parse_call(left, pos),
            Token::Colon => self.parse_range(left, pos),
            token => {
                let Some(op) = infix_op(&token) else {
                    return Err(SyntaxError {
                        kind: SyntaxErrorKind::Unexpected(token.to_string()),
                        pos,
                    });
                };
                let right = self.parse_expression(precedence(&token))?;
                Ok(Expr::infix(op, left, right, pos))
            }
        }
    }

    fn parse_call(&mut self, callee: Expr, paren: Position) -> ParseResult<Expr> {
        let ExprKind::Ident(name) = callee.kind else {
            return Err(SyntaxError {
                kind: SyntaxErrorKind::ExpectedIdent(callee.to_string()),
                pos: paren,
            });
        };

        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.advance();
        } else {
            loop {
                args.push(self.parse_expression(Precedence::Lowest)?);
                match self.peek() {
                    Some(Token::Comma) => {
                        self.advance();
                    }
                    Some(Token::RParen) => {
                        self.advance();
                        break;
                    }
                    _ => {
                        return Err(
                            self.error(SyntaxErrorKind::ExpectedRParen(self.describe_current()))
                        );
                    }
                }
            }
        }

        Ok(Expr::new(
            ExprKind::Call(name.to_ascii_uppercase(), args),
            callee.pos,
        ))
    }

    fn parse_range(&mut self, left: Expr, colon: Position) -> ParseResult<Expr> {
        let right = self.parse_expression(Precedence::Call)?;

        let endpoint = |expr: &Expr| match &expr.kind {
            ExprKind::Ident(name) => CellIdx::parse(name),
            _ => None,
        };
        let (Some(start), Some(end)) = (endpoint(&left), endpoint(&right)) else {
            return Err(SyntaxError {
                kind: SyntaxErrorKind::InvalidRange(left.to_string(), right.to_string()),
                pos: colon,
            });
        };

        let cells = bounded_range(start, end).map_err(|kind| SyntaxError {
            kind,
            pos: colon.clone(),
        })?;
        for cell in &cells {
            self.record(&cell.name());
        }

        Ok(Expr::new(ExprKind::Range { start, end, cells }, colon))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(source: &str) -> ParsedFile {
        parse_source(source, Arc::from("")).unwrap()
    }

    fn parse_err(source: &str) -> String {
        parse_source(source, Arc::from("")).unwrap_err().to_string()
    }

    fn rendered(source: &str) -> Vec<String> {
        parse(source)
            .statements
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn precedence_climbing() {
        assert_eq!(
            rendered("1 + 2 * 3; (1 + 2) * 3; -a * b; !x == y; a < b == c > d; 10 - 4 - 3"),
            [
                "(1 + (2 * 3));",
                "((1 + 2) * 3);",
                "((-a) * b);",
                "((!x) == y);",
                "((a < b) == (c > d));",
                "((10 - 4) - 3);",
            ]
        );
    }

    #[test]
    fn calls_and_ranges() {
        assert_eq!(
            rendered("let d1 = sum(a1:c1, 2) + Now();"),
            ["let D1 = (SUM(A1:C1, 2) + NOW());"]
        );

        let parsed = parse("SUM(B2:A1);");
        let Statement::Expr(call) = &parsed.statements[0] else {
            panic!("expected an expression statement");
        };
        let ExprKind::Call(_, args) = &call.kind else {
            panic!("expected a call");
        };
        let ExprKind::Range { cells, .. } = &args[0].kind else {
            panic!("expected a range");
        };
        let names = cells.iter().map(CellIdx::name).collect::<Vec<_>>();
        assert_eq!(names, ["B2", "A2", "B1", "A1"]);
    }

    #[test]
    fn boolean_keywords_can_be_called() {
        assert_eq!(
            rendered("let a = true() == TRUE(); let b = false() != true;"),
            ["let a = (TRUE() == TRUE());", "let b = (FALSE() != true);"]
        );
    }

    #[test]
    fn oversized_ranges_are_rejected() {
        assert_eq!(
            parse_err("let a = SUM(A1:ZZZZZ999999);"),
            "syntax error: range A1:ZZZZZ999999 names more than 1048576 cells at input:1:15"
        );
        assert_eq!(
            parse_err("let A1:ZZ99999 = 1;"),
            "syntax error: range A1:ZZ99999 names more than 1048576 cells at input:1:5"
        );
        assert_eq!(parse("let a = SUM(A1:J100);").statements.len(), 1);
    }

    #[test]
    fn targets_expand() {
        assert_eq!(
            rendered("let A1:A3 = 1;"),
            ["let A1 = 1;", "let A2 = 1;", "let A3 = 1;"]
        );
        assert_eq!(
            rendered("fmt x, b1:c1 = \"%d\";"),
            ["fmt x = \"%d\";", "fmt B1 = \"%d\";", "fmt C1 = \"%d\";"]
        );
    }

    #[test]
    fn identifiers_are_collected() {
        let parsed = parse("let b2 = a1 + total; let x = SUM(A1:A2) + a1;");
        assert_eq!(parsed.identifiers, ["B2", "A1", "total", "x", "A2"]);
    }

    #[test]
    fn semicolons() {
        assert_eq!(rendered("let a = 1"), ["let a = 1;"]);
        assert_eq!(rendered(";; let a = 1;;"), ["let a = 1;"]);
        assert_eq!(
            parse_err("let a = 1 let b = 2"),
            "syntax error: unexpected let at input:1:11"
        );
    }

    #[test]
    fn includes_are_collected() {
        let parsed = parse("#include \"lib.tbl\"\nlet A1 = x;\n#include \"more.tbl\";");
        let paths = parsed
            .includes
            .iter()
            .map(|i| i.path.as_str())
            .collect::<Vec<_>>();
        assert_eq!(paths, ["lib.tbl", "more.tbl"]);
        assert_eq!(parsed.includes[0].pos.to_string(), "input:1:10");
        assert_eq!(parsed.statements.len(), 1);
    }

    #[test]
    fn errors() {
        assert_eq!(
            parse_err("let 1 = 2;"),
            "syntax error: expected an identifier, but got 1 at input:1:5"
        );
        assert_eq!(parse_err("let a 2;"), "syntax error: expected =, but got 2 at input:1:7");
        assert_eq!(
            parse_err("let a = (1 + 2;"),
            "syntax error: expected right paren, but got ; at input:1:15"
        );
        assert_eq!(
            parse_err("let a = SUM(1 2);"),
            "syntax error: expected right paren, but got 2 at input:1:15"
        );
        assert_eq!(
            parse_err("let a = * 2;"),
            "syntax error: expected prefix, but got * at input:1:9"
        );
        assert_eq!(
            parse_err("let a = 1 +"),
            "syntax error: expected prefix, but got EOF at input:1:12"
        );
        assert_eq!(
            parse_err("let a = A1:x;"),
            "syntax error: range must contain valid cell references (like A1:B2), got A1:x at input:1:11"
        );
        assert_eq!(
            parse_err("let x:A2 = 1;"),
            "syntax error: range must contain valid cell references (like A1:B2), got x:A2 at input:1:5"
        );
        assert_eq!(
            parse_err("let a = 1(2);"),
            "syntax error: expected an identifier, but got 1 at input:1:10"
        );
        assert_eq!(
            parse_err("#include 5"),
            "syntax error: expected include path string, but got 5 at input:1:10"
        );
        assert_eq!(
            parse_err("let a = \"open"),
            "lexical error: unterminated string at input:1:9"
        );
    }
}
