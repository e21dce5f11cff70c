use std::fmt;

use crate::cell::CellIdx;

use super::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOp {
    Neg,
    Not,
}
impl fmt::Display for PrefixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PrefixOp::Neg => "-",
            PrefixOp::Not => "!",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
}
impl InfixOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            InfixOp::Add => "+",
            InfixOp::Sub => "-",
            InfixOp::Mul => "*",
            InfixOp::Div => "/",
            InfixOp::Rem => "%",
            InfixOp::Eq => "==",
            InfixOp::NotEq => "!=",
            InfixOp::Lt => "<",
            InfixOp::Gt => ">",
            InfixOp::LtEq => "<=",
            InfixOp::GtEq => ">=",
        }
    }
}
impl fmt::Display for InfixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// An expression node and the position of the lexeme that produced it
///
/// For infix and range nodes the position is the operator, for calls it is
/// the function name.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    /// A cell name (canonical uppercase) or a free variable
    Ident(String),
    Prefix(PrefixOp, Box<Expr>),
    Infix(InfixOp, Box<Expr>, Box<Expr>),
    /// Fn name, then arguments list
    Call(String, Vec<Expr>),
    /// Endpoints plus the row-major enumeration between them
    Range {
        start: CellIdx,
        end: CellIdx,
        cells: Vec<CellIdx>,
    },
}

impl Expr {
    pub fn new(kind: ExprKind, pos: Position) -> Self {
        Self { kind, pos }
    }
    pub fn prefix(op: PrefixOp, operand: Expr, pos: Position) -> Self {
        Self::new(ExprKind::Prefix(op, Box::new(operand)), pos)
    }
    pub fn infix(op: InfixOp, lhs: Expr, rhs: Expr, pos: Position) -> Self {
        Self::new(ExprKind::Infix(op, Box::new(lhs), Box::new(rhs)), pos)
    }

    /// Every name this expression depends on, including range members
    pub fn dependencies(&self) -> Vec<String> {
        let mut deps = Vec::new();
        self.collect_dependencies(&mut deps);
        deps
    }

    fn collect_dependencies(&self, deps: &mut Vec<String>) {
        match &self.kind {
            ExprKind::Range { cells, .. } => deps.extend(cells.iter().map(CellIdx::name)),
            ExprKind::Prefix(_, operand) => operand.collect_dependencies(deps),
            ExprKind::Infix(_, lhs, rhs) => {
                lhs.collect_dependencies(deps);
                rhs.collect_dependencies(deps);
            }
            ExprKind::Call(_, args) => {
                for arg in args {
                    arg.collect_dependencies(deps);
                }
            }
            ExprKind::Ident(name) => deps.push(name.clone()),
            ExprKind::Int(_) | ExprKind::Float(_) | ExprKind::Str(_) | ExprKind::Bool(_) => {}
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Int(i) => write!(f, "{i}"),
            ExprKind::Float(x) => write!(f, "{x:?}"),
            ExprKind::Str(s) => write!(f, "{s:?}"),
            ExprKind::Bool(b) => write!(f, "{b}"),
            ExprKind::Ident(name) => f.write_str(name),
            ExprKind::Prefix(op, operand) => write!(f, "({op}{operand})"),
            ExprKind::Infix(op, lhs, rhs) => write!(f, "({lhs} {op} {rhs})"),
            ExprKind::Call(name, args) => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            ExprKind::Range { start, end, .. } => write!(f, "{start}:{end}"),
        }
    }
}

/// The single name a `let` or `fmt` statement assigns to
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub name: String,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Let { target: Target, value: Expr },
    Fmt { target: Target, value: Expr },
    Expr(Expr),
}
impl Statement {
    /// Name defined by a `let`, if any
    pub fn defines(&self) -> Option<&str> {
        match self {
            Statement::Let { target, .. } => Some(&target.name),
            Statement::Fmt { .. } | Statement::Expr(_) => None,
        }
    }

    pub fn expr(&self) -> &Expr {
        match self {
            Statement::Let { value, .. } | Statement::Fmt { value, .. } => value,
            Statement::Expr(expr) => expr,
        }
    }

    pub fn pos(&self) -> &Position {
        match self {
            Statement::Let { target, .. } | Statement::Fmt { target, .. } => &target.pos,
            Statement::Expr(expr) => &expr.pos,
        }
    }
}
impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Let { target, value } => write!(f, "let {} = {value};", target.name),
            Statement::Fmt { target, value } => write!(f, "fmt {} = {value};", target.name),
            Statement::Expr(expr) => write!(f, "{expr};"),
        }
    }
}

/// A parsed script
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
    /// Every referenced identifier, deduplicated, in first-seen order
    pub identifiers: Vec<String>,
}
impl Program {
    /// Cells referenced anywhere in the program
    pub fn cells(&self) -> impl Iterator<Item = CellIdx> + '_ {
        self.identifiers.iter().filter_map(|id| CellIdx::parse(id))
    }
}
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for statement in &self.statements {
            writeln!(f, "{statement}")?;
        }
        Ok(())
    }
}
