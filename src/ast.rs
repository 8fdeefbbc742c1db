use crate::diagnostic::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Rem,
    Quot,
    Pow,
    Eq,
    NotEq,
    Greater,
    Less,
    GreaterEq,
    LessEq,
    And,
    Or,
    In,
    Matches,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "mod",
            BinaryOp::Rem => "rem",
            BinaryOp::Quot => "quot",
            BinaryOp::Pow => "**",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Greater => ">",
            BinaryOp::Less => "<",
            BinaryOp::GreaterEq => ">=",
            BinaryOp::LessEq => "<=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::In => "in",
            BinaryOp::Matches => "matches",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Greater
                | BinaryOp::Less
                | BinaryOp::GreaterEq
                | BinaryOp::LessEq
                | BinaryOp::In
                | BinaryOp::Matches
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    NoneLit,

    /// `.` — the input stream unchanged.
    Identity,
    /// `$name` lookup in the evaluation context.
    Variable(String),

    FieldAccess {
        base: Box<Expr>,
        field: String,
    },
    /// `expr[key]` with a string-literal key.
    BracketAccess {
        base: Box<Expr>,
        key: Box<Expr>,
    },
    /// `expr[index]` with a computed key; dispatches on the key kind at
    /// runtime, exactly like `BracketAccess`.
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Slice {
        base: Box<Expr>,
        start: Option<Box<Expr>>,
        end: Option<Box<Expr>>,
    },
    /// `expr[]`
    Iterate {
        base: Box<Expr>,
    },

    FunctionCall {
        name: String,
        args: Vec<Expr>,
    },
    /// A bare registry name such as `length` or `unique`.
    NullaryFunctionRef {
        name: String,
    },

    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    UnaryMinus {
        expr: Box<Expr>,
    },

    /// `a, b, c` — one tuple per cartesian combination of child outputs.
    Tuple {
        items: Vec<Expr>,
    },
    /// `[ subquery ]`; `None` is the empty list literal `[]`.
    Fold {
        inner: Option<Box<Expr>>,
    },

    Pipe {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `left; right` — left runs for its side effects only.
    Sequence {
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// `value as $name | body` — the binding covers the pipeline tail.
    AsBinding {
        value: Box<Expr>,
        name: String,
        body: Box<Expr>,
    },
    /// `let value as $name in body`
    LetBinding {
        value: Box<Expr>,
        name: String,
        body: Box<Expr>,
    },
    /// `elif` chains desugar into nested `IfThenElse` nodes.
    IfThenElse {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    AssignField {
        target: Box<Expr>,
        field: String,
        value: Box<Expr>,
    },
    AssignBracket {
        target: Box<Expr>,
        key: Box<Expr>,
        value: Box<Expr>,
    },
}
