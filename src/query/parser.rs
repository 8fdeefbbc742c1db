//! Recursive-descent parser over the lexed token stream.
//!
//! One method per precedence level, lowest first: pipe, sequence,
//! assignment, `as` binding, comma, `or`/`and`, comparison, additive,
//! multiplicative, unary minus, power, postfix chain, primary.

use crate::ast::{BinaryOp, Expr, ExprKind};
use crate::diagnostic::Span;
use crate::lexer::{lex, Token};
use crate::query::error::QueryError;
use crate::query::functions::Registry;

/// Parse query text into an AST expression.
pub fn parse_query_with_registry(source: &str, registry: &Registry) -> Result<Expr, QueryError> {
    let tokens = lex(source)?;
    TokenParser::new(tokens, registry).parse()
}

pub struct TokenParser<'r> {
    tokens: Vec<(Token, Span)>,
    current: usize,
    registry: &'r Registry,
}

impl<'r> TokenParser<'r> {
    pub fn new(tokens: Vec<(Token, Span)>, registry: &'r Registry) -> Self {
        Self {
            tokens,
            current: 0,
            registry,
        }
    }

    pub fn parse(&mut self) -> Result<Expr, QueryError> {
        if self.tokens.is_empty() {
            return Err(QueryError::parse("empty query", Span::dummy()));
        }
        let expr = self.parse_pipe()?;
        match self.current_token() {
            Some(token) => Err(QueryError::parse(
                format!("unexpected {} after expression", token.describe()),
                self.current_span(),
            )),
            None => Ok(expr),
        }
    }

    fn current_token(&self) -> Option<&Token> {
        self.tokens.get(self.current).map(|(token, _)| token)
    }

    fn current_span(&self) -> Span {
        match self.tokens.get(self.current) {
            Some((_, span)) => *span,
            None => self.end_span(),
        }
    }

    fn previous_span(&self) -> Span {
        match self.current.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some((_, span)) => *span,
            None => Span::dummy(),
        }
    }

    fn end_span(&self) -> Span {
        match self.tokens.last() {
            Some((_, span)) => Span::new(span.end, span.end),
            None => Span::dummy(),
        }
    }

    fn advance(&mut self) -> Option<(Token, Span)> {
        let entry = self.tokens.get(self.current).cloned();
        if entry.is_some() {
            self.current += 1;
        }
        entry
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.current_token() == Some(expected) {
            self.current += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), QueryError> {
        match self.current_token() {
            Some(token) if *token == expected => {
                self.current += 1;
                Ok(())
            }
            Some(token) => Err(QueryError::parse(
                format!("expected {}, found {}", expected.describe(), token.describe()),
                self.current_span(),
            )),
            None => Err(QueryError::parse(
                format!("expected {}, found end of query", expected.describe()),
                self.end_span(),
            )),
        }
    }

    // Level 1: pipe, right-associative. An `as` binding on the left takes the
    // whole pipeline tail as its body.
    fn parse_pipe(&mut self) -> Result<Expr, QueryError> {
        let left = self.parse_sequence()?;
        if self.eat(&Token::Pipe) {
            let rest = self.parse_pipe()?;
            return Ok(pipe_with_tail(left, rest));
        }
        Ok(left)
    }

    // Level 2: `;`, left-associative.
    fn parse_sequence(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.parse_assignment()?;
        while self.eat(&Token::Semicolon) {
            let right = self.parse_assignment()?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Sequence {
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(left)
    }

    // Level 3: `=`, right-associative. Only field and bracket paths are valid
    // targets.
    fn parse_assignment(&mut self) -> Result<Expr, QueryError> {
        let left = self.parse_as_binding()?;
        if !self.eat(&Token::Assign) {
            return Ok(left);
        }
        let value = self.parse_assignment()?;
        let span = left.span.merge(value.span);
        let target_span = left.span;
        match left.kind {
            ExprKind::FieldAccess { base, field } => Ok(Expr::new(
                ExprKind::AssignField {
                    target: base,
                    field,
                    value: Box::new(value),
                },
                span,
            )),
            ExprKind::BracketAccess { base, key } => Ok(Expr::new(
                ExprKind::AssignBracket {
                    target: base,
                    key,
                    value: Box::new(value),
                },
                span,
            )),
            ExprKind::Index { base, index } => Ok(Expr::new(
                ExprKind::AssignBracket {
                    target: base,
                    key: index,
                    value: Box::new(value),
                },
                span,
            )),
            _ => Err(QueryError::parse(
                "invalid assignment target: expected a field or bracket path",
                target_span,
            )),
        }
    }

    // Level 4: `value as $name`. The body is a placeholder until the pipe
    // level attaches the pipeline tail.
    fn parse_as_binding(&mut self) -> Result<Expr, QueryError> {
        let value = self.parse_comma()?;
        let mut names: Vec<(String, Span)> = Vec::new();
        while self.eat(&Token::As) {
            match self.advance() {
                Some((Token::Var(name), span)) => names.push((name, span)),
                Some((token, span)) => {
                    return Err(QueryError::parse(
                        format!("expected `$variable` after `as`, found {}", token.describe()),
                        span,
                    ))
                }
                None => {
                    return Err(QueryError::parse(
                        "expected `$variable` after `as`, found end of query",
                        self.end_span(),
                    ))
                }
            }
        }
        if names.is_empty() {
            return Ok(value);
        }
        Ok(build_as_chain(value, &names))
    }

    // Level 5: `,`, flattened into one n-ary tuple.
    fn parse_comma(&mut self) -> Result<Expr, QueryError> {
        let first = self.parse_or()?;
        if self.current_token() != Some(&Token::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(&Token::Comma) {
            items.push(self.parse_or()?);
        }
        let span = items
            .first()
            .map(|e| e.span)
            .unwrap_or_default()
            .merge(self.previous_span());
        Ok(Expr::new(ExprKind::Tuple { items }, span))
    }

    // Level 6: `or` below `and`, both left-associative.
    fn parse_or(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::Or) {
            let right = self.parse_and()?;
            left = binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.parse_comparison()?;
        while self.eat(&Token::And) {
            let right = self.parse_comparison()?;
            left = binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    // Level 7: comparison, membership, and regex match; non-associative.
    fn parse_comparison(&mut self) -> Result<Expr, QueryError> {
        let left = self.parse_additive()?;
        let Some(op) = self.comparison_op() else {
            return Ok(left);
        };
        self.current += 1;
        let right = self.parse_additive()?;
        if let Some(second) = self.comparison_op() {
            return Err(QueryError::parse(
                format!("comparison `{}` cannot be chained", second.symbol()),
                self.current_span(),
            ));
        }
        Ok(binary(op, left, right))
    }

    fn comparison_op(&self) -> Option<BinaryOp> {
        match self.current_token()? {
            Token::Eq => Some(BinaryOp::Eq),
            Token::NotEq => Some(BinaryOp::NotEq),
            Token::GreaterEq => Some(BinaryOp::GreaterEq),
            Token::LessEq => Some(BinaryOp::LessEq),
            Token::Greater => Some(BinaryOp::Greater),
            Token::Less => Some(BinaryOp::Less),
            Token::In => Some(BinaryOp::In),
            Token::Matches => Some(BinaryOp::Matches),
            _ => None,
        }
    }

    // Level 8: `+` and `-`, left-associative.
    fn parse_additive(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current_token() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.current += 1;
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    // Level 9: `*`, `/`, `mod`, `rem`, `quot`, left-associative.
    fn parse_multiplicative(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current_token() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Mod) => BinaryOp::Mod,
                Some(Token::Rem) => BinaryOp::Rem,
                Some(Token::Quot) => BinaryOp::Quot,
                _ => break,
            };
            self.current += 1;
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    // Level 10: unary minus. Binds looser than `**`, so `-2 ** 2` is `-(2 ** 2)`.
    fn parse_unary(&mut self) -> Result<Expr, QueryError> {
        if self.current_token() == Some(&Token::Minus) {
            let start = self.current_span();
            self.current += 1;
            let expr = self.parse_unary()?;
            let span = start.merge(expr.span);
            return Ok(Expr::new(
                ExprKind::UnaryMinus {
                    expr: Box::new(expr),
                },
                span,
            ));
        }
        self.parse_power()
    }

    // Level 11: `**`, right-associative.
    fn parse_power(&mut self) -> Result<Expr, QueryError> {
        let left = self.parse_postfix()?;
        if self.eat(&Token::Pow) {
            let right = self.parse_unary()?;
            return Ok(binary(BinaryOp::Pow, left, right));
        }
        Ok(left)
    }

    // Level 12: postfix chain `.field`, `[]`, `[k]`, `[a:b]`.
    fn parse_postfix(&mut self) -> Result<Expr, QueryError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.current_token() {
                Some(Token::Dot) => {
                    self.current += 1;
                    let field = self.expect_field_name()?;
                    let span = expr.span.merge(self.previous_span());
                    expr = Expr::new(
                        ExprKind::FieldAccess {
                            base: Box::new(expr),
                            field,
                        },
                        span,
                    );
                }
                Some(Token::LBracket) => {
                    self.current += 1;
                    expr = self.parse_bracket_suffix(expr)?;
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// After a consumed `[`: iterate, index, key access, or slice.
    fn parse_bracket_suffix(&mut self, base: Expr) -> Result<Expr, QueryError> {
        if self.eat(&Token::RBracket) {
            let span = base.span.merge(self.previous_span());
            return Ok(Expr::new(
                ExprKind::Iterate {
                    base: Box::new(base),
                },
                span,
            ));
        }

        if self.eat(&Token::Colon) {
            let end = self.parse_slice_bound()?;
            self.expect(Token::RBracket)?;
            let span = base.span.merge(self.previous_span());
            return Ok(Expr::new(
                ExprKind::Slice {
                    base: Box::new(base),
                    start: None,
                    end,
                },
                span,
            ));
        }

        let key = self.parse_additive()?;
        if self.eat(&Token::Colon) {
            let end = self.parse_slice_bound()?;
            self.expect(Token::RBracket)?;
            let span = base.span.merge(self.previous_span());
            return Ok(Expr::new(
                ExprKind::Slice {
                    base: Box::new(base),
                    start: Some(Box::new(key)),
                    end,
                },
                span,
            ));
        }

        self.expect(Token::RBracket)?;
        let span = base.span.merge(self.previous_span());
        if matches!(key.kind, ExprKind::Str(_)) {
            Ok(Expr::new(
                ExprKind::BracketAccess {
                    base: Box::new(base),
                    key: Box::new(key),
                },
                span,
            ))
        } else {
            Ok(Expr::new(
                ExprKind::Index {
                    base: Box::new(base),
                    index: Box::new(key),
                },
                span,
            ))
        }
    }

    fn parse_slice_bound(&mut self) -> Result<Option<Box<Expr>>, QueryError> {
        if self.current_token() == Some(&Token::RBracket) {
            return Ok(None);
        }
        Ok(Some(Box::new(self.parse_additive()?)))
    }

    fn expect_field_name(&mut self) -> Result<String, QueryError> {
        match self.advance() {
            Some((Token::Ident(name), _)) => Ok(name),
            Some((token, span)) => Err(QueryError::parse(
                format!("expected field name after `.`, found {}", token.describe()),
                span,
            )),
            None => Err(QueryError::parse(
                "expected field name after `.`, found end of query",
                self.end_span(),
            )),
        }
    }

    // Level 13: primary expressions.
    fn parse_primary(&mut self) -> Result<Expr, QueryError> {
        match self.advance() {
            Some((Token::Int(value), span)) => Ok(Expr::new(ExprKind::Int(value), span)),
            Some((Token::Float(value), span)) => Ok(Expr::new(ExprKind::Float(value), span)),
            Some((Token::Str(value), span)) => Ok(Expr::new(ExprKind::Str(value), span)),
            Some((Token::True, span)) => Ok(Expr::new(ExprKind::Bool(true), span)),
            Some((Token::False, span)) => Ok(Expr::new(ExprKind::Bool(false), span)),
            Some((Token::NoneKw, span)) => Ok(Expr::new(ExprKind::NoneLit, span)),
            Some((Token::Var(name), span)) => Ok(Expr::new(ExprKind::Variable(name), span)),
            Some((Token::Dot, span)) => self.parse_dot_rooted(span),
            Some((Token::LParen, _)) => {
                let inner = self.parse_pipe()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some((Token::LBracket, span)) => self.parse_fold(span),
            Some((Token::If, span)) => self.parse_if_chain(span),
            Some((Token::Let, span)) => self.parse_let(span),
            Some((Token::Ident(name), span)) => self.parse_identifier(name, span),
            Some((token, span)) => Err(QueryError::parse(
                format!("unexpected {}", token.describe()),
                span,
            )),
            None => Err(QueryError::parse(
                "unexpected end of query",
                self.end_span(),
            )),
        }
    }

    /// `.`, `.field`, and the identity the postfix loop extends with
    /// brackets.
    fn parse_dot_rooted(&mut self, dot_span: Span) -> Result<Expr, QueryError> {
        if let Some(Token::Ident(_)) = self.current_token() {
            let Some((Token::Ident(field), field_span)) = self.advance() else {
                unreachable!("peeked an identifier");
            };
            let span = dot_span.merge(field_span);
            return Ok(Expr::new(
                ExprKind::FieldAccess {
                    base: Box::new(Expr::new(ExprKind::Identity, dot_span)),
                    field,
                },
                span,
            ));
        }
        Ok(Expr::new(ExprKind::Identity, dot_span))
    }

    /// `[ subquery ]` collects the subquery's outputs; bare `[]` is the
    /// empty list literal.
    fn parse_fold(&mut self, open_span: Span) -> Result<Expr, QueryError> {
        if self.eat(&Token::RBracket) {
            let span = open_span.merge(self.previous_span());
            return Ok(Expr::new(ExprKind::Fold { inner: None }, span));
        }
        let inner = self.parse_pipe()?;
        self.expect(Token::RBracket)?;
        let span = open_span.merge(self.previous_span());
        Ok(Expr::new(
            ExprKind::Fold {
                inner: Some(Box::new(inner)),
            },
            span,
        ))
    }

    fn parse_if_chain(&mut self, start: Span) -> Result<Expr, QueryError> {
        let cond = self.parse_pipe()?;
        self.expect(Token::Then)?;
        let then_branch = self.parse_pipe()?;
        let else_branch = if self.eat(&Token::Elif) {
            let elif_span = self.previous_span();
            self.parse_if_chain(elif_span)?
        } else {
            self.expect(Token::Else)?;
            self.parse_pipe()?
        };
        let span = start.merge(self.previous_span());
        Ok(Expr::new(
            ExprKind::IfThenElse {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            },
            span,
        ))
    }

    fn parse_let(&mut self, start: Span) -> Result<Expr, QueryError> {
        let value = self.parse_comma()?;
        self.expect(Token::As)?;
        let name = match self.advance() {
            Some((Token::Var(name), _)) => name,
            Some((token, span)) => {
                return Err(QueryError::parse(
                    format!("expected `$variable` after `as`, found {}", token.describe()),
                    span,
                ))
            }
            None => {
                return Err(QueryError::parse(
                    "expected `$variable` after `as`, found end of query",
                    self.end_span(),
                ))
            }
        };
        self.expect(Token::In)?;
        let body = self.parse_pipe()?;
        let span = start.merge(self.previous_span());
        Ok(Expr::new(
            ExprKind::LetBinding {
                value: Box::new(value),
                name,
                body: Box::new(body),
            },
            span,
        ))
    }

    /// A bare identifier is a function call when parenthesized, a nullary
    /// function reference when the registry knows it, and otherwise a plain
    /// string literal.
    fn parse_identifier(&mut self, name: String, span: Span) -> Result<Expr, QueryError> {
        if self.eat(&Token::LParen) {
            let args = if self.eat(&Token::RParen) {
                Vec::new()
            } else {
                let inner = self.parse_pipe()?;
                self.expect(Token::RParen)?;
                match inner.kind {
                    ExprKind::Tuple { items } => items,
                    _ => vec![inner],
                }
            };
            let span = span.merge(self.previous_span());
            return Ok(Expr::new(ExprKind::FunctionCall { name, args }, span));
        }
        if self.registry.contains(&name) {
            return Ok(Expr::new(ExprKind::NullaryFunctionRef { name }, span));
        }
        Ok(Expr::new(ExprKind::Str(name), span))
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    let span = left.span.merge(right.span);
    Expr::new(
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    )
}

/// Attach a pipeline tail, letting a leading `as` binding capture it as its
/// body.
fn pipe_with_tail(left: Expr, rest: Expr) -> Expr {
    let span = left.span.merge(rest.span);
    let left_span = left.span;
    match left.kind {
        ExprKind::AsBinding { value, name, body } => {
            let new_body = attach_to_as_body(*body, &name, rest);
            Expr::new(
                ExprKind::AsBinding {
                    value,
                    name,
                    body: Box::new(new_body),
                },
                span,
            )
        }
        kind => Expr::new(
            ExprKind::Pipe {
                left: Box::new(Expr::new(kind, left_span)),
                right: Box::new(rest),
            },
            span,
        ),
    }
}

fn attach_to_as_body(body: Expr, name: &str, rest: Expr) -> Expr {
    // The placeholder the `as` level left behind takes the tail directly.
    let is_placeholder =
        matches!(&body.kind, ExprKind::Variable(placeholder) if placeholder == name);
    if is_placeholder {
        return rest;
    }
    if matches!(body.kind, ExprKind::AsBinding { .. }) {
        return pipe_with_tail(body, rest);
    }
    let span = body.span.merge(rest.span);
    Expr::new(
        ExprKind::Pipe {
            left: Box::new(body),
            right: Box::new(rest),
        },
        span,
    )
}

/// `a as $x as $y` nests so that both bindings cover the eventual tail.
fn build_as_chain(value: Expr, names: &[(String, Span)]) -> Expr {
    let (name, name_span) = &names[0];
    let placeholder = Expr::new(ExprKind::Variable(name.clone()), *name_span);
    let body = if names.len() == 1 {
        placeholder
    } else {
        build_as_chain(placeholder, &names[1..])
    };
    let span = value.span.merge(body.span);
    Expr::new(
        ExprKind::AsBinding {
            value: Box::new(value),
            name: name.clone(),
            body: Box::new(body),
        },
        span,
    )
}
