//! Lowers the AST into a composition of executable stages.
//!
//! Compilation is a pure transformation: function names and arities resolve
//! against the registry, literal regex patterns compile once, and negative
//! numeric literals fold, but no value is evaluated. Every stage shares one
//! signature, `(stream, context) -> stream`, and a compiled query is
//! immutable and reentrant.

use std::rc::Rc;
use std::slice;

use regex::Regex;

use crate::ast::{BinaryOp, Expr, ExprKind};
use crate::query::context::EvalContext;
use crate::query::error::QueryError;
use crate::query::evaluator as eval;
use crate::query::functions::Registry;
use crate::value::Value;

pub type Stream = Vec<Value>;

type StageFn = dyn Fn(&[Value], &mut EvalContext) -> Result<Stream, QueryError>;

/// One compiled pipeline stage.
#[derive(Clone)]
pub struct Stage(Rc<StageFn>);

impl Stage {
    fn new(stage: impl Fn(&[Value], &mut EvalContext) -> Result<Stream, QueryError> + 'static) -> Self {
        Self(Rc::new(stage))
    }

    pub fn run(&self, input: &[Value], context: &mut EvalContext) -> Result<Stream, QueryError> {
        (self.0)(input, context)
    }

    /// Run against one item's singleton stream.
    pub fn run_on(&self, item: &Value, context: &mut EvalContext) -> Result<Stream, QueryError> {
        (self.0)(slice::from_ref(item), context)
    }
}

/// A fully lowered query, safe to execute any number of times.
pub struct CompiledQuery {
    root: Stage,
}

impl std::fmt::Debug for CompiledQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledQuery").finish_non_exhaustive()
    }
}

impl CompiledQuery {
    pub fn execute(&self, input: &[Value], context: &mut EvalContext) -> Result<Stream, QueryError> {
        self.root.run(input, context)
    }
}

pub struct Compiler<'r> {
    registry: &'r Registry,
}

impl<'r> Compiler<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    pub fn compile(&self, expr: &Expr) -> Result<CompiledQuery, QueryError> {
        Ok(CompiledQuery {
            root: self.stage(expr)?,
        })
    }

    fn stage(&self, expr: &Expr) -> Result<Stage, QueryError> {
        match &expr.kind {
            ExprKind::Int(value) => Ok(constant(Value::Int(*value))),
            ExprKind::Float(value) => Ok(constant(Value::Float(*value))),
            ExprKind::Str(value) => Ok(constant(Value::str(value))),
            ExprKind::Bool(value) => Ok(constant(Value::Bool(*value))),
            ExprKind::NoneLit => Ok(constant(Value::None)),

            ExprKind::Identity => Ok(Stage::new(|input, _| Ok(input.to_vec()))),

            ExprKind::Variable(name) => {
                let name = name.clone();
                Ok(Stage::new(move |_, context| {
                    Ok(vec![context.lookup(&name).unwrap_or(Value::None)])
                }))
            }

            ExprKind::FieldAccess { base, field } => {
                let base = self.stage(base)?;
                let field = field.clone();
                Ok(Stage::new(move |input, context| {
                    let values = base.run(input, context)?;
                    Ok(values
                        .iter()
                        .map(|value| eval::resolve_field(value, &field))
                        .collect())
                }))
            }

            // Both bracket forms lower to one stage dispatching on the key
            // kind at runtime.
            ExprKind::BracketAccess { base, key } | ExprKind::Index { base, index: key } => {
                let base = self.stage(base)?;
                let key = self.stage(key)?;
                Ok(Stage::new(move |input, context| {
                    let mut output = Vec::new();
                    for item in input {
                        let bases = base.run_on(item, context)?;
                        let keys = key.run_on(item, context)?;
                        for (key_value, base_value) in eval::broadcast(&keys, &bases)? {
                            output.push(eval::bracket_get(&base_value, &key_value)?);
                        }
                    }
                    Ok(output)
                }))
            }

            ExprKind::Slice { base, start, end } => {
                let base = self.stage(base)?;
                let start = start.as_deref().map(|bound| self.stage(bound)).transpose()?;
                let end = end.as_deref().map(|bound| self.stage(bound)).transpose()?;
                Ok(Stage::new(move |input, context| {
                    let mut output = Vec::new();
                    for item in input {
                        let bases = base.run_on(item, context)?;
                        let starts = match &start {
                            Some(stage) => stage.run_on(item, context)?,
                            None => vec![Value::None],
                        };
                        let ends = match &end {
                            Some(stage) => stage.run_on(item, context)?,
                            None => vec![Value::None],
                        };
                        for (start_value, base_value) in eval::broadcast(&starts, &bases)? {
                            for (end_value, slice_base) in
                                eval::broadcast(&ends, slice::from_ref(&base_value))?
                            {
                                output.push(eval::slice_value(
                                    &slice_base,
                                    &start_value,
                                    &end_value,
                                )?);
                            }
                        }
                    }
                    Ok(output)
                }))
            }

            ExprKind::Iterate { base } => {
                let base = self.stage(base)?;
                Ok(Stage::new(move |input, context| {
                    let mut output = Vec::new();
                    for value in base.run(input, context)? {
                        output.extend(eval::iterate(&value)?);
                    }
                    Ok(output)
                }))
            }

            ExprKind::Binary { op, left, right } => self.binary_stage(*op, left, right),

            ExprKind::UnaryMinus { expr: inner } => {
                // Negative literals fold away at compile time.
                match &inner.kind {
                    ExprKind::Int(value) => return Ok(constant(Value::Int(-value))),
                    ExprKind::Float(value) => return Ok(constant(Value::Float(-value))),
                    _ => {}
                }
                let inner = self.stage(inner)?;
                Ok(Stage::new(move |input, context| {
                    inner
                        .run(input, context)?
                        .into_iter()
                        .map(|value| match value {
                            Value::Int(value) => Ok(Value::Int(-value)),
                            Value::Float(value) => Ok(Value::Float(-value)),
                            other => Err(QueryError::runtime(format!(
                                "unary minus requires a numeric operand, got {}",
                                other.kind_name()
                            ))),
                        })
                        .collect()
                }))
            }

            ExprKind::Tuple { items } => {
                let items = items
                    .iter()
                    .map(|item| self.stage(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Stage::new(move |input, context| {
                    let mut output = Vec::new();
                    for item in input {
                        let mut parts = Vec::with_capacity(items.len());
                        let mut emitted_nothing = false;
                        for stage in &items {
                            let values = stage.run_on(item, context)?;
                            if values.is_empty() {
                                emitted_nothing = true;
                                break;
                            }
                            parts.push(values);
                        }
                        if emitted_nothing {
                            continue;
                        }
                        for combo in eval::cartesian(&parts) {
                            output.push(Value::tuple(combo));
                        }
                    }
                    Ok(output)
                }))
            }

            ExprKind::Fold { inner } => {
                let inner = inner.as_deref().map(|sub| self.stage(sub)).transpose()?;
                Ok(Stage::new(move |input, context| {
                    let mut output = Vec::new();
                    for item in input {
                        let Some(inner) = &inner else {
                            output.push(Value::list(Vec::new()));
                            continue;
                        };
                        let mut collected = Vec::new();
                        for value in inner.run_on(item, context)? {
                            // Tuples spread into the collected list so that
                            // `[ a, b ]` reads as stream collection.
                            match value {
                                Value::Tuple(items) => collected.extend(items.iter().cloned()),
                                other => collected.push(other),
                            }
                        }
                        output.push(Value::list(collected));
                    }
                    Ok(output)
                }))
            }

            ExprKind::FunctionCall { name, args } => {
                let builtin = self.lookup_function(name, expr)?;
                self.check_arity(name, builtin.min_args, builtin.max_args, args.len(), expr)?;
                let stages = args
                    .iter()
                    .map(|arg| self.stage(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                let run = builtin.run;
                Ok(Stage::new(move |input, context| run(input, &stages, context)))
            }

            ExprKind::NullaryFunctionRef { name } => {
                let builtin = self.lookup_function(name, expr)?;
                self.check_arity(name, builtin.min_args, builtin.max_args, 0, expr)?;
                let run = builtin.run;
                Ok(Stage::new(move |input, context| run(input, &[], context)))
            }

            ExprKind::Pipe { left, right } => {
                let left = self.stage(left)?;
                let right = self.stage(right)?;
                Ok(Stage::new(move |input, context| {
                    let intermediate = left.run(input, context)?;
                    right.run(&intermediate, context)
                }))
            }

            ExprKind::Sequence { left, right } => {
                let left = self.stage(left)?;
                let right = self.stage(right)?;
                Ok(Stage::new(move |input, context| {
                    left.run(input, context)?;
                    right.run(input, context)
                }))
            }

            ExprKind::AsBinding { value, name, body }
            | ExprKind::LetBinding { value, name, body } => self.binding_stage(value, name, body),

            ExprKind::IfThenElse {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond = self.stage(cond)?;
                let then_branch = self.stage(then_branch)?;
                let else_branch = self.stage(else_branch)?;
                Ok(Stage::new(move |input, context| {
                    let mut output = Vec::new();
                    for item in input {
                        let conditions = cond.run_on(item, context)?;
                        let branch = if eval::any_truthy(&conditions) {
                            &then_branch
                        } else {
                            &else_branch
                        };
                        output.extend(branch.run_on(item, context)?);
                    }
                    Ok(output)
                }))
            }

            ExprKind::AssignField {
                target,
                field,
                value,
            } => {
                let target = self.stage(target)?;
                let value = self.stage(value)?;
                let key = Value::str(field);
                Ok(Stage::new(move |input, context| {
                    let mut output = Vec::new();
                    for item in input {
                        let bases = target.run_on(item, context)?;
                        let values = value.run_on(item, context)?;
                        for (assigned, base) in eval::broadcast(&values, &bases)? {
                            output.push(eval::assign_into(&base, &key, assigned)?);
                        }
                    }
                    Ok(output)
                }))
            }

            ExprKind::AssignBracket { target, key, value } => {
                let target = self.stage(target)?;
                let key = self.stage(key)?;
                let value = self.stage(value)?;
                Ok(Stage::new(move |input, context| {
                    let mut output = Vec::new();
                    for item in input {
                        let bases = target.run_on(item, context)?;
                        let keys = key.run_on(item, context)?;
                        let values = value.run_on(item, context)?;
                        let key_base_pairs = eval::broadcast(&keys, &bases)?;
                        for (assigned, (key_value, base)) in
                            eval::broadcast(&values, &key_base_pairs)?
                        {
                            output.push(eval::assign_into(&base, &key_value, assigned)?);
                        }
                    }
                    Ok(output)
                }))
            }
        }
    }

    fn binary_stage(
        &self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
    ) -> Result<Stage, QueryError> {
        // A literal pattern on the right of `matches` compiles once; an
        // invalid pattern is still reported as a runtime error, on first use.
        if op == BinaryOp::Matches {
            if let ExprKind::Str(pattern) = &right.kind {
                let compiled: Rc<Result<Regex, QueryError>> = Rc::new(eval::compile_regex(pattern));
                let left = self.stage(left)?;
                return Ok(Stage::new(move |input, context| {
                    let regex = compiled.as_ref().as_ref().map_err(Clone::clone)?;
                    left.run(input, context)?
                        .into_iter()
                        .map(|value| match value {
                            Value::Str(text) => Ok(Value::Bool(regex.is_match(&text))),
                            other => Err(QueryError::runtime(format!(
                                "matches operator requires two strings, got {} and str",
                                other.kind_name()
                            ))),
                        })
                        .collect()
                }));
            }
        }

        let left = self.stage(left)?;
        let right = self.stage(right)?;
        Ok(Stage::new(move |input, context| {
            let left_values = left.run(input, context)?;
            let right_values = right.run(input, context)?;
            eval::broadcast(&left_values, &right_values)?
                .iter()
                .map(|(left_value, right_value)| eval::apply_binary(op, left_value, right_value))
                .collect()
        }))
    }

    fn binding_stage(&self, value: &Expr, name: &str, body: &Expr) -> Result<Stage, QueryError> {
        let value = self.stage(value)?;
        let body = self.stage(body)?;
        let name = name.to_string();
        Ok(Stage::new(move |input, context| {
            let mut output = Vec::new();
            for item in input {
                for bound in value.run_on(item, context)? {
                    context.push(name.clone(), bound);
                    let result = body.run_on(item, context);
                    context.pop();
                    output.extend(result?);
                }
            }
            Ok(output)
        }))
    }

    fn lookup_function(
        &self,
        name: &str,
        expr: &Expr,
    ) -> Result<&'r crate::query::functions::Builtin, QueryError> {
        self.registry.get(name).ok_or_else(|| {
            let available = self.registry.names().collect::<Vec<_>>().join(", ");
            QueryError::compile(
                format!(
                    "unknown function `{}`; available functions: {}",
                    name, available
                ),
                expr.span,
            )
        })
    }

    fn check_arity(
        &self,
        name: &str,
        min: usize,
        max: usize,
        got: usize,
        expr: &Expr,
    ) -> Result<(), QueryError> {
        if (min..=max).contains(&got) {
            return Ok(());
        }
        let expected = if min == max {
            format!("{}", min)
        } else {
            format!("{} to {}", min, max)
        };
        Err(QueryError::compile(
            format!(
                "{} expects {} argument(s), got {}",
                name, expected, got
            ),
            expr.span,
        ))
    }
}

fn constant(value: Value) -> Stage {
    Stage::new(move |_, _| Ok(vec![value.clone()]))
}
