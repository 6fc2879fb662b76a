//! Turns a parse tree into the typed expression model.
//!
//! Each entry point consumes the [ParseTree]. On success the tree is released
//!  back to its pool explicitly once the owned model has been built; on error
//!  it is dropped on the way out, which releases it just the same. Either way
//!  it happens exactly once.

use chrono::{DateTime, FixedOffset, NaiveDate};
use tracing::instrument;

use crate::{
    error::{Error, Result},
    expression::{
        ComputeExpression, ComputeItem, ExprType, FilterExpression, Operand, Operator,
        OrderByExpression, OrderByItem, Value,
    },
    functions::Function,
    lex::unescape_string,
    metadata::EntityMetadata,
    parser::{ComparisonOp, Literal, LiteralKind, LogicalOp, Node, Span},
    pool::{ArgList, NodeId, ParseTree},
};

#[instrument(level = "trace", skip_all)]
pub fn resolve_filter(
    tree: ParseTree<'_>,
    root: NodeId,
    metadata: &EntityMetadata,
) -> Result<FilterExpression> {
    let filter = Resolver::new(&tree, metadata).filter(root)?;
    tracing::trace!(nodes = tree.node_count(), "resolved filter");
    tree.release();
    Ok(filter)
}

#[instrument(level = "trace", skip_all)]
pub fn resolve_compute(
    tree: ParseTree<'_>,
    items: ArgList,
    metadata: &EntityMetadata,
) -> Result<ComputeExpression> {
    let resolver = Resolver::new(&tree, metadata);
    let mut compute = ComputeExpression::default();

    for &id in tree.args(&items) {
        let &Node::ComputeAlias { expr, alias } = tree.node(id) else {
            return Err(Error::validation("expected 'expression as alias'"));
        };
        let alias = tree.text(alias);
        if compute.get(alias).is_some() {
            return Err(Error::validation(format!(
                "duplicate alias '{alias}' in $compute"
            )));
        }
        if metadata.property(alias).is_some() {
            return Err(Error::validation(format!(
                "alias '{alias}' conflicts with a property of '{}'",
                metadata.name
            )));
        }
        let (operand, ty) = resolver.operand(expr)?;
        compute.expressions.push(ComputeItem {
            operand,
            alias: alias.to_string(),
            ty,
        });
    }

    tracing::trace!(items = compute.expressions.len(), "resolved compute");
    tree.release();
    Ok(compute)
}

#[instrument(level = "trace", skip_all)]
pub fn resolve_orderby(
    tree: ParseTree<'_>,
    items: ArgList,
    metadata: &EntityMetadata,
) -> Result<OrderByExpression> {
    let resolver = Resolver::new(&tree, metadata);
    let mut orderby = OrderByExpression::default();

    for (i, &id) in tree.args(&items).iter().enumerate() {
        let &Node::OrderBy { expr, descending } = tree.node(id) else {
            return Err(Error::validation("expected an $orderby item"));
        };
        let (operand, _) = resolver.operand(expr)?;
        if operand.is_literal() {
            return Err(Error::validation(format!(
                "$orderby item {} does not reference any property",
                i + 1
            )));
        }
        orderby.items.push(OrderByItem {
            operand,
            descending,
        });
    }

    tracing::trace!(items = orderby.items.len(), "resolved orderby");
    tree.release();
    Ok(orderby)
}

struct Resolver<'t, 'input, 'm> {
    tree: &'t ParseTree<'input>,
    metadata: &'m EntityMetadata,
}

impl<'t, 'input, 'm> Resolver<'t, 'input, 'm> {
    fn new(tree: &'t ParseTree<'input>, metadata: &'m EntityMetadata) -> Self {
        Self { tree, metadata }
    }

    fn filter(&self, id: NodeId) -> Result<FilterExpression> {
        match *self.tree.node(id) {
            Node::Logical { left, op, right } => Ok(FilterExpression::Logical {
                left: Box::new(self.filter(left)?),
                operator: match op {
                    LogicalOp::And => Operator::And,
                    LogicalOp::Or => Operator::Or,
                },
                right: Box::new(self.filter(right)?),
            }),
            Node::Not(inner) => Ok(FilterExpression::Not(Box::new(self.filter(inner)?))),
            Node::Comparison { left, op, right } => self.comparison(left, op, right),
            Node::FunctionCall { name, args } => {
                let function = self.function(name)?;
                if !function.is_string_match() {
                    return Err(Error::validation(format!(
                        "'{function}' does not produce a boolean and cannot be used as a condition"
                    )));
                }
                self.string_match(function, args)
            }
            Node::PropertyPath(span) => {
                let path = self.tree.text(span);
                let property = self.metadata.resolve(path)?;
                if property.expr_type() != ExprType::Boolean {
                    return Err(Error::validation(format!(
                        "property '{path}' is not boolean and cannot be used as a condition"
                    )));
                }
                Ok(FilterExpression::Comparison {
                    left: Operand::Property(path.to_string()),
                    operator: Operator::Equal,
                    right: Operand::Literal(Value::Bool(true)),
                })
            }
            Node::Literal(Literal {
                kind: LiteralKind::Boolean,
                span,
            }) => Ok(FilterExpression::Constant(
                self.tree.text(span).eq_ignore_ascii_case("true"),
            )),
            _ => Err(Error::validation(format!(
                "'{}' is not a condition",
                crate::parser::TreePrinter(self.tree, id)
            ))),
        }
    }

    fn comparison(&self, left: NodeId, op: ComparisonOp, right: NodeId) -> Result<FilterExpression> {
        let operator = match op {
            ComparisonOp::Eq => Operator::Equal,
            ComparisonOp::Ne => Operator::NotEqual,
            ComparisonOp::Gt => Operator::GreaterThan,
            ComparisonOp::Ge => Operator::GreaterOrEqual,
            ComparisonOp::Lt => Operator::LessThan,
            ComparisonOp::Le => Operator::LessOrEqual,
        };

        // contains(...) eq true, false ne startswith(...), etc.
        if let Some(folded) = self.fold_string_match(left, operator, right)? {
            return Ok(folded);
        }
        if let Some(folded) = self.fold_string_match(right, operator, left)? {
            return Ok(folded);
        }

        let (mut left, left_ty) = self.operand(left)?;
        let (mut right, right_ty) = self.operand(right)?;

        if left.is_null() && right.is_null() {
            return Err(Error::validation("cannot compare null with null"));
        }
        let left_ty = coerce_temporal(&mut left, left_ty, right_ty)?;
        let right_ty = coerce_temporal(&mut right, right_ty, left_ty)?;
        if !left_ty.comparable(right_ty) {
            return Err(Error::validation(format!(
                "cannot compare {left_ty} with {right_ty}"
            )));
        }

        Ok(FilterExpression::Comparison {
            left,
            operator,
            right,
        })
    }

    /// Folds `<string match> eq|ne <boolean literal>` into the match or its
    ///  negation. Returns `None` when [call] isn't a string match.
    fn fold_string_match(
        &self,
        call: NodeId,
        operator: Operator,
        other: NodeId,
    ) -> Result<Option<FilterExpression>> {
        let Node::FunctionCall { name, args } = *self.tree.node(call) else {
            return Ok(None);
        };
        let Ok(function) = Function::try_from(self.tree.text(name)) else {
            return Ok(None);
        };
        if !function.is_string_match() {
            return Ok(None);
        }

        let expected = match *self.tree.node(other) {
            Node::Literal(Literal {
                kind: LiteralKind::Boolean,
                span,
            }) => self.tree.text(span).eq_ignore_ascii_case("true"),
            _ => {
                return Err(Error::validation(format!(
                    "'{function}' can only be compared with true or false"
                )));
            }
        };
        let negate = match operator {
            Operator::Equal => !expected,
            Operator::NotEqual => expected,
            _ => {
                return Err(Error::validation(format!(
                    "'{function}' can only be tested with eq or ne"
                )));
            }
        };

        let matched = self.string_match(function, args)?;
        Ok(Some(if negate {
            FilterExpression::Not(Box::new(matched))
        } else {
            matched
        }))
    }

    fn string_match(&self, function: Function, args: ArgList) -> Result<FilterExpression> {
        let operator = match function {
            Function::Contains => Operator::Contains,
            Function::StartsWith => Operator::StartsWith,
            Function::EndsWith => Operator::EndsWith,
            _ => {
                return Err(Error::validation(format!("'{function}' is not a string match")));
            }
        };
        let &[target, pattern] = self.tree.args(&args) else {
            return Err(Error::validation(format!(
                "'{function}' expects 2 arguments, got {}",
                args.len()
            )));
        };

        let (target, ty) = self.operand(target)?;
        if ty != ExprType::String {
            return Err(Error::validation(format!(
                "argument 1 of '{function}' must be a string, got {ty}"
            )));
        }
        let pattern = match *self.tree.node(pattern) {
            Node::Literal(Literal {
                kind: LiteralKind::String,
                span,
            }) => self.string_literal(span),
            _ => {
                return Err(Error::validation(format!(
                    "argument 2 of '{function}' must be a string literal"
                )));
            }
        };

        Ok(FilterExpression::StringMatch {
            operator,
            target,
            pattern,
        })
    }

    fn function(&self, name: Span) -> Result<Function> {
        let name = self.tree.text(name);
        Function::try_from(name)
            .map_err(|()| Error::validation(format!("unsupported function '{name}'")))
    }

    fn operand(&self, id: NodeId) -> Result<(Operand, ExprType)> {
        match *self.tree.node(id) {
            Node::PropertyPath(span) => {
                let path = self.tree.text(span);
                let property = self.metadata.resolve(path)?;
                Ok((Operand::Property(path.to_string()), property.expr_type()))
            }
            Node::Literal(literal) => {
                let value = self.literal(literal)?;
                let ty = value.expr_type();
                Ok((Operand::Literal(value), ty))
            }
            Node::FunctionCall { name, args } => {
                let function = self.function(name)?;
                if function.is_string_match() {
                    return Err(Error::validation(format!(
                        "'{function}' can only be used as a condition"
                    )));
                }
                let signature = function.signature();
                let args = self.tree.args(&args);
                if !signature.accepts_arity(args.len()) {
                    let required = signature.required.len();
                    let expected = match signature.optional.len() {
                        0 => required.to_string(),
                        n => format!("{required} to {}", required + n),
                    };
                    return Err(Error::validation(format!(
                        "'{function}' expects {expected} arguments, got {}",
                        args.len()
                    )));
                }

                let mut resolved = Vec::with_capacity(args.len());
                for (i, &arg) in args.iter().enumerate() {
                    let (operand, ty) = self.operand(arg)?;
                    if let Some(param) = signature.param(i).filter(|p| !p.accepts(ty)) {
                        return Err(Error::validation(format!(
                            "argument {} of '{function}' must be {param}, got {ty}",
                            i + 1
                        )));
                    }
                    resolved.push(operand);
                }
                Ok((
                    Operand::Call {
                        function,
                        args: resolved,
                    },
                    signature.returns,
                ))
            }
            Node::Arithmetic { left, op, right } => {
                let (left, left_ty) = self.operand(left)?;
                let (right, right_ty) = self.operand(right)?;
                for ty in [left_ty, right_ty] {
                    if ty != ExprType::Number {
                        return Err(Error::validation(format!(
                            "'{op}' requires numeric operands, got {ty}"
                        )));
                    }
                }
                Ok((
                    Operand::Arithmetic {
                        left: Box::new(left),
                        op,
                        right: Box::new(right),
                    },
                    ExprType::Number,
                ))
            }
            Node::Comparison { .. } | Node::Logical { .. } | Node::Not(_) => {
                Err(Error::validation(format!(
                    "condition '{}' cannot be used as a value",
                    crate::parser::TreePrinter(self.tree, id)
                )))
            }
            Node::ComputeAlias { .. } | Node::OrderBy { .. } => {
                Err(Error::validation("unexpected list item inside an expression"))
            }
        }
    }

    fn string_literal(&self, span: Span) -> String {
        let text = self.tree.text(span);
        // The lexer guarantees the surrounding quotes
        unescape_string(&text[1..text.len() - 1]).into_owned()
    }

    fn literal(&self, literal: Literal) -> Result<Value> {
        let text = self.tree.text(literal.span);
        match literal.kind {
            LiteralKind::Null => Ok(Value::Null),
            LiteralKind::Boolean => Ok(Value::Bool(text.eq_ignore_ascii_case("true"))),
            LiteralKind::String => Ok(Value::Text(self.string_literal(literal.span))),
            LiteralKind::Number => parse_number(text),
            LiteralKind::Date => parse_date(text).map(Value::Date),
            LiteralKind::DateTime => parse_date_time(text).map(Value::DateTime),
        }
    }
}

/// A string literal compared with a date or date-time becomes one.
fn coerce_temporal(operand: &mut Operand, ty: ExprType, other: ExprType) -> Result<ExprType> {
    let Operand::Literal(Value::Text(text)) = operand else {
        return Ok(ty);
    };
    let value = match other {
        ExprType::Date => Value::Date(parse_date(text)?),
        ExprType::DateTime => match parse_date_time(text) {
            Ok(dt) => Value::DateTime(dt),
            Err(_) => Value::Date(parse_date(text)?),
        },
        _ => return Ok(ty),
    };
    let ty = value.expr_type();
    *operand = Operand::Literal(value);
    Ok(ty)
}

fn parse_number(text: &str) -> Result<Value> {
    let is_float = text.contains(['.', 'e', 'E']);
    if !is_float
        && let Ok(i) = text.parse::<i64>()
    {
        return Ok(Value::Integer(i));
    }
    text.parse::<f64>()
        .map(Value::Float)
        .map_err(|_| Error::validation(format!("'{text}' is not a valid number")))
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map_err(|e| Error::validation(format!("'{text}' is not a valid date: {e}")))
}

fn parse_date_time(text: &str) -> Result<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt);
    }
    // Seconds are optional: 2024-01-15T10:30Z
    const MINUTES_END: usize = "yyyy-mm-ddThh:mm".len();
    if text.len() > MINUTES_END && text.is_char_boundary(MINUTES_END) {
        let (head, offset) = text.split_at(MINUTES_END);
        if !offset.starts_with(':')
            && let Ok(dt) = DateTime::parse_from_rfc3339(&format!("{head}:00{offset}"))
        {
            return Ok(dt);
        }
    }
    Err(Error::validation(format!("'{text}' is not a valid date-time")))
}
