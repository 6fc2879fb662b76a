//! The typed, metadata-resolved model the SQL generator consumes. Unlike the
//!  parse tree these are plain owned values: they outlive the request's parse
//!  tree and can be kept by the caller for later bookkeeping.

use chrono::{DateTime, FixedOffset, NaiveDate};

use crate::{functions::Function, lex::ArithmeticOp};

/// The inferred type of an operand.
#[derive(strum_macros::Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum ExprType {
    String,
    Number,
    Boolean,
    Date,
    DateTime,
    Time,
    /// The type of the `null` literal, compatible with everything.
    Null,
}

impl ExprType {
    /// Whether values of the two types may be compared with each other.
    pub fn comparable(self, other: ExprType) -> bool {
        use ExprType::*;
        match (self, other) {
            (Null, _) | (_, Null) => true,
            (Date | DateTime, Date | DateTime) => true,
            (a, b) => a == b,
        }
    }
}

/// A literal value. These are the positional arguments handed to the query
///  executor alongside the generated SQL.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(untagged)
)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
}

impl Value {
    pub fn expr_type(&self) -> ExprType {
        match self {
            Value::Null => ExprType::Null,
            Value::Bool(_) => ExprType::Boolean,
            Value::Integer(_) | Value::Float(_) => ExprType::Number,
            Value::Text(_) => ExprType::String,
            Value::Date(_) => ExprType::Date,
            Value::DateTime(_) => ExprType::DateTime,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::DateTime(dt) => f.write_str(&dt.to_rfc3339()),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    Contains,
    StartsWith,
    EndsWith,
    And,
    Or,
    Not,
}

/// A value producing term: anything that can sit on either side of a
///  comparison or be projected by `$compute`.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A `/` separated path, already checked against metadata.
    Property(String),
    Literal(Value),
    Call {
        function: Function,
        args: Vec<Operand>,
    },
    Arithmetic {
        left: Box<Operand>,
        op: ArithmeticOp,
        right: Box<Operand>,
    },
}

impl Operand {
    pub fn is_null(&self) -> bool {
        matches!(self, Operand::Literal(Value::Null))
    }

    pub fn is_literal(&self) -> bool {
        match self {
            Operand::Literal(_) => true,
            Operand::Property(_) => false,
            Operand::Call { args, function } => {
                *function != Function::Now && args.iter().all(Operand::is_literal)
            }
            Operand::Arithmetic { left, right, .. } => left.is_literal() && right.is_literal(),
        }
    }

    fn collect_properties<'a>(&'a self, into: &mut Vec<&'a str>) {
        match self {
            Operand::Property(path) => {
                if !into.contains(&path.as_str()) {
                    into.push(path);
                }
            }
            Operand::Literal(_) => {}
            Operand::Call { args, .. } => args.iter().for_each(|a| a.collect_properties(into)),
            Operand::Arithmetic { left, right, .. } => {
                left.collect_properties(into);
                right.collect_properties(into);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpression {
    /// `left <op> right` for the six comparison operators. `null` stays a
    ///  literal here; the generator decides how a dialect spells the test.
    Comparison {
        left: Operand,
        operator: Operator,
        right: Operand,
    },
    /// `contains`, `startswith` and `endswith`. [pattern] is the raw user
    ///  text, escaping happens at generation.
    StringMatch {
        operator: Operator,
        target: Operand,
        pattern: String,
    },
    Logical {
        left: Box<FilterExpression>,
        operator: Operator,
        right: Box<FilterExpression>,
    },
    Not(Box<FilterExpression>),
    /// `$filter=true` and friends.
    Constant(bool),
}

impl FilterExpression {
    /// Every property path the filter reads, in order of first appearance.
    pub fn referenced_properties(&self) -> Vec<&str> {
        let mut into = Vec::new();
        self.collect_properties(&mut into);
        into
    }

    fn collect_properties<'a>(&'a self, into: &mut Vec<&'a str>) {
        match self {
            FilterExpression::Comparison { left, right, .. } => {
                left.collect_properties(into);
                right.collect_properties(into);
            }
            FilterExpression::StringMatch { target, .. } => target.collect_properties(into),
            FilterExpression::Logical { left, right, .. } => {
                left.collect_properties(into);
                right.collect_properties(into);
            }
            FilterExpression::Not(inner) => inner.collect_properties(into),
            FilterExpression::Constant(_) => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComputeItem {
    pub operand: Operand,
    pub alias: String,
    pub ty: ExprType,
}

/// A resolved `$compute` clause. Aliases are unique within it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComputeExpression {
    pub expressions: Vec<ComputeItem>,
}

impl ComputeExpression {
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.expressions.iter().map(|item| item.alias.as_str())
    }

    pub fn get(&self, alias: &str) -> Option<&ComputeItem> {
        self.expressions.iter().find(|item| item.alias == alias)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub operand: Operand,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderByExpression {
    pub items: Vec<OrderByItem>,
}

impl OrderByExpression {
    pub fn referenced_properties(&self) -> Vec<&str> {
        let mut into = Vec::new();
        for item in &self.items {
            item.operand.collect_properties(&mut into);
        }
        into
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparable_types() {
        assert!(ExprType::Number.comparable(ExprType::Number));
        assert!(ExprType::Null.comparable(ExprType::Time));
        assert!(ExprType::Date.comparable(ExprType::DateTime));
        assert!(!ExprType::String.comparable(ExprType::Number));
        assert!(!ExprType::Boolean.comparable(ExprType::String));
        assert_eq!(ExprType::DateTime.to_string(), "datetime");
    }

    #[test]
    fn referenced_properties_are_deduplicated() {
        let filter = FilterExpression::Logical {
            left: Box::new(FilterExpression::Comparison {
                left: Operand::Property("Price".into()),
                operator: Operator::GreaterThan,
                right: Operand::Literal(Value::Integer(100)),
            }),
            operator: Operator::And,
            right: Box::new(FilterExpression::Not(Box::new(
                FilterExpression::StringMatch {
                    operator: Operator::Contains,
                    target: Operand::Call {
                        function: Function::ToLower,
                        args: vec![Operand::Property("Name".into())],
                    },
                    pattern: "x".into(),
                },
            ))),
        };
        assert_eq!(filter.referenced_properties(), ["Price", "Name"]);

        let orderby = OrderByExpression {
            items: vec![
                OrderByItem {
                    operand: Operand::Property("Name".into()),
                    descending: true,
                },
                OrderByItem {
                    operand: Operand::Arithmetic {
                        left: Box::new(Operand::Property("Price".into())),
                        op: ArithmeticOp::Sub,
                        right: Box::new(Operand::Property("Name".into())),
                    },
                    descending: false,
                },
            ],
        };
        assert_eq!(orderby.referenced_properties(), ["Name", "Price"]);
    }

    #[test]
    fn value_display() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).expect("valid date");
        assert_eq!(Value::Date(date).to_string(), "2024-01-15");
        assert_eq!(Value::from("abc").to_string(), "abc");
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::from(2.5).to_string(), "2.5");
    }
}
