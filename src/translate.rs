use std::str::FromStr;

use tracing::instrument;

use crate::{
    error::{Error, Result},
    expression::{ComputeExpression, FilterExpression, Operand, Operator, OrderByExpression, Value},
    functions::Function,
    lex::ArithmeticOp,
    metadata::EntityMetadata,
    to_sql::SqlWriter,
};

pub mod mssql;
pub mod mysql;
pub mod postgres;
pub mod sqlite;

/// The SQL engines we generate for. Parsed from configuration; anything we
///  don't know is an error rather than a fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Dialect {
    Sqlite,
    #[cfg_attr(feature = "serde", serde(alias = "postgresql"))]
    Postgres,
    Mysql,
    #[cfg_attr(feature = "serde", serde(alias = "mssql"))]
    SqlServer,
}

impl Dialect {
    pub const ALL: [Dialect; 4] = [
        Dialect::Sqlite,
        Dialect::Postgres,
        Dialect::Mysql,
        Dialect::SqlServer,
    ];

    pub fn name(&self) -> &'static str {
        self.spec().name
    }

    pub fn spec(&self) -> &'static DialectSpec {
        match self {
            Dialect::Sqlite => &sqlite::SPEC,
            Dialect::Postgres => &postgres::SPEC,
            Dialect::Mysql => &mysql::SPEC,
            Dialect::SqlServer => &mssql::SPEC,
        }
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Dialect::Sqlite),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "mysql" => Ok(Dialect::Mysql),
            "sqlserver" | "mssql" => Ok(Dialect::SqlServer),
            _ => Err(Error::UnknownDialect(s.to_string())),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything that differs between dialects, as data. Function templates use
///  `{0}`, `{1}`... for the translated arguments; a slot may appear more than
///  once or out of order.
#[derive(Debug)]
pub struct DialectSpec {
    pub name: &'static str,
    /// Appended to every `LIKE` we emit. Patterns are always escaped with a
    ///  single backslash; this is how the dialect spells that character.
    pub like_escape: &'static str,
    /// Opening and closing quote for identifiers we name ourselves, i.e.
    ///  compute aliases.
    pub identifier_quotes: (&'static str, &'static str),
    /// `None` means the dialect has no translation for the function at that
    ///  arity.
    pub function_template: fn(Function, usize) -> Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl From<ArithmeticOp> for BinaryOp {
    fn from(op: ArithmeticOp) -> Self {
        match op {
            ArithmeticOp::Add => BinaryOp::Add,
            ArithmeticOp::Sub => BinaryOp::Sub,
            ArithmeticOp::Mul => BinaryOp::Mul,
            ArithmeticOp::Div => BinaryOp::Div,
            ArithmeticOp::Mod => BinaryOp::Mod,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Parenthesize {
    #[default]
    Yes,
    No,
}

/// The output of translation: a typed expression goes in, a SQL expression
///  comes out. Printing it (see [crate::to_sql::ToSql]) yields the text and the positional
///  arguments together, so the two can't disagree on order.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlExpr {
    /// A metadata controlled column reference, qualified when needed.
    Column(String),
    /// A `?` placeholder bound to the value.
    Param(Value),
    /// A function translation, see [DialectSpec::function_template].
    Template {
        template: &'static str,
        args: Vec<SqlExpr>,
    },
    BinaryOperator(Box<SqlExpr>, BinaryOp, Box<SqlExpr>, Parenthesize),
    /// Always printed inside parentheses.
    Group(Box<SqlExpr>),
    Not(Box<SqlExpr>),
    IsNull {
        operand: Box<SqlExpr>,
        negated: bool,
    },
    Like {
        target: Box<SqlExpr>,
        pattern: String,
        escape: &'static str,
    },
    Constant(bool),
    /// `AS` alias, quoted so that aliases colliding with reserved words
    ///  (`Order`, `Select`) still parse.
    Alias {
        expr: Box<SqlExpr>,
        alias: String,
        quotes: (&'static str, &'static str),
    },
    Ordered(Box<SqlExpr>, bool),
}

/// A `WHERE` clause body with its positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFragment {
    pub sql: String,
    pub args: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComputeColumn {
    /// `<expression> AS <quoted alias>`
    pub sql: String,
    pub alias: String,
}

/// `SELECT` projections for a `$compute` clause. [args] covers every column,
///  in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputeFragment {
    pub columns: Vec<ComputeColumn>,
    pub args: Vec<Value>,
}

impl ComputeFragment {
    pub fn select_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| c.sql.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByFragment {
    /// `<expression> ASC|DESC`
    pub items: Vec<String>,
    pub args: Vec<Value>,
}

impl OrderByFragment {
    pub fn sql(&self) -> String {
        self.items.join(", ")
    }
}

/// Translates a filter into a parenthesized `WHERE` fragment.
#[instrument(level = "trace", skip_all, fields(dialect = dialect.name()))]
pub fn generate(
    expr: &FilterExpression,
    dialect: Dialect,
    metadata: &EntityMetadata,
) -> Result<SqlFragment> {
    let translator = Translator::new(dialect, metadata);
    let translated = translator.filter(expr)?;
    let (sql, args) = render(&translated)?;
    tracing::debug!(args = args.len(), "generated filter");
    Ok(SqlFragment { sql, args })
}

#[instrument(level = "trace", skip_all, fields(dialect = dialect.name()))]
pub fn generate_compute(
    expr: &ComputeExpression,
    dialect: Dialect,
    metadata: &EntityMetadata,
) -> Result<ComputeFragment> {
    let translator = Translator::new(dialect, metadata);
    let mut out = SqlWriter::new();
    let mut columns = Vec::with_capacity(expr.expressions.len());

    for item in &expr.expressions {
        let translated = SqlExpr::Alias {
            expr: Box::new(translator.operand(&item.operand)?),
            alias: item.alias.clone(),
            quotes: translator.spec.identifier_quotes,
        };
        let sql = out.column(&translated)?;
        columns.push(ComputeColumn {
            sql,
            alias: item.alias.clone(),
        });
    }

    let (_, args) = out.finish();
    tracing::debug!(columns = columns.len(), args = args.len(), "generated compute");
    Ok(ComputeFragment { columns, args })
}

#[instrument(level = "trace", skip_all, fields(dialect = dialect.name()))]
pub fn generate_orderby(
    expr: &OrderByExpression,
    dialect: Dialect,
    metadata: &EntityMetadata,
) -> Result<OrderByFragment> {
    let translator = Translator::new(dialect, metadata);
    let mut out = SqlWriter::new();
    let mut items = Vec::with_capacity(expr.items.len());

    for item in &expr.items {
        let translated =
            SqlExpr::Ordered(Box::new(translator.operand(&item.operand)?), item.descending);
        items.push(out.column(&translated)?);
    }

    let (_, args) = out.finish();
    tracing::debug!(items = items.len(), args = args.len(), "generated orderby");
    Ok(OrderByFragment { items, args })
}

fn render(expr: &SqlExpr) -> Result<(String, Vec<Value>)> {
    let mut out = SqlWriter::new();
    out.render(expr)?;
    Ok(out.finish())
}

/// Escapes the `LIKE` wildcards and the escape character itself with a
///  backslash, so user text always matches literally.
pub fn escape_like_pattern(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len() + 4);
    for c in pattern.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

struct Translator<'m> {
    spec: &'static DialectSpec,
    metadata: &'m EntityMetadata,
}

impl<'m> Translator<'m> {
    fn new(dialect: Dialect, metadata: &'m EntityMetadata) -> Self {
        Self {
            spec: dialect.spec(),
            metadata,
        }
    }

    fn filter(&self, expr: &FilterExpression) -> Result<SqlExpr> {
        match expr {
            FilterExpression::Logical {
                left,
                operator,
                right,
            } => {
                let op = match operator {
                    Operator::And => BinaryOp::And,
                    Operator::Or => BinaryOp::Or,
                    other => {
                        return Err(Error::unsupported(format!(
                            "{other:?} is not a boolean connective"
                        )));
                    }
                };
                Ok(SqlExpr::BinaryOperator(
                    Box::new(SqlExpr::Group(Box::new(self.filter(left)?))),
                    op,
                    Box::new(SqlExpr::Group(Box::new(self.filter(right)?))),
                    Parenthesize::No,
                ))
            }
            FilterExpression::Not(inner) => Ok(SqlExpr::Not(Box::new(self.filter(inner)?))),
            FilterExpression::Comparison {
                left,
                operator,
                right,
            } => self.comparison(left, *operator, right),
            FilterExpression::StringMatch {
                operator,
                target,
                pattern,
            } => {
                let escaped = escape_like_pattern(pattern);
                let pattern = match operator {
                    Operator::Contains => format!("%{escaped}%"),
                    Operator::StartsWith => format!("{escaped}%"),
                    Operator::EndsWith => format!("%{escaped}"),
                    other => {
                        return Err(Error::unsupported(format!(
                            "{other:?} is not a string match"
                        )));
                    }
                };
                Ok(SqlExpr::Like {
                    target: Box::new(self.operand(target)?),
                    pattern,
                    escape: self.spec.like_escape,
                })
            }
            FilterExpression::Constant(value) => Ok(SqlExpr::Constant(*value)),
        }
    }

    fn comparison(&self, left: &Operand, operator: Operator, right: &Operand) -> Result<SqlExpr> {
        // null on either side turns into IS [NOT] NULL on the other
        let null_tested = match (left.is_null(), right.is_null()) {
            (false, true) => Some(left),
            (true, false) => Some(right),
            (true, true) => return Err(Error::unsupported("comparison between two nulls")),
            (false, false) => None,
        };
        if let Some(operand) = null_tested {
            let negated = match operator {
                Operator::Equal => false,
                Operator::NotEqual => true,
                other => {
                    return Err(Error::unsupported(format!(
                        "null can only be compared with eq or ne, not {other:?}"
                    )));
                }
            };
            return Ok(SqlExpr::IsNull {
                operand: Box::new(self.operand(operand)?),
                negated,
            });
        }

        let op = match operator {
            Operator::Equal => BinaryOp::Eq,
            Operator::NotEqual => BinaryOp::Ne,
            Operator::GreaterThan => BinaryOp::Gt,
            Operator::GreaterOrEqual => BinaryOp::Ge,
            Operator::LessThan => BinaryOp::Lt,
            Operator::LessOrEqual => BinaryOp::Le,
            other => {
                return Err(Error::unsupported(format!(
                    "{other:?} is not a comparison"
                )));
            }
        };
        Ok(SqlExpr::BinaryOperator(
            Box::new(self.operand(left)?),
            op,
            Box::new(self.operand(right)?),
            Parenthesize::No,
        ))
    }

    fn operand(&self, operand: &Operand) -> Result<SqlExpr> {
        match operand {
            // Only the metadata's column name reaches the SQL text
            Operand::Property(path) => Ok(SqlExpr::Column(self.metadata.resolve(path)?.column_sql())),
            Operand::Literal(value) => Ok(SqlExpr::Param(value.clone())),
            Operand::Call { function, args } => {
                let template = (self.spec.function_template)(*function, args.len())
                    .ok_or_else(|| {
                        Error::unsupported(format!(
                            "function '{function}' has no translation for {}",
                            self.spec.name
                        ))
                    })?;
                let args = args
                    .iter()
                    .map(|arg| self.operand(arg))
                    .collect::<Result<Vec<_>>>()?;
                Ok(SqlExpr::Template { template, args })
            }
            Operand::Arithmetic { left, op, right } => Ok(SqlExpr::BinaryOperator(
                Box::new(self.operand(left)?),
                (*op).into(),
                Box::new(self.operand(right)?),
                Parenthesize::Yes,
            )),
        }
    }
}
