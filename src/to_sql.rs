use std::{
    fmt::{Result, Write},
    sync::LazyLock,
};

use regex::Regex;

use crate::{
    error::Error,
    expression::Value,
    translate::{BinaryOp, Parenthesize, SqlExpr},
};

/// `{0}`, `{1}`... in a function template.
static SLOT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\d+)\}").expect("template slot pattern is valid"));

/// Accumulates SQL text and the positional arguments for its placeholders.
///  Every `?` written through [SqlWriter::param] pushes its value, so the
///  argument list always follows the textual order of the placeholders.
#[derive(Debug, Default)]
pub struct SqlWriter {
    sql: String,
    args: Vec<Value>,
}

impl SqlWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(&mut self, value: &Value) -> Result {
        self.args.push(value.clone());
        self.write_str("?")
    }

    /// Prints [expr] onto the end of the text.
    pub fn render(&mut self, expr: &impl ToSql) -> crate::error::Result<()> {
        expr.to_sql(self)
            .map_err(|_| Error::unsupported("malformed function template"))
    }

    /// Prints [expr] on its own and returns its text. Its arguments stay in
    ///  the writer, after those of earlier columns.
    pub fn column(&mut self, expr: &impl ToSql) -> crate::error::Result<String> {
        let start = self.sql.len();
        self.render(expr)?;
        Ok(self.sql.split_off(start))
    }

    pub fn finish(self) -> (String, Vec<Value>) {
        (self.sql, self.args)
    }
}

impl Write for SqlWriter {
    fn write_str(&mut self, s: &str) -> Result {
        self.sql.push_str(s);
        Ok(())
    }
}

pub trait ToSql {
    fn to_sql(&self, out: &mut SqlWriter) -> Result;
}

impl<T> ToSql for Box<T>
where
    T: ToSql,
{
    fn to_sql(&self, out: &mut SqlWriter) -> Result {
        self.as_ref().to_sql(out)
    }
}

impl Parenthesize {
    pub fn open(&self, out: &mut SqlWriter) -> Result {
        self.write(out, "(")
    }
    pub fn close(&self, out: &mut SqlWriter) -> Result {
        self.write(out, ")")
    }
    fn write(&self, out: &mut SqlWriter, s: &str) -> Result {
        if self == &Parenthesize::Yes {
            out.write_str(s)
        } else {
            Ok(())
        }
    }
}

impl ToSql for BinaryOp {
    fn to_sql(&self, out: &mut SqlWriter) -> Result {
        out.write_str(match self {
            BinaryOp::Add => " + ",
            BinaryOp::Sub => " - ",
            BinaryOp::Mul => " * ",
            BinaryOp::Div => " / ",
            BinaryOp::Mod => " % ",

            BinaryOp::Eq => " = ",
            BinaryOp::Ne => " <> ",
            BinaryOp::Lt => " < ",
            BinaryOp::Le => " <= ",
            BinaryOp::Gt => " > ",
            BinaryOp::Ge => " >= ",
            BinaryOp::And => " AND ",
            BinaryOp::Or => " OR ",
        })
    }
}

impl ToSql for SqlExpr {
    fn to_sql(&self, out: &mut SqlWriter) -> Result {
        match self {
            SqlExpr::Column(name) => out.write_str(name),
            SqlExpr::Param(value) => out.param(value),
            SqlExpr::Template { template, args } => write_template(template, args, out),
            SqlExpr::BinaryOperator(l, op, r, p) => {
                p.open(out)?;
                l.to_sql(out)?;
                op.to_sql(out)?;
                r.to_sql(out)?;
                p.close(out)
            }
            SqlExpr::Group(inner) => {
                out.write_str("(")?;
                inner.to_sql(out)?;
                out.write_str(")")
            }
            SqlExpr::Not(inner) => {
                out.write_str("NOT (")?;
                inner.to_sql(out)?;
                out.write_str(")")
            }
            SqlExpr::IsNull { operand, negated } => {
                operand.to_sql(out)?;
                out.write_str(if *negated { " IS NOT NULL" } else { " IS NULL" })
            }
            SqlExpr::Like {
                target,
                pattern,
                escape,
            } => {
                target.to_sql(out)?;
                out.write_str(" LIKE ")?;
                out.param(&Value::Text(pattern.clone()))?;
                write!(out, " {escape}")
            }
            SqlExpr::Constant(true) => out.write_str("1 = 1"),
            SqlExpr::Constant(false) => out.write_str("1 = 0"),
            SqlExpr::Alias {
                expr,
                alias,
                quotes: (open, close),
            } => {
                expr.to_sql(out)?;
                write!(out, " AS {open}{alias}{close}")
            }
            SqlExpr::Ordered(inner, descending) => {
                inner.to_sql(out)?;
                out.write_str(if *descending { " DESC" } else { " ASC" })
            }
        }
    }
}

/// Copies [template] substituting each slot with its argument. Arguments are
///  printed where their slot appears, so a slot used twice binds its
///  parameters twice and reordered slots bind in textual order.
fn write_template(template: &str, args: &[SqlExpr], out: &mut SqlWriter) -> Result {
    let mut copied = 0;
    for caps in SLOT.captures_iter(template) {
        let (Some(slot), Some(index)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.write_str(&template[copied..slot.start()])?;
        let index: usize = index.as_str().parse().map_err(|_| std::fmt::Error)?;
        args.get(index).ok_or(std::fmt::Error)?.to_sql(out)?;
        copied = slot.end();
    }
    out.write_str(&template[copied..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str) -> SqlExpr {
        SqlExpr::Column(name.into())
    }

    #[test]
    fn templates_fill_slots_in_textual_order() {
        let mut out = SqlWriter::new();
        let expr = SqlExpr::Template {
            template: "(LOCATE({1}, {0}) - 1)",
            args: vec![col("name"), SqlExpr::Param(Value::from("x"))],
        };
        out.render(&expr).expect("valid template");
        let (sql, args) = out.finish();
        assert_eq!(sql, "(LOCATE(?, name) - 1)");
        assert_eq!(args, [Value::from("x")]);
    }

    #[test]
    fn missing_slot_argument_is_an_error() {
        let mut out = SqlWriter::new();
        let expr = SqlExpr::Template {
            template: "SUBSTR({0}, {2})",
            args: vec![col("name")],
        };
        assert!(matches!(
            out.render(&expr),
            Err(Error::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn columns_share_arguments() {
        let mut out = SqlWriter::new();
        let first = SqlExpr::Alias {
            expr: Box::new(SqlExpr::BinaryOperator(
                Box::new(col("price")),
                BinaryOp::Mul,
                Box::new(SqlExpr::Param(Value::Float(1.1))),
                Parenthesize::Yes,
            )),
            alias: "PriceWithTax".into(),
            quotes: ("[", "]"),
        };
        let second = SqlExpr::Ordered(Box::new(SqlExpr::Param(Value::Integer(2))), true);
        assert_eq!(
            out.column(&first).expect("renders"),
            "(price * ?) AS [PriceWithTax]"
        );
        assert_eq!(out.column(&second).expect("renders"), "? DESC");
        let (sql, args) = out.finish();
        assert!(sql.is_empty());
        assert_eq!(args, [Value::Float(1.1), Value::Integer(2)]);
    }

    #[test]
    fn logical_operands_are_grouped() {
        let mut out = SqlWriter::new();
        let expr = SqlExpr::Not(Box::new(SqlExpr::BinaryOperator(
            Box::new(SqlExpr::Group(Box::new(SqlExpr::IsNull {
                operand: Box::new(col("a")),
                negated: false,
            }))),
            BinaryOp::Or,
            Box::new(SqlExpr::Group(Box::new(SqlExpr::Constant(false)))),
            Parenthesize::No,
        )));
        out.render(&expr).expect("renders");
        assert_eq!(out.finish().0, "NOT ((a IS NULL) OR (1 = 0))");
    }
}
