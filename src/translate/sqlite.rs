use crate::{functions::Function as F, translate::DialectSpec};

pub static SPEC: DialectSpec = DialectSpec {
    name: "sqlite",
    like_escape: r"ESCAPE '\'",
    identifier_quotes: ("\"", "\""),
    function_template: function_template,
};

// SQLite has no FLOOR/CEILING before 3.35 and no time zone support at all;
//  dates are ISO text read through strftime.
fn function_template(function: F, arity: usize) -> Option<&'static str> {
    Some(match function {
        F::Contains | F::StartsWith | F::EndsWith => return None,
        F::IndexOf => "(INSTR({0}, {1}) - 1)",
        F::Length => "LENGTH({0})",
        F::Substring if arity == 3 => "SUBSTR({0}, {1} + 1, {2})",
        F::Substring => "SUBSTR({0}, {1} + 1)",
        F::ToLower => "LOWER({0})",
        F::ToUpper => "UPPER({0})",
        F::Trim => "TRIM({0})",
        F::Concat => "({0} || {1})",
        F::Year => "CAST(strftime('%Y', {0}) AS INTEGER)",
        F::Month => "CAST(strftime('%m', {0}) AS INTEGER)",
        F::Day => "CAST(strftime('%d', {0}) AS INTEGER)",
        F::Hour => "CAST(strftime('%H', {0}) AS INTEGER)",
        F::Minute => "CAST(strftime('%M', {0}) AS INTEGER)",
        F::Second => "CAST(strftime('%S', {0}) AS INTEGER)",
        F::FractionalSeconds => {
            "(CAST(strftime('%f', {0}) AS REAL) - CAST(strftime('%S', {0}) AS INTEGER))"
        }
        F::TotalOffsetMinutes => return None,
        F::Date => "date({0})",
        F::Time => "time({0})",
        F::Now => "datetime('now')",
        F::Round => "ROUND({0})",
        F::Floor => "(CAST({0} AS INTEGER) - ({0} < CAST({0} AS INTEGER)))",
        F::Ceiling => "(CAST({0} AS INTEGER) + ({0} > CAST({0} AS INTEGER)))",
    })
}
