use crate::{functions::Function as F, translate::DialectSpec};

pub static SPEC: DialectSpec = DialectSpec {
    name: "postgres",
    like_escape: r"ESCAPE '\'",
    identifier_quotes: ("\"", "\""),
    function_template: function_template,
};

fn function_template(function: F, arity: usize) -> Option<&'static str> {
    Some(match function {
        F::Contains | F::StartsWith | F::EndsWith => return None,
        F::IndexOf => "(STRPOS({0}, {1}) - 1)",
        F::Length => "LENGTH({0})",
        F::Substring if arity == 3 => "SUBSTRING({0} FROM {1} + 1 FOR {2})",
        F::Substring => "SUBSTRING({0} FROM {1} + 1)",
        F::ToLower => "LOWER({0})",
        F::ToUpper => "UPPER({0})",
        F::Trim => "TRIM({0})",
        F::Concat => "({0} || {1})",
        F::Year => "CAST(EXTRACT(YEAR FROM {0}) AS INTEGER)",
        F::Month => "CAST(EXTRACT(MONTH FROM {0}) AS INTEGER)",
        F::Day => "CAST(EXTRACT(DAY FROM {0}) AS INTEGER)",
        F::Hour => "CAST(EXTRACT(HOUR FROM {0}) AS INTEGER)",
        F::Minute => "CAST(EXTRACT(MINUTE FROM {0}) AS INTEGER)",
        F::Second => "CAST(FLOOR(EXTRACT(SECOND FROM {0})) AS INTEGER)",
        F::FractionalSeconds => "(EXTRACT(SECOND FROM {0}) - FLOOR(EXTRACT(SECOND FROM {0})))",
        F::TotalOffsetMinutes => "CAST(EXTRACT(TIMEZONE FROM {0}) / 60 AS INTEGER)",
        F::Date => "CAST({0} AS DATE)",
        F::Time => "CAST({0} AS TIME)",
        F::Now => "NOW()",
        F::Round => "ROUND({0})",
        F::Floor => "FLOOR({0})",
        F::Ceiling => "CEILING({0})",
    })
}
