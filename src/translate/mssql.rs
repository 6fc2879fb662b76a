use crate::{functions::Function as F, translate::DialectSpec};

pub static SPEC: DialectSpec = DialectSpec {
    name: "sqlserver",
    like_escape: r"ESCAPE '\'",
    identifier_quotes: ("[", "]"),
    function_template: function_template,
};

fn function_template(function: F, arity: usize) -> Option<&'static str> {
    Some(match function {
        F::Contains | F::StartsWith | F::EndsWith => return None,
        F::IndexOf => "(CHARINDEX({1}, {0}) - 1)",
        F::Length => "LEN({0})",
        F::Substring if arity == 3 => "SUBSTRING({0}, {1} + 1, {2})",
        // SUBSTRING always wants a length
        F::Substring => "SUBSTRING({0}, {1} + 1, LEN({0}))",
        F::ToLower => "LOWER({0})",
        F::ToUpper => "UPPER({0})",
        F::Trim => "LTRIM(RTRIM({0}))",
        F::Concat => "CONCAT({0}, {1})",
        F::Year => "DATEPART(year, {0})",
        F::Month => "DATEPART(month, {0})",
        F::Day => "DATEPART(day, {0})",
        F::Hour => "DATEPART(hour, {0})",
        F::Minute => "DATEPART(minute, {0})",
        F::Second => "DATEPART(second, {0})",
        F::FractionalSeconds => "(DATEPART(nanosecond, {0}) / 1000000000.0)",
        F::TotalOffsetMinutes => "DATEPART(tzoffset, {0})",
        F::Date => "CAST({0} AS DATE)",
        F::Time => "CAST({0} AS TIME)",
        F::Now => "SYSDATETIMEOFFSET()",
        F::Round => "ROUND({0}, 0)",
        F::Floor => "FLOOR({0})",
        F::Ceiling => "CEILING({0})",
    })
}
