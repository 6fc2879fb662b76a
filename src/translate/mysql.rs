use crate::{functions::Function as F, translate::DialectSpec};

pub static SPEC: DialectSpec = DialectSpec {
    name: "mysql",
    // MySQL string literals treat the backslash as an escape themselves, so
    //  one literal backslash is spelled twice.
    like_escape: r"ESCAPE '\\'",
    identifier_quotes: ("`", "`"),
    function_template: function_template,
};

fn function_template(function: F, arity: usize) -> Option<&'static str> {
    Some(match function {
        F::Contains | F::StartsWith | F::EndsWith => return None,
        F::IndexOf => "(LOCATE({1}, {0}) - 1)",
        F::Length => "CHAR_LENGTH({0})",
        F::Substring if arity == 3 => "SUBSTRING({0}, {1} + 1, {2})",
        F::Substring => "SUBSTRING({0}, {1} + 1)",
        F::ToLower => "LOWER({0})",
        F::ToUpper => "UPPER({0})",
        F::Trim => "TRIM({0})",
        F::Concat => "CONCAT({0}, {1})",
        F::Year => "YEAR({0})",
        F::Month => "MONTH({0})",
        F::Day => "DAY({0})",
        F::Hour => "HOUR({0})",
        F::Minute => "MINUTE({0})",
        F::Second => "SECOND({0})",
        F::FractionalSeconds => "(MICROSECOND({0}) / 1000000)",
        // DATETIME columns carry no offset
        F::TotalOffsetMinutes => return None,
        F::Date => "DATE({0})",
        F::Time => "TIME({0})",
        F::Now => "NOW()",
        F::Round => "ROUND({0})",
        F::Floor => "FLOOR({0})",
        F::Ceiling => "CEILING({0})",
    })
}
