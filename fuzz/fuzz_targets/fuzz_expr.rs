#![no_main]
use libfuzzer_sys::fuzz_target;

use arbitrary::{Arbitrary, Unstructured};

const MAX_PIECES: usize = 1024;

const VOCABULARY: &[&str] = &[
    "Name", "Price", "Shipped", "ShipDate", "CreatedAt", "Address/City", "Customer/Name",
    "eq", "ne", "gt", "ge", "lt", "le", "and", "or", "not", "add", "sub", "mul", "div", "mod",
    "as", "asc", "desc", "null", "true", "false", "(", ")", ",", "'x'", "'%_\\'", "''''",
    "1", "-2", "3.5", "1e3", "2024-01-15", "2024-01-15T10:30:00Z", "contains(", "startswith(",
    "endswith(", "substring(", "year(", "now()", "round(", "totaloffsetminutes(",
];

/// Either raw text or a token soup drawn from the query language.
#[derive(Debug)]
enum ExprInput {
    Raw(String),
    Tokens(Vec<&'static str>),
}

impl<'a> Arbitrary<'a> for ExprInput {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        if u.arbitrary()? {
            return Ok(Self::Raw(u.arbitrary()?));
        }
        let len = u.int_in_range(0..=MAX_PIECES)?;
        let pieces = (0..len)
            .map(|_| u.choose(VOCABULARY).copied())
            .collect::<arbitrary::Result<_>>()?;
        Ok(Self::Tokens(pieces))
    }
}

impl ExprInput {
    fn render(&self) -> String {
        match self {
            Self::Raw(s) => s.clone(),
            Self::Tokens(pieces) => pieces.join(" "),
        }
    }
}

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = Unstructured::new(data).arbitrary::<ExprInput>() {
        odata_expr::fuzz_helper::translate_expr(&input.render());
    }
});
