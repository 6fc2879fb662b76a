use crate::expression::ExprType;

/// Every function the engine knows how to resolve. Dialect templates are
///  exhaustive matches over this enum, so adding a variant forces every
///  dialect to decide what it compiles to.
#[derive(strum_macros::Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum Function {
    Contains,
    StartsWith,
    EndsWith,
    IndexOf,
    Length,
    Substring,
    ToLower,
    ToUpper,
    Trim,
    Concat,
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    FractionalSeconds,
    TotalOffsetMinutes,
    Date,
    Time,
    Now,
    Round,
    Floor,
    Ceiling,
}

/// What a parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    String,
    Number,
    /// A date or a date-time
    Temporal,
    DateTime,
    /// A date-time or a time of day
    TimeOfDay,
}

impl Param {
    pub fn accepts(&self, ty: ExprType) -> bool {
        matches!(
            (self, ty),
            (Param::String, ExprType::String)
                | (Param::Number, ExprType::Number)
                | (Param::Temporal, ExprType::Date | ExprType::DateTime)
                | (Param::DateTime, ExprType::DateTime)
                | (Param::TimeOfDay, ExprType::DateTime | ExprType::Time)
        )
    }
}

impl std::fmt::Display for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Param::String => "a string",
            Param::Number => "a number",
            Param::Temporal => "a date or date-time",
            Param::DateTime => "a date-time",
            Param::TimeOfDay => "a date-time or time",
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Signature {
    pub required: &'static [Param],
    pub optional: &'static [Param],
    pub returns: ExprType,
}

impl Signature {
    pub fn accepts_arity(&self, count: usize) -> bool {
        (self.required.len()..=self.required.len() + self.optional.len()).contains(&count)
    }

    /// The parameter at [index], if the signature has one.
    pub fn param(&self, index: usize) -> Option<Param> {
        self.required
            .iter()
            .chain(self.optional)
            .nth(index)
            .copied()
    }
}

const fn sig(required: &'static [Param], returns: ExprType) -> Signature {
    Signature {
        required,
        optional: &[],
        returns,
    }
}

impl Function {
    pub fn signature(&self) -> Signature {
        use Param as P;
        match self {
            Function::Contains | Function::StartsWith | Function::EndsWith => {
                sig(&[P::String, P::String], ExprType::Boolean)
            }
            Function::IndexOf => sig(&[P::String, P::String], ExprType::Number),
            Function::Length => sig(&[P::String], ExprType::Number),
            Function::Substring => Signature {
                required: &[P::String, P::Number],
                optional: &[P::Number],
                returns: ExprType::String,
            },
            Function::ToLower | Function::ToUpper | Function::Trim => {
                sig(&[P::String], ExprType::String)
            }
            Function::Concat => sig(&[P::String, P::String], ExprType::String),
            Function::Year | Function::Month | Function::Day => {
                sig(&[P::Temporal], ExprType::Number)
            }
            Function::Hour | Function::Minute | Function::Second | Function::FractionalSeconds => {
                sig(&[P::TimeOfDay], ExprType::Number)
            }
            Function::TotalOffsetMinutes => sig(&[P::DateTime], ExprType::Number),
            Function::Date => sig(&[P::DateTime], ExprType::Date),
            Function::Time => sig(&[P::DateTime], ExprType::Time),
            Function::Now => sig(&[], ExprType::DateTime),
            Function::Round | Function::Floor | Function::Ceiling => {
                sig(&[P::Number], ExprType::Number)
            }
        }
    }

    /// The functions compiled to `LIKE` rather than through a template. They
    ///  are only meaningful as filter conditions.
    pub fn is_string_match(&self) -> bool {
        matches!(
            self,
            Function::Contains | Function::StartsWith | Function::EndsWith
        )
    }
}

impl TryFrom<&str> for Function {
    type Error = ();
    fn try_from(word: &str) -> Result<Self, Self::Error> {
        match word.to_ascii_lowercase().as_str() {
            "contains" => Ok(Function::Contains),
            "startswith" => Ok(Function::StartsWith),
            "endswith" => Ok(Function::EndsWith),
            "indexof" => Ok(Function::IndexOf),
            "length" => Ok(Function::Length),
            "substring" => Ok(Function::Substring),
            "tolower" => Ok(Function::ToLower),
            "toupper" => Ok(Function::ToUpper),
            "trim" => Ok(Function::Trim),
            "concat" => Ok(Function::Concat),
            "year" => Ok(Function::Year),
            "month" => Ok(Function::Month),
            "day" => Ok(Function::Day),
            "hour" => Ok(Function::Hour),
            "minute" => Ok(Function::Minute),
            "second" => Ok(Function::Second),
            "fractionalseconds" => Ok(Function::FractionalSeconds),
            "totaloffsetminutes" => Ok(Function::TotalOffsetMinutes),
            "date" => Ok(Function::Date),
            "time" => Ok(Function::Time),
            "now" => Ok(Function::Now),
            "round" => Ok(Function::Round),
            "floor" => Ok(Function::Floor),
            "ceiling" => Ok(Function::Ceiling),
            _ => Err(()),
        }
    }
}
