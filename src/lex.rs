use std::{borrow::Cow, sync::LazyLock};

use regex::Regex;
use thiserror::Error;

/// Keyword operators. `and`, `or` and `not` share the keyword space with the
///  comparisons so they are kept together here; the parser assigns them
///  different binding powers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Op {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    And,
    Or,
    Not,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ArithmeticOp {
    Mul,
    Div,
    Add,
    Sub,
    Mod,
}

/// #Notes
/// A path such as `Address/City` is lexed as a single [TokenKind::PropertyPath]
///  token, the parser never sees the separators.
/// `-` and `+` are only meaningful as the sign of a number literal; arithmetic
///  is spelled `add`/`sub`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    PropertyPath,
    Operator(Op),
    ArithmeticOp(ArithmeticOp),
    FunctionName,
    StringLiteral,
    NumberLiteral,
    BooleanLiteral,
    NullLiteral,
    DateLiteral,
    DateTimeLiteral,
    OpenParen,
    CloseParen,
    Comma,
    AsKeyword,
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,

    // Byte indexes into the source
    start: usize,
    end: usize,
}

impl Token {
    /// Byte offset of the first character of this token.
    #[inline]
    pub fn position(&self) -> usize {
        self.start
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("unterminated string literal starting at {0}")]
    UnterminatedStringLiteral(usize),
    #[error("unexpected character '{ch}' at {position}")]
    UnexpectedCharacter { position: usize, ch: char },
    #[error("malformed number literal '{text}' at {position}")]
    MalformedNumber { position: usize, text: String },
}

impl Error {
    pub fn position(&self) -> usize {
        match self {
            Self::UnterminatedStringLiteral(position)
            | Self::UnexpectedCharacter { position, .. }
            | Self::MalformedNumber { position, .. } => *position,
        }
    }
}

/// Assumes that [word] is eight ASCII characters packed into a u64 and
///  returns the lowercased equivalent.
#[inline]
fn lowercase_u64(word: u64) -> u64 {
    // Branchless: a byte `b` is in A..=Z if
    //   (b + 0x1F) & ~(b + 0x05) & 0x20 != 0
    // and lowercasing it means setting the fifth bit ('A' = 65, 'a' = 97).
    // Identifier bytes are at most 0x7A so the additions never carry into the
    //  neighbouring byte.
    const ADD_1F: u64 = 0x1F1F1F1F1F1F1F1F;
    const ADD_05: u64 = 0x0505050505050505;
    const FIFTH_BIT: u64 = 0x2020202020202020;

    let mask = word.wrapping_add(ADD_1F) & !word.wrapping_add(ADD_05) & FIFTH_BIT;
    word | mask
}

/// Packs up to eight bytes, zero padded, into a little endian u64.
const fn pack(word: &[u8]) -> u64 {
    let mut bytes = [0u8; 8];
    let mut i = 0;
    while i < word.len() {
        bytes[i] = word[i];
        i += 1;
    }
    u64::from_le_bytes(bytes)
}

/// Every keyword is eight characters or less, so recognizing one is a single
///  lowercase-and-compare on the packed word.
fn keyword(word: &[u8]) -> Option<TokenKind> {
    const AND: u64 = pack(b"and");
    const OR: u64 = pack(b"or");
    const NOT: u64 = pack(b"not");
    const EQ: u64 = pack(b"eq");
    const NE: u64 = pack(b"ne");
    const GT: u64 = pack(b"gt");
    const GE: u64 = pack(b"ge");
    const LT: u64 = pack(b"lt");
    const LE: u64 = pack(b"le");
    const MUL: u64 = pack(b"mul");
    const DIV: u64 = pack(b"div");
    const ADD: u64 = pack(b"add");
    const SUB: u64 = pack(b"sub");
    const MOD: u64 = pack(b"mod");
    const TRUE: u64 = pack(b"true");
    const FALSE: u64 = pack(b"false");
    const NULL: u64 = pack(b"null");
    const AS: u64 = pack(b"as");

    if word.len() > 8 {
        return None;
    }
    Some(match lowercase_u64(pack(word)) {
        AND => TokenKind::Operator(Op::And),
        OR => TokenKind::Operator(Op::Or),
        NOT => TokenKind::Operator(Op::Not),
        EQ => TokenKind::Operator(Op::Eq),
        NE => TokenKind::Operator(Op::Ne),
        GT => TokenKind::Operator(Op::Gt),
        GE => TokenKind::Operator(Op::Ge),
        LT => TokenKind::Operator(Op::Lt),
        LE => TokenKind::Operator(Op::Le),
        MUL => TokenKind::ArithmeticOp(ArithmeticOp::Mul),
        DIV => TokenKind::ArithmeticOp(ArithmeticOp::Div),
        ADD => TokenKind::ArithmeticOp(ArithmeticOp::Add),
        SUB => TokenKind::ArithmeticOp(ArithmeticOp::Sub),
        MOD => TokenKind::ArithmeticOp(ArithmeticOp::Mod),
        TRUE | FALSE => TokenKind::BooleanLiteral,
        NULL => TokenKind::NullLiteral,
        AS => TokenKind::AsKeyword,
        _ => return None,
    })
}

/// `2024-01-15` or `2024-01-15T10:30:00.5+02:00`; a date-time must carry an
///  offset.
static DATE_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}(T\d{2}:\d{2}(:\d{2}(\.\d{1,9})?)?(Z|[+-]\d{2}:\d{2}))?")
        .expect("date literal pattern is valid")
});

#[inline]
fn is_ident_start(b: u8) -> bool {
    matches!(b, b'a'..=b'z' | b'A'..=b'Z' | b'_')
}

#[inline]
fn is_ident_continuation(b: u8) -> bool {
    matches!(b, b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_')
}

/// This type simply holds a reference to the source and an index, so it's
///  cheap to copy.
#[derive(Clone)]
pub struct Lexer<'input> {
    source: &'input str,
    current: usize,
}

impl<'input> Lexer<'input> {
    pub fn new(source: &'input str) -> Self {
        Self { source, current: 0 }
    }

    #[inline]
    fn bytes(&self) -> &'input [u8] {
        self.source.as_bytes()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.current >= self.source.len()
    }

    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.bytes().get(self.current).copied()
    }

    #[inline]
    pub fn peek_at(&self, at: usize) -> Option<u8> {
        self.bytes().get(self.current + at).copied()
    }

    #[inline]
    fn pop_unchecked(&mut self) -> u8 {
        let res = self.bytes()[self.current];
        self.current += 1;
        res
    }

    #[inline]
    pub fn remaining(&self) -> &'input str {
        &self.source[self.current..]
    }

    /// If current starts with [prefix], consume it and return true.
    pub fn consume1(&mut self, prefix: u8) -> bool {
        if let Some(c) = self.peek()
            && c == prefix
        {
            self.current += 1;
            true
        } else {
            false
        }
    }

    #[inline]
    fn consume_while(&mut self, predicate: impl Fn(u8) -> bool) {
        while let Some(c) = self.peek()
            && predicate(c)
        {
            self.current += 1;
        }
    }

    #[inline]
    fn consume_whitespace(&mut self) {
        self.consume_while(|b| b.is_ascii_whitespace());
    }

    /// Digits, an optional fraction and an optional exponent. Anything glued
    ///  onto the end (`1.2.3`, `12abc`, `1e`) makes the whole literal
    ///  malformed rather than splitting it into several tokens.
    fn consume_number(&mut self, start: usize) -> Result<(), Error> {
        let malformed = |lexer: &Self| {
            let mut end = lexer.current;
            while let Some(&b) = lexer.bytes().get(end)
                && (is_ident_continuation(b) || b == b'.')
            {
                end += 1;
            }
            Error::MalformedNumber {
                position: start,
                text: lexer.source[start..end].to_string(),
            }
        };

        self.consume_while(|b| b.is_ascii_digit());

        if self.consume1(b'.') {
            if !matches!(self.peek(), Some(b'0'..=b'9')) {
                return Err(malformed(self));
            }
            self.consume_while(|b| b.is_ascii_digit());
        }

        if matches!(self.peek(), Some(b'e' | b'E')) {
            self.current += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.current += 1;
            }
            if !matches!(self.peek(), Some(b'0'..=b'9')) {
                return Err(malformed(self));
            }
            self.consume_while(|b| b.is_ascii_digit());
        }

        match self.peek() {
            Some(b) if is_ident_continuation(b) || b == b'.' => Err(malformed(self)),
            _ => Ok(()),
        }
    }

    /// Consumes a date or date-time literal if one starts here.
    fn consume_date(&mut self) -> Option<TokenKind> {
        let found = DATE_LITERAL.find(self.remaining())?;
        let end = self.current + found.end();
        // `2024-01-15abc` is not a date
        if let Some(&b) = self.bytes().get(end)
            && (is_ident_continuation(b) || b == b'.' || b == b':')
        {
            return None;
        }
        let kind = if found.as_str().contains('T') {
            TokenKind::DateTimeLiteral
        } else {
            TokenKind::DateLiteral
        };
        self.current = end;
        Some(kind)
    }

    /// Returns the slice of the source that this token was lexed from.
    #[inline]
    pub fn source_of(&self, token: &Token) -> &'input str {
        &self.source[token.start..token.end]
    }

    pub fn next_token(&mut self) -> Result<Option<Token>, Error> {
        self.consume_whitespace();

        if self.is_empty() {
            return Ok(None);
        }
        let start = self.current;

        macro_rules! tok {
            ($kind:expr) => {{
                Token {
                    kind: $kind,
                    start,
                    end: self.current,
                }
            }};
        }

        Ok(Some(match self.pop_unchecked() {
            b'(' => tok!(TokenKind::OpenParen),
            b')' => tok!(TokenKind::CloseParen),
            b',' => tok!(TokenKind::Comma),

            // Single-quoted strings, '' is an escaped quote
            b'\'' => {
                loop {
                    self.consume_while(|b| b != b'\'');
                    if self.is_empty() {
                        return Err(Error::UnterminatedStringLiteral(start));
                    }
                    // consume the quote, then decide if it was an escape
                    self.current += 1;
                    if !self.consume1(b'\'') {
                        break;
                    }
                }
                tok!(TokenKind::StringLiteral)
            }

            // A sign only ever starts a number
            sign @ (b'+' | b'-') => {
                let digit_follows = match (self.peek(), self.peek_at(1)) {
                    (Some(b'0'..=b'9'), _) => true,
                    (Some(b'.'), Some(b'0'..=b'9')) => true,
                    _ => false,
                };
                if !digit_follows {
                    return Err(Error::UnexpectedCharacter {
                        position: start,
                        ch: sign as char,
                    });
                }
                if self.peek() == Some(b'.') {
                    self.current += 1;
                    self.consume_while(|b| b.is_ascii_digit());
                    if let Some(b) = self.peek()
                        && (is_ident_continuation(b) || b == b'.')
                    {
                        return Err(Error::MalformedNumber {
                            position: start,
                            text: self.source[start..self.current + 1].to_string(),
                        });
                    }
                } else {
                    self.consume_number(start)?;
                }
                tok!(TokenKind::NumberLiteral)
            }

            b'0'..=b'9' => {
                // Rewind so the date matcher sees the leading digit
                self.current = start;
                if let Some(kind) = self.consume_date() {
                    tok!(kind)
                } else {
                    self.consume_number(start)?;
                    tok!(TokenKind::NumberLiteral)
                }
            }

            b if is_ident_start(b) => {
                self.consume_while(is_ident_continuation);
                let mut is_path = false;
                while self.peek() == Some(b'/')
                    && let Some(next) = self.peek_at(1)
                    && is_ident_start(next)
                {
                    is_path = true;
                    self.current += 1;
                    self.consume_while(is_ident_continuation);
                }

                if is_path {
                    tok!(TokenKind::PropertyPath)
                } else if let Some(kind) = keyword(&self.bytes()[start..self.current]) {
                    tok!(kind)
                } else if self.peek() == Some(b'(') {
                    // The paren is left for the next call
                    tok!(TokenKind::FunctionName)
                } else {
                    tok!(TokenKind::Identifier)
                }
            }

            _ => {
                let ch = self.source[start..].chars().next().unwrap_or('\u{FFFD}');
                return Err(Error::UnexpectedCharacter { position: start, ch });
            }
        }))
    }
}

/// A fully lexed input. Always terminated by exactly one [TokenKind::Eof].
#[derive(Debug, Clone)]
pub struct TokenStream<'input> {
    source: &'input str,
    tokens: Vec<Token>,
}

impl<'input> TokenStream<'input> {
    #[inline]
    pub fn source(&self) -> &'input str {
        self.source
    }

    #[inline]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Returns the slice of the source that this token was lexed from.
    #[inline]
    pub fn text(&self, token: &Token) -> &'input str {
        &self.source[token.start..token.end]
    }

    /// Like [TokenStream::text] but string literals lose their quotes and
    ///  have `''` collapsed to `'`.
    pub fn contents(&self, token: &Token) -> Cow<'input, str> {
        let text = self.text(token);
        match token.kind {
            TokenKind::StringLiteral => unescape_string(&text[1..text.len() - 1]),
            _ => Cow::Borrowed(text),
        }
    }
}

pub fn unescape_string(inner: &str) -> Cow<'_, str> {
    if inner.contains("''") {
        Cow::Owned(inner.replace("''", "'"))
    } else {
        Cow::Borrowed(inner)
    }
}

/// Lexes the whole input. Either every token is produced, ending with
///  [TokenKind::Eof], or the first error is returned.
pub fn tokenize(input: &str) -> Result<TokenStream<'_>, Error> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::with_capacity(input.len() / 4 + 1);
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    tokens.push(Token {
        kind: TokenKind::Eof,
        start: input.len(),
        end: input.len(),
    });
    tracing::trace!(tokens = tokens.len(), "tokenized");
    Ok(TokenStream {
        source: input,
        tokens,
    })
}
