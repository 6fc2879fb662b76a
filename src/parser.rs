use thiserror::Error;

use crate::{
    lex::{self, ArithmeticOp, Op, Token, TokenKind, TokenStream},
    pool::{ArgList, NodeId, NodePool, ParseTree},
};

/// Bounds both the parser's recursion and the height of the tree it builds.
///  Later stages walk the tree recursively, so a flat `or` chain counts one
///  level per operator just like nested parentheses do.
pub const MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
}

/// Byte range into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

impl From<&Token> for Span {
    fn from(token: &Token) -> Self {
        Span::new(token.position(), token.position() + token.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    String,
    Number,
    Boolean,
    Null,
    Date,
    DateTime,
}

/// Literals keep only their span; the resolver decides what the text means
///  once it knows what the literal is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Literal {
    pub kind: LiteralKind,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Node {
    Comparison {
        left: NodeId,
        op: ComparisonOp,
        right: NodeId,
    },
    Logical {
        left: NodeId,
        op: LogicalOp,
        right: NodeId,
    },
    Not(NodeId),
    FunctionCall {
        name: Span,
        args: ArgList,
    },
    /// A single property or a `/` separated path.
    PropertyPath(Span),
    Literal(Literal),
    Arithmetic {
        left: NodeId,
        op: ArithmeticOp,
        right: NodeId,
    },
    ComputeAlias {
        expr: NodeId,
        alias: Span,
    },
    OrderBy {
        expr: NodeId,
        descending: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Returned when the input is empty (or just whitespace)
    #[error("empty expression")]
    NoExpression,
    #[error(transparent)]
    Lexical(#[from] lex::Error),
    #[error("missing closing parenthesis for '(' at {0}")]
    MissingCloseParen(usize),
    #[error("unexpected token '{text}' at {position}")]
    UnexpectedToken { position: usize, text: String },
    #[error("unexpected end of input at {0}")]
    UnexpectedEof(usize),
    #[error("comparison operators cannot be chained (at {0})")]
    ChainedComparison(usize),
    #[error("compute expression ending at {0} needs an 'as' alias")]
    MissingAlias(usize),
    #[error("expression nested too deeply at {0}")]
    TooDeep(usize),
}

impl Error {
    pub fn position(&self) -> usize {
        match self {
            Self::NoExpression => 0,
            Self::Lexical(e) => e.position(),
            Self::MissingCloseParen(p)
            | Self::UnexpectedEof(p)
            | Self::ChainedComparison(p)
            | Self::MissingAlias(p)
            | Self::TooDeep(p)
            | Self::UnexpectedToken { position: p, .. } => *p,
        }
    }
}

/// Walks a [TokenStream]. The stream always ends with Eof so peeking past the
///  end simply keeps returning it.
struct Cursor<'t, 'input> {
    tokens: &'t TokenStream<'input>,
    current: usize,
    depth: usize,
}

impl<'t, 'input> Cursor<'t, 'input> {
    fn peek(&self) -> Token {
        let last = self.tokens.len() - 1;
        self.tokens.tokens()[self.current.min(last)]
    }

    fn next_token(&mut self) -> Token {
        let tok = self.peek();
        if tok.kind != TokenKind::Eof {
            self.current += 1;
        }
        tok
    }

    fn consume(&mut self, kind: TokenKind) -> bool {
        if self.peek().kind == kind {
            self.current += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self, token: &Token) -> Error {
        if token.kind == TokenKind::Eof {
            Error::UnexpectedEof(token.position())
        } else {
            Error::UnexpectedToken {
                position: token.position(),
                text: self.tokens.text(token).to_string(),
            }
        }
    }

    fn expect_end(&self) -> Result<(), Error> {
        let tok = self.peek();
        if tok.kind == TokenKind::Eof {
            Ok(())
        } else {
            Err(self.unexpected(&tok))
        }
    }
}

/// Parses a `$filter` style expression. The whole stream must be consumed.
///
/// On failure the partially built tree is dropped here, returning its storage
///  to [pool]; on success the caller owns the tree.
pub fn parse<'input>(
    tokens: &TokenStream<'input>,
    pool: &NodePool,
) -> Result<(ParseTree<'input>, NodeId), Error> {
    let mut cursor = Cursor {
        tokens,
        current: 0,
        depth: 0,
    };
    let mut tree = pool.acquire(tokens.source());
    let mut scratch = Vec::with_capacity(16);

    if cursor.peek().kind == TokenKind::Eof {
        return Err(Error::NoExpression);
    }
    let (root, _) = parse_binary_op(&mut cursor, &mut tree, &mut scratch, 0)?;
    cursor.expect_end()?;
    tracing::trace!(nodes = tree.node_count(), "parsed expression");
    Ok((tree, root))
}

/// Parses a `$compute` clause: `expr as Alias, expr as Alias, ...`. Returns
///  the list of [Node::ComputeAlias] ids.
pub fn parse_compute<'input>(
    tokens: &TokenStream<'input>,
    pool: &NodePool,
) -> Result<(ParseTree<'input>, ArgList), Error> {
    parse_list(tokens, pool, parse_compute_item)
}

fn parse_compute_item<'input>(
    cursor: &mut Cursor<'_, 'input>,
    tree: &mut ParseTree<'input>,
    scratch: &mut Vec<NodeId>,
) -> Result<NodeId, Error> {
    let (expr, _) = parse_binary_op(cursor, tree, scratch, 0)?;
    let as_tok = cursor.peek();
    if as_tok.kind != TokenKind::AsKeyword {
        return Err(match as_tok.kind {
            TokenKind::Comma | TokenKind::Eof => Error::MissingAlias(as_tok.position()),
            _ => cursor.unexpected(&as_tok),
        });
    }
    cursor.next_token();
    let alias = cursor.next_token();
    if alias.kind != TokenKind::Identifier {
        return Err(cursor.unexpected(&alias));
    }
    Ok(tree.push(Node::ComputeAlias {
        expr,
        alias: Span::from(&alias),
    }))
}

/// Parses an `$orderby` clause: `expr [asc|desc], ...`. Returns the list of
///  [Node::OrderBy] ids.
pub fn parse_orderby<'input>(
    tokens: &TokenStream<'input>,
    pool: &NodePool,
) -> Result<(ParseTree<'input>, ArgList), Error> {
    parse_list(tokens, pool, parse_orderby_item)
}

fn parse_orderby_item<'input>(
    cursor: &mut Cursor<'_, 'input>,
    tree: &mut ParseTree<'input>,
    scratch: &mut Vec<NodeId>,
) -> Result<NodeId, Error> {
    let (expr, _) = parse_binary_op(cursor, tree, scratch, 0)?;
    let direction = cursor.peek();
    let descending = if direction.kind == TokenKind::Identifier {
        let text = cursor.tokens.text(&direction);
        let descending = if text.eq_ignore_ascii_case("desc") {
            true
        } else if text.eq_ignore_ascii_case("asc") {
            false
        } else {
            return Err(cursor.unexpected(&direction));
        };
        cursor.next_token();
        descending
    } else {
        false
    };
    Ok(tree.push(Node::OrderBy { expr, descending }))
}

fn parse_list<'input, F>(
    tokens: &TokenStream<'input>,
    pool: &NodePool,
    item: F,
) -> Result<(ParseTree<'input>, ArgList), Error>
where
    F: Fn(&mut Cursor<'_, 'input>, &mut ParseTree<'input>, &mut Vec<NodeId>) -> Result<NodeId, Error>,
{
    let mut cursor = Cursor {
        tokens,
        current: 0,
        depth: 0,
    };
    let mut tree = pool.acquire(tokens.source());
    let mut scratch = Vec::with_capacity(16);
    let mut items = Vec::with_capacity(4);

    if cursor.peek().kind == TokenKind::Eof {
        return Err(Error::NoExpression);
    }
    loop {
        items.push(item(&mut cursor, &mut tree, &mut scratch)?);
        if !cursor.consume(TokenKind::Comma) {
            break;
        }
    }
    cursor.expect_end()?;
    let list = tree.push_args(items.into_iter());
    tracing::trace!(items = list.len(), nodes = tree.node_count(), "parsed list");
    Ok((tree, list))
}

/// Rejects a node that would make the tree taller than [MAX_DEPTH].
fn bounded_height(height: usize, position: usize) -> Result<usize, Error> {
    if height > MAX_DEPTH {
        Err(Error::TooDeep(position))
    } else {
        Ok(height)
    }
}

/// Returns the parsed node together with the height of the subtree under it.
fn parse_binary_op<'input>(
    cursor: &mut Cursor<'_, 'input>,
    tree: &mut ParseTree<'input>,
    scratch: &mut Vec<NodeId>,
    min_binding_power: u8,
) -> Result<(NodeId, usize), Error> {
    let first = cursor.next_token();
    cursor.depth += 1;
    if cursor.depth > MAX_DEPTH {
        return Err(Error::TooDeep(first.position()));
    }

    let (mut lhs, mut height) = match first.kind {
        // Open paren: parse the internal expression and expect a closing paren
        TokenKind::OpenParen => {
            let inner = parse_binary_op(cursor, tree, scratch, 0)?;
            if !cursor.consume(TokenKind::CloseParen) {
                return Err(Error::MissingCloseParen(first.position()));
            }
            inner
        }
        TokenKind::Operator(Op::Not) => {
            let ((), pow) = prefix_binding(first.kind).ok_or_else(|| cursor.unexpected(&first))?;
            let (operand, height) = parse_binary_op(cursor, tree, scratch, pow)?;
            let height = bounded_height(height + 1, first.position())?;
            (tree.push(Node::Not(operand)), height)
        }
        TokenKind::StringLiteral
        | TokenKind::NumberLiteral
        | TokenKind::BooleanLiteral
        | TokenKind::NullLiteral
        | TokenKind::DateLiteral
        | TokenKind::DateTimeLiteral => (tree.push(parse_literal(&first)), 1),
        TokenKind::Identifier | TokenKind::PropertyPath => {
            (tree.push(Node::PropertyPath(Span::from(&first))), 1)
        }
        TokenKind::FunctionName => parse_fn_call(cursor, tree, scratch, &first)?,
        _ => return Err(cursor.unexpected(&first)),
    };

    // now that we have our left side, expect a series of operators or the end
    let mut compared = false;
    loop {
        let op_tok = cursor.peek();
        let Some((l_pow, r_pow)) = infix_binding(op_tok.kind) else {
            break;
        };
        if l_pow < min_binding_power {
            break;
        }

        let is_comparison = comparison_op(op_tok.kind).is_some();
        if is_comparison && compared {
            return Err(Error::ChainedComparison(op_tok.position()));
        }
        compared |= is_comparison;

        // Consume the operator token
        cursor.next_token();
        let (rhs, rhs_height) = parse_binary_op(cursor, tree, scratch, r_pow)?;
        height = bounded_height(height.max(rhs_height) + 1, op_tok.position())?;

        let node = match op_tok.kind {
            TokenKind::Operator(Op::And) => Node::Logical {
                left: lhs,
                op: LogicalOp::And,
                right: rhs,
            },
            TokenKind::Operator(Op::Or) => Node::Logical {
                left: lhs,
                op: LogicalOp::Or,
                right: rhs,
            },
            TokenKind::ArithmeticOp(op) => Node::Arithmetic {
                left: lhs,
                op,
                right: rhs,
            },
            kind => match comparison_op(kind) {
                Some(op) => Node::Comparison {
                    left: lhs,
                    op,
                    right: rhs,
                },
                None => return Err(cursor.unexpected(&op_tok)),
            },
        };
        lhs = tree.push(node);
    }

    cursor.depth -= 1;
    Ok((lhs, height))
}

fn comparison_op(kind: TokenKind) -> Option<ComparisonOp> {
    match kind {
        TokenKind::Operator(Op::Eq) => Some(ComparisonOp::Eq),
        TokenKind::Operator(Op::Ne) => Some(ComparisonOp::Ne),
        TokenKind::Operator(Op::Gt) => Some(ComparisonOp::Gt),
        TokenKind::Operator(Op::Ge) => Some(ComparisonOp::Ge),
        TokenKind::Operator(Op::Lt) => Some(ComparisonOp::Lt),
        TokenKind::Operator(Op::Le) => Some(ComparisonOp::Le),
        _ => None,
    }
}

fn parse_literal(token: &Token) -> Node {
    let kind = match token.kind {
        TokenKind::StringLiteral => LiteralKind::String,
        TokenKind::BooleanLiteral => LiteralKind::Boolean,
        TokenKind::NullLiteral => LiteralKind::Null,
        TokenKind::DateLiteral => LiteralKind::Date,
        TokenKind::DateTimeLiteral => LiteralKind::DateTime,
        _ => LiteralKind::Number,
    };
    Node::Literal(Literal {
        kind,
        span: Span::from(token),
    })
}

fn parse_fn_call<'input>(
    cursor: &mut Cursor<'_, 'input>,
    tree: &mut ParseTree<'input>,
    scratch: &mut Vec<NodeId>,
    name_token: &Token,
) -> Result<(NodeId, usize), Error> {
    // Arguments accumulate in the scratch buffer and are drained into the
    //  tree at the end. Outer calls may still be using the buffer, so only
    //  our own span of it is touched.
    let scratch_start = scratch.len();

    // The lexer only produces FunctionName when a paren follows
    let open = cursor.next_token();
    if open.kind != TokenKind::OpenParen {
        return Err(cursor.unexpected(&open));
    }

    // Zero or more arguments
    let mut first = true;
    let mut height = 0;
    loop {
        let t = cursor.peek();
        match t.kind {
            TokenKind::CloseParen => {
                cursor.next_token();
                break;
            }
            TokenKind::Eof => return Err(Error::MissingCloseParen(open.position())),
            _ => {}
        }

        // If this isn't the first argument, expect a comma
        if !first {
            if !cursor.consume(TokenKind::Comma) {
                return Err(cursor.unexpected(&t));
            }
        } else {
            first = false;
        }

        let (arg, arg_height) = parse_binary_op(cursor, tree, scratch, 0)?;
        height = height.max(arg_height);
        scratch.push(arg);
    }

    let height = bounded_height(height + 1, name_token.position())?;
    let args = tree.push_args(scratch.drain(scratch_start..));
    let call = tree.push(Node::FunctionCall {
        name: Span::from(name_token),
        args,
    });
    Ok((call, height))
}

// NOTE prefix_binding and infix_binding specify the "binding power" of the
//  various prefix and infix operators. Binding power is a more intuitive
//  version of "precedence": higher binding power means the operator binds
//  more tightly. So `mul` has a higher binding power than `add`.
fn prefix_binding(kind: TokenKind) -> Option<((), u8)> {
    match kind {
        TokenKind::Operator(Op::Not) => Some(((), 30)),
        _ => None,
    }
}

// NOTE for infix bindings we specify a left and right side of the operator,
//  this slight asymmetry makes every operator left associative. Comparisons
//  are additionally non-associative, enforced in parse_binary_op.
fn infix_binding(kind: TokenKind) -> Option<(u8, u8)> {
    match kind {
        TokenKind::ArithmeticOp(ArithmeticOp::Add | ArithmeticOp::Sub) => Some((50, 51)),
        TokenKind::ArithmeticOp(ArithmeticOp::Mul | ArithmeticOp::Div | ArithmeticOp::Mod) => {
            Some((60, 61))
        }
        TokenKind::Operator(Op::Eq | Op::Ne | Op::Gt | Op::Ge | Op::Lt | Op::Le) => Some((40, 41)),
        TokenKind::Operator(Op::And) => Some((20, 21)),
        TokenKind::Operator(Op::Or) => Some((10, 11)),
        _ => None,
    }
}

impl ParseTree<'_> {
    pub fn print_tree(&self, id: NodeId, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self.node(id) {
            Node::Literal(Literal { span, .. }) | Node::PropertyPath(span) => {
                write!(f, "{}", self.text(span))
            }
            Node::Not(child) => {
                write!(f, "(not ")?;
                self.print_tree(child, f)?;
                write!(f, ")")
            }
            Node::Comparison { left, op, right } => {
                let op = match op {
                    ComparisonOp::Eq => "eq",
                    ComparisonOp::Ne => "ne",
                    ComparisonOp::Gt => "gt",
                    ComparisonOp::Ge => "ge",
                    ComparisonOp::Lt => "lt",
                    ComparisonOp::Le => "le",
                };
                self.print_infix(left, op, right, f)
            }
            Node::Logical { left, op, right } => {
                let op = match op {
                    LogicalOp::And => "and",
                    LogicalOp::Or => "or",
                };
                self.print_infix(left, op, right, f)
            }
            Node::Arithmetic { left, op, right } => {
                self.print_infix(left, &op.to_string(), right, f)
            }
            Node::FunctionCall { name, args } => {
                write!(f, "{}(", self.text(name))?;
                for (i, arg) in self.args(&args).iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    self.print_tree(*arg, f)?;
                }
                write!(f, ")")
            }
            Node::ComputeAlias { expr, alias } => {
                self.print_tree(expr, f)?;
                write!(f, " as {}", self.text(alias))
            }
            Node::OrderBy { expr, descending } => {
                self.print_tree(expr, f)?;
                write!(f, " {}", if descending { "desc" } else { "asc" })
            }
        }
    }

    fn print_infix(
        &self,
        left: NodeId,
        op: &str,
        right: NodeId,
        f: &mut std::fmt::Formatter,
    ) -> std::fmt::Result {
        write!(f, "(")?;
        self.print_tree(left, f)?;
        write!(f, " {op} ")?;
        self.print_tree(right, f)?;
        write!(f, ")")
    }
}

pub struct TreePrinter<'a, 'input>(pub &'a ParseTree<'input>, pub NodeId);

impl std::fmt::Display for TreePrinter<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.print_tree(self.1, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex::tokenize;

    fn printed(source: &str) -> String {
        let pool = NodePool::new(4);
        let tokens = tokenize(source).expect("valid tokens");
        let (tree, root) = parse(&tokens, &pool).expect("a valid parse");
        TreePrinter(&tree, root).to_string()
    }

    fn parse_err(source: &str) -> Error {
        let pool = NodePool::new(4);
        let tokens = tokenize(source).expect("valid tokens");
        parse(&tokens, &pool).expect_err("a parse error")
    }

    #[test]
    fn comparison() {
        let pool = NodePool::new(4);
        let tokens = tokenize("Price gt 100").expect("valid tokens");
        let (tree, root) = parse(&tokens, &pool).expect("a valid parse");
        let Node::Comparison {
            left,
            op: ComparisonOp::Gt,
            right,
        } = *tree.node(root)
        else {
            panic!("Expected a Gt, got {:?}", tree.node(root))
        };
        let Node::PropertyPath(span) = *tree.node(left) else {
            panic!("Expected a property, got {:?}", tree.node(left))
        };
        assert_eq!(tree.text(span), "Price");
        let Node::Literal(lit) = *tree.node(right) else {
            panic!("Expected a literal, got {:?}", tree.node(right))
        };
        assert_eq!(lit.kind, LiteralKind::Number);
        assert_eq!(tree.text(lit.span), "100");
    }

    #[test]
    fn null_is_kept_as_a_literal() {
        let pool = NodePool::new(4);
        let tokens = tokenize("Description eq null").expect("valid tokens");
        let (tree, root) = parse(&tokens, &pool).expect("a valid parse");
        let Node::Comparison { right, .. } = *tree.node(root) else {
            panic!("Expected a comparison")
        };
        assert!(matches!(
            tree.node(right),
            Node::Literal(Literal {
                kind: LiteralKind::Null,
                ..
            })
        ));
    }

    #[test]
    fn precedence() {
        assert_eq!(
            printed("A eq 1 or B eq 2 and C eq 3"),
            "((A eq 1) or ((B eq 2) and (C eq 3)))"
        );
        assert_eq!(
            printed("not A eq null and B eq null"),
            "((not (A eq null)) and (B eq null))"
        );
        assert_eq!(
            printed("Price add Tax mul 2 gt 10"),
            "((Price add (Tax mul 2)) gt 10)"
        );
    }

    #[test]
    fn left_associative() {
        assert_eq!(printed("A sub B sub C"), "((A sub B) sub C)");
        assert_eq!(printed("A div B mod C"), "((A div B) mod C)");
        assert_eq!(printed("A or B or C"), "((A or B) or C)");
    }

    #[test]
    fn parentheses_override_precedence() {
        assert_eq!(
            printed("(A eq 1 or B eq 2) and C eq 3"),
            "(((A eq 1) or (B eq 2)) and (C eq 3))"
        );
        assert_eq!(printed("not (A eq null)"), "(not (A eq null))");
    }

    #[test]
    fn fn_calls() {
        assert_eq!(
            printed("contains(tolower(Name), 'abc') and length(Name) gt 3"),
            "(contains(tolower(Name), 'abc') and (length(Name) gt 3))"
        );
        assert_eq!(printed("now() gt CreatedAt"), "(now() gt CreatedAt)");
    }

    #[test]
    fn paths() {
        assert_eq!(printed("Address/City eq 'Oslo'"), "(Address/City eq 'Oslo')");
    }

    #[test]
    fn failures() {
        assert_eq!(parse_err(""), Error::NoExpression);
        assert_eq!(parse_err("(A eq 1"), Error::MissingCloseParen(0));
        assert_eq!(parse_err("contains(Name, 'x'"), Error::MissingCloseParen(8));
        assert_eq!(parse_err("A eq"), Error::UnexpectedEof(4));
        assert_eq!(parse_err("A eq 1 eq 2"), Error::ChainedComparison(7));
        assert_eq!(
            parse_err("A eq 1 B"),
            Error::UnexpectedToken {
                position: 7,
                text: "B".into()
            }
        );
        assert_eq!(
            parse_err("Price mul 2 as Doubled"),
            Error::UnexpectedToken {
                position: 12,
                text: "as".into()
            }
        );
        assert_eq!(
            parse_err("contains(Name 'x')"),
            Error::UnexpectedToken {
                position: 14,
                text: "'x'".into()
            }
        );
        assert!(matches!(parse_err("A eq 1)"), Error::UnexpectedToken { position: 6, .. }));
    }

    #[test]
    fn too_deep() {
        let source = format!("{}A eq 1{}", "(".repeat(200), ")".repeat(200));
        assert!(matches!(parse_err(&source), Error::TooDeep(_)));
    }

    fn chain(terms: usize, op: &str) -> String {
        (0..terms)
            .map(|i| format!("A eq {i}"))
            .collect::<Vec<_>>()
            .join(op)
    }

    #[test]
    fn long_flat_chains_count_towards_depth() {
        // A comparison is two levels tall, each connective adds one more
        let pool = NodePool::new(4);
        let fits = chain(MAX_DEPTH - 1, " or ");
        let tokens = tokenize(&fits).expect("valid tokens");
        assert!(parse(&tokens, &pool).is_ok());

        for op in [" or ", " and "] {
            let source = chain(MAX_DEPTH, op);
            assert!(matches!(parse_err(&source), Error::TooDeep(_)), "{op}");
        }

        let sum = format!("A eq {}", vec!["1"; 3_000].join(" add "));
        assert!(matches!(parse_err(&sum), Error::TooDeep(_)));

        let nots = format!("{}A", "not ".repeat(MAX_DEPTH));
        assert!(matches!(parse_err(&nots), Error::TooDeep(_)));
    }

    #[test]
    fn failed_parse_releases_its_tree() {
        let pool = NodePool::new(4);
        let tokens = tokenize("A eq 1 and").expect("valid tokens");
        assert!(parse(&tokens, &pool).is_err());
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn compute_list() {
        let pool = NodePool::new(4);
        let tokens = tokenize("Price mul 1.1 as PriceWithTax, year(CreatedAt) as Year").expect("valid tokens");
        let (tree, list) = parse_compute(&tokens, &pool).expect("a valid parse");
        let items = tree.args(&list);
        assert_eq!(items.len(), 2);
        let printed: Vec<_> = items
            .iter()
            .map(|id| TreePrinter(&tree, *id).to_string())
            .collect();
        assert_eq!(
            printed,
            ["(Price mul 1.1) as PriceWithTax", "year(CreatedAt) as Year"]
        );
    }

    #[test]
    fn compute_requires_alias() {
        let pool = NodePool::new(4);
        let tokens = tokenize("Price mul 2").expect("valid tokens");
        assert_eq!(
            parse_compute(&tokens, &pool).map(|_| ()),
            Err(Error::MissingAlias(11))
        );
        let tokens = tokenize("Price mul 2 as").expect("valid tokens");
        assert_eq!(
            parse_compute(&tokens, &pool).map(|_| ()),
            Err(Error::UnexpectedEof(14))
        );
        let tokens = tokenize("Price mul 2 as X Y").expect("valid tokens");
        assert!(parse_compute(&tokens, &pool).is_err());
    }

    #[test]
    fn orderby_list() {
        let pool = NodePool::new(4);
        let tokens = tokenize("Name desc, year(CreatedAt), Price ASC").expect("valid tokens");
        let (tree, list) = parse_orderby(&tokens, &pool).expect("a valid parse");
        let printed: Vec<_> = tree
            .args(&list)
            .iter()
            .map(|id| TreePrinter(&tree, *id).to_string())
            .collect();
        assert_eq!(printed, ["Name desc", "year(CreatedAt) asc", "Price asc"]);

        let tokens = tokenize("Name sideways").expect("valid tokens");
        assert!(parse_orderby(&tokens, &pool).is_err());
    }
}
