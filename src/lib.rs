//! Compiles OData `$filter`, `$compute` and `$orderby` expressions to
//!  parameterized SQL for SQLite, PostgreSQL, MySQL and SQL Server.
//!
//! The pipeline is tokenize ([lex]) → parse ([parser], into a pooled
//!  [pool::ParseTree]) → resolve against [metadata] ([resolve], producing the
//!  typed [expression] model) → generate ([translate]).

use tracing::instrument;

pub mod error;
pub mod expression;
pub mod functions;
#[doc(hidden)]
pub mod fuzz_helper;
pub mod lex;
pub mod metadata;
pub mod parser;
pub mod pool;
pub mod resolve;
pub mod to_sql;
pub mod translate;

#[cfg(test)]
mod tests;

pub use error::{Error, ErrorKind, Result, UnsupportedPolicy};
pub use expression::{ComputeExpression, FilterExpression, OrderByExpression, Value};
pub use metadata::EntityMetadata;
pub use pool::NodePool;
pub use translate::{
    ComputeColumn, ComputeFragment, Dialect, OrderByFragment, SqlFragment,
};

/// Runs the pipeline for one dialect with a chosen [NodePool]. The free
///  functions below are this with [NodePool::global].
#[derive(Debug, Clone)]
pub struct Compiler {
    dialect: Dialect,
    pool: NodePool,
}

impl Compiler {
    pub fn new(dialect: Dialect) -> Self {
        Self::with_pool(dialect, NodePool::global().clone())
    }

    pub fn with_pool(dialect: Dialect, pool: NodePool) -> Self {
        Self { dialect, pool }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn pool(&self) -> &NodePool {
        &self.pool
    }

    #[instrument(level = "trace", skip_all, fields(dialect = self.dialect.name()))]
    pub fn parse_filter(&self, input: &str, metadata: &EntityMetadata) -> Result<FilterExpression> {
        let tokens = lex::tokenize(input)?;
        tracing::trace!(tokens = tokens.len(), "tokenized filter");
        let (tree, root) = parser::parse(&tokens, &self.pool)?;
        resolve::resolve_filter(tree, root, metadata)
    }

    #[instrument(level = "trace", skip_all, fields(dialect = self.dialect.name()))]
    pub fn parse_compute(
        &self,
        input: &str,
        metadata: &EntityMetadata,
    ) -> Result<ComputeExpression> {
        let tokens = lex::tokenize(input)?;
        tracing::trace!(tokens = tokens.len(), "tokenized compute");
        let (tree, items) = parser::parse_compute(&tokens, &self.pool)?;
        resolve::resolve_compute(tree, items, metadata)
    }

    #[instrument(level = "trace", skip_all, fields(dialect = self.dialect.name()))]
    pub fn parse_orderby(
        &self,
        input: &str,
        metadata: &EntityMetadata,
    ) -> Result<OrderByExpression> {
        let tokens = lex::tokenize(input)?;
        tracing::trace!(tokens = tokens.len(), "tokenized orderby");
        let (tree, items) = parser::parse_orderby(&tokens, &self.pool)?;
        resolve::resolve_orderby(tree, items, metadata)
    }

    pub fn filter(&self, input: &str, metadata: &EntityMetadata) -> Result<SqlFragment> {
        let filter = self.parse_filter(input, metadata)?;
        translate::generate(&filter, self.dialect, metadata)
    }

    pub fn compute(&self, input: &str, metadata: &EntityMetadata) -> Result<ComputeFragment> {
        let compute = self.parse_compute(input, metadata)?;
        translate::generate_compute(&compute, self.dialect, metadata)
    }

    pub fn orderby(&self, input: &str, metadata: &EntityMetadata) -> Result<OrderByFragment> {
        let orderby = self.parse_orderby(input, metadata)?;
        translate::generate_orderby(&orderby, self.dialect, metadata)
    }
}

/// Compiles a `$filter` value into a `WHERE` fragment and its arguments.
pub fn compile_filter(
    input: &str,
    metadata: &EntityMetadata,
    dialect: Dialect,
) -> Result<SqlFragment> {
    Compiler::new(dialect).filter(input, metadata)
}

/// Compiles a `$compute` value into `SELECT` projections.
pub fn compile_compute(
    input: &str,
    metadata: &EntityMetadata,
    dialect: Dialect,
) -> Result<ComputeFragment> {
    Compiler::new(dialect).compute(input, metadata)
}

/// Compiles an `$orderby` value into `ORDER BY` items.
pub fn compile_orderby(
    input: &str,
    metadata: &EntityMetadata,
    dialect: Dialect,
) -> Result<OrderByFragment> {
    Compiler::new(dialect).orderby(input, metadata)
}

/// Stops after resolution; for callers that keep the typed filter around.
pub fn parse_filter_expression(input: &str, metadata: &EntityMetadata) -> Result<FilterExpression> {
    let tokens = lex::tokenize(input)?;
    let (tree, root) = parser::parse(&tokens, NodePool::global())?;
    resolve::resolve_filter(tree, root, metadata)
}

pub fn parse_compute_expression(
    input: &str,
    metadata: &EntityMetadata,
) -> Result<ComputeExpression> {
    let tokens = lex::tokenize(input)?;
    let (tree, items) = parser::parse_compute(&tokens, NodePool::global())?;
    resolve::resolve_compute(tree, items, metadata)
}

pub fn parse_orderby_expression(
    input: &str,
    metadata: &EntityMetadata,
) -> Result<OrderByExpression> {
    let tokens = lex::tokenize(input)?;
    let (tree, items) = parser::parse_orderby(&tokens, NodePool::global())?;
    resolve::resolve_orderby(tree, items, metadata)
}
