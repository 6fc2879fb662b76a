use crate::{
    Compiler, Dialect, NodePool,
    metadata::{EntityMetadata, PropertyMetadata, SqlType, StructuredType},
};

fn metadata() -> EntityMetadata {
    EntityMetadata::new("Orders")
        .with_key("ID")
        .with_property("ID", PropertyMetadata::new("id", SqlType::Integer).required())
        .with_property("Name", PropertyMetadata::new("name", SqlType::Text))
        .with_property("Price", PropertyMetadata::new("price", SqlType::Decimal))
        .with_property("Shipped", PropertyMetadata::new("shipped", SqlType::Boolean))
        .with_property("ShipDate", PropertyMetadata::new("ship_date", SqlType::Date))
        .with_property("CreatedAt", PropertyMetadata::new("created_at", SqlType::DateTime))
        .with_complex(
            "Address",
            StructuredType::new()
                .with_property("City", PropertyMetadata::new("city", SqlType::Text)),
        )
        .with_navigation(
            "Customer",
            "c",
            StructuredType::new().with_property("Name", PropertyMetadata::new("name", SqlType::Text)),
        )
}

/// Feeds [expr] through every entry point for every dialect. Errors are
///  expected; panics are what the fuzzer is looking for.
pub fn translate_expr(expr: &str) {
    let metadata = metadata();
    let pool = NodePool::new(4);
    for dialect in Dialect::ALL {
        let compiler = Compiler::with_pool(dialect, pool.clone());
        _ = compiler.filter(expr, &metadata);
        _ = compiler.compute(expr, &metadata);
        _ = compiler.orderby(expr, &metadata);
    }
}
