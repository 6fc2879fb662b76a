use criterion::{Criterion, criterion_group, criterion_main};
use odata_expr::{
    Compiler, Dialect, NodePool,
    lex::tokenize,
    metadata::{EntityMetadata, PropertyMetadata, SqlType, StructuredType},
    parser::parse,
};

const TESTS: [&str; 6] = [
    "Price gt 100 and Price lt 200",
    "Description eq null and Name eq null",
    "contains(tolower(Name), 'widget') or startswith(Name, 'A%_')",
    "Address/City eq 'Oslo' and not (Price mul 2 add 1 ge 10)",
    "year(CreatedAt) eq 2024 and month(CreatedAt) ge 6",
    "((((((((((Price gt 1))))))))))",
];

fn metadata() -> EntityMetadata {
    EntityMetadata::new("Products")
        .with_property("Name", PropertyMetadata::new("name", SqlType::Text))
        .with_property("Description", PropertyMetadata::new("description", SqlType::Text))
        .with_property("Price", PropertyMetadata::new("price", SqlType::Decimal))
        .with_property("CreatedAt", PropertyMetadata::new("created_at", SqlType::DateTime))
        .with_complex(
            "Address",
            StructuredType::new()
                .with_property("City", PropertyMetadata::new("address_city", SqlType::Text)),
        )
}

fn parse_only(pool: &NodePool) {
    for test in TESTS.iter() {
        let tokens = tokenize(test).expect("valid tokens");
        _ = std::hint::black_box(parse(&tokens, pool));
    }
}

fn compile(compiler: &Compiler, metadata: &EntityMetadata) {
    for test in TESTS.iter() {
        _ = std::hint::black_box(compiler.filter(test, metadata));
    }
}

fn criterion_benchmark(c: &mut Criterion) {
    let pool = NodePool::default();
    c.bench_function("parse", |b| b.iter(|| parse_only(&pool)));

    let metadata = metadata();
    let compiler = Compiler::with_pool(Dialect::Postgres, pool.clone());
    c.bench_function("compile filter", |b| b.iter(|| compile(&compiler, &metadata)));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
