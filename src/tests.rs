use crate::{
    Compiler, Dialect, Error, ErrorKind, NodePool, Value, compile_compute, compile_filter,
    compile_orderby, expression::Operand, functions::Function, metadata::tests::products,
    parse_compute_expression, parse_filter_expression,
};

fn filter(source: &str, dialect: Dialect) -> (String, Vec<Value>) {
    let fragment = compile_filter(source, &products(), dialect)
        .unwrap_or_else(|e| panic!("{source} failed on {dialect}: {e}"));
    (fragment.sql, fragment.args)
}

#[test]
fn null_round_trip() {
    for dialect in Dialect::ALL {
        for (property, column) in [("Description", "description"), ("Price", "price")] {
            let (sql, args) = filter(&format!("{property} eq null"), dialect);
            assert_eq!(sql, format!("{column} IS NULL"));
            assert!(args.is_empty());

            let (sql, args) = filter(&format!("{property} ne null"), dialect);
            assert_eq!(sql, format!("{column} IS NOT NULL"));
            assert!(args.is_empty());
        }
    }
}

#[test]
fn boolean_composition_is_parenthesized() {
    let (sql, args) = filter("Description eq null and Name eq null", Dialect::Sqlite);
    assert_eq!(sql, "(description IS NULL) AND (name IS NULL)");
    assert!(args.is_empty());

    let (sql, _) = filter("not (Description eq null)", Dialect::Sqlite);
    assert_eq!(sql, "NOT (description IS NULL)");

    let (sql, _) = filter(
        "Price gt 1 or Price lt 0 and not contains(Name, 'x')",
        Dialect::Postgres,
    );
    assert_eq!(
        sql,
        r"(price > ?) OR ((price < ?) AND (NOT (name LIKE ? ESCAPE '\')))"
    );
}

#[test]
fn like_escaping() {
    let (sql, args) = filter("contains(Name, '%_')", Dialect::Sqlite);
    assert_eq!(sql, r"name LIKE ? ESCAPE '\'");
    assert_eq!(args, [Value::from(r"%\%\_%")]);

    for s in ["", "plain", r"back\slash", "50% off", "snake_case", "it''s"] {
        let (_, args) = filter(&format!("contains(Name, '{s}')"), Dialect::Postgres);
        let unquoted = s.replace("''", "'");
        let expected = format!(
            "%{}%",
            unquoted
                .replace('\\', r"\\")
                .replace('%', r"\%")
                .replace('_', r"\_")
        );
        assert_eq!(args, [Value::Text(expected)], "{s}");
    }
}

#[test]
fn dialect_specific_escape_clause() {
    let (sql, args) = filter("contains(Name, '%_')", Dialect::Mysql);
    assert_eq!(sql, r"name LIKE ? ESCAPE '\\'");
    assert_eq!(args, [Value::from(r"%\%\_%")]);

    for dialect in [Dialect::Sqlite, Dialect::Postgres, Dialect::SqlServer] {
        let (sql, _) = filter("contains(Name, '%_')", dialect);
        assert_eq!(sql, r"name LIKE ? ESCAPE '\'", "{dialect}");
    }
}

#[test]
fn unknown_property_rejected() {
    for source in [
        "Colour eq 'red'",
        "Price gt 1 and Colour eq 'red'",
        "contains(Colour, 'x')",
        "Address/Country eq 'NO'",
    ] {
        let err = compile_filter(source, &products(), Dialect::Sqlite)
            .expect_err("unknown property");
        assert_eq!(err.kind(), ErrorKind::Validation, "{source}");
    }
}

#[test]
fn unterminated_literal_rejected() {
    let err = compile_filter("Name eq 'abc", &products(), Dialect::Sqlite)
        .expect_err("unterminated literal");
    assert!(matches!(err, Error::Syntax { position: 8, .. }), "{err:?}");
    assert_eq!(err.status_code(Default::default()), 400);
}

#[test]
fn trailing_tokens_rejected() {
    for source in ["Price gt 1 Price", "Price gt 1)", "(Price gt 1", ""] {
        let err = compile_filter(source, &products(), Dialect::Sqlite).expect_err("syntax");
        assert_eq!(err.kind(), ErrorKind::Syntax, "{source:?}");
    }
}

#[test]
fn compute_alias_uniqueness() {
    let err = parse_compute_expression("Price mul 1.1 as X,Price mul 0.9 as X", &products())
        .expect_err("duplicate alias");
    assert_eq!(err, Error::validation("duplicate alias 'X' in $compute"));
}

#[test]
fn argument_ordering() {
    let (sql, args) = filter("Price gt 100 and Price lt 200", Dialect::Sqlite);
    assert_eq!(sql, "(price > ?) AND (price < ?)");
    assert_eq!(args, [Value::Integer(100), Value::Integer(200)]);
}

#[test]
fn date_function_scenario() {
    let compute = parse_compute_expression("year(CreatedAt) as Year", &products())
        .expect("valid compute");
    assert_eq!(compute.expressions.len(), 1);
    assert_eq!(compute.expressions[0].alias, "Year");
    assert_eq!(
        compute.expressions[0].operand,
        Operand::Call {
            function: Function::Year,
            args: vec![Operand::Property("CreatedAt".into())],
        }
    );

    let expected = [
        (Dialect::Sqlite, r#"CAST(strftime('%Y', created_at) AS INTEGER) AS "Year""#),
        (Dialect::Postgres, r#"CAST(EXTRACT(YEAR FROM created_at) AS INTEGER) AS "Year""#),
        (Dialect::Mysql, "YEAR(created_at) AS `Year`"),
        (Dialect::SqlServer, "DATEPART(year, created_at) AS [Year]"),
    ];
    for (dialect, sql) in expected {
        let fragment =
            compile_compute("year(CreatedAt) as Year", &products(), dialect).expect("compiles");
        assert_eq!(fragment.columns.len(), 1);
        assert_eq!(fragment.columns[0].sql, sql);
        assert_eq!(fragment.columns[0].alias, "Year");
        assert!(fragment.args.is_empty());
    }

    let err = compile_compute(
        "totaloffsetminutes(CreatedAt) as Offset",
        &products(),
        Dialect::Sqlite,
    )
    .expect_err("no sqlite translation");
    assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
    assert_eq!(err.status_code(crate::UnsupportedPolicy::NotImplemented), 501);
}

#[test]
fn arithmetic_compute() {
    let fragment = compile_compute(
        "Price mul 1.1 as PriceWithTax, Price sub Cost as Margin",
        &products(),
        Dialect::Postgres,
    )
    .expect("compiles");
    assert_eq!(
        fragment.select_list(),
        r#"(price * ?) AS "PriceWithTax", (price - cost) AS "Margin""#
    );
    assert_eq!(fragment.args, [Value::Float(1.1)]);
}

#[test]
fn reserved_word_aliases_are_quoted() {
    let expected = [
        (Dialect::Sqlite, r#"(price * ?) AS "Order""#),
        (Dialect::Postgres, r#"(price * ?) AS "Order""#),
        (Dialect::Mysql, "(price * ?) AS `Order`"),
        (Dialect::SqlServer, "(price * ?) AS [Order]"),
    ];
    for (dialect, sql) in expected {
        let fragment =
            compile_compute("Price mul 2 as Order", &products(), dialect).expect("compiles");
        assert_eq!(fragment.columns[0].sql, sql);
        assert_eq!(fragment.columns[0].alias, "Order");
    }
}

#[test]
fn orderby() {
    let fragment = compile_orderby("Name desc, year(CreatedAt)", &products(), Dialect::Mysql)
        .expect("compiles");
    assert_eq!(fragment.items, ["name DESC", "YEAR(created_at) ASC"]);
    assert_eq!(fragment.sql(), "name DESC, YEAR(created_at) ASC");

    let fragment = compile_orderby("Price mul 2 asc", &products(), Dialect::Sqlite)
        .expect("compiles");
    assert_eq!(fragment.items, ["(price * ?) ASC"]);
    assert_eq!(fragment.args, [Value::Integer(2)]);

    let err = compile_orderby("'x' desc", &products(), Dialect::Sqlite).expect_err("literal");
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn typed_model_is_kept() {
    let filter = parse_filter_expression(
        "Price gt Cost and contains(Category/Name, 'toy')",
        &products(),
    )
    .expect("valid filter");
    assert_eq!(
        filter.referenced_properties(),
        ["Price", "Cost", "Category/Name"]
    );
}

#[test]
fn dedicated_pool_is_reused() {
    let pool = NodePool::new(2);
    let compiler = Compiler::with_pool(Dialect::SqlServer, pool.clone());
    let meta = products();

    for _ in 0..10 {
        let fragment = compiler
            .filter("Name eq 'x' or Category/Parent/Name eq 'y'", &meta)
            .expect("compiles");
        assert_eq!(fragment.sql, "(name = ?) OR (parent_category.name = ?)");
    }
    assert!(compiler.filter("Nope eq 1", &meta).is_err());
    assert!(compiler.filter("Nope eq", &meta).is_err());
    assert_eq!(pool.idle(), 1, "one tree's storage cycles through the pool");
}

#[test]
fn concurrent_requests() {
    let meta = products();
    std::thread::scope(|s| {
        for dialect in Dialect::ALL {
            let meta = &meta;
            s.spawn(move || {
                for i in 0..50 {
                    let fragment = compile_filter(&format!("Price gt {i}"), meta, dialect)
                        .expect("compiles");
                    assert_eq!(fragment.sql, "price > ?");
                    assert_eq!(fragment.args, [Value::Integer(i)]);
                }
            });
        }
    });
}

#[test]
fn unknown_dialect() {
    let err = "db2".parse::<Dialect>().expect_err("unknown");
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(err.status_code(Default::default()), 500);
}

fn or_chain(terms: usize) -> String {
    (0..terms)
        .map(|i| format!("Price eq {i}"))
        .collect::<Vec<_>>()
        .join(" or ")
}

/// Runs [f] on a thread with the stack size async runtimes give their workers.
fn on_small_stack(f: impl FnOnce() + Send + 'static) {
    std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(f)
        .expect("spawn")
        .join()
        .expect("no stack overflow");
}

#[test]
fn long_chains_are_rejected_not_overflowed() {
    on_small_stack(|| {
        for dialect in Dialect::ALL {
            let fragment = compile_filter(&or_chain(100), &products(), dialect).expect("compiles");
            assert_eq!(fragment.args.len(), 100);

            for source in [
                or_chain(3_000),
                vec!["IsActive"; 3_000].join(" and "),
                format!("Price eq {}", vec!["1"; 3_000].join(" add ")),
            ] {
                let err = compile_filter(&source, &products(), dialect).expect_err("too deep");
                assert_eq!(err.kind(), ErrorKind::Syntax, "{dialect}");
            }

            let err = compile_compute(
                &format!("{} as Total", vec!["Price"; 3_000].join(" add ")),
                &products(),
                dialect,
            )
            .expect_err("too deep");
            assert_eq!(err.kind(), ErrorKind::Syntax);

            let err = compile_orderby(&vec!["Price"; 3_000].join(" mul "), &products(), dialect)
                .expect_err("too deep");
            assert_eq!(err.kind(), ErrorKind::Syntax);
        }
    });
}
