use odata_expr::{
    lex::tokenize,
    parser::{Node, TreePrinter, parse},
    pool::NodePool,
};

fn main() {
    println!("sizeof(Node) = {}", std::mem::size_of::<Node>());

    let pool = NodePool::default();
    for line in std::io::stdin().lines() {
        let line = line.expect("a line");
        let now = std::time::Instant::now();
        let res = tokenize(&line)
            .map_err(odata_expr::parser::Error::from)
            .and_then(|tokens| {
                parse(&tokens, &pool).map(|(tree, root)| TreePrinter(&tree, root).to_string())
            });
        print!("[in {}μs] ", now.elapsed().as_micros());
        match res {
            Err(e) => println!("Error parsing input: {e}"),
            Ok(printed) => println!("{printed}"),
        }
    }
}
