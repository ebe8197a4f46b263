use pycraft_core::ast::{Arguments, CmpOperator, Node};
use pycraft_core::{generate, Builder, GeneratorConfig};

fn build() -> Result<Builder, pycraft_core::BuildError> {
    let mut b = Builder::new();
    b.add_import(["os"])?;
    {
        let mut class = b.class_("MyClass", vec![])?;
        let mut method = class.function("my_method", Arguments::positional(["self"])?)?;
        method.if_(Node::compare(
            Node::call(Node::attribute(Node::name("os"), "getenv"), vec![Node::str("DEBUG")]),
            CmpOperator::IsNot,
            Node::none(),
        ))?
        .add_node(Node::return_(Some(Node::int(0))))?;
        method.else_()?.add_node(Node::return_(Some(Node::int(42))))?;
    }
    Ok(b)
}

fn main() -> miette::Result<()> {
    let builder = build()?;

    match generate(&builder, &GeneratorConfig::default()) {
        Ok(code) => {
            println!("Generated module:\n{code}");
        }
        Err(e) => {
            eprintln!("Failed to generate code: {e:?}");
        }
    }
    Ok(())
}
