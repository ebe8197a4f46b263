use pycraft_core::ast::{
    Alias, AnnAssign, Arg, Arguments, BinOperator, ClassDef, CmpOperator, Comp, Comprehension,
    FunctionDef, Import, Keyword, Module, Node, UnaryOperator,
};
use pycraft_core::{generate, generate_module, Builder, GeneratorConfig};

const INVENTORY: &str = include_str!("golden/inventory.py");

fn attr(value: &str, name: &str) -> Node {
    Node::attribute(Node::name(value), name)
}

fn build_inventory() -> Builder {
    let mut b = Builder::new();
    b.add_comment("Inventory service.").unwrap();
    b.import_from("__future__", ["annotations"], 0).unwrap();
    b.add_import(["logging"]).unwrap();
    let osp = Alias::new("os.path").unwrap().with_asname("osp").unwrap();
    b.add_node(Node::Import(Import::new(vec![osp]).unwrap()))
        .unwrap();
    b.add_node(Node::assign(
        Node::name("LOG"),
        Node::call(attr("logging", "getLogger"), vec![Node::name("__name__")]),
    ))
    .unwrap();
    b.add_node(Node::AnnAssign(AnnAssign {
        target: Box::new(Node::name("RETRIES")),
        annotation: Box::new(Node::name("int")),
        value: Some(Box::new(Node::int(3))),
        comment: Some("attempts per call".to_string()),
    }))
    .unwrap();

    let class = ClassDef::new("Item", vec![Node::name("Base")])
        .unwrap()
        .decorated(Node::name("dataclass"))
        .keyword(Keyword::new("metaclass", Node::name("Meta")));
    {
        let mut item = b.block(Node::ClassDef(class)).unwrap();
        item.add_node(Node::ann_assign(Node::name("name"), Node::name("str"), None))
            .unwrap();
        item.add_node(Node::ann_assign(
            Node::name("count"),
            Node::name("int"),
            Some(Node::int(0)),
        ))
        .unwrap();

        let mut args = Arguments::positional(["self"]).unwrap();
        args.vararg = Some(Arg::new("prices").unwrap());
        args.kwonlyargs.push(
            Arg::new("scale")
                .unwrap()
                .annotated(Node::name("float"))
                .with_default(Node::float(1.0)),
        );
        let total = FunctionDef::new("total", args)
            .unwrap()
            .returns(Node::name("float"));
        {
            let mut f = item.block(Node::FunctionDef(total)).unwrap();
            let priced = Node::ListComp(Comp {
                elt: Box::new(Node::binop(
                    Node::name("p"),
                    BinOperator::Mult,
                    attr("self", "count"),
                )),
                generators: vec![Comprehension::new(Node::name("p"), Node::name("prices"))],
            });
            f.add_node(Node::return_(Some(Node::binop(
                Node::call(Node::name("sum"), vec![priced]),
                BinOperator::Mult,
                Node::name("scale"),
            ))))
            .unwrap();
        }
        {
            let mut f = item
                .async_function("refresh", Arguments::positional(["self"]).unwrap())
                .unwrap();
            {
                let mut session = f
                    .async_with(Node::call(Node::name("session"), vec![]), Some(Node::name("s")))
                    .unwrap();
                session
                    .add_node(Node::assign(
                        Node::name("data"),
                        Node::await_(Node::call(attr("s", "get"), vec![attr("self", "name")])),
                    ))
                    .unwrap();
            }
            let mut check = f
                .if_(Node::unary(UnaryOperator::Not, Node::name("data")))
                .unwrap();
            check
                .add_node(Node::raise(
                    Some(Node::call(Node::name("LookupError"), vec![attr("self", "name")])),
                    None,
                ))
                .unwrap();
        }
    }

    {
        let mut f = b
            .function("load", Arguments::positional(["path"]).unwrap())
            .unwrap();
        {
            let mut attempt = f.try_().unwrap();
            let mut opened = attempt
                .with_(
                    Node::call(Node::name("open"), vec![Node::name("path")]),
                    Some(Node::name("fh")),
                )
                .unwrap();
            let rows = Node::ListComp(Comp {
                elt: Box::new(Node::call(attr("line", "strip"), vec![])),
                generators: vec![
                    Comprehension::new(Node::name("line"), Node::name("fh"))
                        .filtered(Node::name("line")),
                ],
            });
            opened.add_node(Node::assign(Node::name("rows"), rows)).unwrap();
        }
        {
            let mut handler = f
                .except_(
                    Some(Node::tuple(vec![
                        Node::name("OSError"),
                        Node::name("ValueError"),
                    ])),
                    Some("err"),
                )
                .unwrap();
            handler
                .add_node(Node::expr(Node::call(
                    attr("LOG", "warning"),
                    vec![Node::str("failed: %s"), Node::name("err")],
                )))
                .unwrap();
            handler
                .add_node(Node::return_(Some(Node::list(vec![]))))
                .unwrap();
        }
        f.else_()
            .unwrap()
            .add_node(Node::return_(Some(Node::name("rows"))))
            .unwrap();
        f.finally_()
            .unwrap()
            .add_node(Node::expr(Node::call(
                attr("LOG", "debug"),
                vec![Node::str("done")],
            )))
            .unwrap();
    }

    {
        let mut f = b
            .function("classify", Arguments::positional(["value"]).unwrap())
            .unwrap();
        f.match_(Node::name("value")).unwrap();
        f.case_(Node::int(0), None)
            .unwrap()
            .add_node(Node::return_(Some(Node::str("zero"))))
            .unwrap();
        f.case_(Node::name("_"), None).unwrap().close().unwrap();
        {
            let mut scan = f
                .for_(
                    Node::tuple(vec![Node::name("i"), Node::name("ch")]),
                    Node::call(Node::name("enumerate"), vec![Node::name("value")]),
                )
                .unwrap();
            scan.if_(Node::compare(Node::name("ch"), CmpOperator::Eq, Node::str(" ")))
                .unwrap()
                .add_node(Node::Continue)
                .unwrap();
            scan.elif_(Node::compare(
                Node::name("ch"),
                CmpOperator::In,
                Node::set(vec![Node::str("a"), Node::str("b")]),
            ))
            .unwrap()
            .add_node(Node::Break)
            .unwrap();
        }
        f.else_()
            .unwrap()
            .add_node(Node::return_(Some(Node::none())))
            .unwrap();
        f.while_(Node::compare(Node::name("i"), CmpOperator::Lt, Node::int(10)))
            .unwrap()
            .add_node(Node::aug_assign(Node::name("i"), BinOperator::Add, Node::int(1)))
            .unwrap();
        f.add_node(Node::return_(Some(Node::dict(vec![
            (Node::str("index"), Node::name("i")),
            (
                Node::str("neg"),
                Node::unary(UnaryOperator::USub, Node::name("i")),
            ),
            (
                Node::str("pow"),
                Node::binop(
                    Node::int(2),
                    BinOperator::Pow,
                    Node::unary(UnaryOperator::USub, Node::name("i")),
                ),
            ),
        ]))))
        .unwrap();
    }
    b
}

#[test]
fn test_inventory_matches_golden_file() {
    let b = build_inventory();
    let code = generate(&b, &GeneratorConfig::default()).unwrap();
    assert_eq!(code, INVENTORY);
}

#[test]
fn test_inventory_survives_json_round_trip() {
    let mut b = build_inventory();
    let module = b.finish().unwrap();
    let restored = Module::from_json(&module.to_json().unwrap()).unwrap();
    let code = generate_module(&restored, &GeneratorConfig::default()).unwrap();
    assert_eq!(code, INVENTORY);
}

#[test]
fn test_every_line_ends_with_newline() {
    let code = generate(&build_inventory(), &GeneratorConfig::default()).unwrap();
    assert!(code.ends_with('\n'));
    assert!(!code.ends_with("\n\n"));
}
