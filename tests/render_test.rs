use std::collections::BTreeMap;
use utpl::{BlockKind, CompileError, Context, Error, RenderError, Value, compile_template, render};

fn render_str(tpl: &str, ctx: &Context) -> String {
    let template = compile_template(tpl).expect("template should compile");
    render(&template, ctx).expect("template should render")
}

#[test]
fn test_literal_round_trip() {
    let inputs = [
        "",
        "plain text",
        "  leading and trailing whitespace \n\t",
        "braces { alone } and %} and #} and }}",
        "unicode: 模板 ✓ {x",
    ];
    for s in inputs {
        assert_eq!(render_str(s, &Context::new()), s);
    }
}

#[test]
fn test_balanced_nesting_required() {
    let unbalanced = [
        "{% for x in a %}",
        "{% if a %}",
        "{% endfor %}",
        "{% endif %}",
        "{% for x in a %}{% endfor %}{% endfor %}",
        "{% if a %}{% for x in a %}{% endif %}{% endfor %}",
    ];
    for tpl in unbalanced {
        match compile_template(tpl) {
            Err(Error::Compile(_)) => {}
            other => panic!("Expected compile error for `{}`, got {:?}", tpl, other),
        }
    }

    let balanced = [
        "{% for x in a %}{% endfor %}",
        "{% if a %}{% for x in a %}{% if x %}{% endif %}{% endfor %}{% endif %}",
        "{% for x in a %}{% endfor %}{% if b %}{% endif %}",
    ];
    for tpl in balanced {
        assert!(compile_template(tpl).is_ok(), "`{}` should compile", tpl);
    }
}

#[test]
fn test_unclosed_reports_kind_and_count() {
    match compile_template("{% for a in x %}{% for b in a %}") {
        Err(Error::Compile(CompileError::Unclosed {
            kind,
            loops,
            conditions,
            ..
        })) => {
            assert_eq!(kind, BlockKind::Loop);
            assert_eq!(loops, 2);
            assert_eq!(conditions, 0);
        }
        other => panic!("Expected Unclosed, got {:?}", other),
    }
}

#[test]
fn test_loop_cardinality() {
    let tpl = "{% for x in items %}{{x}}{% endfor %}";

    let empty = Context::new().with("items", Value::List(vec![]));
    assert_eq!(render_str(tpl, &empty), "");

    let abc = Context::new().with("items", vec!["a", "b", "c"]);
    assert_eq!(render_str(tpl, &abc), "abc");

    let mixed = Context::new().with(
        "items",
        Value::List(vec![Value::Int(1), Value::Bool(true), Value::Float(2.5)]),
    );
    assert_eq!(render_str(tpl, &mixed), "1true2.5");
}

#[test]
fn test_shadowing() {
    let tpl = "{% for x in outer %}{{x}}{% endfor %}{{x}}";
    let ctx = Context::new().with("outer", vec![1, 2]).with("x", "orig");
    assert_eq!(render_str(tpl, &ctx), "12orig");
}

#[test]
fn test_nested_scopes() {
    let tpl = "{% for x in xs %}[{% for x in ys %}{{x}}{{y}}{% endfor %}{{x}}]{% endfor %}";
    let ctx = Context::new()
        .with("xs", vec!["a", "b"])
        .with("ys", vec![1, 2])
        .with("y", "-");
    assert_eq!(render_str(tpl, &ctx), "[1-2-a][1-2-b]");
}

#[test]
fn test_loop_variable_not_visible_after_loop() {
    let template = compile_template("{% for i in items %}{% endfor %}{{ i }}").unwrap();
    let ctx = Context::new().with("items", vec![1]);
    assert_eq!(
        render(&template, &ctx),
        Err(RenderError::Undefined {
            name: "i".to_string()
        })
    );
}

#[test]
fn test_truthiness() {
    let tpl = "{% if flag %}A{% endif %}";

    let truthy = [
        Value::Bool(true),
        Value::Int(3),
        Value::Float(-0.5),
        Value::from("x"),
        Value::from(vec![0]),
    ];
    for v in truthy {
        let ctx = Context::new().with("flag", v.clone());
        assert_eq!(render_str(tpl, &ctx), "A", "{:?} should be truthy", v);
    }

    let falsy = [
        Value::Bool(false),
        Value::Int(0),
        Value::Float(0.0),
        Value::from(""),
        Value::List(vec![]),
        Value::Null,
        Value::Map(BTreeMap::new()),
    ];
    for v in falsy {
        let ctx = Context::new().with("flag", v.clone());
        assert_eq!(render_str(tpl, &ctx), "", "{:?} should be falsy", v);
    }
}

#[test]
fn test_end_to_end_list() {
    let tpl = "<ul>{% for p in items %}<li>{{p}}</li>{% endfor %}</ul>";
    let ctx = Context::new().with("items", vec![1, 2]);
    assert_eq!(render_str(tpl, &ctx), "<ul><li>1</li><li>2</li></ul>");
}

#[test]
fn test_comment_elision() {
    assert_eq!(render_str("A{# drop me #}B", &Context::new()), "AB");
    let ctx = Context::new().with("drop", "x");
    assert_eq!(render_str("A{# drop me #}B", &ctx), "AB");
}

#[test]
fn test_whitespace_preserved_outside_markers() {
    let tpl = "    <p>Products:</p>\n{% for product in product_list   %}\n    <li>   {{ product }} </li>\n{%   endfor   %}\n";
    let ctx = Context::new().with("product_list", vec![1, 2]);
    assert_eq!(
        render_str(tpl, &ctx),
        "    <p>Products:</p>\n\n    <li>   1 </li>\n\n    <li>   2 </li>\n\n"
    );
}

#[test]
fn test_template_reused_across_contexts() {
    let template = compile_template("{% if user %}Welcome, {{ user }}!{% endif %}").unwrap();
    assert_eq!(
        template.render(&Context::new().with("user", "ann")).unwrap(),
        "Welcome, ann!"
    );
    assert_eq!(
        template.render(&Context::new().with("user", false)).unwrap(),
        ""
    );
}

#[test]
fn test_render_errors() {
    let template = compile_template("{{ name }}").unwrap();
    assert_eq!(
        render(&template, &Context::new()),
        Err(RenderError::Undefined {
            name: "name".to_string()
        })
    );

    let template = compile_template("{% for c in name %}{% endfor %}").unwrap();
    assert!(matches!(
        render(&template, &Context::new().with("name", "abc")),
        Err(RenderError::NotIterable { found: "string", .. })
    ));

    let template = compile_template("{% if n > 'a' %}{% endif %}").unwrap();
    assert!(matches!(
        render(&template, &Context::new().with("n", 1)),
        Err(RenderError::TypeMismatch { op: ">", .. })
    ));
}

#[test]
fn test_tokenize_errors() {
    assert!(matches!(
        compile_template("hello {{ name"),
        Err(Error::Tokenize(_))
    ));
    assert!(matches!(
        compile_template("{% include x %}"),
        Err(Error::Tokenize(_))
    ));
}

#[test]
fn test_error_positions_in_messages() {
    let err = compile_template("line one\n  {% endif %}").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Compile error: mismatched `endif` at 2:3: no block is open"
    );
}

#[test]
fn test_deep_nesting_is_an_error() {
    let deep_blocks = format!(
        "{}x{}",
        "{% if a %}".repeat(100_000),
        "{% endif %}".repeat(100_000)
    );
    assert!(matches!(
        compile_template(&deep_blocks),
        Err(Error::Compile(CompileError::TooDeep { .. }))
    ));

    let deep_expr = format!("{{{{ {}a{} }}}}", "(".repeat(100_000), ")".repeat(100_000));
    assert!(matches!(
        compile_template(&deep_expr),
        Err(Error::Compile(CompileError::InvalidExpression { .. }))
    ));

    let nested = format!("{}x{}", "{% if a %}".repeat(64), "{% endif %}".repeat(64));
    let template = compile_template(&nested).unwrap();
    assert_eq!(render(&template, &Context::new().with("a", true)).unwrap(), "x");
}

#[test]
fn test_keyword_loop_binding_rejected() {
    let ctx = Context::new().with("items", vec![1, 2]);
    for keyword in ["true", "false", "null", "and", "or", "not"] {
        let tpl = format!("{{% for {} in items %}}{{{{ {} }}}}{{% endfor %}}", keyword, keyword);
        match compile_template(&tpl) {
            Err(Error::Compile(CompileError::MalformedLoopHeader { .. })) => {}
            other => panic!("Expected MalformedLoopHeader for `{}`, got {:?}", keyword, other),
        }
    }
    assert_eq!(
        render_str("{% for truth in items %}{{ truth }}{% endfor %}", &ctx),
        "12"
    );
}
