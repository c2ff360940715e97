use crate::error::{Error, RenderError};
use crate::tpl::ast::Template;
use crate::tpl::lexer::Tokenizer;
use crate::tpl::render_context::Context;
use crate::tpl::render::render as render_tree;
use crate::tpl::{cache, parser};
use std::time::Instant;
use tracing::debug;

/// 编译模板文本：词法分析 → 构建模板树
pub fn compile_template(source: &str) -> Result<Template, Error> {
    let start = Instant::now();
    let tokens = Tokenizer::new(source).collect::<Result<Vec<_>, _>>()?;
    let template = parser::compile(tokens)?;
    debug!(
        "compile: source_len={}, nodes={}, elapsed_us={}",
        source.len(),
        template.node_count(),
        start.elapsed().as_micros()
    );
    Ok(template)
}

/// 基于上下文渲染已编译的模板
pub fn render(template: &Template, context: &Context) -> Result<String, RenderError> {
    let start = Instant::now();
    let result = render_tree(template, context);
    let elapsed_us = start.elapsed().as_micros();
    let output_len = result.as_ref().ok().map(String::len);
    let err = result.as_ref().err().map(|e| e.to_string());
    debug!(
        "render: elapsed_us={}, output_len={:?}, error={:?}",
        elapsed_us, output_len, err
    );
    result
}

/// 渲染模板（编译结果按名称缓存），参数可以是任意可序列化的结构体或映射
pub fn render_template<T: serde::Serialize + ?Sized>(
    template_name: &str,
    template_content: &str,
    param: &T,
) -> Result<String, Error> {
    // 获取编译结果（缓存）
    let template = cache::get_template(template_name, template_content)?;

    // 序列化参数为上下文
    let context = Context::from_serialize(param)?;

    Ok(render(&template, &context)?)
}

/// 卸载模板缓存
pub fn remove_template(template_name: &str) {
    cache::TEMPLATE_CACHE.remove(template_name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;
    use serde::Serialize;

    #[derive(Serialize)]
    struct User {
        name: String,
        age: u8,
    }

    #[test]
    fn test_render_simple() {
        let tpl = "Hello {{ name }}, you are {{ age }}.";
        let user = User {
            name: "test".to_string(),
            age: 18,
        };

        let out = render_template("engine_test_simple", tpl, &user).unwrap();
        assert_eq!(out, "Hello test, you are 18.");
    }

    #[derive(Serialize)]
    struct IfArgs {
        active: bool,
        age: i32,
        name: Option<String>,
    }

    #[test]
    fn test_if_tag() {
        let tpl = "user{% if active %} active{% endif %}{% if age >= 18 %} adult{% endif %}{% if name != null %} {{ name }}{% endif %}";

        let args = IfArgs {
            active: true,
            age: 20,
            name: Some("tom".to_string()),
        };
        let out = render_template("engine_test_if", tpl, &args).unwrap();
        assert_eq!(out, "user active adult tom");

        let args = IfArgs {
            active: false,
            age: 10,
            name: None,
        };
        let out = render_template("engine_test_if", tpl, &args).unwrap();
        assert_eq!(out, "user");
    }

    #[derive(Serialize)]
    struct NestedUser {
        name: String,
        roles: Vec<Role>,
    }

    #[derive(Serialize)]
    struct Role {
        id: i32,
        name: String,
    }

    #[test]
    fn test_nested_loop() {
        let tpl = "{% for r in roles %}({{ name }}, {{ r.id }}:{{ r.name }}){% endfor %}";

        let user = NestedUser {
            name: "alice".to_string(),
            roles: vec![
                Role {
                    id: 1,
                    name: "admin".to_string(),
                },
                Role {
                    id: 2,
                    name: "editor".to_string(),
                },
            ],
        };

        let out = render_template("engine_test_nested", tpl, &user).unwrap();
        assert_eq!(out, "(alice, 1:admin)(alice, 2:editor)");
    }

    #[test]
    fn test_compile_error_surfaces() {
        match render_template("engine_test_error", "{% for x in xs %}", &()) {
            Err(Error::Compile(CompileError::Unclosed { .. })) => {}
            other => panic!("Expected unclosed block error, got {:?}", other),
        }
    }

    #[test]
    fn test_remove_template() {
        render_template("engine_test_remove", "x", &()).unwrap();
        assert!(cache::TEMPLATE_CACHE.contains_key("engine_test_remove"));
        remove_template("engine_test_remove");
        assert!(!cache::TEMPLATE_CACHE.contains_key("engine_test_remove"));
    }
}
