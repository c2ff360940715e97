use crate::error::Error;
use crate::tpl::ast::Template;
use crate::tpl::engine::compile_template;
use dashmap::DashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock};
use tracing::debug;

#[derive(Clone)]
pub struct CachedTemplate {
    pub template: Arc<Template>,
    pub content_hash: u64,
}

/// 缓存编译后的模板
pub(crate) static TEMPLATE_CACHE: LazyLock<DashMap<String, CachedTemplate>> =
    LazyLock::new(DashMap::new);

fn content_hash(content: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}

/// 按名称获取编译结果；模板内容变化时重新编译并替换缓存
pub(crate) fn get_template(template_name: &str, template_content: &str) -> Result<Arc<Template>, Error> {
    let new_hash = content_hash(template_content);

    match TEMPLATE_CACHE.get(template_name) {
        Some(cached) if cached.content_hash == new_hash => {
            debug!("template cache hit: name={}", template_name);
            return Ok(cached.template.clone());
        }
        Some(_) => debug!("template content changed, recompiling: name={}", template_name),
        None => debug!("template cache miss: name={}", template_name),
    }

    let template = Arc::new(compile_template(template_content)?);
    TEMPLATE_CACHE.insert(
        template_name.to_string(),
        CachedTemplate {
            template: template.clone(),
            content_hash: new_hash,
        },
    );
    Ok(template)
}
