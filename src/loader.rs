use crate::error::Error;
use crate::options::LoaderOptions;
use crate::tpl::ast::Template;
use crate::tpl::engine::{compile_template, render};
use crate::tpl::render_context::Context;
use anyhow::Context as _;
use dashmap::DashMap;
use quick_xml::de;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Debug, Deserialize)]
struct Bundle {
    #[serde(rename = "@namespace")]
    namespace: String,
    #[serde(rename = "template", default)]
    templates: Vec<BundleItem>,
}

#[derive(Debug, Deserialize)]
struct BundleItem {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "$text", default)]
    content: Option<String>,
}

/// 按名称管理已编译模板的集合
///
/// 模板可以来自目录（`.tpl` 文件与 XML 模板包）、XML 字符串或编译期嵌入的资源。
/// 文件模板以相对于加载根目录的路径命名，模板包中的模板以 `namespace.id` 命名。
pub struct TemplateSet {
    templates: DashMap<String, Arc<Template>>,
    extension: String,
    bundle_extension: String,
    strip_extension: bool,
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateSet {
    pub fn new() -> Self {
        let options = LoaderOptions::default();
        Self {
            templates: DashMap::new(),
            extension: options.extension,
            bundle_extension: options.bundle_extension,
            strip_extension: options.strip_extension,
        }
    }

    /// 按配置创建并加载模板
    pub fn with_options(options: &LoaderOptions<'_>) -> Result<Self, Error> {
        let set = Self {
            templates: DashMap::new(),
            extension: options.extension.clone(),
            bundle_extension: options.bundle_extension.clone(),
            strip_extension: options.strip_extension,
        };
        if let Some(assets) = &options.assets {
            set.load_assets(assets)?;
        }
        if let Some(path) = options.assets_path {
            set.load_from_path(Path::new(path))?;
        }
        Ok(set)
    }

    /// 编译并注册模板，同名模板会被替换
    pub fn insert(&self, name: &str, source: &str) -> Result<Arc<Template>, Error> {
        let template = Arc::new(compile_template(source)?);
        self.templates.insert(name.to_string(), template.clone());
        Ok(template)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Template>> {
        self.templates.get(name).map(|v| v.value().clone())
    }

    pub fn render(&self, name: &str, context: &Context) -> Result<String, Error> {
        let template = self
            .get(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        Ok(render(&template, context)?)
    }

    /// 已注册的模板名（排序后）
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.templates.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// 递归读取指定目录及其子目录下的模板文件与模板包，返回加载的模板数量
    pub fn load_from_path(&self, dir_path: &Path) -> Result<usize, Error> {
        let mut loaded = 0;
        for entry in WalkDir::new(dir_path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let relative = path.strip_prefix(dir_path).unwrap_or(path);
            let relative = relative.to_string_lossy().replace('\\', "/");
            if has_extension(&relative, &self.extension) {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("读取模板文件失败: {}", path.display()))?;
                self.add(&self.template_name(&relative), &content, &relative)?;
                loaded += 1;
            } else if has_extension(&relative, &self.bundle_extension) {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("读取模板包失败: {}", path.display()))?;
                loaded += self.load_bundle_str(&content, &relative)?;
            }
        }
        Ok(loaded)
    }

    /// 加载 (路径, 内容) 形式的模板资源
    pub fn load_assets(&self, assets: &[(&str, &str)]) -> Result<usize, Error> {
        let mut loaded = 0;
        for (path, content) in assets {
            let path = path.replace('\\', "/");
            if has_extension(&path, &self.bundle_extension) {
                loaded += self.load_bundle_str(content, &path)?;
            } else {
                self.add(&self.template_name(&path), content, &path)?;
                loaded += 1;
            }
        }
        Ok(loaded)
    }

    /// 解析 XML 模板包，模板以 `namespace.id` 命名
    pub fn load_bundle_str(&self, xml_content: &str, source: &str) -> Result<usize, Error> {
        let bundle: Bundle =
            de::from_str(xml_content).with_context(|| format!("XML 解析失败: {}", source))?;

        let count = bundle.templates.len();
        for item in bundle.templates {
            let name = format!("{}.{}", bundle.namespace, item.id);
            self.add(&name, item.content.as_deref().unwrap_or_default(), source)?;
        }
        Ok(count)
    }

    fn add(&self, name: &str, content: &str, source: &str) -> Result<(), Error> {
        if self.templates.contains_key(name) {
            return Err(anyhow::anyhow!("'{}' 中发现重复的模板名: '{}'", source, name).into());
        }
        let template = compile_template(content).inspect_err(|e| {
            warn!("template failed to compile: name={}, source={}, error={}", name, source, e);
        })?;
        debug!(
            "template loaded: name={}, source={}, nodes={}",
            name,
            source,
            template.node_count()
        );
        self.templates.insert(name.to_string(), Arc::new(template));
        Ok(())
    }

    fn template_name(&self, relative: &str) -> String {
        if self.strip_extension {
            if let Some(stem) = relative.strip_suffix(&format!(".{}", self.extension)) {
                return stem.to_string();
            }
        }
        relative.to_string()
    }
}

fn has_extension(path: &str, extension: &str) -> bool {
    Path::new(path)
        .extension()
        .is_some_and(|ext| ext == extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_render() {
        let set = TemplateSet::new();
        set.insert("greet", "Hi {{ name }}").unwrap();
        let ctx = Context::new().with("name", "bob");
        assert_eq!(set.render("greet", &ctx).unwrap(), "Hi bob");
        assert!(matches!(set.render("missing", &ctx), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_load_bundle() {
        let xml = r#"<templates namespace="mail"><template id="welcome">Hello {{ user }}!</template><template id="list"><![CDATA[<ul>{% for i in items %}<li>{{ i }}</li>{% endfor %}</ul>]]></template></templates>"#;
        let set = TemplateSet::new();
        assert_eq!(set.load_bundle_str(xml, "memory").unwrap(), 2);
        assert_eq!(set.names(), vec!["mail.list", "mail.welcome"]);

        let ctx = Context::new().with("items", vec![1, 2]);
        assert_eq!(
            set.render("mail.list", &ctx).unwrap(),
            "<ul><li>1</li><li>2</li></ul>"
        );
    }

    #[test]
    fn test_duplicate_name() {
        let xml = r#"<templates namespace="ns"><template id="a">x</template><template id="a">y</template></templates>"#;
        let set = TemplateSet::new();
        assert!(matches!(set.load_bundle_str(xml, "dup.xml"), Err(Error::Load(_))));
    }

    #[test]
    fn test_assets_naming() {
        let set = TemplateSet::new();
        let loaded = set
            .load_assets(&[("pages/index.tpl", "index"), ("raw.txt", "raw")])
            .unwrap();
        assert_eq!(loaded, 2);
        assert_eq!(set.names(), vec!["pages/index", "raw.txt"]);
    }

    #[test]
    fn test_compile_error_propagates() {
        let set = TemplateSet::new();
        assert!(matches!(
            set.load_assets(&[("bad.tpl", "{% if x %}")]),
            Err(Error::Compile(_))
        ));
        assert!(set.is_empty());
    }
}
