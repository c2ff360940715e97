use proc_macro::TokenStream;

mod assets;

/// 在编译期嵌入匹配 glob 模式的模板文件
///
/// 模式相对于调用方 crate 的根目录（`CARGO_MANIFEST_DIR`）。展开结果为
/// `Vec<(&'static str, &'static str)>`，元素为 (相对路径, 文件内容)，
/// 其中路径相对于模式中第一个通配符之前的目录。
///
/// ```ignore
/// let set = utpl::TemplateSet::new();
/// set.load_assets(&utpl::template_assets!("templates/**/*.tpl"))?;
/// ```
#[proc_macro]
pub fn template_assets(input: TokenStream) -> TokenStream {
    assets::template_assets_impl(input)
}
