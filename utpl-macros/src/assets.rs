use glob::glob;
use proc_macro::TokenStream;
use quote::quote;
use std::env;
use std::path::{Path, PathBuf};
use syn::{LitStr, parse_macro_input};

/// 模式中第一个含通配符的路径段之前的部分
fn pattern_base(pattern: &str) -> PathBuf {
    Path::new(pattern)
        .components()
        .take_while(|c| {
            let s = c.as_os_str().to_string_lossy();
            !s.contains(['*', '?', '[', '{'])
        })
        .collect()
}

pub fn template_assets_impl(input: TokenStream) -> TokenStream {
    // 1. 解析输入的字符串字面量（glob 模式）
    let pattern = parse_macro_input!(input as LitStr);
    let pattern_str = pattern.value();

    // 2. 获取 Cargo 项目的根目录
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => dir,
        Err(_) => {
            return syn::Error::new(pattern.span(), "编译环境异常：未设置 CARGO_MANIFEST_DIR 环境变量")
                .to_compile_error()
                .into();
        }
    };
    let root = PathBuf::from(manifest_dir);

    // 3. 构建完整的 glob 模式路径
    let full_pattern = root.join(&pattern_str);
    let full_pattern_str = full_pattern.to_string_lossy();
    let base = root.join(pattern_base(&pattern_str));

    // 4. 查找匹配的文件，排序以保证展开结果稳定
    let mut files: Vec<PathBuf> = match glob(&full_pattern_str) {
        Ok(paths) => paths
            .filter_map(|entry| entry.ok())
            .filter(|path| path.is_file())
            .collect(),
        Err(e) => {
            return syn::Error::new(pattern.span(), format!("无效的 glob 模式: {}", e))
                .to_compile_error()
                .into();
        }
    };
    files.sort();

    // 5. 生成 (相对路径, include_str!(绝对路径)) 元组
    let assets: Vec<_> = files
        .iter()
        .map(|path| {
            let absolute = path.to_string_lossy().to_string();
            let relative = path
                .strip_prefix(&base)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");
            quote! {
                (#relative, include_str!(#absolute))
            }
        })
        .collect();

    let output = quote! {
        {
            let assets: ::std::vec::Vec<(&'static str, &'static str)> = ::std::vec![
                #(#assets),*
            ];
            assets
        }
    };

    output.into()
}
