/// 模板加载配置
pub struct LoaderOptions<'a> {
    pub extension: String,        // 单个模板文件的扩展名
    pub bundle_extension: String, // 模板包（XML）文件的扩展名
    pub strip_extension: bool,    // 模板名是否去掉扩展名
    pub assets: Option<Vec<(&'a str, &'a str)>>, // 模板资源，(路径, 内容)，通常来自 template_assets!
    pub assets_path: Option<&'a str>,            // 模板目录，从文件系统中读取
}

impl Default for LoaderOptions<'_> {
    fn default() -> Self {
        LoaderOptions {
            extension: "tpl".to_string(),
            bundle_extension: "xml".to_string(),
            strip_extension: true,
            assets: None,
            assets_path: None,
        }
    }
}

impl<'a> LoaderOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim_start_matches('.').to_string();
        self
    }

    pub fn bundle_extension(mut self, extension: &str) -> Self {
        self.bundle_extension = extension.trim_start_matches('.').to_string();
        self
    }

    pub fn strip_extension(mut self, strip: bool) -> Self {
        self.strip_extension = strip;
        self
    }

    pub fn assets(mut self, assets: Vec<(&'a str, &'a str)>) -> Self {
        self.assets = Some(assets);
        self
    }

    pub fn assets_path(mut self, assets_path: &'a str) -> Self {
        self.assets_path = Some(assets_path);
        self
    }
}
