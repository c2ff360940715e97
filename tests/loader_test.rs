use std::collections::BTreeMap;
use std::path::Path;
use utpl::{Context, Error, LoaderOptions, TemplateSet, Value, template_assets};

fn link(href: &str, text: &str) -> Value {
    let mut map = BTreeMap::new();
    map.insert("href".to_string(), Value::from(href));
    map.insert("text".to_string(), Value::from(text));
    Value::Map(map)
}

fn user(name: &str, admin: bool) -> Value {
    let mut map = BTreeMap::new();
    map.insert("name".to_string(), Value::from(name));
    map.insert("admin".to_string(), Value::Bool(admin));
    Value::Map(map)
}

fn check_loaded(set: &TemplateSet) {
    assert_eq!(
        set.names(),
        vec!["mail/welcome", "page", "site.nav", "site.title"]
    );

    let ctx = Context::new()
        .with("title", "Home")
        .with("items", vec!["a", "b"]);
    assert_eq!(
        set.render("page", &ctx).unwrap(),
        "<h1>Home</h1>\n<ul><li>a</li><li>b</li></ul>\n"
    );

    let ctx = Context::new().with("user", user("ann", true));
    assert_eq!(
        set.render("mail/welcome", &ctx).unwrap(),
        "Welcome, ann! (admin)"
    );

    let ctx = Context::new().with("links", Value::List(vec![link("/", "home")]));
    assert_eq!(
        set.render("site.nav", &ctx).unwrap(),
        "<nav><a href=\"/\">home</a></nav>"
    );
}

#[test]
fn test_load_from_path() {
    let set = TemplateSet::new();
    let loaded = set
        .load_from_path(Path::new("tests/resources/templates"))
        .expect("Failed to load templates");
    assert_eq!(loaded, 4);
    check_loaded(&set);
}

#[test]
fn test_with_options() {
    let options = LoaderOptions::new().assets_path("tests/resources/templates");
    let set = TemplateSet::with_options(&options).unwrap();
    check_loaded(&set);

    // 重复加载同一目录会因模板名冲突而失败
    assert!(matches!(
        set.load_from_path(Path::new("tests/resources/templates")),
        Err(Error::Load(_))
    ));
}

#[test]
fn test_keep_extension() {
    let options = LoaderOptions::new()
        .strip_extension(false)
        .assets_path("tests/resources/templates");
    let set = TemplateSet::with_options(&options).unwrap();
    assert!(set.get("page.tpl").is_some());
    assert!(set.get("page").is_none());
}

#[test]
fn test_macro_assets() {
    let assets = template_assets!("tests/resources/templates/**/*.tpl");
    assert_eq!(assets.len(), 2);
    assert_eq!(assets[0].0, "mail/welcome.tpl");
    assert_eq!(assets[1].0, "page.tpl");
    assert!(assets[1].1.contains("{% for p in items %}"));

    let options = LoaderOptions::new().assets(assets);
    let set = TemplateSet::with_options(&options).unwrap();
    assert_eq!(set.names(), vec!["mail/welcome", "page"]);
}

#[test]
fn test_missing_directory_loads_nothing() {
    let set = TemplateSet::new();
    assert_eq!(
        set.load_from_path(Path::new("tests/resources/does-not-exist"))
            .unwrap(),
        0
    );
    assert!(set.is_empty());
}
