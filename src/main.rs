use anyhow::Context as _;
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};
use utpl::{Context, Value, compile_template, render};

/// 渲染模板文件，变量通过 name=value 传入
#[derive(Parser, Debug)]
#[command(name = "utpl", version, about, long_about = None)]
struct Cli {
    /// Template file to render.
    template: PathBuf,

    /// Context variables, e.g. `title=Home` or `items=[a, b]`.
    #[arg(value_name = "NAME=VALUE", value_parser = parse_var)]
    vars: Vec<(String, Value)>,

    /// Log at debug level unless RUST_LOG is set.
    #[arg(long, short, default_value_t = false)]
    verbose: bool,
}

/// 解析命令行中的值：true/false/null、整数、浮点数、[a,b,c] 列表，其余按字符串处理
fn parse_value(raw: &str) -> Value {
    let raw = raw.trim();
    if let Some(inner) = raw.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        if inner.trim().is_empty() {
            return Value::List(vec![]);
        }
        return Value::List(inner.split(',').map(parse_value).collect());
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        _ => {
            if let Ok(n) = raw.parse::<i64>() {
                Value::Int(n)
            } else if let Some(n) = parse_float(raw) {
                Value::Float(n)
            } else {
                Value::Str(raw.to_string())
            }
        }
    }
}

// "inf"、"NaN" 这类写法按字符串处理
fn parse_float(raw: &str) -> Option<f64> {
    if !raw.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<f64>().ok()
}

fn parse_var(arg: &str) -> Result<(String, Value), String> {
    let (name, raw) = arg
        .split_once('=')
        .ok_or_else(|| format!("invalid variable `{}`, expected NAME=VALUE", arg))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing variable name in `{}`", arg));
    }
    Ok((name.to_string(), parse_value(raw)))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let path = cli.template.display().to_string();
    let context: Context = cli.vars.into_iter().collect();
    debug!("cli: template={}, vars={}", path, context.len());

    let source = fs::read_to_string(&cli.template).with_context(|| format!("读取模板文件失败: {}", path))?;
    let template = compile_template(&source).with_context(|| format!("编译模板失败: {}", path))?;
    let output = render(&template, &context).with_context(|| format!("渲染模板失败: {}", path))?;
    print!("{}", output);
    Ok(())
}
