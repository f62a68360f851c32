use std::path::PathBuf;

use anyhow::Context;
use clap::Parser as _;
use lamb::{parse, Config, EvaluationContext, Output, Tokenizer};

const SAMPLE_PROGRAM: &str = r#"
print_range = lambda(a, b) if a <= b {
  print(a);
  if a + 1 <= b {
    print(", ");
    print_range(a + 1, b);
  } else println("");
};
print_range(1, 10);
"#;

/// Run a lamb program
#[derive(clap::Parser, Debug)]
#[command(version)]
struct Args {
    /// Program to run. Without it, and without --expression, a sample program runs
    file: Option<PathBuf>,

    /// Evaluate this source and print the resulting value
    #[arg(short, long, conflicts_with = "file")]
    expression: Option<String>,

    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dump the token stream before evaluating
    #[arg(long)]
    tokens: bool,

    /// Dump the parsed tree before evaluating
    #[arg(long)]
    ast: bool,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let Some(path) = path else { return Ok(Config::default()) };

    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Unable to read config file {}", path.display()))?;
    Config::from_json(&source)
        .with_context(|| format!("Unable to load config file {}", path.display()))
}

fn dump(source: &str, args: &Args) -> anyhow::Result<()> {
    if args.tokens {
        for token in Tokenizer::from_source(source) {
            let token = token?;
            println!("{}\t{}", token.pos, token.kind);
        }
    }
    if args.ast {
        println!("{:#?}", parse(source)?);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr, filtered by RUST_LOG
    use tracing_subscriber::{fmt, EnvFilter};
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = load_config(args.config.as_ref())?;
    let (name, source) = match (&args.expression, &args.file) {
        (Some(expression), _) => ("<expression>".to_owned(), expression.clone()),
        (None, Some(path)) => {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("Unable to read script file {}", path.display()))?;
            (path.display().to_string(), source)
        }
        (None, None) => ("<sample>".to_owned(), SAMPLE_PROGRAM.to_owned()),
    };

    dump(&source, &args)?;

    let mut context = EvaluationContext::with_output(Output::stdout(), config);
    tracing::info!(%name, "running");
    let value = context.evaluate_str(&source)
        .with_context(|| format!("Failed to run {}", name))?;

    // Debug quotes strings so `"1"` and `1` print differently
    if args.expression.is_some() {
        println!("{:?}", value);
    }

    Ok(())
}
