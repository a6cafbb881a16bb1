//! Reckon CLI - formula evaluation tool

use anyhow::{bail, Context, Result};
use clap::Parser;
use reckon::prelude::*;
use std::io::{self, BufRead, Write};

#[derive(Parser)]
#[command(name = "reckon")]
#[command(author, version, about = "Evaluate formula expressions")]
struct Cli {
    /// Expression to evaluate (default: one expression per line from stdin)
    expression: Option<String>,

    /// Bind a variable, e.g. `--var price=9.99`. Values are read as
    /// expressions; anything that does not evaluate is bound as text.
    #[arg(short = 'v', long = "var", value_name = "NAME=VALUE")]
    vars: Vec<String>,

    /// Maximum number of rewrite steps per evaluation
    #[arg(long)]
    max_steps: Option<usize>,

    /// Print the token stream instead of evaluating
    #[arg(short, long)]
    tokens: bool,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let mut calc = Calculator::new();
    if let Some(max_steps) = cli.max_steps {
        calc = calc.with_max_steps(max_steps);
    }
    for var in &cli.vars {
        let (name, value) = parse_binding(&calc, var)?;
        calc.store(&name, value);
    }

    match &cli.expression {
        Some(expression) => run(&calc, expression, cli.tokens),
        None => {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = line.context("Failed to read from stdin")?;
                if line.trim().is_empty() {
                    continue;
                }
                // keep going after a bad line
                if let Err(err) = run(&calc, &line, cli.tokens) {
                    eprintln!("error: {err:#}");
                }
            }
            Ok(())
        }
    }
}

fn run(calc: &Calculator, expression: &str, tokens: bool) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if tokens {
        let tokens = calc
            .tokenize(expression)
            .with_context(|| format!("Failed to tokenize '{expression}'"))?;
        for token in tokens {
            writeln!(stdout, "{:?}\t{}", token.category(), token)
                .context("Failed to write to stdout")?;
        }
        return Ok(());
    }

    let value = calc
        .evaluate(expression)
        .with_context(|| format!("Failed to evaluate '{expression}'"))?;
    writeln!(stdout, "{value}").context("Failed to write to stdout")?;
    Ok(())
}

/// Split `name=value` and evaluate the value
fn parse_binding(calc: &Calculator, binding: &str) -> Result<(String, Value)> {
    let Some((name, raw)) = binding.split_once('=') else {
        bail!("Invalid binding '{binding}': expected NAME=VALUE");
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("Invalid binding '{binding}': empty name");
    }

    let value = match calc.evaluate(raw) {
        Ok(value) => value,
        Err(err) => {
            log::debug!("binding {name} as text: {err}");
            Value::from(raw.trim())
        }
    };
    Ok((name.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_binding() {
        let calc = Calculator::new();
        let (name, value) = parse_binding(&calc, "price=9.5").unwrap();
        assert_eq!(name, "price");
        assert_eq!(value.to_string(), "9.5");

        let (_, value) = parse_binding(&calc, "flag=true").unwrap();
        assert_eq!(value, Value::from(true));

        let (_, value) = parse_binding(&calc, "name=bob").unwrap();
        assert_eq!(value, Value::from("bob"));

        assert!(parse_binding(&calc, "novalue").is_err());
        assert!(parse_binding(&calc, "=1").is_err());
    }

    #[test]
    fn test_cli_parses_repeated_vars() {
        let cli = Cli::parse_from(["reckon", "a + b", "--var", "a=1", "-v", "b=2", "--tokens"]);
        assert_eq!(cli.expression.as_deref(), Some("a + b"));
        assert_eq!(cli.vars, ["a=1", "b=2"]);
        assert!(cli.tokens);
        assert!(!cli.verbose);
    }
}
