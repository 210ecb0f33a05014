//! `a2linfo`: dumps a chosen pipeline stage of an A2L file as JSON or a
//! plain indented tree, for inspecting how the library parsed a file without
//! writing a throwaway caller program.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use a2lparser::{config::ParserConfig, ParseOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Stage {
    /// The tokenizer's raw lexeme stream (whitespace and comments included).
    Tokens,
    /// The preprocessor's line map and IF_DATA index, without parsing the A2L body.
    Preprocess,
    /// The AML grammar compiled from the file's `A2ML` block, if any.
    Aml,
    /// The full parsed value tree (the default).
    Valuecontainer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Tree,
}

/// Inspect a single pipeline stage of an A2L file.
#[derive(Parser, Debug)]
#[command(name = "a2linfo", version, about)]
struct Args {
    /// Path to the A2L file to parse.
    path: PathBuf,

    #[arg(long, value_enum, default_value = "valuecontainer")]
    stage: Stage,

    #[arg(long, value_enum, default_value = "json")]
    format: Format,

    /// Treat IF_DATA blocks that cannot be interpreted as fatal errors.
    #[arg(long)]
    strict_if_data: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let mut config = ParserConfig::from_env();
    config.strict_if_data = args.strict_if_data;

    match run(&args, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("a2linfo: {}", message);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args, config: &ParserConfig) -> Result<(), String> {
    match args.stage {
        Stage::Tokens => {
            let bytes = std::fs::read(&args.path).map_err(|e| e.to_string())?;
            let tokens = a2lparser::tokenizer::tokenize(&bytes);
            print_value(&tokens, args.format)
        }
        Stage::Preprocess => {
            let pre = a2lparser::preprocessor::Preprocessor::new(config);
            let mut result = pre.process(&args.path).map_err(|e| e.to_string())?;
            let tokens = result.tokens.read_all().map_err(|e| e.to_string())?;
            let summary = serde_json::json!({
                "line_map": &result.line_map,
                "token_count": tokens.len(),
                "if_data_blocks": result.if_data.len(),
            });
            print_value(&summary, args.format)
        }
        Stage::Aml => {
            let pre = a2lparser::preprocessor::Preprocessor::new(config);
            let mut result = pre.process(&args.path).map_err(|e| e.to_string())?;
            let blob = result.aml_blob.read().map_err(|e| e.to_string())?;
            if blob.trim().is_empty() {
                return Err("file has no A2ML block".to_string());
            }
            let file = a2lparser::compile_aml(&blob).map_err(|e| e.to_string())?;
            print_value(&file, args.format)
        }
        Stage::Valuecontainer => {
            let outcome: ParseOutcome = a2lparser::parse_file(&args.path, config).map_err(|e| e.to_string())?;
            if !outcome.warnings.is_empty() {
                for warning in &outcome.warnings {
                    eprintln!("warning: {}", warning);
                }
            }
            print_value(&outcome.root, args.format)
        }
    }
}

fn print_value(value: &impl serde::Serialize, format: Format) -> Result<(), String> {
    match format {
        Format::Json => {
            let text = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
            println!("{}", text);
        }
        Format::Tree => {
            let json = serde_json::to_value(value).map_err(|e| e.to_string())?;
            print_tree(&json, 0);
        }
    }
    Ok(())
}

fn print_tree(value: &serde_json::Value, depth: usize) {
    let indent = "  ".repeat(depth);
    match value {
        serde_json::Value::Object(map) => {
            for (key, v) in map {
                match v {
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        println!("{}{}:", indent, key);
                        print_tree(v, depth + 1);
                    }
                    _ => println!("{}{}: {}", indent, key, v),
                }
            }
        }
        serde_json::Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                println!("{}[{}]", indent, i);
                print_tree(item, depth + 1);
            }
        }
        other => println!("{}{}", indent, other),
    }
}
