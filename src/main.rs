use clap::Parser;
use lox::ast_printer;
use lox::config;
use lox::diagnostics::Diagnostics;
use lox::interpreter::Interpreter;
use lox::parser::Parser as LoxParser;
use lox::resolver::Resolver;
use lox::scanner::Scanner;
use std::path::PathBuf;
use std::process::ExitCode;

/// A tree-walking interpreter for the Lox programming language
#[derive(Parser, Debug)]
#[command(name = "lox")]
#[command(version = config::VERSION)]
#[command(about = config::USAGE)]
struct CliArgs {
    /// Pipeline stage to run: tokenize, parse, evaluate, or run
    command: String,

    /// Source file to read
    filename: PathBuf,
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let contents = match std::fs::read_to_string(&args.filename) {
        Ok(contents) => contents,
        Err(err) => {
            eprintln!("Cannot read file {}: {}", args.filename.display(), err);
            return ExitCode::from(1);
        }
    };

    match args.command.as_str() {
        "tokenize" => tokenize(&contents),
        "parse" => parse(&contents),
        "evaluate" => evaluate(&contents),
        "run" => run(&contents),
        other => {
            eprintln!("Unknown command: {}", other);
            ExitCode::from(1)
        }
    }
}

fn tokenize(source: &str) -> ExitCode {
    let mut diagnostics = Diagnostics::new();
    let tokens = Scanner::new(source).scan_tokens(&mut diagnostics);

    for token in &tokens {
        println!("{}", token.dump());
    }

    exit_code(&diagnostics)
}

fn parse(source: &str) -> ExitCode {
    let mut diagnostics = Diagnostics::new();
    let tokens = Scanner::new(source).scan_tokens(&mut diagnostics);
    let expr = LoxParser::new(tokens, &mut diagnostics).parse_single_expression();

    if let Some(expr) = expr {
        println!("{}", ast_printer::print(&expr));
    }

    exit_code(&diagnostics)
}

fn evaluate(source: &str) -> ExitCode {
    let mut diagnostics = Diagnostics::new();
    let tokens = Scanner::new(source).scan_tokens(&mut diagnostics);
    let expr = LoxParser::new(tokens, &mut diagnostics).parse_single_expression();

    if diagnostics.had_error() {
        return exit_code(&diagnostics);
    }

    let Some(expr) = expr else {
        return exit_code(&diagnostics);
    };

    let interpreter = Interpreter::new(Default::default());
    match interpreter.evaluate_single(&expr) {
        Ok(value) => println!("{}", value),
        Err(err) => diagnostics.runtime_error(&err),
    }

    exit_code(&diagnostics)
}

fn run(source: &str) -> ExitCode {
    let mut diagnostics = Diagnostics::new();
    let tokens = Scanner::new(source).scan_tokens(&mut diagnostics);
    let statements = LoxParser::new(tokens, &mut diagnostics).parse_program();

    if diagnostics.had_error() {
        return exit_code(&diagnostics);
    }

    let locals = Resolver::new(&mut diagnostics).resolve(&statements);

    if diagnostics.had_error() {
        return exit_code(&diagnostics);
    }

    let interpreter = Interpreter::new(locals);
    interpreter.interpret(&statements, &mut diagnostics);

    exit_code(&diagnostics)
}

/// Maps the accumulated diagnostics to the CLI's exit-code contract:
/// 65 for a compile-time error, 70 for a runtime error, 0 otherwise.
fn exit_code(diagnostics: &Diagnostics) -> ExitCode {
    if diagnostics.had_error() {
        ExitCode::from(65)
    } else if diagnostics.had_runtime_error() {
        ExitCode::from(70)
    } else {
        ExitCode::from(0)
    }
}
