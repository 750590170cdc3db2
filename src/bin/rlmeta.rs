//! Command-line front end
//!
//! Thin wrapper over the library: compile grammar files to Rust matcher
//! source, emit the support prelude, and run the embedded example
//! checks. Unrecoverable compilation failures print their diagnostic and
//! terminate the process; only this layer decides to exit.

use clap::{Parser, Subcommand};
use rlmeta::{bootstrap, compile_chain, CompileError, Language, RuleTable, Value, SUPPORT};
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "rlmeta", about = "Self-hosting PEG matcher toolkit", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a grammar file to Rust matcher source on stdout
    Compile {
        /// Grammar file path, or "-" for stdin
        file: PathBuf,
    },
    /// Print the support prelude for generated programs
    Support,
    /// Copy a file to stdout (build-script plumbing)
    Copy {
        /// File path, or "-" for stdin
        file: PathBuf,
    },
    /// Emit a file's contents as a Rust string constant
    Embed {
        /// Constant name
        name: String,
        /// File path, or "-" for stdin
        file: PathBuf,
    },
    /// Run the embedded example checks
    Selftest,
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{}", message);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Compile { file } => {
            let source = read(&file)?;
            let code = compile(&source).map_err(|e| e.to_string())?;
            print!("{}", code);
            Ok(())
        }
        Command::Support => {
            print!("{}", SUPPORT);
            Ok(())
        }
        Command::Copy { file } => {
            print!("{}", read(&file)?);
            Ok(())
        }
        Command::Embed { name, file } => {
            println!("pub const {}: &str = {:?};", name, read(&file)?);
            Ok(())
        }
        Command::Selftest => selftest(),
    }
}

fn compile(source: &str) -> Result<String, CompileError> {
    let mut rules = RuleTable::new();
    bootstrap::register(&mut rules);
    let output = compile_chain(
        &rules,
        &["Parser.file", "CodeGenerator.astInner"],
        Value::str(source),
    )?;
    match output.as_str() {
        Some(code) => Ok(code.to_string()),
        None => Err(CompileError::BadSubject {
            expected: "generated source text",
        }),
    }
}

fn read(path: &PathBuf) -> Result<String, String> {
    if path.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| format!("ERROR: {}", e))?;
        return Ok(buffer);
    }
    std::fs::read_to_string(path).map_err(|e| format!("ERROR: {}: {}", path.display(), e))
}

fn selftest() -> Result<(), String> {
    let json = Language::json().map_err(|e| e.to_string())?;
    let text = " { \"hello\" : [1, false, true, null], \"there\": \"hello\" } ";
    let once = json
        .pretty(&json.parse(text).map_err(|e| e.to_string())?)
        .map_err(|e| e.to_string())?;
    let twice = json
        .pretty(&json.parse(&once).map_err(|e| e.to_string())?)
        .map_err(|e| e.to_string())?;
    if once != twice {
        return Err("ERROR: json pretty-print is not idempotent".to_string());
    }

    let grammar = Language::grammar();
    let pretty = grammar
        .pretty(&grammar.parse("Grammar { foo = . }").map_err(|e| e.to_string())?)
        .map_err(|e| e.to_string())?;
    if pretty != "Grammar {\n  foo =\n    | .\n}\n" {
        return Err("ERROR: grammar pretty-print drifted".to_string());
    }

    let generated = compile(rlmeta::RLMETA_GRAMMAR).map_err(|e| e.to_string())?;
    if !generated.contains("pub fn register_Parser(rules: &mut RuleTable)") {
        return Err("ERROR: self-compilation lost the Parser registration".to_string());
    }

    println!("ok");
    Ok(())
}
