use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use cifmend::{apply_rules, fix_cif2_compliance, load_rules, validate_cif2_compliance};

fn main() {
    tracing_subscriber::fmt().with_writer(io::stderr).with_target(false).init();

    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    if let Err(err) = run(&config) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

struct CliConfig {
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    rules: Option<PathBuf>,
    fix: bool,
    check: bool,
}

fn run(config: &CliConfig) -> Result<(), String> {
    let mut content = match &config.input {
        Some(path) => fs::read_to_string(path)
            .map_err(|err| format!("failed to read {}: {err}", path.display()))?,
        None => read_stdin_input()?,
    };

    if config.check {
        let issues = validate_cif2_compliance(&content);
        for issue in &issues {
            println!("line {}: {} ({})", issue.line, issue.issue, issue.field);
        }
        if !issues.is_empty() {
            std::process::exit(1);
        }
        return Ok(());
    }

    if let Some(path) = &config.rules {
        let rules = load_rules(path).map_err(|err| err.to_string())?;
        let (rewritten, log) = apply_rules(&content, &rules);
        content = rewritten;
        for entry in &log {
            eprintln!("{entry}");
        }
    }

    if config.fix {
        let (rewritten, fixes) = fix_cif2_compliance(&content);
        content = rewritten;
        for fix in &fixes {
            eprintln!("line {}: fixed {}", fix.line, fix.field);
        }
    }

    match &config.output {
        Some(path) => fs::write(path, &content)
            .map_err(|err| format!("failed to write {}: {err}", path.display())),
        None => {
            io::stdout()
                .write_all(content.as_bytes())
                .map_err(|err| format!("failed to write stdout: {err}"))
        }
    }
}

fn parse_args() -> Result<CliConfig, String> {
    let mut config =
        CliConfig { input: None, output: None, rules: None, fix: false, check: false };
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                println!("{}", help_text());
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("cifmend {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--rules" => {
                let value = args.next().ok_or("error: --rules expects a path")?;
                config.rules = Some(PathBuf::from(value));
            }
            "--output" | "-o" => {
                let value = args.next().ok_or("error: --output expects a path")?;
                config.output = Some(PathBuf::from(value));
            }
            "--fix" => config.fix = true,
            "--check" => config.check = true,
            _ if arg.starts_with("--rules=") => {
                config.rules = Some(PathBuf::from(arg.trim_start_matches("--rules=")));
            }
            _ if arg.starts_with("--output=") => {
                config.output = Some(PathBuf::from(arg.trim_start_matches("--output=")));
            }
            _ if arg.starts_with('-') => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => {
                if config.input.is_some() {
                    return Err("error: input provided multiple times".to_string());
                }
                config.input = Some(PathBuf::from(arg));
            }
        }
    }

    if config.rules.is_none() && !config.fix && !config.check {
        return Err(format!(
            "error: nothing to do, pass --rules, --fix or --check\n\n{}",
            help_text()
        ));
    }

    Ok(config)
}

fn read_stdin_input() -> Result<String, String> {
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|err| format!("failed to read stdin: {err}"))?;
    Ok(buffer)
}

fn help_text() -> String {
    format!(
        "cifmend {}\n\
         Rule-driven normalization and CIF2 compliance fixing for CIF files.\n\n\
         USAGE:\n    cifmend [OPTIONS] [FILE]\n\n\
         Reads FILE (or stdin) and writes the rewritten document to stdout\n\
         (or --output). The operation log goes to stderr.\n\n\
         OPTIONS:\n    \
         --rules <PATH>     apply the rules file to the document\n    \
         --fix              rewrite CIF1-style bracketed values for CIF2\n    \
         --check            report CIF2 compliance issues and exit\n    \
         -o, --output <PATH>    write the result to PATH instead of stdout\n    \
         -h, --help         print this help\n    \
         -V, --version      print the version",
        env!("CARGO_PKG_VERSION")
    )
}
