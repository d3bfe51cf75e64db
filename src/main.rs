//! Imager CLI - Chat-driven Image Processing
//!
//! Runs command text against local files or URLs the same way the chat
//! integration would.

use imager::adapter::{CommandRequest, Imager, Reply};
use imager::config::ImagerConfig;
use imager::core::types::ImageSource;
use std::io::Write;
use std::path::{Path, PathBuf};

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("imager");

    let (config_path, rest) = match split_config_flag(&args[1.min(args.len())..]) {
        Ok(split) => split,
        Err(message) => {
            eprintln!("Error: {}", message);
            std::process::exit(2);
        }
    };

    let config = match load_config(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    init_logging(&config.log_level);

    if rest.is_empty() {
        print_usage(program);
        return;
    }

    let imager = Imager::new(config);

    let code = match rest[0].as_str() {
        "list" => list_operations(&imager),
        "info" => match rest.get(1) {
            Some(name) => operation_info(&imager, name),
            None => {
                eprintln!("Error: Please specify an operation name");
                2
            }
        },
        "parse" => match rest.get(1) {
            Some(text) => parse_command(&imager, text),
            None => {
                eprintln!("Error: Please specify command text");
                2
            }
        },
        "run" => {
            if rest.len() < 3 {
                eprintln!("Error: Please specify command text and at least one input");
                eprintln!("Usage: {} run \"<text>\" <input>... [--out-dir <dir>]", program);
                2
            } else {
                run_command(&imager, &rest[1], &rest[2..])
            }
        }
        "help" | "--help" | "-h" => {
            print_usage(program);
            0
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage(program);
            2
        }
    };

    std::process::exit(code);
}

fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

fn load_config(path: Option<&str>) -> Result<ImagerConfig, imager::core::error::ConfigError> {
    match path {
        Some(path) => {
            let mut config = ImagerConfig::load(path)?;
            if let Ok(level) = std::env::var(imager::config::LOG_ENV) {
                config.log_level = level;
            }
            Ok(config)
        }
        None => ImagerConfig::from_env_or_default(),
    }
}

/// Pull `--config <file>` out of the argument list.
fn split_config_flag(args: &[String]) -> Result<(Option<String>, Vec<String>), String> {
    let mut config = None;
    let mut rest = Vec::with_capacity(args.len());
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        if arg == "--config" {
            let path = iter.next().ok_or("--config needs a file path")?;
            config = Some(path.clone());
        } else {
            rest.push(arg.clone());
        }
    }

    Ok((config, rest))
}

fn print_usage(program: &str) {
    println!("Imager v{}", imager::VERSION);
    println!();
    println!("Usage: {} [--config <file>] <command> [options]", program);
    println!();
    println!("Commands:");
    println!("  list                      List all operations");
    println!("  info <operation>          Show arguments of an operation");
    println!("  parse \"<text>\"            Show how command text is understood (JSON)");
    println!("  run \"<text>\" <input>...   Run command text against images");
    println!("  help                      Show this help message");
    println!();
    println!("Run options:");
    println!("  --out-dir <dir>   Where results are written (default: current directory)");
    println!();
    println!("Inputs may be file paths, http(s) URLs or data: URLs.");
}

fn list_operations(imager: &Imager) -> i32 {
    let registry = imager.parser().registry();
    println!("Available operations ({} total):", registry.len());
    println!();

    for (category, operations) in registry.grouped_by_category() {
        println!("  {}", category.display_name());
        for metadata in operations {
            println!("      • {} - {}", metadata.usage(), metadata.description);
        }
        println!();
    }
    0
}

fn operation_info(imager: &Imager, name: &str) -> i32 {
    let Some(metadata) = imager.parser().registry().get_metadata(name) else {
        eprintln!("Operation not found: {}", name);
        eprintln!("Use 'list' to see available operations.");
        return 1;
    };

    println!("Operation: {}", metadata.name);
    if !metadata.aliases.is_empty() {
        println!("Aliases: {}", metadata.aliases.join(", "));
    }
    println!("Category: {}", metadata.category.display_name());
    println!("Usage: {}", metadata.usage());
    println!();
    println!("Description:");
    println!("  {}", metadata.description);

    if !metadata.arguments.is_empty() {
        println!();
        println!("Arguments:");
        for arg in &metadata.arguments {
            let optional = if arg.optional { " (optional)" } else { "" };
            println!("  • {} [{}]{}", arg.name, arg.kind, optional);
            if !arg.description.is_empty() {
                println!("    {}", arg.description);
            }
        }
    }
    0
}

fn parse_command(imager: &Imager, text: &str) -> i32 {
    let parsed = imager.parser().parse(text);
    match serde_json::to_string_pretty(&parsed) {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn run_command(imager: &Imager, text: &str, args: &[String]) -> i32 {
    use rayon::prelude::*;

    let mut out_dir = PathBuf::from(".");
    let mut inputs = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--out-dir" {
            match iter.next() {
                Some(dir) => out_dir = PathBuf::from(dir),
                None => {
                    eprintln!("Error: --out-dir needs a directory");
                    return 2;
                }
            }
        } else {
            inputs.push(arg.as_str());
        }
    }

    if let Err(e) = std::fs::create_dir_all(&out_dir) {
        eprintln!("Error: cannot create {}: {}", out_dir.display(), e);
        return 1;
    }

    let failures: usize = inputs
        .par_iter()
        .map(|input| {
            let request = CommandRequest {
                text: text.to_string(),
                attachment: ImageSource::from_reference(input),
                filename: file_name_of(input),
            };
            let reply = imager.handle(&request);
            report(input, &reply, &out_dir)
        })
        .filter(|ok| !ok)
        .count();

    if failures > 0 {
        1
    } else {
        0
    }
}

/// Print one reply and save its image; returns whether the run succeeded.
fn report(input: &str, reply: &Reply, out_dir: &Path) -> bool {
    match reply {
        Reply::Image {
            data,
            filename,
            caption,
            ..
        } => {
            let path = out_dir.join(filename);
            match std::fs::write(&path, data) {
                Ok(()) => {
                    println!("{} -> {}", caption, path.display());
                    true
                }
                Err(e) => {
                    eprintln!("{}: cannot write {}: {}", input, path.display(), e);
                    false
                }
            }
        }
        Reply::NoCommands { message } => {
            eprintln!("{}: {}", input, message);
            false
        }
        Reply::Failure { messages } => {
            for message in messages {
                eprintln!("{}: {}", input, message);
            }
            false
        }
    }
}

fn file_name_of(input: &str) -> String {
    if input.starts_with("data:") {
        return "image".to_string();
    }
    let trimmed = input.split(['?', '#']).next().unwrap_or(input);
    trimmed
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("image")
        .to_string()
}
