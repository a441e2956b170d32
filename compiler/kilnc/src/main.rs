//! kiln compiler driver CLI.

use std::path::Path;

use kiln_options::OptionScope;
use kilnc::commands::{
    convert_file, describe_container, describe_kernels, describe_options, parse_version_flag,
    read_container,
};

fn main() {
    kilnc::init_tracing();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let command = &args[1];

    match command.as_str() {
        "options" => {
            let mut scope = OptionScope::Build;
            let mut text: Option<&str> = None;
            for arg in args.iter().skip(2) {
                match arg.as_str() {
                    "--link" => scope = OptionScope::Link,
                    "--compile" => scope = OptionScope::Compile,
                    _ if text.is_none() => text = Some(arg.as_str()),
                    _ => {
                        eprintln!("error: unexpected argument '{arg}'");
                        std::process::exit(1);
                    }
                }
            }
            let Some(text) = text else {
                eprintln!("Usage: kilnc options [--link | --compile] \"<options>\"");
                std::process::exit(1);
            };
            match describe_options(text, scope) {
                Ok(out) => print!("{out}"),
                Err(e) => {
                    eprintln!("error: {e}");
                    std::process::exit(1);
                }
            }
        }
        "inspect" => {
            if args.len() < 3 {
                eprintln!("Usage: kilnc inspect <file>");
                std::process::exit(1);
            }
            let bif = load_or_exit(&args[2]);
            print!("{}", describe_container(&bif));
        }
        "kernels" => {
            if args.len() < 3 {
                eprintln!("Usage: kilnc kernels <file>");
                std::process::exit(1);
            }
            let bif = load_or_exit(&args[2]);
            match describe_kernels(&bif) {
                Ok(out) => print!("{out}"),
                Err(e) => {
                    eprintln!("error: {e}");
                    std::process::exit(1);
                }
            }
        }
        "convert" => {
            let mut paths = Vec::new();
            let mut to = None;
            for arg in args.iter().skip(2) {
                if arg.starts_with("--to=") {
                    let Some(version) = parse_version_flag(arg) else {
                        eprintln!("error: unknown version in '{arg}'");
                        eprintln!("Valid versions: 2.0, 2.1, 3.0, 3.1");
                        std::process::exit(1);
                    };
                    to = Some(version);
                } else {
                    paths.push(arg.as_str());
                }
            }
            let (Some(to), [input, output]) = (to, paths.as_slice()) else {
                eprintln!("Usage: kilnc convert <in> <out> --to=<version>");
                std::process::exit(1);
            };
            match convert_file(Path::new(input), Path::new(output), to) {
                Ok(report) => {
                    for section in &report.dropped_sections {
                        eprintln!("warning: dropped section {section}");
                    }
                    for symbol in &report.dropped_symbols {
                        eprintln!("warning: dropped symbol {symbol}");
                    }
                }
                Err(e) => {
                    eprintln!("error: {e}");
                    std::process::exit(1);
                }
            }
        }
        "help" | "--help" | "-h" => {
            print_usage();
        }
        "version" | "--version" | "-v" => {
            println!("kilnc {}", env!("CARGO_PKG_VERSION"));
        }
        _ => {
            eprintln!("Unknown command: {command}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}

fn load_or_exit(path: &str) -> kiln_bif::Bif {
    match read_container(Path::new(path)) {
        Ok(bif) => bif,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!("kiln compiler driver");
    println!();
    println!("Usage: kilnc <command> [options]");
    println!();
    println!("Commands:");
    println!("  options [--link] \"<string>\"       Parse an option string and show the result");
    println!("                                    (--compile checks it as a compile string)");
    println!("  inspect <file>                    Show a binary's header, sections and symbols");
    println!("  kernels <file>                    List kernel signatures in a binary");
    println!("  convert <in> <out> --to=<ver>     Convert a binary to another format version");
    println!("  help                              Show this help message");
    println!("  version                           Show version information");
    println!();
    println!("Set RUST_LOG (e.g. RUST_LOG=kiln_bif=debug) for trace output.");
}
