#![allow(non_snake_case)]
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use CalcBlocks::Utils::config_parser::CalcSettings;
use CalcBlocks::Utils::logger::init_logger;
use CalcBlocks::calc::converter::python_to_latex;
use clap::Parser;
use log::info;

/// CalcBlocks: convert calculation code to a LaTeX aligned block
#[derive(Parser, Debug)]
#[clap(version)]
struct Cli {
    /// Settings document (render/logging sections).
    #[clap(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Also print the final variable values as a table (to stderr).
    #[clap(long)]
    table: bool,
    /// Code to convert; read from stdin when absent.
    code: Option<String>,
}

fn main() -> ExitCode {
    let args: Cli = Cli::parse();

    let settings = match &args.config {
        Some(path) => match CalcSettings::from_file(path) {
            Ok(settings) => settings,
            Err(err) => {
                eprintln!("{}: {}", path.display(), err);
                return ExitCode::from(2);
            }
        },
        None => CalcSettings::default(),
    };
    init_logger(settings.loglevel, settings.logfile.as_deref());

    let code = match args.code {
        Some(code) => code,
        None => {
            let mut code = String::new();
            if let Err(err) = io::stdin().read_to_string(&mut code) {
                eprintln!("cannot read stdin: {}", err);
                return ExitCode::from(2);
            }
            code
        }
    };

    match python_to_latex(&code, &settings.render) {
        Ok(conversion) => {
            println!("{}", conversion.latex);
            if args.table {
                eprintln!("{}", conversion.bindings_table());
            }
            info!("done");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("parse error: {}", err);
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_arguments() {
        let cli = Cli::try_parse_from(["CalcBlocks", "--config", "calc.cfg", "--table", "x = 1"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("calc.cfg")));
        assert!(cli.table);
        assert_eq!(cli.code.as_deref(), Some("x = 1"));

        let cli = Cli::try_parse_from(["CalcBlocks"]).unwrap();
        assert!(cli.config.is_none() && !cli.table && cli.code.is_none());

        assert!(Cli::try_parse_from(["CalcBlocks", "--config"]).is_err());
        assert!(Cli::try_parse_from(["CalcBlocks", "a = 1", "b = 2"]).is_err());
        assert!(Cli::try_parse_from(["CalcBlocks", "--verbose"]).is_err());
    }
}
