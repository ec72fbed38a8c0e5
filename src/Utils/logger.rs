//! terminal (and optionally file) logging for conversion runs
use log::info;
use simplelog::*;
use std::fs::File;
use std::path::Path;

/// Maps a configured level name to a filter; `off` and `none` disable logging.
/// Unknown names give `None`.
pub fn parse_level(level: &str) -> Option<LevelFilter> {
    match level.trim().to_lowercase().as_str() {
        "off" | "none" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" | "warning" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

/// Installs the global logger. Terminal output goes to stderr so it never mixes with the LaTeX
/// written to stdout. When `log_file` is given the same records are also written there.
/// Returns false when logging stays off (level `Off`, a logger already installed, or the file
/// could not be created).
pub fn init_logger(level: LevelFilter, log_file: Option<&Path>) -> bool {
    if level == LevelFilter::Off {
        return false;
    }
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];
    if let Some(path) = log_file {
        match File::create(path) {
            Ok(file) => loggers.push(WriteLogger::new(level, Config::default(), file)),
            Err(err) => eprintln!("log file {} not created: {}", path.display(), err),
        }
    }
    match CombinedLogger::init(loggers) {
        Ok(()) => {
            info!("logging started with level {}", level);
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Some(LevelFilter::Debug));
        assert_eq!(parse_level(" WARN "), Some(LevelFilter::Warn));
        assert_eq!(parse_level("warning"), Some(LevelFilter::Warn));
        assert_eq!(parse_level("none"), Some(LevelFilter::Off));
        assert_eq!(parse_level("off"), Some(LevelFilter::Off));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn test_off_level_installs_nothing() {
        assert!(!init_logger(LevelFilter::Off, None));
    }
}
