//! Minimal CLI parsing: configuration path and one-shot runs.

use std::env;
use std::path::PathBuf;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CliOptions {
    pub config_path: Option<PathBuf>,
    /// Run a single pass even when a schedule is configured
    pub once: bool,
}

impl CliOptions {
    pub fn from_args() -> Self {
        Self::parse(env::args().skip(1))
    }

    /// Unknown arguments are ignored
    pub fn parse<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut options = CliOptions::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--once" => options.once = true,
                "--config" => {
                    if let Some(value) = args.next() {
                        options.config_path = Some(PathBuf::from(value));
                    }
                }
                _ if arg.starts_with("--config=") => {
                    if let Some((_, value)) = arg.split_once('=') {
                        options.config_path = Some(PathBuf::from(value));
                    }
                }
                _ => {}
            }
        }
        options
    }
}
