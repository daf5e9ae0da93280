//! Command-line configuration, built on `argh`'s derive: a `Config` value
//! plus a method that parses `std::env::args()` into it.

use argh::FromArgs;

use crate::messages::DebugLevel;

pub const VERSION: &str = "0.1.0";

#[derive(FromArgs)]
/// A small interactive Forth interpreter.
struct Args {
    /// diagnostic verbosity: error, warning, info, debug (default warning)
    #[argh(option, default = "String::from(\"warning\")")]
    debug_level: String,

    /// load and run a source file before dropping to the interactive prompt
    #[argh(option, short = 'f')]
    file: Option<String>,

    /// suppress the startup banner
    #[argh(switch)]
    no_banner: bool,
}

pub struct Config {
    pub debug_level: DebugLevel,
    pub loaded_file: String,
    pub no_banner: bool,
}

impl Config {
    pub fn new() -> Config {
        Config {
            debug_level: DebugLevel::Warning,
            loaded_file: String::new(),
            no_banner: false,
        }
    }

    /// Parses `std::env::args()`, overwriting fields the user actually
    /// passed. Unknown flags or `--help` print argh's usage text and exit
    /// the process, matching `argh::from_env`'s own behavior.
    pub fn process_args(&mut self) -> &Config {
        let args: Args = argh::from_env();
        self.debug_level = match args.debug_level.to_ascii_lowercase().as_str() {
            "error" => DebugLevel::Error,
            "info" => DebugLevel::Info,
            "debug" => DebugLevel::Debug,
            _ => DebugLevel::Warning,
        };
        if let Some(file) = args.file {
            self.loaded_file = file;
        }
        self.no_banner = args.no_banner;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}
