use clap::Parser;

#[derive(Parser)]
#[command(author, version, about = "Hydraulic and economic river system simulator", long_about = None)]
pub struct Args {
    /// Path to the global configuration file
    config: String,

    #[arg(long, default_value_t = false, help = "Enable debug logging")]
    debug_logging: bool,

    #[arg(long, default_value_t = false, help = "Only log warnings and errors")]
    quiet: bool,
}

impl Args {
    pub fn config(&self) -> &str {
        &self.config
    }

    pub fn debug_logging(&self) -> bool {
        self.debug_logging
    }

    pub fn quiet(&self) -> bool {
        self.quiet
    }
}
