use clap::Parser;
use std::path::PathBuf;

use ytbrief::config::{Config, Strategy};

#[derive(Parser)]
#[command(
    name = "ytbrief",
    about = "YouTube video summaries and follow-up chat over HTTP",
    version
)]
pub struct Cli {
    /// Address to listen on (default 127.0.0.1:3000)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// How summaries and replies are generated
    #[arg(short, long, value_enum)]
    pub strategy: Option<Strategy>,

    /// LLM model for the provider strategy
    #[arg(short, long)]
    pub model: Option<String>,

    /// Config file (default ~/.config/ytbrief/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Read YouTube captions for summaries instead of the title-only placeholder
    #[arg(long)]
    pub captions: bool,

    /// Use templates when the AI provider fails
    #[arg(long)]
    pub fallback_on_error: bool,

    /// Print startup details to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Settings given on the command line, as a config layer
    pub fn overrides(&self) -> Config {
        Config {
            bind: self.bind.clone(),
            strategy: self.strategy,
            model: self.model.clone(),
            captions: self.captions.then_some(true),
            fallback_on_error: self.fallback_on_error.then_some(true),
            ..Config::default()
        }
    }
}
