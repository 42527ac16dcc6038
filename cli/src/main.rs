use clap::Parser;
use girzig_core::config;
use girzig_core::config::Config;
use girzig_core::ir::Repository;
use std::path::PathBuf;

/// Generates Zig bindings from an API description.
#[derive(Parser, Debug)]
#[command(name = "girzig", version)]
struct Args {
    /// JSON description dumped by the introspection loader.
    description: PathBuf,

    #[arg(short, long, default_value = "output")]
    /// Directory receiving one subdirectory per target.
    output: PathBuf,

    #[arg(short, long, default_value = config::FILENAME)]
    /// Configuration file, ignored if missing.
    config: PathBuf,

    #[arg(long)]
    /// Emit deprecated entities and members.
    include_deprecated: bool,

    #[arg(long)]
    /// Lower-case constant names.
    lowercase_constants: bool,

    #[arg(short, long = "namespace")]
    /// Only generate these namespaces.
    namespaces: Vec<String>,
}

impl Args {
    fn config(&self) -> Result<Config, girzig_core::Error> {
        let mut config = Config::read(&self.config)?;
        if self.include_deprecated {
            config.include_deprecated = true;
        }
        if self.lowercase_constants {
            config.uppercase_constants = false;
        }
        if !self.namespaces.is_empty() {
            config.namespaces = self.namespaces.clone();
        }
        Ok(config)
    }
}

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    let config = args.config()?;
    let repository = Repository::load(&args.description).await?;

    log::info!(
        "Generating bindings for {} namespaces into `{}`",
        repository.namespaces.len(),
        args.output.display()
    );
    let diagnostics = girzig_core::bindgen(&repository, &config, &args.output).await?;
    if !diagnostics.is_empty() {
        log::warn!(
            "{} constructs were replaced by `core.Unsupported`",
            diagnostics.len()
        );
    }
    Ok(())
}
