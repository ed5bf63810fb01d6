use std::path::PathBuf;

use clap::Parser;

use crate::build::Builder;
use crate::config::SiteConfig;

#[derive(Parser)]
pub struct BuildArgs {
    /// The path to the configuration file
    #[arg(short, long, default_value = "quire.yaml")]
    pub config_file: Option<PathBuf>,

    /// Abort on the first resource that fails instead of reporting at the end
    #[arg(short, long, default_value = "false")]
    pub strict: bool,
}

pub fn run(args: &BuildArgs) -> Result<(), anyhow::Error> {
    // Determine the config file path
    let config_path = args
        .config_file
        .clone()
        .unwrap_or_else(|| "quire.yaml".into());
    let config_path = if config_path.is_relative() {
        std::env::current_dir()?.join(&config_path)
    } else {
        config_path
    };

    let mut config = SiteConfig::load_from_arg(Some(config_path.as_path()))?;
    if args.strict {
        config.strict = true;
    }

    // Relative source/output paths resolve against the config file's directory
    let base_path = config_path
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let builder = Builder::new(config, base_path);
    let result = builder.build()?;

    println!("Built site to {}", result.output_dir.display());
    if result.report.has_failures() {
        for failure in &result.report.failures {
            eprintln!(
                "  failed ({}): {}: {}",
                failure.stage,
                failure.path.display(),
                failure.message
            );
        }
        return Err(anyhow::anyhow!(
            "{} resource(s) failed to build",
            result.report.failures.len()
        ));
    }

    Ok(())
}
