use anyhow::Result;
use clap::Args;
use omcs_api::config::config_path;
use omcs_api::Config;

#[derive(Args, Debug)]
#[command(about = "Show the effective configuration")]
pub struct ConfigArgs {
    /// Print the config file location instead
    #[arg(long)]
    pub path: bool,
}

pub fn execute(args: ConfigArgs) -> Result<()> {
    if args.path {
        println!("{}", config_path()?.display());
        return Ok(());
    }

    let config = Config::load()?;
    print!("{}", toml::to_string_pretty(&config.redacted())?);
    Ok(())
}
