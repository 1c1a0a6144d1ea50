#[derive(clap::Args, Debug)]
pub struct SetupArgs {
    /// Unique ID of your STA virtual server, found in the console or User Portal URL.
    tenant_reference_id: String,

    /// FQDN of your STA cloud zone, e.g. idp.us.safenetid.com for US hosted tenants.
    #[arg(long, default_value = "idp.eu.safenetid.com")]
    cloud_idp: String,

    /// Name of the AWS application in the STA console.
    #[arg(short, long, default_value = "AWS")]
    app_name: String,

    /// AWS region for STS calls and the saved profile.
    #[arg(short, long, default_value = "us-east-2")]
    region: String,

    /// AWS CLI output format saved in the profile.
    #[arg(short, long, default_value = "json")]
    output: String,

    /// Configuration file to write instead of $XDG_CONFIG_HOME/stacreds/config.json
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Proceed and override even if the configuration file already exists.
    #[arg(short = 'y', long, default_value_t = false)]
    overwrite: bool,
}

#[tokio::main]
pub async fn run(args: &SetupArgs) -> Result<(), anyhow::Error> {
    let path = match args.config.as_ref() {
        Some(p) => p.clone(),
        None => crate::config::config_path()?,
    };
    if !args.overwrite && tokio::fs::try_exists(&path).await? {
        anyhow::bail!(
            "Configuration already exists at {}, confirm overwrite using --overwrite (-y)",
            path.display()
        );
    }

    let config = build_config(args, path);
    config.validate()?;
    config.entry_url()?;
    config.save_to_file().await?;

    tracing::info!(path = %config.config_path.display(), "Saved configuration");
    Ok(())
}

fn build_config(args: &SetupArgs, path: std::path::PathBuf) -> crate::config::Config {
    let mut config = crate::config::Config::new(args.tenant_reference_id.clone());
    config.config_path = path;
    config.cloud_idp = args.cloud_idp.clone();
    config.aws_app_name = args.app_name.clone();
    config.region = args.region.clone();
    config.output = args.output.clone();
    config
}
