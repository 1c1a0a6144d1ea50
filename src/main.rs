#[derive(clap::Parser)]
#[clap(author, version, long_about = None)]
#[clap(about = "Obtain AWS temporary credentials through SafeNet Trusted Access SAML login")]
#[clap(propagate_version = true)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Login with username and OTP, then save temporary credentials to the shared credentials file
    Login(stacreds::cmd::login::LoginArgs),
    /// Write the STA tenant configuration
    Setup(stacreds::cmd::setup::SetupArgs),
}

fn main() -> Result<std::process::ExitCode, anyhow::Error> {
    use clap::Parser;
    let cli = Cli::parse();

    enable_tracing();
    let retval = match &cli.command {
        Commands::Login(args) => stacreds::cmd::login::run(args),
        Commands::Setup(args) => stacreds::cmd::setup::run(args),
    };
    match retval {
        Ok(_) => Ok(std::process::ExitCode::SUCCESS),
        Err(e) => match e.downcast_ref::<stacreds::Error>() {
            Some(stacreds::Error::FailureButSilentlyExit) => Ok(std::process::ExitCode::FAILURE),
            _ => Err(e),
        },
    }
}

fn enable_tracing() {
    let filter = std::env::var("STACREDS_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "stacreds=info".to_owned());

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .init();
}
