use crate::respondent::{
    run_catalog, run_contact, run_questionnaire, CatalogArgs, ClientArgs, ContactArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use hillia::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "hillia",
    about = "Run the Hillia reading room or walk through the community questionnaire",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Answer the questionnaire in the terminal, resuming saved progress
    Questionnaire(ClientArgs),
    /// Send a standalone request for a conversation
    Contact(ContactArgs),
    /// Print the questionnaire outline
    Catalog(CatalogArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Questionnaire(args) => run_questionnaire(args).await,
        Command::Contact(args) => run_contact(args).await,
        Command::Catalog(args) => run_catalog(args),
    }
}
