mod cli;
mod console;
mod infra;
mod respondent;
mod routes;
mod server;

use hillia::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
