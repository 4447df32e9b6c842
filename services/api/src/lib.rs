mod cli;
mod extract;
mod infra;
mod routes;
mod server;

use credit_intake::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
