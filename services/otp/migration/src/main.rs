use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    cli::run_cli(storefront_otp_migration::Migrator).await;
}
