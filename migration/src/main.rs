use sea_orm_migration::prelude::*;
use std::env;

#[tokio::main]
async fn main() {
    if env::var("DATABASE_URL").is_err() {
        let db_path = if env::current_dir().unwrap().ends_with("migration") {
            "../data/gateway.db"
        } else {
            "data/gateway.db"
        };
        unsafe {
            env::set_var("DATABASE_URL", format!("sqlite://{}", db_path));
        }
    }
    cli::run_cli(migration::Migrator).await;
}
