pub use sea_orm_migration::prelude::*;

mod m20250101_000001_create_groups_table;
mod m20250101_000002_create_api_keys_table;
mod m20250101_000003_create_proxy_keys_table;
mod m20250101_000004_create_proxy_key_group_allowlist_table;
mod m20250101_000005_create_key_health_table;
mod m20250101_000006_create_model_health_table;
mod m20250101_000007_create_provider_health_table;
mod m20250101_000008_create_health_check_events_table;
mod m20250101_000009_create_request_logs_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_groups_table::Migration),
            Box::new(m20250101_000002_create_api_keys_table::Migration),
            Box::new(m20250101_000003_create_proxy_keys_table::Migration),
            Box::new(m20250101_000004_create_proxy_key_group_allowlist_table::Migration),
            Box::new(m20250101_000005_create_key_health_table::Migration),
            Box::new(m20250101_000006_create_model_health_table::Migration),
            Box::new(m20250101_000007_create_provider_health_table::Migration),
            Box::new(m20250101_000008_create_health_check_events_table::Migration),
            Box::new(m20250101_000009_create_request_logs_table::Migration),
        ]
    }
}
