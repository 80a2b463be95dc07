//! Core domain logic for the house cup points store.
//! This crate is the single source of truth for running-total invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, DatabaseConfig, HouseCupConfig, LoggingConfig};
pub use db::{open_db, open_db_in_memory, ConnectionPool, DbError, PoolOptions};
pub use logging::{
    default_log_level, init_from_config, init_logging, init_stderr_logging, logging_status,
};
pub use model::award::{AwardId, AwardLedger, LedgerOverflow, NewAward, PointAward};
pub use model::house::{House, HouseId};
pub use model::student::{NewStudent, Student, StudentId};
pub use model::tournament::{Tournament, TournamentId, TournamentValidationError};
pub use model::{EntityRef, TotalDrift};
pub use repo::award_repo::HouseContribution;
pub use repo::error::{StoreError, StoreResult};
pub use service::award_service::{AwardService, StudentRemoval};
pub use service::query_service::QueryService;
pub use service::roster_service::RosterService;

/// Opens the pool described by `config`.
///
/// `:memory:` yields a single-connection private store.
pub fn open_pool(config: &DatabaseConfig) -> Result<ConnectionPool, DbError> {
    if config.is_in_memory() {
        ConnectionPool::in_memory()
    } else {
        ConnectionPool::open(&config.path, config.pool_options())
    }
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, open_pool, DatabaseConfig};

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn memory_config_opens_single_connection_pool() {
        let config = DatabaseConfig {
            path: ":memory:".to_string(),
            ..DatabaseConfig::default()
        };
        let pool = open_pool(&config).expect("pool should open");
        assert_eq!(pool.size(), 1);
    }
}
