/// Database layer for TeamTrack
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool with a startup health check
/// - `migrations`: embedded schema migrations
///
/// Queries live with their records in [`crate::models`].

pub mod migrations;
pub mod pool;
