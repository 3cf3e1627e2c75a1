use std::time::Duration;

use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::RunQueryDsl;

use crate::config::Config;

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

/// Session limits applied to every connection when it is checked out, so a
/// blocked lock or a slow statement surfaces as an error instead of hanging.
#[derive(Debug, Clone, Copy)]
pub struct SessionTimeouts {
    pub statement_timeout: Duration,
    pub lock_timeout: Duration,
}

impl CustomizeConnection<PgConnection, diesel::r2d2::Error> for SessionTimeouts {
    fn on_acquire(&self, conn: &mut PgConnection) -> Result<(), diesel::r2d2::Error> {
        diesel::sql_query(format!(
            "SET statement_timeout = {}",
            self.statement_timeout.as_millis()
        ))
        .execute(conn)
        .map_err(diesel::r2d2::Error::QueryError)?;
        diesel::sql_query(format!("SET lock_timeout = {}", self.lock_timeout.as_millis()))
            .execute(conn)
            .map_err(diesel::r2d2::Error::QueryError)?;
        Ok(())
    }
}

pub fn create_pool(config: &Config) -> Result<DbPool, r2d2::Error> {
    let manager = ConnectionManager::<PgConnection>::new(&config.database_url);
    Pool::builder()
        .max_size(config.pool_size)
        .connection_timeout(config.connect_timeout)
        .connection_customizer(Box::new(SessionTimeouts {
            statement_timeout: config.statement_timeout,
            lock_timeout: config.lock_timeout,
        }))
        .build(manager)
}
