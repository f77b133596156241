use mysql::{Opts, Pool};
use std::env;

use crate::error::AppError;

/// Builds the shared connection pool from `DATABASE_URL`. Called once at
/// startup; every request checks a connection out of this pool.
pub fn create_pool() -> Result<Pool, AppError> {
    let db_url = env::var("DATABASE_URL")
        .map_err(|_| AppError::Config("the DATABASE_URL environment variable is not set"))?;

    let opts = Opts::from_url(&db_url)
        .map_err(|_| AppError::Config("DATABASE_URL is not a valid connection URL"))?;

    let pool = Pool::new(opts)?;

    Ok(pool)
}
