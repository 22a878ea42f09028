pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod utils;

use ledger::EngagementLedger;

pub struct AppState {
    pub db: db::Pool,
    pub ledger: EngagementLedger,
    pub jwt_access_secret: String,
    pub jwt_refresh_secret: String,
}

impl AppState {
    pub fn new(pool: db::Pool, jwt_access_secret: String, jwt_refresh_secret: String) -> Self {
        Self {
            ledger: EngagementLedger::new(pool.clone()),
            db: pool,
            jwt_access_secret,
            jwt_refresh_secret,
        }
    }
}
