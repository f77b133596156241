pub mod database;
pub mod error;
pub mod health;
pub mod pages;
pub mod posts;
pub mod tags;
pub mod views;

use mysql::Pool;
use tera::Tera;

#[derive(Clone)]
pub struct AppState {
    pub pool: Pool,
    pub templates: Tera,
}
