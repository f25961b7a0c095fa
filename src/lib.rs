pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod expenses;
pub mod groups;
pub mod mailer;
pub mod messages;
pub mod state;
pub mod users;
pub mod verification;

pub use app::{build_app, serve};
pub use state::AppState;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
