pub mod api;
pub mod app;
pub mod auth;
pub mod collect;
pub mod config;
pub mod draft;
pub mod errors;
pub mod form;
pub mod handlers;
pub mod models;
pub mod state;
pub mod store;
pub mod ui;

pub use app::router;
pub use config::Config;
pub use state::AppState;
pub use store::Gateway;
