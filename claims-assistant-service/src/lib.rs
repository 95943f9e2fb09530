pub mod clients;
pub mod images;
pub mod policy;
pub mod prompt;
pub mod routes;
pub mod tools;

pub use routes::{AppState, create_app};
