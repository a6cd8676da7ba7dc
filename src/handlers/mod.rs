pub mod auth;
pub mod department;
