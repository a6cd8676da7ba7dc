pub mod department;
pub mod user;
