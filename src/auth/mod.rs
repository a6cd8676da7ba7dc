pub mod gate;
pub mod session;
