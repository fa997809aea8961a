pub mod portal;
pub mod session;
