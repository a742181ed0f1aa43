pub mod donation;
pub mod ngo;
pub mod user;
pub mod withdrawal;
