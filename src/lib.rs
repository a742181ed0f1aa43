pub mod auth;
pub mod checkout;
pub mod config;
pub mod directory;
pub mod entities;
pub mod error;
pub mod http;
pub mod ledger;
pub mod models;
pub mod money;
pub mod payments;
pub mod recorder;
pub mod state;
pub mod withdrawal;

#[cfg(test)]
mod test_utils;
