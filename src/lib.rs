pub mod app;
pub mod auth;
pub mod clients;
pub mod config;
pub mod error;
pub mod foods;
pub mod index;
pub mod meals;
pub mod retry;
pub mod state;
pub mod sync;
pub mod units;

#[cfg(test)]
mod testing;
