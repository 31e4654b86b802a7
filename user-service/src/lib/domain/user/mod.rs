pub mod email_verification;
pub mod errors;
pub mod events;
pub mod models;
pub mod password_reset;
pub mod ports;
pub mod service;

#[cfg(test)]
pub mod mocks;
