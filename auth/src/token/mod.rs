pub mod generator;

pub use generator::generate_secure_token;
