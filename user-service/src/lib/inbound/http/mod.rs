pub mod client_ip;
pub mod handlers;
pub mod middleware;
pub mod router;
