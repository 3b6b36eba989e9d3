pub mod connection;
pub mod server;

pub use server::Server;
