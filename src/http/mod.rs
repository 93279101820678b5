mod client;
mod request;

pub use client::create_client;
pub use request::execute_request;
