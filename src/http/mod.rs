pub mod request;
pub mod response;

pub use request::{Body, Method, Request};
pub use response::{Payload, Response};
