//! Database entities

pub mod captured_request;
pub mod endpoint;

pub use captured_request::Entity as CapturedRequest;
pub use endpoint::Entity as Endpoint;

pub mod prelude {
    pub use super::captured_request::Entity as CapturedRequest;
    pub use super::endpoint::Entity as Endpoint;
}
