pub mod generator;
pub mod summary;
pub mod validator;

pub use validator::{Schedule, ToggleRejection};
