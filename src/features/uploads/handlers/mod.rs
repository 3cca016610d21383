pub mod form_handler;
pub mod upload_handler;

pub use form_handler::show_form;
pub use upload_handler::{method_not_allowed, upload_image};
