pub mod form_state;
pub mod request_context;
pub mod upload;
