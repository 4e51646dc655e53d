//! dbfile API Library
//!
//! HTTP surface for the attachment control: the download handler and the form
//! endpoints that carry a session's slots between round trips.

mod api_doc;
mod handlers;
pub mod setup;
mod telemetry;
pub mod utils;

pub mod error;
pub mod state;

pub use error::ErrorResponse;
pub use utils::form_state::FormStateSigner;
