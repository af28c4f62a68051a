//! Request extractors.

mod body;
mod request_id;

pub use body::{ApiForm, ApiJson, ApiQuery};
pub use request_id::{stamp_request_id, RequestId, REQUEST_ID_HEADER};
