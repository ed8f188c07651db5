pub mod extractors;
pub mod request_id;
