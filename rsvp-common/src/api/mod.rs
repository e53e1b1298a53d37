//! HTTP API types shared by the RSVP client and server
//!
//! Field names and the endpoint path live here so the multipart request the
//! client builds and the one the server parses are described once.

pub mod types;

pub use types::{
    decode_guests, encode_guests, ErrorCode, ErrorResponse, SubmitResponse, FIELD_GUESTS,
    FIELD_MAIN_EMAIL, FIELD_PASSPORTS, SUBMIT_PATH,
};
