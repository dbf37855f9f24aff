//! BusTime API transport and response normalization.
//!
//! The API is quirky in two ways that shape everything here:
//! - every response, success or failure, shares one `bustime-response`
//!   wrapper, and errors are reported inside it as `error` children whose
//!   free-form message text must be pattern-matched;
//! - a field holding exactly one record arrives as a bare object, while
//!   the same field with several records arrives as a list (see
//!   [`norm`]).

pub mod client;
pub mod convert;
pub mod endpoint;
pub mod envelope;
pub mod error;
pub mod norm;
pub mod types;

pub use client::{
    BulletinQuery, BustimeClient, BustimeConfig, PatternQuery, PredictionQuery, VehicleQuery,
};
pub use endpoint::{Endpoint, MAX_IDS, QueryParams, build_url};
pub use envelope::{ERROR_TOKEN, RESPONSE_TOKEN, ResponseFormat, decode};
pub use error::{BustimeError, ConversionError};
