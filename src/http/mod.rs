pub mod client;
pub mod transport;


pub use client::{RateLimitedHttpClient, TransportSettings};
pub use transport::{HttpMethod, RawResponse, RestTransport};
