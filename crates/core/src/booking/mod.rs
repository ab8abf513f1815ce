pub mod classify;
pub mod http;

use crate::domain::contract::BookingRequest;

/// Raw reply from the booking endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointResponse {
    pub status: u16,
    pub body: String,
}

impl EndpointResponse {
    pub fn is_success_status(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Remote side that accepts one booking per call. `Err` means the request did
/// not complete (timeout, connection failure); any HTTP reply is `Ok`.
#[async_trait::async_trait]
pub trait BookingEndpoint: Send + Sync {
    fn endpoint_name(&self) -> &'static str;

    async fn submit(&self, request: &BookingRequest) -> anyhow::Result<EndpointResponse>;
}
