//! Client IP extraction.
//!
//! VNPay wants the payer's IP in `vnp_IpAddr`. Behind a proxy that is the
//! first `x-forwarded-for` entry; otherwise the socket peer.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, request::Parts},
};

const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
const FALLBACK_IP: &str = "127.0.0.1";

/// The requesting client's IP address as a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(String::from)
}

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = forwarded_for(&parts.headers)
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            })
            .unwrap_or_else(|| FALLBACK_IP.to_string());

        Ok(Self(ip))
    }
}
