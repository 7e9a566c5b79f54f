use std::net::IpAddr;
use std::net::SocketAddr;

use http::Request;

/// Key used for every request whose client cannot be identified.
///
/// All such requests share a single bucket.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Derives the client key a request is rate limited under.
pub trait KeyExtractor: Clone {
    /// Returns `None` when the request carries nothing to identify its client.
    fn extract<B>(&self, req: &Request<B>) -> Option<String>;
}

/// Keys requests by the IP address of the connected peer.
///
/// The address is read from a `SocketAddr` request extension, which the server is
/// expected to insert per connection. With the `axum` feature enabled,
/// `axum::extract::ConnectInfo<SocketAddr>` is used as well.
#[derive(Clone, Copy, Debug, Default)]
pub struct PeerIp;

impl PeerIp {
    fn peer_ip<B>(req: &Request<B>) -> Option<IpAddr> {
        #[cfg(feature = "axum")]
        if let Some(axum::extract::ConnectInfo(addr)) = req
            .extensions()
            .get::<axum::extract::ConnectInfo<SocketAddr>>()
        {
            return Some(addr.ip());
        }

        req.extensions().get::<SocketAddr>().map(SocketAddr::ip)
    }
}

impl KeyExtractor for PeerIp {
    fn extract<B>(&self, req: &Request<B>) -> Option<String> {
        Self::peer_ip(req).map(|ip| ip.to_string())
    }
}

/// Keys requests by the leftmost `X-Forwarded-For` address, falling back to [`PeerIp`].
///
/// The header is supplied by the client. Anyone able to reach the service directly can
/// put an arbitrary address in it and get a fresh bucket per request, so only use this
/// behind a proxy that overwrites the header.
#[derive(Clone, Copy, Debug, Default)]
pub struct ForwardedFor;

impl KeyExtractor for ForwardedFor {
    fn extract<B>(&self, req: &Request<B>) -> Option<String> {
        req.headers()
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .and_then(|first| first.parse::<IpAddr>().ok())
            .map(|ip| ip.to_string())
            .or_else(|| PeerIp.extract(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_from(peer: Option<&str>, forwarded: Option<&str>) -> Request<()> {
        let mut builder = Request::builder().uri("/");
        if let Some(forwarded) = forwarded {
            builder = builder.header("x-forwarded-for", forwarded);
        }
        let mut req = builder.body(()).unwrap();
        if let Some(peer) = peer {
            req.extensions_mut()
                .insert(peer.parse::<SocketAddr>().unwrap());
        }
        req
    }

    #[test]
    fn peer_ip_ignores_the_port() {
        let req = request_from(Some("1.2.3.4:5555"), None);
        assert_eq!(PeerIp.extract(&req).as_deref(), Some("1.2.3.4"));

        let req = request_from(Some("[::1]:8080"), None);
        assert_eq!(PeerIp.extract(&req).as_deref(), Some("::1"));
    }

    #[test]
    fn peer_ip_without_connection_info() {
        let req = request_from(None, Some("9.9.9.9"));
        assert_eq!(PeerIp.extract(&req), None);
    }

    #[test]
    fn forwarded_for_takes_the_leftmost_address() {
        let req = request_from(Some("10.0.0.1:443"), Some(" 5.6.7.8 , 10.0.0.1"));
        assert_eq!(ForwardedFor.extract(&req).as_deref(), Some("5.6.7.8"));
    }

    #[test]
    fn forwarded_for_falls_back_to_peer() {
        let req = request_from(Some("10.0.0.1:443"), Some("not-an-address"));
        assert_eq!(ForwardedFor.extract(&req).as_deref(), Some("10.0.0.1"));

        let req = request_from(None, None);
        assert_eq!(ForwardedFor.extract(&req), None);
    }
}
