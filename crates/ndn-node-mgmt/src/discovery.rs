//! Router discovery through the NDN Find-Closest-Hub service.

use serde::Deserialize;
use url::Url;

use crate::error::{MgmtError, Result};

/// Public FCH service.
pub const FCH_SERVICE: &str = "https://fch.ndn.today";

#[derive(Debug, Deserialize)]
struct FchResponse {
    #[serde(default)]
    routers: Vec<FchRouter>,
}

#[derive(Debug, Deserialize)]
struct FchRouter {
    connect: String,
}

/// Ask `service` for the closest secure-WebSocket router.
pub async fn discover(client: &reqwest::Client, service: &str) -> Result<Url> {
    let response = client
        .get(service)
        .query(&[("cap", "wss"), ("network", "ndn"), ("k", "1")])
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| MgmtError::DiscoveryFailure(format!("FCH server is down: {e}")))?;
    if !response.status().is_success() {
        return Err(MgmtError::DiscoveryFailure(format!(
            "FCH answered {}",
            response.status()
        )));
    }
    let body = response
        .text()
        .await
        .map_err(|e| MgmtError::DiscoveryFailure(e.to_string()))?;
    let url = parse_fch_response(&body)?;
    tracing::info!(router = %url, "router discovered");
    Ok(url)
}

/// Pick the first router of an FCH JSON answer and turn it into
/// `wss://<host>/ws/`.
pub fn parse_fch_response(body: &str) -> Result<Url> {
    let response: FchResponse = serde_json::from_str(body)
        .map_err(|e| MgmtError::DiscoveryFailure(format!("bad FCH response: {e}")))?;
    let router = response
        .routers
        .first()
        .ok_or_else(|| MgmtError::DiscoveryFailure("FCH gives no response".into()))?;
    websocket_endpoint(&router.connect)
}

/// `wss://<host[:port]>/ws/` for a router's connect string, which may be a
/// URL or a bare host.
pub fn websocket_endpoint(connect: &str) -> Result<Url> {
    let host = match Url::parse(connect) {
        Ok(url) if url.host_str().is_some() => {
            let host = url.host_str().unwrap_or_default();
            match url.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            }
        }
        _ => connect.trim_end_matches('/').to_string(),
    };
    Url::parse(&format!("wss://{host}/ws/"))
        .map_err(|e| MgmtError::DiscoveryFailure(format!("bad router address {connect:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_router_wins() {
        let body = r#"{"updated":1700000000,"routers":[
            {"transport":"wss","connect":"wss://suns.cs.ucla.edu/ws/"},
            {"transport":"wss","connect":"wss://hobo.cs.arizona.edu/ws/"}
        ]}"#;
        assert_eq!(
            parse_fch_response(body).unwrap().as_str(),
            "wss://suns.cs.ucla.edu/ws/"
        );
    }

    #[test]
    fn test_port_is_kept() {
        assert_eq!(
            websocket_endpoint("wss://router.example:9696/ws/").unwrap().as_str(),
            "wss://router.example:9696/ws/"
        );
    }

    #[test]
    fn test_bare_host() {
        assert_eq!(
            websocket_endpoint("router.example").unwrap().as_str(),
            "wss://router.example/ws/"
        );
    }

    #[test]
    fn test_empty_router_list() {
        assert!(matches!(
            parse_fch_response(r#"{"routers":[]}"#),
            Err(MgmtError::DiscoveryFailure(_))
        ));
        assert!(matches!(
            parse_fch_response("{}"),
            Err(MgmtError::DiscoveryFailure(_))
        ));
    }

    #[test]
    fn test_garbage_body() {
        assert!(matches!(
            parse_fch_response("<html>down</html>"),
            Err(MgmtError::DiscoveryFailure(_))
        ));
    }
}
