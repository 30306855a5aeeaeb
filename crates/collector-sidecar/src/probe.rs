use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Cap on each probe attempt so a health iteration stays under its cadence
const PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// Check whether a TCP port is free.
///
/// A successful short-lived outbound connection means something is listening,
/// so the port is NOT available. Refusal, timeout, and any other connect
/// error all count as available: an ambiguous probe must never block
/// startup. This is used both pre-launch (port clash detection) and as the
/// post-launch readiness signal (occupied == collector is listening).
pub async fn is_port_available(host: &str, port: u16) -> bool {
    match timeout(PROBE_TIMEOUT, TcpStream::connect((host, port))).await {
        Ok(Ok(_)) => {
            debug!(host = %host, port = port, "Port is occupied");
            false
        }
        _ => {
            debug!(host = %host, port = port, "Port is available");
            true
        }
    }
}
