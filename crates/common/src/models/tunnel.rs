use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::utils::uptime_since;

/// A tunnel as reported by the broker's management API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelInfo {
    /// Tunnel ID (path segment of the public URL)
    pub tunnel_id: String,

    /// Subdomain the tunnel was registered under, empty when none
    #[serde(default)]
    pub subdomain: String,

    /// Whether a client session is currently attached
    pub connected: bool,

    /// Number of open virtual streams
    #[serde(default)]
    pub num_streams: u64,

    /// When the client session attached (RFC 3339 on the wire)
    pub attached_at: DateTime<Utc>,
}

impl TunnelInfo {
    /// Connection state label for the listing table
    pub fn status(&self) -> &'static str {
        if self.connected {
            "🟢 online"
        } else {
            "🔴 offline"
        }
    }

    /// Time the session has been attached, as of `now`
    pub fn uptime(&self, now: DateTime<Utc>) -> Duration {
        uptime_since(self.attached_at, now)
    }

    /// Subdomain for display, `-` when unset
    pub fn display_subdomain(&self) -> &str {
        if self.subdomain.is_empty() {
            "-"
        } else {
            &self.subdomain
        }
    }
}

/// Response body of `GET /tunnels`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelListing {
    pub count: usize,
    #[serde(default)]
    pub tunnels: Vec<TunnelInfo>,
}

impl TunnelListing {
    /// Empty as reported by the broker's `count`
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const LISTING: &str = r#"{
        "count": 2,
        "tunnels": [
            {
                "tunnel_id": "3f2a9c01d4e5b6a7",
                "subdomain": "myapp",
                "connected": true,
                "num_streams": 3,
                "attached_at": "2025-01-01T12:00:00Z"
            },
            {
                "tunnel_id": "my-api",
                "connected": false,
                "attached_at": "2025-01-01T10:30:00.123456789+00:00"
            }
        ]
    }"#;

    #[test]
    fn test_listing_deserialization() {
        let listing: TunnelListing = serde_json::from_str(LISTING).unwrap();

        assert_eq!(listing.count, 2);
        assert_eq!(listing.tunnels.len(), 2);

        let first = &listing.tunnels[0];
        assert_eq!(first.tunnel_id, "3f2a9c01d4e5b6a7");
        assert_eq!(first.subdomain, "myapp");
        assert_eq!(first.num_streams, 3);
        assert_eq!(first.status(), "🟢 online");
        assert_eq!(
            first.attached_at,
            Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
        );

        let second = &listing.tunnels[1];
        assert_eq!(second.display_subdomain(), "-");
        assert_eq!(second.num_streams, 0);
        assert_eq!(second.status(), "🔴 offline");
    }

    #[test]
    fn test_empty_listing() {
        let listing: TunnelListing = serde_json::from_str(r#"{"count": 0}"#).unwrap();
        assert!(listing.is_empty());
        assert_eq!(listing, TunnelListing::default());
    }

    #[test]
    fn test_listing_emptiness_follows_count() {
        let listing: TunnelListing =
            serde_json::from_str(r#"{"count": 0, "tunnels": [{"tunnel_id": "a", "connected": false, "attached_at": "2025-01-01T00:00:00Z"}]}"#)
                .unwrap();
        assert!(listing.is_empty());

        let listing: TunnelListing = serde_json::from_str(r#"{"count": 3}"#).unwrap();
        assert!(!listing.is_empty());
    }

    #[test]
    fn test_tunnel_info_uptime() {
        let info = TunnelInfo {
            tunnel_id: "abc".to_string(),
            subdomain: String::new(),
            connected: true,
            num_streams: 0,
            attached_at: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
        };
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 1, 30).unwrap();
        assert_eq!(info.uptime(now), Duration::from_secs(90));
    }

    #[test]
    fn test_tunnel_info_serialization_roundtrip() {
        let info = TunnelInfo {
            tunnel_id: "abc".to_string(),
            subdomain: "demo".to_string(),
            connected: true,
            num_streams: 1,
            attached_at: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
        };
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"attached_at\":\"2025-06-01T00:00:00Z\""));

        let back: TunnelInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, info);
    }
}
