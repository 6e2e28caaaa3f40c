use rand::{Rng, thread_rng};
use uuid::Uuid;

use crate::constants::TUNNEL_ID_BYTES;

/// Generate a random tunnel ID
/// Format: 16 lowercase hex characters
pub fn generate_tunnel_id() -> String {
    let mut bytes = [0u8; TUNNEL_ID_BYTES];
    thread_rng().fill(&mut bytes[..]);

    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Generate an identifier correlating the log events of one virtual stream
pub fn generate_stream_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_tunnel_id_format() {
        let id = generate_tunnel_id();
        assert_eq!(id.len(), TUNNEL_ID_BYTES * 2);
        assert!(
            id.chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        );
    }

    #[test]
    fn test_generate_tunnel_id_uniqueness() {
        let mut ids = HashSet::new();

        for _ in 0..1000 {
            assert!(ids.insert(generate_tunnel_id()), "Generated duplicate tunnel ID");
        }
    }

    #[test]
    fn test_generate_stream_id_is_v4() {
        let stream_id = generate_stream_id();
        assert_eq!(stream_id.len(), 36);

        let uuid = Uuid::parse_str(&stream_id).unwrap();
        assert_eq!(uuid.get_version_num(), 4);
    }
}
