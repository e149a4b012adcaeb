use chrono::{DateTime, TimeZone, Utc};

/// The verified contents of a session token.
///
/// Claims are reconstructed from the signed token on every request, never
/// persisted. The subject is the user identifier only; role membership is
/// resolved against current policy at check time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub subject: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Claims {
    /// Serialize into the raw claim map, carrying the subject under the
    /// configured identity key next to the registered `iat`/`exp` claims.
    pub fn to_map(&self, identity_key: &str) -> serde_json::Map<String, serde_json::Value> {
        let mut map = serde_json::Map::new();
        map.insert(identity_key.to_string(), self.subject.clone().into());
        map.insert("iat".to_string(), self.issued_at.timestamp().into());
        map.insert("exp".to_string(), self.expires_at.timestamp().into());
        map
    }

    /// Rebuild claims from a decoded claim map, or `None` when the
    /// identity key or a registered claim is missing or malformed.
    pub fn from_map(
        map: &serde_json::Map<String, serde_json::Value>,
        identity_key: &str,
    ) -> Option<Self> {
        let subject = map.get(identity_key)?.as_str()?.to_string();
        let issued_at = Utc.timestamp_opt(map.get("iat")?.as_i64()?, 0).single()?;
        let expires_at = Utc.timestamp_opt(map.get("exp")?.as_i64()?, 0).single()?;
        Some(Self {
            subject,
            issued_at,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn claim_map_round_trip() {
        let now = Utc.timestamp_opt(Utc::now().timestamp(), 0).single().unwrap();
        let claims = Claims {
            subject: "u1".to_string(),
            issued_at: now,
            expires_at: now + Duration::hours(1),
        };

        let map = claims.to_map("user");
        assert_eq!(Claims::from_map(&map, "user"), Some(claims.clone()));

        // wrong identity key means no subject
        assert_eq!(Claims::from_map(&map, "uid"), None);
    }

    #[test]
    fn malformed_maps_are_rejected() {
        let mut map = serde_json::Map::new();
        map.insert("user".to_string(), "u1".into());
        assert_eq!(Claims::from_map(&map, "user"), None);

        map.insert("iat".to_string(), "not-a-number".into());
        map.insert("exp".to_string(), 0.into());
        assert_eq!(Claims::from_map(&map, "user"), None);
    }
}
