//! Shared User-Agent string for relay HTTP traffic.

/// Product token identifying relay traffic to the web app.
const PRODUCT: &str = "auth-relay";

/// Default User-Agent for relay requests.
#[must_use]
pub(crate) fn default_relay_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("{PRODUCT}/{version} (native-oauth-relay)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_contains_version() {
        let ua = default_relay_user_agent();
        assert_eq!(
            env!("CARGO_PKG_VERSION"),
            ua.strip_prefix("auth-relay/")
                .and_then(|s| s.split(' ').next())
                .expect("UA has version"),
        );
        assert!(ua.contains("native-oauth-relay"), "got: {ua}");
    }
}
