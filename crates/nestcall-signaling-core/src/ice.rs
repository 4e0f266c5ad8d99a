use nestcall_types_api::ice::IceServer;

use crate::capabilities::IceConfigProvider;

/// Optional TURN credentials layered on top of the STUN server list (spec §4.2).
#[derive(Debug, Clone)]
pub struct TurnConfig {
    pub urls: Vec<String>,
    pub username: String,
    pub credential: String,
}

/// An [`IceConfigProvider`] backed by a fixed, configuration-supplied server list
/// (spec §4.2 "Pure function of configuration").
#[derive(Debug, Clone)]
pub struct StaticIceConfigProvider {
    stun_urls: Vec<String>,
    turn: Option<TurnConfig>,
}

impl StaticIceConfigProvider {
    pub fn new(stun_urls: Vec<String>, turn: Option<TurnConfig>) -> Self {
        Self { stun_urls, turn }
    }
}

impl IceConfigProvider for StaticIceConfigProvider {
    fn ice_servers(&self) -> Vec<IceServer> {
        let mut servers = Vec::with_capacity(2);
        if !self.stun_urls.is_empty() {
            servers.push(IceServer {
                urls: self.stun_urls.clone(),
                username: None,
                credential: None,
            });
        }
        if let Some(turn) = &self.turn {
            servers.push(IceServer {
                urls: turn.urls.clone(),
                username: Some(turn.username.clone()),
                credential: Some(turn.credential.clone()),
            });
        }
        servers
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn omits_turn_entry_when_unconfigured() {
        let provider = StaticIceConfigProvider::new(vec!["stun:stun.example.com".to_owned()], None);
        assert_eq!(provider.ice_servers().len(), 1);
    }

    #[test]
    fn includes_turn_entry_with_credentials_when_configured() {
        let provider = StaticIceConfigProvider::new(
            vec!["stun:stun.example.com".to_owned()],
            Some(TurnConfig {
                urls: vec!["turn:turn.example.com".to_owned()],
                username: "u".to_owned(),
                credential: "p".to_owned(),
            }),
        );
        let servers = provider.ice_servers();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[1].username.as_deref(), Some("u"));
    }
}
