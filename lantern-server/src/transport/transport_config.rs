/// Settings applied to every connection the engine creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// STUN URLs probed in parallel for server-reflexive candidates.
    pub ice_servers: Vec<String>,
    /// Public addresses of a 1:1 NAT, advertised as server-reflexive candidates.
    pub public_ips: Vec<String>,
    /// Skip mDNS candidate generation; it keeps extra UDP sockets open for nothing.
    pub disable_mdns: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![
                "stun:stun.l.google.com:19302".to_owned(),
                "stun:stun.cloudflare.com:3478".to_owned(),
            ],
            public_ips: Vec::new(),
            disable_mdns: true,
        }
    }
}
