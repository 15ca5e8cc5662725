use std::{fmt, net::IpAddr};

/// The network endpoint of a party.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    pub host: String,
    pub port: u16,
}

impl Address {
    /// Whether both addresses name the same endpoint.
    ///
    /// Hosts are compared case-insensitively and `localhost` is the same host as any loopback IP.
    /// Other host names are not resolved.
    pub fn same_endpoint(&self, other: &Address) -> bool {
        self.port == other.port && canonical_host(&self.host) == canonical_host(&other.host)
    }
}

fn canonical_host(host: &str) -> String {
    let host = host
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_ascii_lowercase();

    match host.parse::<IpAddr>().map(|ip| ip.to_canonical()) {
        Ok(ip) if ip.is_loopback() => "localhost".to_string(),
        Ok(ip) => ip.to_string(),
        Err(_) => host,
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A named member of the training roster.
#[derive(Debug, Clone, PartialEq)]
pub struct Party {
    name: String,
    address: Address,
    data: Option<String>,
}

impl Party {
    pub(crate) fn new(name: String, address: Address, data: Option<String>) -> Self {
        Self {
            name,
            address,
            data,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// The identifier handed to the data accessor to fetch this party's shard.
    ///
    /// Falls back to the party's name when no `data` entry was configured.
    pub fn shard_id(&self) -> &str {
        self.data.as_deref().unwrap_or(&self.name)
    }
}
