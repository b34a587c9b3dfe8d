//! Peer endpoint table and capture-line parsing.

use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr, SocketAddrV4};

/// Known endpoint of every peer, keyed by peer public key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EndpointTable {
    peers: BTreeMap<String, SocketAddr>,
}

impl EndpointTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the text output of `wg show`.
    ///
    /// Every `peer:` line opens a section; an `endpoint:` line inside it
    /// gives that peer's address. Peers without a usable endpoint (`(none)`,
    /// malformed) are left out.
    pub fn parse_wg_show(text: &str) -> Self {
        let mut table = Self::new();
        let mut current: Option<&str> = None;
        for line in text.lines().map(str::trim) {
            if let Some(peer) = line.strip_prefix("peer:") {
                current = Some(peer.trim());
            } else if let (Some(peer), Some(endpoint)) = (current, line.strip_prefix("endpoint:")) {
                if let Ok(addr) = endpoint.trim().parse::<SocketAddr>() {
                    table.insert(peer, addr);
                }
            }
        }
        table
    }

    /// Adds or replaces a peer's endpoint.
    pub fn insert(&mut self, peer: impl Into<String>, addr: SocketAddr) {
        self.peers.insert(peer.into(), addr);
    }

    pub fn get(&self, peer: &str) -> Option<SocketAddr> {
        self.peers.get(peer).copied()
    }

    /// Finds the peer whose endpoint has the given IP.
    pub fn by_ip(&self, ip: IpAddr) -> Option<(&str, u16)> {
        self.peers
            .iter()
            .find(|(_, addr)| addr.ip() == ip)
            .map(|(peer, addr)| (peer.as_str(), addr.port()))
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SocketAddr)> {
        self.peers.iter().map(|(peer, addr)| (peer.as_str(), *addr))
    }
}

/// Extracts the source of an inbound datagram from one `tcpdump -n -l` line.
///
/// Only lines marked `In` whose destination port is `listen_port` match:
///
/// ```text
/// 12:00:01.000000 eth0  In  IP 198.51.100.7.40001 > 10.0.0.1.51820: UDP, length 148
/// ```
pub fn parse_capture_line(line: &str, listen_port: u16) -> Option<SocketAddrV4> {
    let mut tokens = line.split_whitespace();
    tokens.by_ref().find(|t| *t == "In")?;

    let rest: Vec<&str> = tokens.collect();
    let arrow = rest.iter().position(|t| *t == ">")?;
    let src = rest.get(arrow.checked_sub(1)?)?;
    let dst = rest.get(arrow + 1)?.strip_suffix(':')?;

    let (_, dst_port) = dst.rsplit_once('.')?;
    if dst_port.parse::<u16>().ok()? != listen_port {
        return None;
    }
    let (ip, port) = src.rsplit_once('.')?;
    Some(SocketAddrV4::new(ip.parse().ok()?, port.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    const WG_SHOW: &str = "\
interface: wg0
  public key: 9jalV3EEBnVXahro0pRMQ+cHlmjE33Slo9tddzCVtCw=
  private key: (hidden)
  listening port: 51820

peer: AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=
  endpoint: 198.51.100.7:40000
  allowed ips: 10.6.0.2/32
  latest handshake: 1 minute, 3 seconds ago

peer: BBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB=
  allowed ips: 10.6.0.3/32

peer: CCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCC=
  endpoint: [2001:db8::5]:51820
";

    #[test]
    fn test_parse_wg_show() {
        let table = EndpointTable::parse_wg_show(WG_SHOW);
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.get("AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA="),
            Some("198.51.100.7:40000".parse().unwrap())
        );
        assert!(table.get("BBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB=").is_none());
        assert_eq!(
            table.by_ip("2001:db8::5".parse().unwrap()),
            Some(("CCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCC=", 51820))
        );
    }

    #[test]
    fn test_interface_lines_are_not_peers() {
        let table = EndpointTable::parse_wg_show("interface: wg0\n  endpoint: 1.2.3.4:5\n");
        assert!(table.is_empty());
    }

    #[test]
    fn test_parse_capture_line() {
        let line = "12:00:01.000000 eth0  In  IP 198.51.100.7.40001 > 10.0.0.1.51820: UDP, length 148";
        assert_eq!(
            parse_capture_line(line, 51820),
            Some("198.51.100.7:40001".parse().unwrap())
        );
        assert_eq!(parse_capture_line(line, 51821), None);

        let outbound = "12:00:01.000000 eth0  Out IP 10.0.0.1.51820 > 198.51.100.7.40001: UDP, length 92";
        assert_eq!(parse_capture_line(outbound, 51820), None);
        assert_eq!(parse_capture_line("garbage In >", 51820), None);
    }
}
