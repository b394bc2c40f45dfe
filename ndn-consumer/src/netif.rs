//! Network interface discovery for the face locator.

use nix::ifaddrs::getifaddrs;
use nix::net::if_::InterfaceFlags;

use crate::macaddr::MacAddr;

/// A host network interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetInterface {
    pub name: String,
    pub hwaddr: Option<MacAddr>,
    pub up: bool,
    pub loopback: bool,
}

/// Enumerate host interfaces, one entry per name, in kernel order.
pub fn scan() -> nix::Result<Vec<NetInterface>> {
    let mut out: Vec<NetInterface> = Vec::new();
    for ifaddr in getifaddrs()? {
        let hwaddr = ifaddr
            .address
            .as_ref()
            .and_then(|a| a.as_link_addr())
            .and_then(|l| l.addr())
            .map(MacAddr::from)
            .filter(|m| !m.is_zero());

        if let Some(entry) = out.iter_mut().find(|e| e.name == ifaddr.interface_name) {
            entry.hwaddr = entry.hwaddr.or(hwaddr);
            continue;
        }
        out.push(NetInterface {
            name: ifaddr.interface_name.clone(),
            hwaddr,
            up: ifaddr.flags.contains(InterfaceFlags::IFF_UP),
            loopback: ifaddr.flags.contains(InterfaceFlags::IFF_LOOPBACK),
        });
    }
    Ok(out)
}

/// Pick `wanted` by name, or when `wanted` is empty the first interface
/// that is up, not loopback, and has a hardware address.
pub fn pick<'a>(interfaces: &'a [NetInterface], wanted: &str) -> Option<&'a NetInterface> {
    if wanted.is_empty() {
        interfaces
            .iter()
            .find(|i| i.up && !i.loopback && i.hwaddr.is_some())
    } else {
        interfaces.iter().find(|i| i.name == wanted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iface(name: &str, hw: Option<[u8; 6]>, up: bool, loopback: bool) -> NetInterface {
        NetInterface {
            name: name.to_string(),
            hwaddr: hw.map(MacAddr::from),
            up,
            loopback,
        }
    }

    #[test]
    fn test_pick_auto_skips_loopback_and_down() {
        let list = [
            iface("lo", None, true, true),
            iface("eth0", Some([2, 0, 0, 0, 0, 1]), false, false),
            iface("eth1", Some([2, 0, 0, 0, 0, 2]), true, false),
        ];
        assert_eq!(pick(&list, "").unwrap().name, "eth1");
    }

    #[test]
    fn test_pick_by_name() {
        let list = [iface("lo", None, true, true), iface("eth0", None, false, false)];
        assert_eq!(pick(&list, "eth0").unwrap().name, "eth0");
        assert!(pick(&list, "eth9").is_none());
        assert!(pick(&list, "").is_none());
    }

    #[test]
    fn test_scan_host() {
        // Every Linux host has at least a loopback interface.
        let list = scan().unwrap();
        assert!(list.iter().any(|i| i.loopback));
    }
}
