//! IPv4 subnet arithmetic for network ranges

use crate::error::{CloudConfigError, Result};
use std::net::Ipv4Addr;

/// Addresses after the network address kept away from the director
const RESERVED_START: u32 = 2;
const RESERVED_END: u32 = 6;
/// Static range spans `broadcast - 200 ..= broadcast - 1`
const STATIC_SPAN: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subnet {
    network: u32,
    prefix: u8,
}

impl Subnet {
    /// Parse `a.b.c.d/n`; the subnet must be large enough to hold both the
    /// reserved and the static range
    pub fn parse(cidr: &str) -> Result<Self> {
        let invalid = || CloudConfigError::InvalidCidr(cidr.to_string());

        let (addr, prefix) = cidr.trim().split_once('/').ok_or_else(invalid)?;
        let addr: Ipv4Addr = addr.parse().map_err(|_| invalid())?;
        let prefix: u8 = prefix.parse().map_err(|_| invalid())?;
        if prefix > 32 {
            return Err(invalid());
        }

        let mask = if prefix == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(prefix))
        };
        let subnet = Self {
            network: u32::from(addr) & mask,
            prefix,
        };

        let fits = subnet
            .broadcast()
            .checked_sub(STATIC_SPAN)
            .zip(subnet.network.checked_add(RESERVED_END))
            .is_some_and(|(static_start, reserved_end)| static_start > reserved_end);
        if !fits {
            return Err(invalid());
        }
        Ok(subnet)
    }

    fn broadcast(&self) -> u32 {
        let host_bits = 32 - u32::from(self.prefix);
        let hosts = if host_bits == 32 {
            u32::MAX
        } else {
            (1u32 << host_bits) - 1
        };
        self.network | hosts
    }

    pub fn cidr(&self) -> String {
        format!("{}/{}", Ipv4Addr::from(self.network), self.prefix)
    }

    pub fn gateway(&self) -> String {
        Ipv4Addr::from(self.network + 1).to_string()
    }

    pub fn reserved(&self) -> String {
        range(self.network + RESERVED_START, self.network + RESERVED_END)
    }

    pub fn static_range(&self) -> String {
        range(self.broadcast() - STATIC_SPAN, self.broadcast() - 1)
    }
}

fn range(first: u32, last: u32) -> String {
    format!("{}-{}", Ipv4Addr::from(first), Ipv4Addr::from(last))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges_for_slash_20() {
        let subnet = Subnet::parse("10.0.16.0/20").unwrap();
        assert_eq!(subnet.gateway(), "10.0.16.1");
        assert_eq!(subnet.reserved(), "10.0.16.2-10.0.16.6");
        assert_eq!(subnet.static_range(), "10.0.31.55-10.0.31.254");
    }

    #[test]
    fn test_host_bits_are_masked() {
        let subnet = Subnet::parse("10.0.0.17/24").unwrap();
        assert_eq!(subnet.cidr(), "10.0.0.0/24");
        assert_eq!(subnet.static_range(), "10.0.0.55-10.0.0.254");
    }

    #[test]
    fn test_invalid_cidrs() {
        for cidr in ["10.0.0.0", "10.0.0.256/24", "10.0.0.0/33", "nonsense/8", "10.0.0.0/25"] {
            assert!(
                matches!(Subnet::parse(cidr), Err(CloudConfigError::InvalidCidr(_))),
                "{cidr} should be rejected"
            );
        }
    }
}
