//! Supported infrastructure providers

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Target cloud provider, recorded once per environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Iaas {
    Aws,
    Gcp,
    Azure,
    Vsphere,
    Openstack,
    Cloudstack,
}

impl Iaas {
    /// Every accepted value, in the order shown to users
    pub const ALL: [Iaas; 6] = [
        Iaas::Gcp,
        Iaas::Aws,
        Iaas::Azure,
        Iaas::Vsphere,
        Iaas::Openstack,
        Iaas::Cloudstack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Iaas::Aws => "aws",
            Iaas::Gcp => "gcp",
            Iaas::Azure => "azure",
            Iaas::Vsphere => "vsphere",
            Iaas::Openstack => "openstack",
            Iaas::Cloudstack => "cloudstack",
        }
    }
}

impl std::fmt::Display for Iaas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Iaas {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Iaas::ALL
            .iter()
            .copied()
            .find(|i| i.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "unknown iaas {:?}; expected one of: {}",
                    s,
                    Iaas::ALL.map(|i| i.as_str()).join(", ")
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_display() {
        for iaas in Iaas::ALL {
            assert_eq!(iaas.to_string().parse::<Iaas>().unwrap(), iaas);
        }
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "digitalocean".parse::<Iaas>().unwrap_err();
        assert!(err.contains("digitalocean"));
        assert!(err.contains("cloudstack"));
    }
}
