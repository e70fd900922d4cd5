//! Offline zone and DNS zone collaborators
//!
//! These derive answers from provider naming conventions instead of calling a
//! provider API.

use crate::error::{CloudError, Result};
use crate::provider::{AvailabilityZoneRetriever, DnsZoneLookup};
use async_trait::async_trait;
use bbl_core::{Iaas, State};

/// Zones named by the provider's convention for a region
#[derive(Debug, Clone, Copy, Default)]
pub struct ConventionalZoneRetriever;

#[async_trait]
impl AvailabilityZoneRetriever for ConventionalZoneRetriever {
    async fn retrieve(&self, state: &State) -> Result<Vec<String>> {
        let region = state.region();
        if region.is_empty() {
            return Err(CloudError::InvalidConfig(
                "a region is required to list availability zones".to_string(),
            ));
        }

        let zones = match state.iaas {
            Some(Iaas::Aws) => ["a", "b", "c"]
                .iter()
                .map(|suffix| format!("{}{}", region, suffix))
                .collect(),
            Some(Iaas::Gcp) => ["b", "c", "d"]
                .iter()
                .map(|suffix| format!("{}-{}", region, suffix))
                .collect(),
            Some(Iaas::Azure) => vec!["1".to_string(), "2".to_string(), "3".to_string()],
            Some(Iaas::Openstack) => vec![state.openstack.az.clone()],
            Some(Iaas::Cloudstack) => vec![state.cloudstack.zone.clone()],
            Some(Iaas::Vsphere) | None => vec![region.to_string()],
        };
        tracing::debug!(?zones, "Retrieved availability zones");
        Ok(zones)
    }
}

/// Derives the DNS zone identifier from the domain itself
#[derive(Debug, Clone, Copy, Default)]
pub struct DomainZoneLookup;

#[async_trait]
impl DnsZoneLookup for DomainZoneLookup {
    async fn zone(&self, state: &State, domain: &str) -> Result<String> {
        let domain = domain.trim_end_matches('.');
        if domain.is_empty() {
            return Err(CloudError::InvalidConfig("empty LB domain".to_string()));
        }
        Ok(match state.iaas {
            // managed zone names may not contain dots
            Some(Iaas::Gcp) => domain.replace('.', "-"),
            _ => domain.to_string(),
        })
    }
}
