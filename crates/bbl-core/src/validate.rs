//! Pre-flight validation for state-modifying commands

use crate::error::{CoreError, Result};
use crate::iaas::Iaas;
use crate::state::State;
use std::net::Ipv4Addr;

/// A flag the merged state must carry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredFlag {
    pub flag: &'static str,
    pub env: &'static str,
    /// Set when a value is present but unusable
    pub problem: Option<String>,
}

impl RequiredFlag {
    fn missing(flag: &'static str, env: &'static str) -> Self {
        Self {
            flag,
            env,
            problem: None,
        }
    }
}

impl std::fmt::Display for RequiredFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.flag, self.env)?;
        if let Some(problem) = &self.problem {
            write!(f, ": {}", problem)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StateValidator;

impl StateValidator {
    pub fn new() -> Self {
        Self
    }

    /// Check integrity, then collect every missing or invalid field for the
    /// state's provider into one error
    pub fn validate(&self, state: &State) -> Result<()> {
        let iaas = state.iaas.ok_or(CoreError::MissingIaas)?;

        check_integrity(iaas, state)?;

        let flags = match iaas {
            Iaas::Aws => aws(state),
            Iaas::Gcp => gcp(state),
            Iaas::Azure => azure(state),
            Iaas::Vsphere => vsphere(state),
            Iaas::Openstack => openstack(state),
            Iaas::Cloudstack => cloudstack(state),
        };

        if flags.is_empty() {
            Ok(())
        } else {
            Err(CoreError::MissingFlags { iaas, flags })
        }
    }
}

fn check_integrity(iaas: Iaas, state: &State) -> Result<()> {
    let stray: Vec<Iaas> = state
        .configured_providers()
        .into_iter()
        .filter(|p| *p != iaas)
        .collect();
    if !stray.is_empty() {
        return Err(CoreError::Integrity {
            message: format!(
                "state says iaas={} but also holds configuration for {}",
                iaas,
                stray.iter().map(|p| p.as_str()).collect::<Vec<_>>().join(", ")
            ),
            hint: "remove the stray provider section from bbl-state.json or use a fresh --state-dir"
                .to_string(),
        });
    }

    if state.director_vm.is_deployed() && state.infrastructure_id().is_none() {
        return Err(CoreError::Integrity {
            message: "a director is recorded but no infrastructure state exists".to_string(),
            hint: "run `bbl down` to clean up the director, or restore vars/terraform.tfstate"
                .to_string(),
        });
    }

    Ok(())
}

fn require(
    flags: &mut Vec<RequiredFlag>,
    value: &str,
    flag: &'static str,
    env: &'static str,
) {
    if value.trim().is_empty() {
        flags.push(RequiredFlag::missing(flag, env));
    }
}

fn aws(state: &State) -> Vec<RequiredFlag> {
    let c = &state.aws;
    let mut flags = Vec::new();
    require(&mut flags, &c.access_key_id, "--aws-access-key-id", "BBL_AWS_ACCESS_KEY_ID");
    require(
        &mut flags,
        &c.secret_access_key,
        "--aws-secret-access-key",
        "BBL_AWS_SECRET_ACCESS_KEY",
    );
    require(&mut flags, &c.region, "--aws-region", "BBL_AWS_REGION");
    flags
}

fn gcp(state: &State) -> Vec<RequiredFlag> {
    let c = &state.gcp;
    let mut flags = Vec::new();
    require(
        &mut flags,
        &c.service_account_key,
        "--gcp-service-account-key",
        "BBL_GCP_SERVICE_ACCOUNT_KEY",
    );
    require(&mut flags, &c.region, "--gcp-region", "BBL_GCP_REGION");
    flags
}

fn azure(state: &State) -> Vec<RequiredFlag> {
    let c = &state.azure;
    let mut flags = Vec::new();
    require(&mut flags, &c.client_id, "--azure-client-id", "BBL_AZURE_CLIENT_ID");
    require(
        &mut flags,
        &c.client_secret,
        "--azure-client-secret",
        "BBL_AZURE_CLIENT_SECRET",
    );
    require(&mut flags, &c.region, "--azure-region", "BBL_AZURE_REGION");
    require(
        &mut flags,
        &c.subscription_id,
        "--azure-subscription-id",
        "BBL_AZURE_SUBSCRIPTION_ID",
    );
    require(&mut flags, &c.tenant_id, "--azure-tenant-id", "BBL_AZURE_TENANT_ID");
    flags
}

fn vsphere(state: &State) -> Vec<RequiredFlag> {
    let c = &state.vsphere;
    let mut flags = Vec::new();
    require(
        &mut flags,
        &c.vcenter_user,
        "--vsphere-vcenter-user",
        "BBL_VSPHERE_VCENTER_USER",
    );
    require(
        &mut flags,
        &c.vcenter_password,
        "--vsphere-vcenter-password",
        "BBL_VSPHERE_VCENTER_PASSWORD",
    );
    require(&mut flags, &c.vcenter_ip, "--vsphere-vcenter-ip", "BBL_VSPHERE_VCENTER_IP");
    require(&mut flags, &c.vcenter_dc, "--vsphere-vcenter-dc", "BBL_VSPHERE_VCENTER_DC");
    require(
        &mut flags,
        &c.vcenter_cluster,
        "--vsphere-vcenter-cluster",
        "BBL_VSPHERE_VCENTER_CLUSTER",
    );
    require(&mut flags, &c.vcenter_rp, "--vsphere-vcenter-rp", "BBL_VSPHERE_VCENTER_RP");
    require(&mut flags, &c.network, "--vsphere-network", "BBL_VSPHERE_NETWORK");
    require(&mut flags, &c.vcenter_ds, "--vsphere-vcenter-ds", "BBL_VSPHERE_VCENTER_DS");
    if c.subnet_cidr.trim().is_empty() {
        flags.push(RequiredFlag::missing(
            "--vsphere-subnet-cidr",
            "BBL_VSPHERE_SUBNET_CIDR",
        ));
    } else if !is_ipv4_cidr(&c.subnet_cidr) {
        flags.push(RequiredFlag {
            flag: "--vsphere-subnet-cidr",
            env: "BBL_VSPHERE_SUBNET_CIDR",
            problem: Some(format!("{:?} is not a valid IPv4 CIDR", c.subnet_cidr)),
        });
    }
    flags
}

fn openstack(state: &State) -> Vec<RequiredFlag> {
    let c = &state.openstack;
    let mut flags = Vec::new();
    require(&mut flags, &c.auth_url, "--openstack-auth-url", "BBL_OPENSTACK_AUTH_URL");
    require(&mut flags, &c.az, "--openstack-az", "BBL_OPENSTACK_AZ");
    require(
        &mut flags,
        &c.network_id,
        "--openstack-network-id",
        "BBL_OPENSTACK_NETWORK_ID",
    );
    require(
        &mut flags,
        &c.network_name,
        "--openstack-network-name",
        "BBL_OPENSTACK_NETWORK_NAME",
    );
    require(&mut flags, &c.password, "--openstack-password", "BBL_OPENSTACK_PASSWORD");
    require(&mut flags, &c.username, "--openstack-username", "BBL_OPENSTACK_USERNAME");
    require(&mut flags, &c.project, "--openstack-project", "BBL_OPENSTACK_PROJECT");
    require(&mut flags, &c.domain, "--openstack-domain", "BBL_OPENSTACK_DOMAIN");
    require(
        &mut flags,
        &c.private_key,
        "--openstack-private-key",
        "BBL_OPENSTACK_PRIVATE_KEY",
    );
    flags
}

fn cloudstack(state: &State) -> Vec<RequiredFlag> {
    let c = &state.cloudstack;
    let mut flags = Vec::new();
    require(&mut flags, &c.endpoint, "--cloudstack-endpoint", "BBL_CLOUDSTACK_ENDPOINT");
    require(&mut flags, &c.api_key, "--cloudstack-api-key", "BBL_CLOUDSTACK_API_KEY");
    require(
        &mut flags,
        &c.secret_access_key,
        "--cloudstack-secret-access-key",
        "BBL_CLOUDSTACK_SECRET_ACCESS_KEY",
    );
    require(&mut flags, &c.zone, "--cloudstack-zone", "BBL_CLOUDSTACK_ZONE");
    flags
}

fn is_ipv4_cidr(value: &str) -> bool {
    match value.split_once('/') {
        Some((addr, prefix)) => {
            addr.parse::<Ipv4Addr>().is_ok() && prefix.parse::<u8>().is_ok_and(|p| p <= 32)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_iaas(iaas: Iaas) -> State {
        State {
            iaas: Some(iaas),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_iaas_lists_accepted_values() {
        let err = StateValidator::new().validate(&State::default()).unwrap_err();
        assert!(matches!(err, CoreError::MissingIaas));
        let message = err.to_string();
        for iaas in Iaas::ALL {
            assert!(message.contains(iaas.as_str()));
        }
        assert!(message.contains("BBL_IAAS"));
    }

    #[test]
    fn test_gcp_without_credentials_enumerates_both_flags() {
        let err = StateValidator::new()
            .validate(&with_iaas(Iaas::Gcp))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("--gcp-service-account-key"));
        assert!(message.contains("--gcp-region"));
        assert_eq!(message.lines().count(), 3);
    }

    #[test]
    fn test_complete_aws_state_passes() {
        let mut state = with_iaas(Iaas::Aws);
        state.aws.access_key_id = "k".to_string();
        state.aws.secret_access_key = "s".to_string();
        state.aws.region = "r".to_string();
        StateValidator::new().validate(&state).unwrap();
    }

    #[test]
    fn test_partial_azure_reports_only_missing() {
        let mut state = with_iaas(Iaas::Azure);
        state.azure.client_id = "id".to_string();
        state.azure.client_secret = "secret".to_string();
        state.azure.region = "westus".to_string();
        let err = StateValidator::new().validate(&state).unwrap_err();
        match err {
            CoreError::MissingFlags { iaas, flags } => {
                assert_eq!(iaas, Iaas::Azure);
                let names: Vec<_> = flags.iter().map(|f| f.flag).collect();
                assert_eq!(names, vec!["--azure-subscription-id", "--azure-tenant-id"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_vsphere_invalid_cidr_is_reported() {
        let mut state = with_iaas(Iaas::Vsphere);
        state.vsphere.subnet_cidr = "10.0.0.0/40".to_string();
        let message = StateValidator::new().validate(&state).unwrap_err().to_string();
        assert!(message.contains("\"10.0.0.0/40\" is not a valid IPv4 CIDR"));
        assert!(message.contains("--vsphere-vcenter-user"));
    }

    #[test]
    fn test_stray_provider_configuration_is_integrity_error() {
        let mut state = with_iaas(Iaas::Aws);
        state.aws.access_key_id = "k".to_string();
        state.gcp.region = "us-east1".to_string();
        let err = StateValidator::new().validate(&state).unwrap_err();
        assert!(matches!(err, CoreError::Integrity { .. }));
        assert!(err.to_string().contains("Hint:"));
    }

    #[test]
    fn test_director_without_infrastructure_is_integrity_error() {
        let mut state = with_iaas(Iaas::Aws);
        state.director_vm.address = "https://10.0.0.6:25555".to_string();
        let err = StateValidator::new().validate(&state).unwrap_err();
        assert!(err.to_string().contains("no infrastructure state"));
    }

    #[test]
    fn test_planned_director_name_without_infrastructure_is_valid() {
        let mut state = with_iaas(Iaas::Aws);
        state.aws.access_key_id = "k".to_string();
        state.aws.secret_access_key = "s".to_string();
        state.aws.region = "us-east-1".to_string();
        state.env_id = "env1".to_string();
        state.director_vm.name = "bosh-env1".to_string();
        StateValidator::new().validate(&state).unwrap();
    }
}
