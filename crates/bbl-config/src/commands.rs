//! Subcommand table shared by the loader and the router

/// Static description of a subcommand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandInfo {
    pub name: &'static str,
    /// The router persists the handler's state after running it
    pub modifies_state: bool,
    /// Help and version run without touching the state directory
    pub needs_state: bool,
    pub summary: &'static str,
}

const fn mutating(name: &'static str, summary: &'static str) -> CommandInfo {
    CommandInfo {
        name,
        modifies_state: true,
        needs_state: true,
        summary,
    }
}

const fn query(name: &'static str, summary: &'static str) -> CommandInfo {
    CommandInfo {
        name,
        modifies_state: false,
        needs_state: true,
        summary,
    }
}

pub const COMMANDS: &[CommandInfo] = &[
    mutating("up", "Deploys BOSH director on an IAAS, creates a jumpbox"),
    mutating("down", "Tears down BOSH director infrastructure"),
    mutating("destroy", "Alias for down"),
    mutating("plan", "Populates a state directory with the latest config without applying it"),
    mutating("leftovers", "Alias for cleanup-leftovers"),
    mutating("cleanup-leftovers", "Cleans up orphaned IAAS resources"),
    mutating("rotate", "Rotates the jumpbox SSH key"),
    CommandInfo {
        name: "help",
        modifies_state: false,
        needs_state: false,
        summary: "Prints usage",
    },
    CommandInfo {
        name: "version",
        modifies_state: false,
        needs_state: false,
        summary: "Prints version",
    },
    query("lbs", "Prints attached load balancer(s)"),
    query("outputs", "Prints the outputs of the infrastructure engine"),
    query("jumpbox-address", "Prints address of the jumpbox"),
    query("director-address", "Prints BOSH director address"),
    query("director-username", "Prints BOSH director username"),
    query("director-password", "Prints BOSH director password"),
    query("director-ca-cert", "Prints BOSH director CA certificate"),
    query("ssh-key", "Prints jumpbox SSH private key"),
    query("env-id", "Prints environment ID"),
    query("print-env", "Prints required BOSH environment variables"),
    query("latest-error", "Prints the output from the latest infrastructure engine call"),
];

pub fn lookup(name: &str) -> Option<&'static CommandInfo> {
    COMMANDS.iter().find(|c| c.name == name)
}

/// Unknown commands never modify state
pub fn modifies_state(name: &str) -> bool {
    lookup(name).is_some_and(|c| c.modifies_state)
}

/// Commands that remove an environment and must tolerate a missing one
pub fn tears_down(name: &str) -> bool {
    matches!(name, "down" | "destroy")
}
