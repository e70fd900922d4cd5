//! HTTP client for the director's `/info` endpoint
//!
//! The director listens on a private address. Requests go through the proxy
//! named by `BOSH_ALL_PROXY` when it is set. Otherwise, when the state records
//! a jumpbox and its key, each request opens an SSH dynamic forward to the
//! jumpbox and goes through its local SOCKS5 listener.

use crate::error::{CloudError, Result};
use crate::provider::{DirectorClient, DirectorClientFactory};
use async_trait::async_trait;
use bbl_bosh::variable;
use bbl_core::State;
use serde::Deserialize;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::process::{Child, Command};

pub const PROXY_ENV: &str = "BOSH_ALL_PROXY";
const TIMEOUT: Duration = Duration::from_secs(10);
const SSH_PROGRAM: &str = "ssh";
const JUMPBOX_USER: &str = "jumpbox";
const SSH_PORT: u16 = 22;
const TUNNEL_READY_TIMEOUT: Duration = Duration::from_secs(15);
const TUNNEL_POLL: Duration = Duration::from_millis(200);

/// Subset of the director's `/info` response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DirectorInfo {
    pub name: String,
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub version: String,
}

/// Where the jumpbox private key comes from
#[derive(Clone, PartialEq, Eq)]
pub enum KeySource {
    Path(PathBuf),
    Inline(String),
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            KeySource::Inline(_) => f.write_str("Inline(..)"),
        }
    }
}

/// SSH dynamic forward through the jumpbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTunnel {
    pub user: String,
    pub host: String,
    pub port: u16,
    pub key: KeySource,
}

/// How requests reach the director
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Direct,
    Proxy(String),
    Tunnel(SshTunnel),
}

impl Route {
    /// `proxy` is the `BOSH_ALL_PROXY` value; without one the state's
    /// jumpbox is used when its address and key are recorded
    pub fn for_state(state: &State, proxy: Option<&str>) -> Result<Self> {
        if let Some(proxy) = proxy {
            return Self::from_proxy(proxy);
        }
        match jumpbox_key(state) {
            Some(key) if !state.jumpbox.url.is_empty() => {
                let (host, port) = split_host_port(&state.jumpbox.url)?;
                Ok(Route::Tunnel(SshTunnel {
                    user: JUMPBOX_USER.to_string(),
                    host,
                    port,
                    key: KeySource::Inline(key),
                }))
            }
            _ => Ok(Route::Direct),
        }
    }

    /// Parse a `BOSH_ALL_PROXY` value. `ssh+socks5://user@host:port?private-key=<path>`
    /// names the jumpbox to tunnel through; other schemes are used as-is.
    pub fn from_proxy(proxy: &str) -> Result<Self> {
        let invalid = || {
            CloudError::InvalidConfig(format!("unsupported {} value {:?}", PROXY_ENV, proxy))
        };
        let (scheme, rest) = proxy.split_once("://").ok_or_else(invalid)?;
        if rest.is_empty() {
            return Err(invalid());
        }
        match scheme {
            "ssh+socks5" => {
                let (target, query) = rest.split_once('?').unwrap_or((rest, ""));
                let (user, address) = target.split_once('@').unwrap_or((JUMPBOX_USER, target));
                let key = query
                    .split('&')
                    .find_map(|pair| pair.strip_prefix("private-key="))
                    .filter(|key| !key.is_empty())
                    .ok_or_else(|| {
                        CloudError::InvalidConfig(format!(
                            "{} has no private-key: {:?}",
                            PROXY_ENV, proxy
                        ))
                    })?;
                let (host, port) = split_host_port(address)?;
                Ok(Route::Tunnel(SshTunnel {
                    user: user.to_string(),
                    host,
                    port,
                    key: KeySource::Path(PathBuf::from(key)),
                }))
            }
            "socks5" | "socks5h" | "http" | "https" => Ok(Route::Proxy(proxy.to_string())),
            _ => Err(invalid()),
        }
    }
}

/// The jumpbox SSH private key, from the key pair or the jumpbox vars-store
fn jumpbox_key(state: &State) -> Option<String> {
    if !state.key_pair.private_key.is_empty() {
        return Some(state.key_pair.private_key.clone());
    }
    variable(&state.jumpbox.variables, &["jumpbox_ssh", "private_key"])
}

fn split_host_port(address: &str) -> Result<(String, u16)> {
    let Some((host, port)) = address.rsplit_once(':') else {
        return Ok((address.to_string(), SSH_PORT));
    };
    let port = port
        .parse()
        .map_err(|_| CloudError::InvalidConfig(format!("invalid jumpbox address {:?}", address)))?;
    Ok((host.to_string(), port))
}

fn tunnel_error(e: std::io::Error) -> CloudError {
    CloudError::DirectorNotReachable(format!("ssh tunnel to the jumpbox: {}", e))
}

/// A running `ssh -D`; the process is killed when this is dropped
pub struct OpenTunnel {
    _child: Child,
    _key_file: Option<NamedTempFile>,
    proxy: String,
}

impl OpenTunnel {
    /// SOCKS5 URL of the local listener
    pub fn proxy(&self) -> &str {
        &self.proxy
    }
}

impl SshTunnel {
    fn args(&self, local_port: u16, key_path: &Path) -> Vec<String> {
        let mut args: Vec<String> = [
            "-N",
            "-o",
            "StrictHostKeyChecking=no",
            "-o",
            "UserKnownHostsFile=/dev/null",
            "-o",
            "ExitOnForwardFailure=yes",
            "-o",
            "BatchMode=yes",
        ]
        .iter()
        .map(|arg| arg.to_string())
        .collect();
        args.extend([
            "-D".to_string(),
            format!("127.0.0.1:{}", local_port),
            "-p".to_string(),
            self.port.to_string(),
            "-i".to_string(),
            key_path.to_string_lossy().into_owned(),
            format!("{}@{}", self.user, self.host),
        ]);
        args
    }

    pub async fn open(&self) -> Result<OpenTunnel> {
        self.open_with(SSH_PROGRAM).await
    }

    async fn open_with(&self, program: &str) -> Result<OpenTunnel> {
        let (key_file, key_path) = match &self.key {
            KeySource::Path(path) => (None, path.clone()),
            KeySource::Inline(key) => {
                // created with mode 0600
                let mut file = NamedTempFile::new().map_err(tunnel_error)?;
                file.write_all(key.as_bytes()).map_err(tunnel_error)?;
                if !key.ends_with('\n') {
                    file.write_all(b"\n").map_err(tunnel_error)?;
                }
                file.flush().map_err(tunnel_error)?;
                let path = file.path().to_path_buf();
                (Some(file), path)
            }
        };

        let local_port = std::net::TcpListener::bind(("127.0.0.1", 0))
            .and_then(|listener| listener.local_addr())
            .map_err(tunnel_error)?
            .port();
        tracing::debug!(jumpbox = %self.host, local_port, "Opening SSH tunnel");

        let mut child = Command::new(program)
            .args(self.args(local_port, &key_path))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                CloudError::DirectorNotReachable(format!("failed to start {}: {}", program, e))
            })?;
        wait_for_listener(&mut child, local_port).await?;

        Ok(OpenTunnel {
            _child: child,
            _key_file: key_file,
            proxy: format!("socks5h://127.0.0.1:{}", local_port),
        })
    }
}

async fn wait_for_listener(child: &mut Child, port: u16) -> Result<()> {
    let deadline = tokio::time::Instant::now() + TUNNEL_READY_TIMEOUT;
    loop {
        if let Some(status) = child.try_wait().map_err(tunnel_error)? {
            return Err(CloudError::DirectorNotReachable(format!(
                "ssh tunnel to the jumpbox exited with {}",
                status
            )));
        }
        if tokio::net::TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(CloudError::DirectorNotReachable(
                "timed out waiting for the ssh tunnel to the jumpbox".to_string(),
            ));
        }
        tokio::time::sleep(TUNNEL_POLL).await;
    }
}

pub struct HttpDirectorClient {
    address: String,
    ca_cert: Option<reqwest::Certificate>,
    route: Route,
}

impl HttpDirectorClient {
    pub fn new(address: &str, ca_cert: &str, route: Route) -> Result<Self> {
        let ca_cert = if ca_cert.is_empty() {
            None
        } else {
            Some(
                reqwest::Certificate::from_pem(ca_cert.as_bytes())
                    .map_err(|e| CloudError::InvalidConfig(format!("director CA cert: {}", e)))?,
            )
        };
        Ok(Self {
            address: address.trim_end_matches('/').to_string(),
            ca_cert,
            route,
        })
    }

    fn http(&self, proxy: Option<&str>) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder().timeout(TIMEOUT);
        if let Some(cert) = &self.ca_cert {
            builder = builder.add_root_certificate(cert.clone());
        }
        if let Some(proxy) = proxy {
            tracing::debug!(proxy = %proxy, "Routing director requests through proxy");
            builder = builder.proxy(
                reqwest::Proxy::all(proxy)
                    .map_err(|e| CloudError::InvalidConfig(format!("{}: {}", PROXY_ENV, e)))?,
            );
        }
        Ok(builder.build()?)
    }

    async fn fetch(&self, client: reqwest::Client) -> Result<DirectorInfo> {
        let url = format!("{}/info", self.address);
        tracing::debug!(url = %url, "Querying director");

        let response = client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(CloudError::ApiError(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl DirectorClient for HttpDirectorClient {
    async fn info(&self) -> Result<DirectorInfo> {
        match &self.route {
            Route::Direct => self.fetch(self.http(None)?).await,
            Route::Proxy(proxy) => self.fetch(self.http(Some(proxy))?).await,
            Route::Tunnel(tunnel) => {
                let open = tunnel.open().await?;
                self.fetch(self.http(Some(open.proxy()))?).await
            }
        }
    }
}

/// Factory building [`HttpDirectorClient`]s from the recorded director
#[derive(Debug, Clone, Default)]
pub struct HttpDirectorClientFactory {
    proxy: Option<String>,
}

impl HttpDirectorClientFactory {
    pub fn new(proxy: Option<String>) -> Self {
        Self { proxy }
    }

    pub fn from_env() -> Self {
        Self::new(std::env::var(PROXY_ENV).ok().filter(|p| !p.is_empty()))
    }
}

impl DirectorClientFactory for HttpDirectorClientFactory {
    fn client(&self, state: &State) -> Result<Box<dyn DirectorClient>> {
        if state.director_vm.address.is_empty() {
            return Err(CloudError::DirectorNotReachable(
                "no director address is recorded".to_string(),
            ));
        }
        let route = Route::for_state(state, self.proxy.as_deref())?;
        let client = HttpDirectorClient::new(
            &state.director_vm.address,
            &state.director_vm.ca_cert,
            route,
        )?;
        Ok(Box::new(client))
    }
}
