//! SSH transport to the appliance.
//!
//! The orchestrator talks to the device through the [`Transport`] and
//! [`Session`] traits so tests can substitute a recording fake; the real
//! implementation wraps a blocking libssh2 session. Each orchestrator
//! operation opens exactly one session, runs a strictly sequential series
//! of commands and transfers, and closes the session on every exit path.
//!
//! Authentication is sequential: when a private key is configured it is
//! tried first, and the password is attempted only if key authentication
//! did not succeed. (The system this replaces re-authenticated with the
//! password unconditionally after key auth; key success short-circuits
//! here.) [`TransportError::AuthenticationFailed`] is raised only when no
//! configured method succeeded.

use std::io::Read;
use std::net::TcpStream;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, warn};

use crate::settings::DeviceSettings;

/// Transport-level failures, typed so callers never see a raw library
/// error.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No configured authentication method was accepted.
    #[error("authentication failed for {username}@{host}")]
    AuthenticationFailed { username: String, host: String },
    /// Network- or protocol-level failure.
    #[error("connection to {endpoint} failed: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },
    /// A remote command exited with a non-zero status. Whether that is
    /// fatal is the caller's decision.
    #[error("remote command `{command}` exited with status {status}: {stderr}")]
    RemoteCommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },
    /// A file transfer to the remote host failed.
    #[error("transfer to {remote} failed: {reason}")]
    TransferFailed { remote: String, reason: String },
}

/// An established remote shell + file-transfer channel.
pub trait Session {
    /// Run a command and return its stdout. A non-zero exit status is
    /// surfaced as [`TransportError::RemoteCommandFailed`] carrying the
    /// captured stderr.
    fn run_command(&mut self, command: &str) -> Result<String, TransportError>;

    /// Stream a local file to the remote path.
    fn upload_file(&mut self, local: &Path, remote: &str) -> Result<(), TransportError>;

    /// Release the underlying connection.
    fn close(&mut self) -> Result<(), TransportError>;
}

/// Something that can open an authenticated [`Session`].
pub trait Transport {
    type Session: Session;

    fn open(&self) -> Result<Self::Session, TransportError>;
}

/// SSH transport bound to one configured device.
pub struct SshTransport {
    device: DeviceSettings,
}

impl SshTransport {
    pub fn new(device: DeviceSettings) -> Self {
        Self { device }
    }
}

impl Transport for SshTransport {
    type Session = SshSession;

    fn open(&self) -> Result<SshSession, TransportError> {
        let endpoint = format!("{}:{}", self.device.host, self.device.port);
        debug!(%endpoint, "opening ssh session");

        let stream = TcpStream::connect(&endpoint).map_err(|err| {
            TransportError::ConnectionFailed {
                endpoint: endpoint.clone(),
                reason: err.to_string(),
            }
        })?;

        let mut session = ssh2::Session::new().map_err(|err| connection_failed(&endpoint, &err))?;
        session.set_tcp_stream(stream);
        session
            .handshake()
            .map_err(|err| connection_failed(&endpoint, &err))?;

        authenticate(&session, &self.device)?;
        debug!(%endpoint, username = %self.device.username, "ssh session established");

        Ok(SshSession { session, endpoint })
    }
}

/// One live SSH connection.
pub struct SshSession {
    session: ssh2::Session,
    endpoint: String,
}

impl Session for SshSession {
    fn run_command(&mut self, command: &str) -> Result<String, TransportError> {
        debug!(%command, "running remote command");
        let mut channel = self
            .session
            .channel_session()
            .map_err(|err| connection_failed(&self.endpoint, &err))?;
        channel
            .exec(command)
            .map_err(|err| connection_failed(&self.endpoint, &err))?;

        let mut stdout = String::new();
        channel
            .read_to_string(&mut stdout)
            .map_err(|err| connection_failed(&self.endpoint, &err))?;
        let mut stderr = String::new();
        channel
            .stderr()
            .read_to_string(&mut stderr)
            .map_err(|err| connection_failed(&self.endpoint, &err))?;

        channel
            .wait_close()
            .map_err(|err| connection_failed(&self.endpoint, &err))?;
        let status = channel
            .exit_status()
            .map_err(|err| connection_failed(&self.endpoint, &err))?;

        if status != 0 {
            return Err(TransportError::RemoteCommandFailed {
                command: command.to_string(),
                status,
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(stdout)
    }

    fn upload_file(&mut self, local: &Path, remote: &str) -> Result<(), TransportError> {
        debug!(local = %local.display(), %remote, "uploading file");
        let mut source =
            std::fs::File::open(local).map_err(|err| transfer_failed(remote, &err))?;
        let sftp = self
            .session
            .sftp()
            .map_err(|err| transfer_failed(remote, &err))?;
        let mut target = sftp
            .create(Path::new(remote))
            .map_err(|err| transfer_failed(remote, &err))?;
        std::io::copy(&mut source, &mut target).map_err(|err| transfer_failed(remote, &err))?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        debug!(endpoint = %self.endpoint, "closing ssh session");
        self.session
            .disconnect(None, "session closed", None)
            .map_err(|err| connection_failed(&self.endpoint, &err))
    }
}

fn authenticate(
    session: &ssh2::Session,
    device: &DeviceSettings,
) -> Result<(), TransportError> {
    if let Some(key_file) = &device.key_file {
        match session.userauth_pubkey_file(&device.username, None, key_file, None) {
            Ok(()) => {}
            Err(err) => {
                warn!(
                    key_file = %key_file.display(),
                    error = %err,
                    "key authentication failed, falling back to password"
                );
            }
        }
    }

    if !session.authenticated() {
        if let Some(password) = &device.password {
            if let Err(err) = session.userauth_password(&device.username, password) {
                debug!(error = %err, "password authentication failed");
            }
        }
    }

    if session.authenticated() {
        Ok(())
    } else {
        Err(TransportError::AuthenticationFailed {
            username: device.username.clone(),
            host: device.host.clone(),
        })
    }
}

fn connection_failed(endpoint: &str, err: &dyn std::fmt::Display) -> TransportError {
    TransportError::ConnectionFailed {
        endpoint: endpoint.to_string(),
        reason: err.to_string(),
    }
}

fn transfer_failed(remote: &str, err: &dyn std::fmt::Display) -> TransportError {
    TransportError::TransferFailed {
        remote: remote.to_string(),
        reason: err.to_string(),
    }
}
