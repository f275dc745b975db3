//! Configuration synchronization orchestration.
//!
//! Three operations compose the transport, codec and schema:
//!
//! - [`Synchronizer::fetch`] — read and decode the live configuration.
//! - [`Synchronizer::push`] — replace the live configuration with a
//!   backup-then-replace sequence and trigger a reload.
//! - [`load_from_file`] — decode a local snapshot with no remote
//!   dependency.
//!
//! A push walks an explicit state machine:
//!
//! ```text
//! Idle -> BackupTaken -> StagingUploaded -> LiveReplaced
//!      -> CacheInvalidated -> Reloaded
//! ```
//!
//! There is no rollback: the steps are independently-failing remote side
//! effects over a non-transactional shell. A failing step aborts with the
//! last completed step recorded in the error, so an operator can resume or
//! restore from the backup path by hand. If the reload step fails after
//! the live file was replaced, the device keeps running its cached old
//! configuration against the new on-disk file until the next reload.
//!
//! Every operation opens one session and closes it exactly once, on
//! success and on every failure path.

use std::fmt::{self, Display, Formatter};
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::codec::{self, SchemaError};
use crate::markup::MarkupError;
use crate::schema::ConfigDocument;
use crate::settings::RemotePaths;
use crate::transport::{Session, Transport, TransportError};

/// The last completed step of a push sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushStep {
    Idle,
    BackupTaken,
    StagingUploaded,
    LiveReplaced,
    CacheInvalidated,
    Reloaded,
}

impl Display for PushStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            PushStep::Idle => "idle",
            PushStep::BackupTaken => "backup_taken",
            PushStep::StagingUploaded => "staging_uploaded",
            PushStep::LiveReplaced => "live_replaced",
            PushStep::CacheInvalidated => "cache_invalidated",
            PushStep::Reloaded => "reloaded",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("fetch failed: {0}")]
    FetchFailed(#[source] FetchError),
    #[error("push aborted after step `{last_completed}`: {source}")]
    PushFailed {
        last_completed: PushStep,
        #[source]
        source: PushError,
    },
    #[error("failed to load configuration from {}: {source}", path.display())]
    LoadFailed {
        path: PathBuf,
        #[source]
        source: SchemaError,
    },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

#[derive(Debug, Error)]
pub enum PushError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Encode(#[from] MarkupError),
    #[error("failed to stage configuration locally: {0}")]
    Staging(#[from] std::io::Error),
}

/// Decode a configuration snapshot from local storage.
pub fn load_from_file(path: &Path) -> Result<ConfigDocument, SyncError> {
    codec::decode_file(path).map_err(|source| SyncError::LoadFailed {
        path: path.to_path_buf(),
        source,
    })
}

/// Orchestrates fetch and push against one device.
///
/// Operations are synchronous and hold one exclusive session each; nothing
/// here coordinates concurrent pushes against the same device. The
/// consistency model is last-writer-wins, with the backup copy as the only
/// (manual) recovery path.
pub struct Synchronizer<T: Transport> {
    transport: T,
    paths: RemotePaths,
}

impl<T: Transport> Synchronizer<T> {
    pub fn new(transport: T, paths: RemotePaths) -> Self {
        Self { transport, paths }
    }

    /// Fetch and decode the live configuration.
    pub fn fetch(&self) -> Result<ConfigDocument, SyncError> {
        let mut session = self
            .transport
            .open()
            .map_err(|err| SyncError::FetchFailed(err.into()))?;

        let result = self.read_live_config(&mut session);
        close_session(&mut session);
        result.map_err(SyncError::FetchFailed)
    }

    fn read_live_config(&self, session: &mut T::Session) -> Result<ConfigDocument, FetchError> {
        let stdout = session.run_command(&format!("cat {}", self.paths.config))?;
        Ok(codec::decode(&stdout)?)
    }

    /// Push a configuration to the device.
    ///
    /// Validation is the caller's responsibility; this pushes whatever it
    /// is given. The backup copy is best-effort: its failure is logged and
    /// the push continues, since the backup is a recovery aid rather than
    /// a precondition.
    pub fn push(&self, config: &ConfigDocument) -> Result<(), SyncError> {
        let mut session = self.transport.open().map_err(|err| SyncError::PushFailed {
            last_completed: PushStep::Idle,
            source: err.into(),
        })?;

        let result = self.run_push(&mut session, config);
        close_session(&mut session);

        match result {
            Ok(()) => {
                info!(config = %self.paths.config, "configuration pushed and reload triggered");
                Ok(())
            }
            Err((last_completed, source)) => {
                error!(
                    %last_completed,
                    backup = %self.paths.backup,
                    "push aborted; completed steps are not rolled back"
                );
                Err(SyncError::PushFailed {
                    last_completed,
                    source,
                })
            }
        }
    }

    fn run_push(
        &self,
        session: &mut T::Session,
        config: &ConfigDocument,
    ) -> Result<(), (PushStep, PushError)> {
        let paths = &self.paths;
        let mut last = PushStep::Idle;

        match session.run_command(&format!("cp {} {}", paths.config, paths.backup)) {
            Ok(_) => {
                debug!(backup = %paths.backup, "backup copy taken");
                last = PushStep::BackupTaken;
            }
            Err(err) => {
                warn!(error = %err, "backup copy failed; continuing without a fresh backup");
            }
        }

        let xml = codec::encode(config).map_err(|err| (last, err.into()))?;
        let mut staged = NamedTempFile::new().map_err(|err| (last, PushError::Staging(err)))?;
        staged
            .write_all(xml.as_bytes())
            .map_err(|err| (last, PushError::Staging(err)))?;
        staged
            .flush()
            .map_err(|err| (last, PushError::Staging(err)))?;

        session
            .upload_file(staged.path(), &paths.staging)
            .map_err(|err| (last, err.into()))?;
        last = PushStep::StagingUploaded;
        debug!(staging = %paths.staging, "new configuration uploaded");

        session
            .run_command(&format!("mv {} {}", paths.staging, paths.config))
            .map_err(|err| (last, err.into()))?;
        last = PushStep::LiveReplaced;

        // -f so a device without a cache artifact does not abort the push
        // after the live file was already replaced.
        session
            .run_command(&format!("rm -f {}", paths.cache))
            .map_err(|err| (last, err.into()))?;
        last = PushStep::CacheInvalidated;

        session
            .run_command(&paths.reload_command)
            .map_err(|err| (last, err.into()))?;
        debug!(step = %PushStep::Reloaded, "push sequence complete");
        Ok(())
    }
}

/// Best-effort close; a close failure after the work is done is logged,
/// not surfaced.
fn close_session(session: &mut impl Session) {
    if let Err(err) = session.close() {
        warn!(error = %err, "failed to close session cleanly");
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::path::Path;
    use std::rc::Rc;

    use super::{load_from_file, PushStep, SyncError, Synchronizer};
    use crate::settings::RemotePaths;
    use crate::transport::{Session, Transport, TransportError};

    const SAMPLE_XML: &str = r#"<pfsense>
        <system><hostname>edge-fw</hostname></system>
        <interfaces><lan><ipaddr>192.168.1.1</ipaddr><subnet>24</subnet></lan></interfaces>
        <dhcpd><lan><range><from>192.168.1.100</from><to>192.168.1.199</to></range></lan></dhcpd>
        <user><name>admin</name></user>
    </pfsense>"#;

    #[derive(Clone)]
    struct FakeTransport {
        log: Rc<RefCell<Vec<String>>>,
        fail_on: Option<String>,
        remote_config: String,
    }

    impl FakeTransport {
        fn new(remote_config: &str) -> Self {
            Self {
                log: Rc::new(RefCell::new(Vec::new())),
                fail_on: None,
                remote_config: remote_config.to_string(),
            }
        }

        fn failing_on(mut self, needle: &str) -> Self {
            self.fail_on = Some(needle.to_string());
            self
        }

        fn log(&self) -> Vec<String> {
            self.log.borrow().clone()
        }

        fn close_count(&self) -> usize {
            self.log.borrow().iter().filter(|l| *l == "close").count()
        }
    }

    struct FakeSession {
        log: Rc<RefCell<Vec<String>>>,
        fail_on: Option<String>,
        remote_config: String,
    }

    impl Transport for FakeTransport {
        type Session = FakeSession;

        fn open(&self) -> Result<FakeSession, TransportError> {
            Ok(FakeSession {
                log: Rc::clone(&self.log),
                fail_on: self.fail_on.clone(),
                remote_config: self.remote_config.clone(),
            })
        }
    }

    impl FakeSession {
        fn maybe_fail(&self, action: &str) -> Result<(), TransportError> {
            if let Some(needle) = &self.fail_on {
                if action.contains(needle.as_str()) {
                    return Err(TransportError::RemoteCommandFailed {
                        command: action.to_string(),
                        status: 1,
                        stderr: "injected failure".to_string(),
                    });
                }
            }
            Ok(())
        }
    }

    impl Session for FakeSession {
        fn run_command(&mut self, command: &str) -> Result<String, TransportError> {
            self.log.borrow_mut().push(format!("run {command}"));
            self.maybe_fail(command)?;
            if command.starts_with("cat ") {
                Ok(self.remote_config.clone())
            } else {
                Ok(String::new())
            }
        }

        fn upload_file(&mut self, _local: &Path, remote: &str) -> Result<(), TransportError> {
            self.log.borrow_mut().push(format!("upload {remote}"));
            self.maybe_fail(remote)?;
            Ok(())
        }

        fn close(&mut self) -> Result<(), TransportError> {
            self.log.borrow_mut().push("close".to_string());
            Ok(())
        }
    }

    fn synchronizer(transport: &FakeTransport) -> Synchronizer<FakeTransport> {
        Synchronizer::new(transport.clone(), RemotePaths::default())
    }

    #[test]
    fn fetch_decodes_the_remote_config() {
        let transport = FakeTransport::new(SAMPLE_XML);
        let doc = synchronizer(&transport).fetch().expect("fetch");

        assert_eq!(doc.system.hostname, "edge-fw");
        assert_eq!(doc.users.len(), 1);
        assert_eq!(
            transport.log(),
            vec!["run cat /cf/conf/config.xml".to_string(), "close".to_string()]
        );
    }

    #[test]
    fn fetch_closes_the_session_when_decode_fails() {
        let transport = FakeTransport::new("<pfsense><system>");
        let err = synchronizer(&transport).fetch().expect_err("should fail");

        assert!(matches!(err, SyncError::FetchFailed(_)));
        assert_eq!(transport.close_count(), 1);
    }

    #[test]
    fn push_runs_the_remote_steps_in_order() {
        let transport = FakeTransport::new(SAMPLE_XML);
        let doc = crate::codec::decode(SAMPLE_XML).expect("decode");

        synchronizer(&transport).push(&doc).expect("push");

        assert_eq!(
            transport.log(),
            vec![
                "run cp /cf/conf/config.xml /cf/conf/config.xml.bak".to_string(),
                "upload /tmp/config.xml.staged".to_string(),
                "run mv /tmp/config.xml.staged /cf/conf/config.xml".to_string(),
                "run rm -f /tmp/config.cache".to_string(),
                "run /etc/rc.reload_all".to_string(),
                "close".to_string(),
            ]
        );
    }

    #[test]
    fn reload_failure_reports_last_step_and_closes_once() {
        let transport = FakeTransport::new(SAMPLE_XML).failing_on("rc.reload_all");
        let doc = crate::codec::decode(SAMPLE_XML).expect("decode");

        let err = synchronizer(&transport).push(&doc).expect_err("should fail");

        match err {
            SyncError::PushFailed { last_completed, .. } => {
                assert_eq!(last_completed, PushStep::CacheInvalidated);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(transport.close_count(), 1);
    }

    #[test]
    fn backup_failure_is_tolerated() {
        let transport = FakeTransport::new(SAMPLE_XML).failing_on("cp /cf/conf");
        let doc = crate::codec::decode(SAMPLE_XML).expect("decode");

        synchronizer(&transport).push(&doc).expect("push");

        let log = transport.log();
        assert!(log.iter().any(|l| l.starts_with("run /etc/rc.reload_all")));
        assert_eq!(transport.close_count(), 1);
    }

    #[test]
    fn upload_failure_reports_backup_as_last_step() {
        let transport = FakeTransport::new(SAMPLE_XML).failing_on("config.xml.staged");
        let doc = crate::codec::decode(SAMPLE_XML).expect("decode");

        let err = synchronizer(&transport).push(&doc).expect_err("should fail");

        match err {
            SyncError::PushFailed { last_completed, .. } => {
                assert_eq!(last_completed, PushStep::BackupTaken);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(transport.close_count(), 1);
    }

    #[test]
    fn load_from_file_decodes_a_local_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.xml");
        std::fs::write(&path, SAMPLE_XML).expect("write");

        let doc = load_from_file(&path).expect("load");
        assert_eq!(doc.system.hostname, "edge-fw");
    }

    #[test]
    fn load_from_file_reports_the_path_on_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing.xml");

        let err = load_from_file(&path).expect_err("should fail");
        assert!(matches!(err, SyncError::LoadFailed { .. }));
    }
}
