use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use time::{macros::format_description, OffsetDateTime};
use tracing::{debug, info, warn};

use crate::config::PathsConfig;
use crate::executor::{CommandRunner, Invocation};

const MAX_SUFFIX: u32 = 100;

/// A finished configuration archive.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct BackupArchive {
    pub backup_file: PathBuf,
    /// Names of the source directories that were present and copied.
    pub included: Vec<String>,
}

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("failed to create staging directory {path}: {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to copy {path}: {stderr}")]
    Copy { path: PathBuf, stderr: String },

    #[error("Failed to create backup archive: {0}")]
    Archive(String),
}

/// `vpn-backup-YYYYmmdd-HHMMSS`
pub fn staging_dir_name(at: OffsetDateTime) -> String {
    let fmt = format_description!("[year][month][day]-[hour][minute][second]");
    let stamp = at
        .format(fmt)
        .unwrap_or_else(|_| String::from("19700101-000000"));
    format!("vpn-backup-{stamp}")
}

/// Create a staging directory no other backup is using. Backups started in
/// the same second get `-1`, `-2`, ... suffixes.
async fn claim_staging_dir(root: &Path, base: &str) -> Result<(PathBuf, String), BackupError> {
    tokio::fs::create_dir_all(root)
        .await
        .map_err(|source| BackupError::Staging {
            path: root.to_path_buf(),
            source,
        })?;

    for suffix in 0..=MAX_SUFFIX {
        let name = match suffix {
            0 => base.to_string(),
            n => format!("{base}-{n}"),
        };
        let staging = root.join(&name);
        if tokio::fs::try_exists(archive_path(&staging))
            .await
            .unwrap_or(false)
        {
            continue;
        }
        match tokio::fs::create_dir(&staging).await {
            Ok(()) => return Ok((staging, name)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(source) => {
                return Err(BackupError::Staging {
                    path: staging,
                    source,
                })
            }
        }
    }
    Err(BackupError::Staging {
        path: root.join(base),
        source: io::Error::from(io::ErrorKind::AlreadyExists),
    })
}

fn archive_path(staging: &Path) -> PathBuf {
    let mut archive: OsString = staging.as_os_str().to_owned();
    archive.push(".tar.gz");
    PathBuf::from(archive)
}

fn lossy(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Copy the configured source directories into a timestamped staging
/// directory, archive it as `<staging>.tar.gz` and remove the staging copy.
///
/// Source directories that do not exist are skipped. A copy that fails for a
/// directory that exists aborts the backup.
pub async fn create_backup(
    runner: &dyn CommandRunner,
    paths: &PathsConfig,
    at: OffsetDateTime,
) -> Result<BackupArchive, BackupError> {
    let base = staging_dir_name(at);
    let (staging, name) = claim_staging_dir(&paths.backup_staging_root, &base).await?;
    let result = stage_and_archive(runner, paths, &staging, &name).await;

    if let Err(e) = tokio::fs::remove_dir_all(&staging).await {
        warn!(path = %staging.display(), error = %e, "failed to remove backup staging directory");
    }
    result
}

async fn stage_and_archive(
    runner: &dyn CommandRunner,
    paths: &PathsConfig,
    staging: &Path,
    name: &str,
) -> Result<BackupArchive, BackupError> {
    let mut included = Vec::new();
    for (idx, source) in paths.backup_sources.iter().enumerate() {
        if !tokio::fs::try_exists(source).await.unwrap_or(false) {
            debug!(path = %source.display(), "backup source absent; skipping");
            continue;
        }
        let dir_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("source-{idx}"));
        let dest = staging.join(&dir_name);

        let res = runner
            .run(&Invocation::argv([
                "cp".to_string(),
                "-r".to_string(),
                lossy(source),
                lossy(&dest),
            ]))
            .await;
        if !res.succeeded {
            return Err(BackupError::Copy {
                path: source.clone(),
                stderr: res.stderr.trim().to_string(),
            });
        }
        included.push(dir_name);
    }

    let archive = archive_path(staging);

    let res = runner
        .run(&Invocation::argv([
            "tar".to_string(),
            "-czf".to_string(),
            lossy(&archive),
            "-C".to_string(),
            lossy(&paths.backup_staging_root),
            name.to_string(),
        ]))
        .await;
    if !res.succeeded {
        return Err(BackupError::Archive(res.stderr.trim().to_string()));
    }

    info!(archive = %archive.display(), ?included, "configuration backup created");
    Ok(BackupArchive {
        backup_file: archive,
        included,
    })
}
