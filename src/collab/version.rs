use std::{
    fs::{self, File},
    io::{self, Read},
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::{VersionId, VersionSource};
use crate::app::Logger;
use crate::guard::{ErrorSignal, Fault, FaultKind};

/// Release manifest published next to the installer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub url: String,
    pub sha256: String,
}

impl Manifest {
    pub fn parse(raw: &str) -> crate::Result<Self> {
        let manifest: Manifest = serde_json::from_str(raw)?;
        if manifest.version.trim().is_empty() {
            return Err(crate::Error::Parse("manifest version is empty".into()));
        }
        if manifest.sha256.len() != 64 || hex::decode(&manifest.sha256).is_err() {
            return Err(crate::Error::Parse(
                "manifest sha256 must be 64 hex digits".into(),
            ));
        }
        Ok(manifest)
    }
}

/// Release channel reached over HTTP(S).
pub struct HttpVersionSource {
    manifest_url: String,
    client: reqwest::blocking::Client,
    manifest: Option<Manifest>,
    logger: Logger,
}

impl HttpVersionSource {
    pub fn new(manifest_url: impl Into<String>, timeout: Duration, logger: Logger) -> crate::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("fuelboard/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            manifest_url: manifest_url.into(),
            client,
            manifest: None,
            logger,
        })
    }

    fn fetch_manifest(&self) -> crate::Result<Manifest> {
        let body = self
            .client
            .get(&self.manifest_url)
            .send()?
            .error_for_status()?
            .text()?;
        Manifest::parse(&body)
    }

    fn fetch_installer(&self, url: &str, target: &Path) -> crate::Result<()> {
        let mut response = self.client.get(url).send()?.error_for_status()?;
        let partial = partial_path(target);
        let mut file = File::create(&partial)?;
        io::copy(&mut response, &mut file)?;
        file.sync_all()?;
        drop(file);
        make_executable(&partial)?;
        fs::rename(&partial, target)?;
        Ok(())
    }
}

fn partial_path(target: &Path) -> PathBuf {
    let mut raw = target.as_os_str().to_owned();
    raw.push(".part");
    PathBuf::from(raw)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Hex SHA-256 of a file, read in chunks.
pub fn sha256_hex(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

impl VersionSource for HttpVersionSource {
    fn current_version(&self) -> VersionId {
        VersionId::new(env!("CARGO_PKG_VERSION"))
    }

    fn latest_version(&mut self) -> Result<VersionId, Fault> {
        let manifest = self.fetch_manifest().map_err(|err| {
            self.logger.warn(format!("manifest fetch failed: {err}"));
            Fault::new(
                FaultKind::UpdateCheck,
                [
                    "Could not check for updates.".to_string(),
                    format!("{err}"),
                ],
            )
        })?;
        let version = VersionId::new(manifest.version.clone());
        self.manifest = Some(manifest);
        Ok(version)
    }

    fn download(&mut self, target: &Path) -> ErrorSignal {
        let Some(manifest) = self.manifest.as_ref() else {
            return Err(Fault::with_message(
                FaultKind::UpdateDownload,
                "Download failed: no release manifest loaded",
            ));
        };
        self.fetch_installer(&manifest.url, target).map_err(|err| {
            let _ = fs::remove_file(partial_path(target));
            Fault::with_message(FaultKind::UpdateDownload, format!("Download failed: {err}"))
        })
    }

    fn verify(&mut self, target: &Path) -> ErrorSignal {
        let Some(manifest) = self.manifest.as_ref() else {
            return Err(Fault::with_message(
                FaultKind::UpdateVerify,
                "Verification failed: no release manifest loaded",
            ));
        };
        let actual = sha256_hex(target).map_err(|err| {
            Fault::with_message(FaultKind::UpdateVerify, format!("Verification failed: {err}"))
        })?;
        if actual.eq_ignore_ascii_case(manifest.sha256.trim()) {
            self.logger.info(format!("installer checksum {actual} matches"));
            return Ok(());
        }
        self.logger.warn(format!(
            "installer checksum mismatch: expected {}, got {actual}",
            manifest.sha256
        ));
        let _ = fs::remove_file(target);
        Err(Fault::new(
            FaultKind::UpdateVerify,
            [
                "The downloaded update is corrupt.".to_string(),
                "Checksum mismatch, nothing was installed.".to_string(),
            ],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::LogLevel;

    const EMPTY_SHA: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    fn source() -> HttpVersionSource {
        HttpVersionSource::new(
            "http://127.0.0.1:9/manifest.json",
            Duration::from_millis(200),
            Logger::stderr(LogLevel::Error),
        )
        .unwrap()
    }

    #[test]
    fn manifest_requires_hex_digest() {
        let ok = format!(r#"{{"version":"1.2.0","url":"http://x/i","sha256":"{EMPTY_SHA}"}}"#);
        assert_eq!(Manifest::parse(&ok).unwrap().version, "1.2.0");
        let bad = r#"{"version":"1.2.0","url":"http://x/i","sha256":"abc"}"#;
        assert!(Manifest::parse(bad).is_err());
    }

    #[test]
    fn hashes_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty");
        fs::write(&path, b"").unwrap();
        assert_eq!(sha256_hex(&path).unwrap(), EMPTY_SHA);
    }

    #[test]
    fn verify_rejects_mismatch_and_removes_download() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("fuelboard-updater");
        fs::write(&target, b"tampered").unwrap();

        let mut source = source();
        source.manifest = Some(Manifest {
            version: "9.9.9".into(),
            url: "http://127.0.0.1:9/installer".into(),
            sha256: EMPTY_SHA.into(),
        });
        let fault = source.verify(&target).unwrap_err();
        assert_eq!(fault.kind(), FaultKind::UpdateVerify);
        assert!(!target.exists());
    }

    #[test]
    fn download_without_manifest_faults() {
        let dir = tempfile::tempdir().unwrap();
        let fault = source().download(&dir.path().join("x")).unwrap_err();
        assert_eq!(fault.kind(), FaultKind::UpdateDownload);
    }

    #[test]
    fn current_version_is_crate_version() {
        assert_eq!(source().current_version().as_str(), env!("CARGO_PKG_VERSION"));
    }
}
