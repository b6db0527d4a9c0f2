//! Document to PDF conversion through a headless LibreOffice.

use mailmerge_core::{ConversionSession, Error, PageConverter, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

#[cfg(windows)]
const DEFAULT_PROGRAM: &str = "soffice.exe";
#[cfg(not(windows))]
const DEFAULT_PROGRAM: &str = "soffice";

const PROFILE_PREFIX: &str = "mailmerge-soffice-";

/// Converts documents with LibreOffice's `--convert-to pdf`.
#[derive(Debug, Clone)]
pub struct SofficeConverter {
    program: PathBuf,
}

impl SofficeConverter {
    /// Use `soffice` from `PATH`.
    pub fn new() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
        }
    }

    /// Use a specific LibreOffice executable.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// The executable that will be run.
    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Default for SofficeConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl PageConverter for SofficeConverter {
    type Session = SofficeSession;

    /// Check the executable starts and set up a private user profile, so a
    /// batch never attaches to an office instance the user has open.
    fn open(&self) -> Result<SofficeSession> {
        let status = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| {
                Error::ConverterUnavailable(format!("{}: {}", self.program.display(), e))
            })?;
        if !status.success() {
            return Err(Error::ConverterUnavailable(format!(
                "{} --version exited with {}",
                self.program.display(),
                status
            )));
        }

        let profile = tempfile::Builder::new()
            .prefix(PROFILE_PREFIX)
            .tempdir()
            .map_err(|e| Error::ConverterUnavailable(format!("no profile directory: {}", e)))?;
        log::debug!(
            "Opened converter session with profile {}",
            profile.path().display()
        );

        Ok(SofficeSession {
            program: self.program.clone(),
            profile,
        })
    }
}

/// An open LibreOffice converter. Dropping it removes its profile directory.
#[derive(Debug)]
pub struct SofficeSession {
    program: PathBuf,
    profile: TempDir,
}

impl SofficeSession {
    fn profile_arg(&self) -> OsString {
        let mut arg = OsString::from("-env:UserInstallation=");
        arg.push(profile_url(self.profile.path()));
        arg
    }
}

impl ConversionSession for SofficeSession {
    fn convert(&mut self, source: &Path, target: &Path) -> Result<()> {
        let conversion_error = |reason: String| Error::Conversion {
            path: source.to_path_buf(),
            reason,
        };

        let out_dir = match target.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let stem = source
            .file_stem()
            .ok_or_else(|| conversion_error("source has no file name".to_string()))?;
        let mut produced_name = stem.to_os_string();
        produced_name.push(".pdf");
        let produced = out_dir.join(produced_name);

        if target.exists() {
            fs::remove_file(target)
                .map_err(|e| conversion_error(format!("cannot replace existing output: {}", e)))?;
        }

        log::debug!(
            "Running {} --convert-to pdf --outdir {} {}",
            self.program.display(),
            out_dir.display(),
            source.display()
        );
        let output = Command::new(&self.program)
            .arg(self.profile_arg())
            .arg("--headless")
            .arg("--norestore")
            .args(["--convert-to", "pdf", "--outdir"])
            .arg(&out_dir)
            .arg(source)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| conversion_error(format!("failed to run converter: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(conversion_error(format!(
                "converter exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        if produced != target && produced.exists() {
            fs::rename(&produced, target)
                .map_err(|e| conversion_error(format!("cannot move output: {}", e)))?;
        }
        if !target.exists() {
            return Err(conversion_error(format!(
                "converter produced no {}",
                target.display()
            )));
        }

        Ok(())
    }
}

impl Drop for SofficeSession {
    fn drop(&mut self) {
        log::debug!(
            "Released converter session {}",
            self.profile.path().display()
        );
    }
}

/// `file://` URL of a local directory, as LibreOffice expects for
/// `-env:UserInstallation`.
fn profile_url(dir: &Path) -> String {
    let path = dir.to_string_lossy().replace('\\', "/");
    let mut url = String::from("file://");
    if !path.starts_with('/') {
        url.push('/');
    }
    for c in path.chars() {
        match c {
            ' ' => url.push_str("%20"),
            '%' => url.push_str("%25"),
            '#' => url.push_str("%23"),
            _ => url.push(c),
        }
    }
    url
}
