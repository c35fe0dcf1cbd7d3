//! Source-spec diff report.
//!
//! Downloads the published source spec, compares it with the local copy
//! using `openapi-changes html-report`, and optionally opens the result.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::command;
use crate::config::DiffConfig;
use crate::error::{Error, Result};

/// Default report file name inside the temporary directory.
pub const REPORT_FILE_NAME: &str = "changes-report.html";

/// Options of one diff run.
#[derive(Debug, Clone, Default)]
pub struct DiffOptions {
    /// Where to write the HTML report; a fresh temporary directory when unset.
    pub report_file: Option<PathBuf>,
    /// Open the report with the system `open` command afterwards.
    pub open: bool,
}

/// Files produced by a diff run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffReport {
    /// Downloaded copy of the remote spec.
    pub remote_copy: PathBuf,
    /// Generated HTML report.
    pub report_file: PathBuf,
    /// Whether the report was opened.
    pub opened: bool,
}

/// Fetch `url` and return the body.
///
/// # Errors
///
/// Returns [`Error::Http`] on transport failure and [`Error::Download`] on a
/// non-success status.
pub async fn download(url: &str) -> Result<String> {
    let response = reqwest::get(url).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::Download {
            url: url.to_string(),
            status,
        });
    }
    Ok(response.text().await?)
}

fn download_blocking(url: &str) -> Result<String> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(download(url))
}

/// `openapi-changes html-report` arguments comparing `remote` with `local`.
fn report_args<'a>(remote: &'a str, local: &'a str, report: &'a str) -> [&'a str; 6] {
    ["html-report", "--no-logo", remote, local, "--report-file", report]
}

/// Download the remote spec, generate the HTML report, optionally open it.
///
/// A failure to open the report is logged and reported through
/// [`DiffReport::opened`]; every other failure is fatal.
///
/// # Errors
///
/// Returns an error if the download fails, a file cannot be written, or
/// `openapi-changes` is missing or fails.
pub fn generate_report(config: &DiffConfig, options: &DiffOptions) -> Result<DiffReport> {
    let work_dir = tempfile::Builder::new()
        .prefix("changes-report-")
        .tempdir()?
        .keep();
    let report_file = options
        .report_file
        .clone()
        .unwrap_or_else(|| work_dir.join(REPORT_FILE_NAME));
    if let Some(parent) = report_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    debug!(url = %config.remote_url, "downloading remote spec");
    let content = download_blocking(&config.remote_url)?;
    let remote_copy = work_dir.join(remote_file_name(&config.remote_url));
    std::fs::write(&remote_copy, content)?;

    let remote = remote_copy.to_string_lossy();
    let report = report_file.to_string_lossy();
    command::forward(
        "openapi-changes",
        &report_args(&remote, &config.local_file, &report),
    )?;

    let opened = options.open && open_report(&report_file);
    Ok(DiffReport {
        remote_copy,
        report_file,
        opened,
    })
}

fn open_report(report_file: &Path) -> bool {
    match command::capture("open", &[&report_file.to_string_lossy()]) {
        Ok(_) => true,
        Err(e) => {
            warn!(report = %report_file.display(), error = %e, "could not open report");
            false
        }
    }
}

/// Last path segment of `url`, or `source.yaml`.
fn remote_file_name(url: &str) -> &str {
    url.split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .unwrap_or("source.yaml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn remote_file_name_from_url() {
        assert_eq!(
            remote_file_name("https://gleanwork.github.io/open-api/specs/source/client_rest.yaml"),
            "client_rest.yaml"
        );
        assert_eq!(remote_file_name("https://example.com/spec.yaml?v=2"), "spec.yaml");
        assert_eq!(remote_file_name("https://example.com/"), "source.yaml");
    }

    #[test]
    fn report_command_line() {
        assert_eq!(
            report_args("/tmp/x/client_rest.yaml", "source_specs/client_rest.yaml", "/tmp/x/r.html"),
            [
                "html-report",
                "--no-logo",
                "/tmp/x/client_rest.yaml",
                "source_specs/client_rest.yaml",
                "--report-file",
                "/tmp/x/r.html",
            ]
        );
    }

    #[test]
    fn unreachable_host_is_an_http_error() {
        let err = download_blocking("http://127.0.0.1:9/spec.yaml").unwrap_err();
        assert!(matches!(err, Error::Http(_)));
    }
}
