//! Release-sync checker.
//!
//! Every client SDK repository embeds the merged spec it was generated from,
//! stamped with the commits of the source spec and of this repository. The
//! checker reads those stamps at each repository's latest release and reports
//! whether all clients were generated from the same pair of commits.

use std::collections::BTreeMap;
use std::fmt;

use base64::Engine as _;
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use serde_yaml_ng::Value;
use tracing::{debug, warn};

use openapi_transform_core::{scalar_text, ValueExt};

use crate::command;
use crate::config::ReleaseConfig;
use crate::error::{Error, Result};

/// Latest published release of a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    /// Release tag (`v0.9.3`).
    pub tag: String,
    /// Release page URL.
    pub url: String,
    /// Publish timestamp, when reported and well-formed.
    pub published_at: Option<DateTime<FixedOffset>>,
}

/// Commit stamps found in a released spec.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Provenance {
    /// Source spec commit.
    pub source_sha: Option<String>,
    /// Transform repository commit.
    pub open_api_sha: Option<String>,
}

impl Provenance {
    /// Both stamps, when both are present.
    #[must_use]
    pub fn complete(&self) -> Option<(&str, &str)> {
        Some((self.source_sha.as_deref()?, self.open_api_sha.as_deref()?))
    }

    /// Read the stamps from a spec document's `info` block.
    ///
    /// Returns `None` when the document has no `info` mapping.
    #[must_use]
    pub fn from_document(doc: &Value, source_sha_key: &str, open_api_sha_key: &str) -> Option<Self> {
        let info = doc.mapping("info")?;
        Some(Self {
            source_sha: info.field(source_sha_key).and_then(scalar_text),
            open_api_sha: info.field(open_api_sha_key).and_then(scalar_text),
        })
    }
}

/// Where release metadata comes from.
pub trait ReleaseSource {
    /// Latest release of `repo` (`owner/name`), `None` if it has none.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata cannot be queried.
    fn latest_release(&self, repo: &str) -> Result<Option<Release>>;

    /// Commit stamps of the spec embedded at `tag`, `None` if the file is
    /// missing or unreadable.
    ///
    /// # Errors
    ///
    /// Returns an error if the query itself fails.
    fn provenance_at(&self, repo: &str, tag: &str) -> Result<Option<Provenance>>;
}

/// [`ReleaseSource`] backed by the GitHub CLI (`gh`).
#[derive(Debug, Clone)]
pub struct GhCli {
    spec_path: String,
    source_sha_key: String,
    open_api_sha_key: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhRelease {
    tag_name: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    published_at: Option<String>,
}

impl GhCli {
    /// Source reading the configured spec path and stamp keys.
    #[must_use]
    pub fn new(config: &ReleaseConfig) -> Self {
        Self {
            spec_path: config.spec_path.clone(),
            source_sha_key: config.source_sha_key.clone(),
            open_api_sha_key: config.open_api_sha_key.clone(),
        }
    }

    /// Parse `gh release view --json tagName,url,publishedAt` output.
    fn parse_release(repo: &str, stdout: &str) -> Result<Release> {
        let raw: GhRelease = serde_json::from_str(stdout).map_err(|e| Error::ReleaseMetadata {
            repo: repo.to_string(),
            message: e.to_string(),
        })?;
        Ok(Release {
            tag: raw.tag_name,
            url: raw.url,
            published_at: raw
                .published_at
                .as_deref()
                .and_then(|t| DateTime::parse_from_rfc3339(t).ok()),
        })
    }

    /// Decode base64 file content and read the stamps.
    fn parse_content(&self, repo: &str, stdout: &str) -> Option<Provenance> {
        let encoded: String = stdout.split_whitespace().collect();
        let bytes = match base64::engine::general_purpose::STANDARD.decode(encoded) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(repo, error = %e, "released spec is not valid base64");
                return None;
            }
        };
        let doc: Value = match serde_yaml_ng::from_slice(&bytes) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(repo, error = %e, "released spec is not valid YAML");
                return None;
            }
        };
        Provenance::from_document(&doc, &self.source_sha_key, &self.open_api_sha_key)
    }
}

impl ReleaseSource for GhCli {
    fn latest_release(&self, repo: &str) -> Result<Option<Release>> {
        let stdout = match command::capture(
            "gh",
            &["release", "view", "--repo", repo, "--json", "tagName,url,publishedAt"],
        ) {
            Ok(stdout) => stdout,
            Err(e) if e.command_stderr_contains("release not found") => return Ok(None),
            Err(e) => return Err(e),
        };
        Self::parse_release(repo, &stdout).map(Some)
    }

    fn provenance_at(&self, repo: &str, tag: &str) -> Result<Option<Provenance>> {
        let endpoint = format!("repos/{repo}/contents/{}?ref={tag}", self.spec_path);
        match command::capture("gh", &["api", &endpoint, "--jq", ".content"]) {
            Ok(stdout) => Ok(self.parse_content(repo, &stdout)),
            Err(e) if e.command_stderr_contains("Not Found") => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// What was found for one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoState {
    /// The repository has no release.
    NoRelease,
    /// The release has no readable spec (or the spec has no `info`).
    MissingSpec(Release),
    /// The release's spec was read.
    Found(Release, Provenance),
    /// A query failed.
    Failed(String),
}

/// Result of checking one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoStatus {
    /// Repository (`owner/name`).
    pub repo: String,
    /// What was found.
    pub state: RepoState,
}

impl RepoStatus {
    /// Release and both stamps, when everything needed for comparison exists.
    #[must_use]
    pub fn stamps(&self) -> Option<(&Release, &str, &str)> {
        match &self.state {
            RepoState::Found(release, provenance) => {
                let (source, open_api) = provenance.complete()?;
                Some((release, source, open_api))
            }
            _ => None,
        }
    }
}

/// Query every repository in turn.
///
/// A failing repository is recorded as [`RepoState::Failed`] and the rest are
/// still checked.
pub fn collect(source: &dyn ReleaseSource, repos: &[String]) -> Vec<RepoStatus> {
    repos
        .iter()
        .map(|repo| {
            let state = check_repo(source, repo).unwrap_or_else(|e| {
                warn!(repo = %repo, error = %e, "release query failed");
                RepoState::Failed(e.to_string())
            });
            debug!(repo = %repo, ?state, "checked repository");
            RepoStatus {
                repo: repo.clone(),
                state,
            }
        })
        .collect()
}

fn check_repo(source: &dyn ReleaseSource, repo: &str) -> Result<RepoState> {
    let Some(release) = source.latest_release(repo)? else {
        return Ok(RepoState::NoRelease);
    };
    Ok(match source.provenance_at(repo, &release.tag)? {
        Some(provenance) => RepoState::Found(release, provenance),
        None => RepoState::MissingSpec(release),
    })
}

/// Repositories sharing one stamp value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaGroup {
    /// Stamp value.
    pub sha: String,
    /// Repositories in input order.
    pub repos: Vec<String>,
}

/// Group `(repo, sha)` pairs by sha, sorted by sha.
pub fn group_by_sha<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Vec<ShaGroup> {
    let mut groups: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for (repo, sha) in pairs {
        groups.entry(sha).or_default().push(repo.to_string());
    }
    groups
        .into_iter()
        .map(|(sha, repos)| ShaGroup {
            sha: sha.to_string(),
            repos,
        })
        .collect()
}

/// Overall verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Every repository has a release stamped with the same two commits.
    InSync {
        /// Shared source spec commit.
        source_sha: String,
        /// Shared transform repository commit.
        open_api_sha: String,
    },
    /// Every repository was read but the stamps disagree.
    Mismatch {
        /// Repositories grouped by source spec commit.
        source_groups: Vec<ShaGroup>,
        /// Repositories grouped by transform repository commit.
        open_api_groups: Vec<ShaGroup>,
    },
    /// At least one repository could not be compared.
    Incomplete,
}

/// Verdict plus the per-repository details it was computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Per-repository results, in input order.
    pub statuses: Vec<RepoStatus>,
    /// Verdict.
    pub outcome: SyncOutcome,
}

impl SyncReport {
    /// Whether the process should exit successfully.
    #[must_use]
    pub fn is_in_sync(&self) -> bool {
        matches!(self.outcome, SyncOutcome::InSync { .. })
    }
}

/// Compare the stamps of all repositories.
#[must_use]
pub fn evaluate(statuses: &[RepoStatus]) -> SyncReport {
    let stamped: Vec<_> = statuses
        .iter()
        .filter_map(|s| s.stamps().map(|(_, source, open_api)| (s.repo.as_str(), source, open_api)))
        .collect();

    let outcome = match stamped.first() {
        Some(_) if stamped.len() < statuses.len() => SyncOutcome::Incomplete,
        None => SyncOutcome::Incomplete,
        Some(&(_, source, open_api)) => {
            if stamped.iter().all(|&(_, s, o)| s == source && o == open_api) {
                SyncOutcome::InSync {
                    source_sha: source.to_string(),
                    open_api_sha: open_api.to_string(),
                }
            } else {
                SyncOutcome::Mismatch {
                    source_groups: group_by_sha(stamped.iter().map(|&(repo, s, _)| (repo, s))),
                    open_api_groups: group_by_sha(stamped.iter().map(|&(repo, _, o)| (repo, o))),
                }
            }
        }
    };

    SyncReport {
        statuses: statuses.to_vec(),
        outcome,
    }
}

/// Check every configured repository.
pub fn check(source: &dyn ReleaseSource, config: &ReleaseConfig) -> SyncReport {
    evaluate(&collect(source, &config.repositories))
}

impl fmt::Display for RepoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "📦 {}", self.repo)?;
        match &self.state {
            RepoState::NoRelease => writeln!(f, "   ❌ No releases found"),
            RepoState::Failed(message) => writeln!(f, "   ❌ Error: {message}"),
            RepoState::MissingSpec(release) => {
                write_release(f, release)?;
                writeln!(f, "   ⚠️  Could not find OpenAPI spec with SHAs")
            }
            RepoState::Found(release, provenance) => {
                write_release(f, release)?;
                writeln!(
                    f,
                    "   x-source-commit-sha: {}",
                    provenance.source_sha.as_deref().unwrap_or("not found")
                )?;
                writeln!(
                    f,
                    "   x-open-api-commit-sha: {}",
                    provenance.open_api_sha.as_deref().unwrap_or("not found")
                )
            }
        }
    }
}

fn write_release(f: &mut fmt::Formatter<'_>, release: &Release) -> fmt::Result {
    writeln!(f, "   Latest release: {}", release.tag)?;
    if let Some(published) = release.published_at {
        writeln!(f, "   Published: {}", published.format("%Y-%m-%d %H:%M:%S %:z"))?;
    }
    Ok(())
}

fn write_groups(f: &mut fmt::Formatter<'_>, label: &str, groups: &[ShaGroup]) -> fmt::Result {
    writeln!(f, "{label}:")?;
    for group in groups {
        writeln!(f, "  {}:", group.sha)?;
        for repo in &group.repos {
            writeln!(f, "    - {repo}")?;
        }
    }
    Ok(())
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for status in &self.statuses {
            writeln!(f, "{status}")?;
        }
        writeln!(f, "{}", "━".repeat(80))?;
        writeln!(f)?;
        writeln!(f, "📊 SUMMARY")?;
        writeln!(f)?;

        match &self.outcome {
            SyncOutcome::InSync {
                source_sha,
                open_api_sha,
            } => {
                writeln!(f, "✅ All API client releases have matching SHAs!")?;
                writeln!(f)?;
                writeln!(f, "   x-source-commit-sha:    {source_sha}")?;
                writeln!(f, "   x-open-api-commit-sha:  {open_api_sha}")?;
                writeln!(f)?;
                writeln!(f, "Releases:")?;
                for status in &self.statuses {
                    if let Some((release, _, _)) = status.stamps() {
                        writeln!(f, "  - {}: {}", status.repo, release.tag)?;
                    }
                }
            }
            SyncOutcome::Mismatch {
                source_groups,
                open_api_groups,
            } => {
                writeln!(f, "❌ SHA mismatch detected across releases:")?;
                writeln!(f)?;
                write_groups(f, "x-source-commit-sha", source_groups)?;
                writeln!(f)?;
                write_groups(f, "x-open-api-commit-sha", open_api_groups)?;
                writeln!(f)?;
                writeln!(f, "⏳ Waiting for all releases to sync to the same SHAs.")?;
            }
            SyncOutcome::Incomplete => {
                writeln!(f, "⚠️  Not all repositories have valid releases:")?;
                writeln!(f)?;
                for status in &self.statuses {
                    match &status.state {
                        RepoState::NoRelease => writeln!(f, "  ❌ {}: No releases found", status.repo)?,
                        RepoState::Failed(message) => writeln!(f, "  ❌ {}: {message}", status.repo)?,
                        RepoState::MissingSpec(_) => writeln!(
                            f,
                            "  ❌ {}: Could not find OpenAPI spec with SHAs",
                            status.repo
                        )?,
                        RepoState::Found(release, _) => match status.stamps() {
                            Some(_) => writeln!(f, "  ✅ {}: {}", status.repo, release.tag)?,
                            None => writeln!(f, "  ⚠️  {}: Missing SHA information", status.repo)?,
                        },
                    }
                }
            }
        }
        Ok(())
    }
}
