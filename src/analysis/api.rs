use std::fmt;

use crate::config::ApiConfig;
use crate::pr::PullRequestContext;

/// Path fragments (matched case-insensitively) that mark an API surface.
const PATH_MARKERS: &[&str] = &["api", "route", "controller", "endpoint"];

/// Diff fragments for defining or calling HTTP endpoints across common frameworks.
const DIFF_SIGNATURES: &[&str] = &[
    // Express / Koa style routing
    "app.get(",
    "app.post(",
    "app.put(",
    "app.patch(",
    "app.delete(",
    "router.get(",
    "router.post(",
    "router.put(",
    "router.patch(",
    "router.delete(",
    // Spring
    "@GetMapping",
    "@PostMapping",
    "@PutMapping",
    "@PatchMapping",
    "@DeleteMapping",
    "@RequestMapping",
    // Flask / FastAPI
    "@app.route(",
    "@app.get(",
    "@app.post(",
    "@router.get(",
    "@router.post(",
    // actix / rocket / axum
    "#[get(",
    "#[post(",
    "#[put(",
    "#[delete(",
    ".route(",
    // Go net/http
    "HandleFunc(",
    "http.Get(",
    "http.Post(",
    // HTTP clients
    "axios.",
    "fetch(",
    "requests.get(",
    "requests.post(",
    "reqwest::",
    "HttpClient",
];

/// Why a pull request was judged API-relevant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiEvidence {
    /// A changed path contains an API marker
    Path { path: String, marker: String },
    /// The diff contains an endpoint signature
    Diff { signature: String },
}

impl fmt::Display for ApiEvidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiEvidence::Path { path, marker } => write!(f, "path {path} matches {marker:?}"),
            ApiEvidence::Diff { signature } => write!(f, "diff contains {signature:?}"),
        }
    }
}

/// Textual API-relevance heuristic.
///
/// Errs on the side of reporting relevance: it only decides whether the API
/// section is offered, so a false positive costs one optional section while
/// a false negative hides real API changes. A truncated or empty diff is
/// simply searched as-is.
pub struct ApiDetector {
    path_markers: Vec<String>,
    diff_signatures: Vec<String>,
}

impl ApiDetector {
    pub fn new(config: &ApiConfig) -> Self {
        let path_markers = PATH_MARKERS
            .iter()
            .map(|m| m.to_string())
            .chain(config.extra_path_markers.iter().cloned())
            .map(|m| m.to_lowercase())
            .filter(|m| !m.is_empty())
            .collect();
        let diff_signatures = DIFF_SIGNATURES
            .iter()
            .map(|s| s.to_string())
            .chain(config.extra_diff_signatures.iter().cloned())
            .filter(|s| !s.is_empty())
            .collect();
        Self {
            path_markers,
            diff_signatures,
        }
    }

    /// First piece of evidence found, checking file paths before the diff.
    pub fn detect(&self, ctx: &PullRequestContext) -> Option<ApiEvidence> {
        for file in &ctx.file_changes {
            let path = file.path.to_lowercase();
            if let Some(marker) = self.path_markers.iter().find(|m| path.contains(m.as_str())) {
                return Some(ApiEvidence::Path {
                    path: file.path.clone(),
                    marker: marker.clone(),
                });
            }
        }

        self.diff_signatures
            .iter()
            .find(|sig| ctx.diff.text.contains(sig.as_str()))
            .map(|sig| ApiEvidence::Diff {
                signature: sig.clone(),
            })
    }

    #[cfg(test)]
    pub fn is_relevant(&self, ctx: &PullRequestContext) -> bool {
        self.detect(ctx).is_some()
    }
}
