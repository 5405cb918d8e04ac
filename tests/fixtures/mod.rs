//! In-memory GitHub used by the integration tests.
//!
//! Implements the REST transport the client talks through, so the real handlers,
//! pagination and the rollout machine run unchanged against deterministic state.
#![allow(dead_code)]

use async_trait::async_trait;
use gh_add_files::github::{ClientOptions, GitHubClient, GitHubError};
use gh_add_files::http::{HttpMethod, RawResponse, RestTransport};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

pub const FAKE_API: &str = "https://fake.github.test";
pub const ROLLOUT_BRANCH: &str = "gh-cli/codescanningworkflow";

#[derive(Debug, Clone, Default)]
pub struct FakeRepo {
    pub default_branch: String,
    pub languages: BTreeMap<String, u64>,
    /// branch name -> file path -> content
    pub branches: BTreeMap<String, BTreeMap<String, String>>,
    pub pulls: Vec<FakePull>,
}

#[derive(Debug, Clone)]
pub struct FakePull {
    pub number: u64,
    pub head: String,
    pub base: String,
    pub state: String,
    pub merged: bool,
}

#[derive(Debug, Default)]
struct State {
    orgs: BTreeMap<String, Vec<String>>,
    repos: BTreeMap<String, FakeRepo>,
    failures: Vec<(HttpMethod, String, u16)>,
    requests: Vec<(HttpMethod, String)>,
    page_size: usize,
    next_pull: u64,
}

#[derive(Debug, Clone)]
pub struct FakeGitHub {
    state: Arc<Mutex<State>>,
}

impl Default for FakeGitHub {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeGitHub {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                page_size: 100,
                next_pull: 1,
                ..State::default()
            })),
        }
    }

    /// Organisation repositories are served this many per page.
    pub fn with_page_size(self, page_size: usize) -> Self {
        self.state.lock().unwrap().page_size = page_size.max(1);
        self
    }

    pub fn add_org(&self, org: &str) {
        self.state
            .lock()
            .unwrap()
            .orgs
            .entry(org.to_string())
            .or_default();
    }

    /// Add `org/name` with a `main` branch and the given linguist languages.
    pub fn add_repo(&self, full_name: &str, languages: &[&str]) {
        let mut state = self.state.lock().unwrap();
        let (org, _) = full_name.split_once('/').unwrap();
        state
            .orgs
            .entry(org.to_string())
            .or_default()
            .push(full_name.to_string());

        let mut branches = BTreeMap::new();
        branches.insert(
            "main".to_string(),
            BTreeMap::from([("README.md".to_string(), "# readme".to_string())]),
        );
        state.repos.insert(
            full_name.to_string(),
            FakeRepo {
                default_branch: "main".to_string(),
                languages: languages
                    .iter()
                    .enumerate()
                    .map(|(i, l)| (l.to_string(), 1000 * (i as u64 + 1)))
                    .collect(),
                branches,
                pulls: Vec::new(),
            },
        );
    }

    pub fn add_file(&self, full_name: &str, branch: &str, path: &str, content: &str) {
        let mut state = self.state.lock().unwrap();
        let repo = state.repos.get_mut(full_name).unwrap();
        repo.branches
            .entry(branch.to_string())
            .or_default()
            .insert(path.to_string(), content.to_string());
    }

    pub fn add_branch(&self, full_name: &str, branch: &str) {
        let mut state = self.state.lock().unwrap();
        let repo = state.repos.get_mut(full_name).unwrap();
        let base = repo.branches.get(&repo.default_branch).cloned().unwrap_or_default();
        repo.branches.insert(branch.to_string(), base);
    }

    pub fn add_pull(&self, full_name: &str, state_name: &str, merged: bool) -> u64 {
        let mut state = self.state.lock().unwrap();
        let number = state.next_pull;
        state.next_pull += 1;
        let repo = state.repos.get_mut(full_name).unwrap();
        let base = repo.default_branch.clone();
        repo.pulls.push(FakePull {
            number,
            head: ROLLOUT_BRANCH.to_string(),
            base,
            state: state_name.to_string(),
            merged,
        });
        number
    }

    pub fn close_pulls(&self, full_name: &str, merged: bool) {
        let mut state = self.state.lock().unwrap();
        for pull in &mut state.repos.get_mut(full_name).unwrap().pulls {
            pull.state = "closed".to_string();
            pull.merged = merged;
        }
    }

    /// Answer requests whose path starts with `path_prefix` with `status`.
    pub fn fail(&self, method: HttpMethod, path_prefix: &str, status: u16) {
        self.state
            .lock()
            .unwrap()
            .failures
            .push((method, path_prefix.to_string(), status));
    }

    pub fn repo(&self, full_name: &str) -> FakeRepo {
        self.state.lock().unwrap().repos[full_name].clone()
    }

    pub fn has_branch(&self, full_name: &str, branch: &str) -> bool {
        self.repo(full_name).branches.contains_key(branch)
    }

    pub fn file(&self, full_name: &str, branch: &str, path: &str) -> Option<String> {
        self.repo(full_name)
            .branches
            .get(branch)
            .and_then(|files| files.get(path).cloned())
    }

    pub fn requests(&self) -> Vec<(HttpMethod, String)> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn count(&self, method: HttpMethod, path_prefix: &str) -> usize {
        self.requests()
            .iter()
            .filter(|(m, p)| *m == method && p.starts_with(path_prefix))
            .count()
    }

    pub fn client(&self) -> GitHubClient {
        GitHubClient::with_transport(Arc::new(self.clone()), ClientOptions::default())
    }

    fn route(&self, method: HttpMethod, path: &str, body: Option<&Value>) -> (u16, Value, Option<String>) {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        let (route, query) = path.split_once('?').unwrap_or((path, ""));
        let query: BTreeMap<&str, &str> = query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .collect();
        let segments: Vec<&str> = route.split('/').collect();

        match (method, segments.as_slice()) {
            (HttpMethod::Get, ["rate_limit"]) => (200, json!({"resources": {}}), None),

            (HttpMethod::Get, ["orgs", org, "repos"]) => {
                let Some(names) = state.orgs.get(*org) else {
                    return not_found();
                };
                let page: usize = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
                let per_page = state.page_size;
                let start = (page - 1) * per_page;
                let items: Vec<Value> = names
                    .iter()
                    .skip(start)
                    .take(per_page)
                    .map(|full_name| repository_json(full_name, &state.repos[full_name]))
                    .collect();
                let link = (start + per_page < names.len()).then(|| {
                    format!(
                        "<{FAKE_API}/orgs/{org}/repos?page={}>; rel=\"next\", <{FAKE_API}/orgs/{org}/repos?page={}>; rel=\"last\"",
                        page + 1,
                        names.len().div_ceil(per_page)
                    )
                });
                (200, Value::Array(items), link)
            }

            (_, ["repos", owner, name, rest @ ..]) => {
                let full_name = format!("{owner}/{name}");
                let Some(repo) = state.repos.get_mut(&full_name) else {
                    return not_found();
                };
                let next_pull = &mut state.next_pull;
                route_repo(repo, &full_name, method, rest, &query, body, next_pull)
            }

            _ => not_found(),
        }
    }
}

fn route_repo(
    repo: &mut FakeRepo,
    full_name: &str,
    method: HttpMethod,
    rest: &[&str],
    query: &BTreeMap<&str, &str>,
    body: Option<&Value>,
    next_pull: &mut u64,
) -> (u16, Value, Option<String>) {
    match (method, rest) {
        (HttpMethod::Get, []) => (200, repository_json(full_name, repo), None),

        (HttpMethod::Get, ["languages"]) => (200, json!(repo.languages), None),

        (HttpMethod::Get, ["contents", path @ ..]) => {
            let path = path.join("/");
            let branch = query
                .get("ref")
                .copied()
                .unwrap_or(repo.default_branch.as_str());
            match repo.branches.get(branch).and_then(|files| files.get(&path)) {
                Some(_) => (200, content_json(&path), None),
                None => not_found(),
            }
        }

        (HttpMethod::Put, ["contents", path @ ..]) => {
            let path = path.join("/");
            let body = body.cloned().unwrap_or_default();
            let branch = body["branch"]
                .as_str()
                .unwrap_or(repo.default_branch.as_str())
                .to_string();
            let Some(files) = repo.branches.get_mut(&branch) else {
                return not_found();
            };
            if files.contains_key(&path) {
                return validation_failed("\"sha\" wasn't supplied.");
            }
            files.insert(path.clone(), body["content"].as_str().unwrap_or_default().to_string());
            (201, json!({ "content": content_json(&path) }), None)
        }

        (HttpMethod::Get, ["git", "ref", "heads", branch @ ..]) => {
            let branch = branch.join("/");
            if repo.branches.is_empty() {
                return (409, json!({"message": "Git Repository is empty."}), None);
            }
            match repo.branches.contains_key(&branch) {
                true => (200, ref_json(&branch), None),
                false => not_found(),
            }
        }

        (HttpMethod::Post, ["git", "refs"]) => {
            let body = body.cloned().unwrap_or_default();
            let reference = body["ref"].as_str().unwrap_or_default();
            let Some(branch) = reference.strip_prefix("refs/heads/") else {
                return validation_failed("Reference name is invalid");
            };
            if repo.branches.contains_key(branch) {
                return validation_failed("Reference already exists");
            }
            let base = repo.branches.get(&repo.default_branch).cloned().unwrap_or_default();
            repo.branches.insert(branch.to_string(), base);
            (201, ref_json(branch), None)
        }

        (HttpMethod::Delete, ["git", "refs", "heads", branch @ ..]) => {
            let branch = branch.join("/");
            match repo.branches.remove(&branch) {
                Some(_) => (204, Value::Null, None),
                None => validation_failed("Reference does not exist"),
            }
        }

        (HttpMethod::Post, ["pulls"]) => {
            let body = body.cloned().unwrap_or_default();
            let head = body["head"].as_str().unwrap_or_default().to_string();
            let base = body["base"].as_str().unwrap_or_default().to_string();
            if !repo.branches.contains_key(&head) {
                return validation_failed("head invalid");
            }
            if repo.pulls.iter().any(|pr| pr.head == head && pr.state == "open") {
                return validation_failed(&format!(
                    "A pull request already exists for {}:{head}.",
                    full_name.split('/').next().unwrap_or_default()
                ));
            }
            let number = *next_pull;
            *next_pull += 1;
            let pull = FakePull {
                number,
                head,
                base,
                state: "open".to_string(),
                merged: false,
            };
            let record = pull_json(full_name, &pull);
            repo.pulls.push(pull);
            (201, record, None)
        }

        (HttpMethod::Get, ["pulls"]) => {
            let head = query
                .get("head")
                .and_then(|h| h.split_once(':'))
                .map(|(_, branch)| branch.to_string());
            let pulls: Vec<Value> = repo
                .pulls
                .iter()
                .rev()
                .filter(|pr| head.as_ref().map_or(true, |h| *h == pr.head))
                .map(|pr| pull_json(full_name, pr))
                .collect();
            (200, Value::Array(pulls), None)
        }

        _ => not_found(),
    }
}

fn not_found() -> (u16, Value, Option<String>) {
    (
        404,
        json!({"message": "Not Found", "documentation_url": "https://docs.github.com/rest"}),
        None,
    )
}

fn validation_failed(detail: &str) -> (u16, Value, Option<String>) {
    (
        422,
        json!({"message": "Validation Failed", "errors": [{"message": detail}]}),
        None,
    )
}

fn repository_json(full_name: &str, repo: &FakeRepo) -> Value {
    let name = full_name.split_once('/').map(|(_, n)| n).unwrap_or_default();
    json!({
        "id": 1,
        "name": name,
        "full_name": full_name,
        "private": false,
        "default_branch": repo.default_branch,
    })
}

fn ref_json(branch: &str) -> Value {
    json!({
        "ref": format!("refs/heads/{branch}"),
        "object": {"sha": "aa218f56b14c9653891f9e74264a383fa43fefbd", "type": "commit"},
    })
}

fn content_json(path: &str) -> Value {
    let name = path.rsplit('/').next().unwrap_or(path);
    json!({"name": name, "path": path, "sha": "3d21ec53a331a6f037a91c368710b99387d012c1"})
}

fn pull_json(full_name: &str, pull: &FakePull) -> Value {
    json!({
        "number": pull.number,
        "html_url": format!("https://github.com/{full_name}/pull/{}", pull.number),
        "state": pull.state,
        "merged_at": if pull.merged { json!("2024-05-01T10:00:00Z") } else { Value::Null },
        "head": {"ref": pull.head},
        "base": {"ref": pull.base},
    })
}

#[async_trait]
impl RestTransport for FakeGitHub {
    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
    ) -> Result<RawResponse, GitHubError> {
        let relative = path
            .strip_prefix(FAKE_API)
            .unwrap_or(path)
            .trim_start_matches('/')
            .to_string();

        let injected = {
            let mut state = self.state.lock().unwrap();
            state.requests.push((method, relative.clone()));
            state
                .failures
                .iter()
                .find(|(m, prefix, _)| *m == method && relative.starts_with(prefix.as_str()))
                .map(|(_, _, status)| *status)
        };

        let (status, value, link) = match injected {
            Some(status) => (status, json!({"message": format!("injected {status}")}), None),
            None => self.route(method, &relative, body),
        };

        let body = match value {
            Value::Null => Vec::new(),
            other => serde_json::to_vec(&other).unwrap(),
        };
        Ok(RawResponse { status, link, body })
    }
}

/// The four repositories of the `paradisisland` scenario.
///
/// `sheena` already carries the workflow and `titanforest` has no language
/// CodeQL analyses.
pub fn paradisisland() -> FakeGitHub {
    let github = FakeGitHub::new();
    github.add_repo("paradisisland/maria", &["Go", "Shell"]);
    github.add_repo("paradisisland/rose", &["Python", "TypeScript"]);
    github.add_repo("paradisisland/sheena", &["Java"]);
    github.add_repo("paradisisland/titanforest", &["HCL", "Shell"]);
    github.add_file(
        "paradisisland/sheena",
        "main",
        ".github/workflows/codeql.yml",
        "name: CodeQL",
    );
    github
}

/// A workflow template on disk, kept alive with its directory.
pub fn workflow_template() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("codeql.yml");
    std::fs::write(&path, "name: \"CodeQL\"\non: [push, pull_request]\n").unwrap();
    (dir, path)
}
