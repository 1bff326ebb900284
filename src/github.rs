// src/github.rs

use std::sync::mpsc;
use std::thread;

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;

use crate::error::Error;
use crate::orchestrator::CancelToken;

/// One retrieved file, fixed for the lifetime of an orchestration.
#[derive(Debug, Clone)]
pub struct FileRef {
    pub path: String,
    pub content: String,
}

/// A batch of files to retrieve from one branch.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub paths: Vec<String>,
}

/// Admission filter shared by tree listing and selection: only these
/// extensions are offered for summarization.
pub fn is_code_file(path: &str) -> bool {
    let re = Regex::new(r"\.(js|jsx|ts|tsx|py|java|cpp)$").unwrap();
    re.is_match(path)
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntry>,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    content: String,
    encoding: String,
}

#[derive(Clone)]
pub struct GithubClient {
    client: Client,
}

impl GithubClient {
    pub fn new(token: &str) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("testloom"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );

        let value = format!("Bearer {}", token);
        let value = HeaderValue::from_str(&value)
            .map_err(|e| Error::Validation(format!("credential is not header-safe: {e}")))?;
        headers.insert(AUTHORIZATION, value);

        let client = Client::builder().default_headers(headers).build()?;
        Ok(Self { client })
    }

    /// List blob paths in the branch tree that pass the admission filter.
    pub fn list_code_files(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<Vec<String>, Error> {
        let url = format!(
            "https://api.github.com/repos/{owner}/{repo}/git/trees/{branch}?recursive=1"
        );
        let label = format!("{owner}/{repo}@{branch}");

        let resp: TreeResponse = self
            .client
            .get(&url)
            .send()
            .map_err(|e| retrieval(&label, e))?
            .error_for_status()
            .map_err(|e| retrieval(&label, e))?
            .json()
            .map_err(|e| retrieval(&label, e))?;

        Ok(resp
            .tree
            .into_iter()
            .filter(|entry| entry.kind == "blob" && is_code_file(&entry.path))
            .map(|entry| entry.path)
            .collect())
    }

    /// Fetch one file and decode it from its transport encoding.
    pub fn file_content(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        path: &str,
    ) -> Result<String, Error> {
        let url = format!(
            "https://api.github.com/repos/{owner}/{repo}/contents/{path}?ref={branch}"
        );

        let body: ContentResponse = self
            .client
            .get(&url)
            .send()
            .map_err(|e| retrieval(path, e))?
            .error_for_status()
            .map_err(|e| retrieval(path, e))?
            .json()
            .map_err(|e| retrieval(path, e))?;

        decode_content(path, &body)
    }

    /// Fail-fast fan-out: every path is retrieved on its own thread and the
    /// results are re-assembled in request order. The first failure cancels
    /// the token and aborts the batch; no partial list is ever returned.
    pub fn fetch_files(
        &self,
        req: &FetchRequest,
        cancel: &CancelToken,
    ) -> Result<Vec<FileRef>, Error> {
        let (tx, rx) = mpsc::channel();

        for (idx, path) in req.paths.iter().enumerate() {
            let tx = tx.clone();
            let cancel = cancel.clone();
            let client = self.clone();
            let owner = req.owner.clone();
            let repo = req.repo.clone();
            let branch = req.branch.clone();
            let path = path.clone();

            thread::spawn(move || {
                if cancel.is_cancelled() {
                    return;
                }
                let result = client
                    .file_content(&owner, &repo, &branch, &path)
                    .map(|content| FileRef {
                        path: path.clone(),
                        content,
                    });
                let _ = tx.send((idx, result));
            });
        }
        drop(tx);

        let mut slots: Vec<Option<FileRef>> = vec![None; req.paths.len()];

        for (idx, result) in rx {
            match result {
                Ok(file) => slots[idx] = Some(file),
                Err(e) => {
                    cancel.cancel();
                    return Err(e);
                }
            }
        }

        let files: Vec<FileRef> = slots.into_iter().flatten().collect();
        if files.len() != req.paths.len() {
            // a worker bailed on the cancel token without reporting
            return Err(Error::Retrieval {
                path: format!("{}/{}", req.owner, req.repo),
                reason: "batch aborted before all files were retrieved".into(),
            });
        }

        Ok(files)
    }
}

fn retrieval(path: &str, e: impl std::fmt::Display) -> Error {
    Error::Retrieval {
        path: path.to_string(),
        reason: e.to_string(),
    }
}

fn decode_content(path: &str, body: &ContentResponse) -> Result<String, Error> {
    if body.encoding != "base64" {
        return Err(Error::Retrieval {
            path: path.to_string(),
            reason: format!("unknown file encoding '{}'", body.encoding),
        });
    }

    // the contents API wraps base64 payloads with newlines
    let compact: String = body.content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = B64.decode(compact.as_bytes()).map_err(|e| retrieval(path, e))?;
    String::from_utf8(bytes).map_err(|e| retrieval(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admission_filter_accepts_known_source_extensions() {
        assert!(is_code_file("src/index.js"));
        assert!(is_code_file("app/Main.java"));
        assert!(is_code_file("lib/util.tsx"));
        assert!(is_code_file("scripts/run.py"));
    }

    #[test]
    fn admission_filter_rejects_other_paths() {
        assert!(!is_code_file("README.md"));
        assert!(!is_code_file("assets/logo.png"));
        assert!(!is_code_file("Makefile"));
        assert!(!is_code_file("src/main.rs"));
    }

    #[test]
    fn decode_content_handles_wrapped_base64() {
        let body = ContentResponse {
            // "function add(a,b){return a+b}" split across lines, as the
            // contents API delivers it
            content: "ZnVuY3Rpb24gYWRkKGEs\nYil7cmV0dXJuIGErYn0=\n".into(),
            encoding: "base64".into(),
        };

        let text = decode_content("a.js", &body).unwrap();
        assert_eq!(text, "function add(a,b){return a+b}");
    }

    #[test]
    fn decode_content_rejects_unknown_encoding() {
        let body = ContentResponse {
            content: "whatever".into(),
            encoding: "utf-16".into(),
        };

        let err = decode_content("a.js", &body).unwrap_err();
        match err {
            Error::Retrieval { path, reason } => {
                assert_eq!(path, "a.js");
                assert!(reason.contains("unknown file encoding"));
            }
            other => panic!("expected retrieval error, got {other:?}"),
        }
    }
}
