//! Version-controlled working tree backend
//!
//! Wraps a git working tree: every store or delete is followed by a
//! stage+commit sequence, so the tree's history doubles as the object
//! history. Unlike the other backends, objects here are addressed by their
//! original name: the file name in the tree is the identifier.
//!
//! Mutations shell out through a [`CommandRunner`] and are therefore slower
//! and can fail with `VcsCommand`; retrieve and list stay pure filesystem
//! reads (list consults the index so untracked scratch files are excluded).

use super::{content_type_for, Backend, ObjectSummary, StoreReceipt, StoredObject};
use crate::vcs::{CmdOutput, CommandRunner};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

pub struct VcsTreeBackend {
    root: PathBuf,
    runner: Box<dyn CommandRunner>,
}

impl VcsTreeBackend {
    /// Open the backend over `root`, initializing a repository there if one
    /// does not exist yet.
    pub fn open(root: impl AsRef<Path>, runner: Box<dyn CommandRunner>) -> Result<Self> {
        let backend = VcsTreeBackend {
            root: root.as_ref().to_path_buf(),
            runner,
        };
        if !backend.root.join(".git").exists() {
            backend.init_repo()?;
        }
        Ok(backend)
    }

    fn init_repo(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)
            .map_err(|e| Error::BackendUnavailable(format!("repository directory: {}", e)))?;

        self.expect_ok(&["init"])?;
        self.expect_ok(&["config", "user.name", "File Hosting Service"])?;
        self.expect_ok(&["config", "user.email", "no-reply@filehosting.invalid"])?;
        std::fs::write(
            self.root.join(".gitignore"),
            "*.tmp\n*.temp\n.DS_Store\nThumbs.db\n",
        )?;
        Ok(())
    }

    fn expect_ok(&self, args: &[&str]) -> Result<CmdOutput> {
        let output = self.runner.run(args)?;
        if !output.ok() {
            return Err(Error::VcsCommand(format!(
                "git {}: {}",
                args.join(" "),
                output.joined()
            )));
        }
        Ok(output)
    }

    /// Commit, tolerating the benign "nothing to commit" outcome (the
    /// content is already committed, e.g. a re-upload of identical bytes).
    fn commit_tolerant(&self, message: &str) -> Result<()> {
        let output = self.runner.run(&["commit", "-m", message])?;
        if output.ok() || output.joined().contains("nothing to commit") {
            return Ok(());
        }
        Err(Error::VcsCommand(format!("git commit: {}", output.joined())))
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        if id.is_empty() || id.contains('/') || id.contains('\\') || id.starts_with('.') {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(self.root.join(id))
    }
}

impl Backend for VcsTreeBackend {
    fn name(&self) -> &'static str {
        "vcs"
    }

    fn store(
        &self,
        name: &str,
        content: &[u8],
        _content_type: &str,
        original_name: Option<&str>,
    ) -> Result<StoreReceipt> {
        // Stored under the original name: the tree is meant to be browsable
        // and the name is the identifier.
        let file_name = original_name.unwrap_or(name);
        if file_name.is_empty()
            || file_name.contains('/')
            || file_name.contains('\\')
            || file_name.starts_with('.')
        {
            return Err(Error::InvalidInput(format!("object name: {}", file_name)));
        }
        let path = self.root.join(file_name);
        std::fs::write(&path, content).map_err(|e| Error::WriteFailure(e.to_string()))?;

        self.expect_ok(&["add", file_name])?;
        self.commit_tolerant(&format!("Add file: {}", file_name))?;

        Ok(StoreReceipt {
            id: file_name.to_string(),
            stored_name: file_name.to_string(),
        })
    }

    fn retrieve(&self, id: &str) -> Result<StoredObject> {
        let path = self.path_for(id)?;
        if !path.is_file() {
            return Err(Error::NotFound(id.to_string()));
        }

        let content = std::fs::read(&path)?;
        let created_at = std::fs::metadata(&path)
            .ok()
            .and_then(|m| m.modified().ok())
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs());

        Ok(StoredObject {
            id: id.to_string(),
            name: id.to_string(),
            original_name: Some(id.to_string()),
            size: content.len() as u64,
            content_type: content_type_for(id).to_string(),
            content,
            created_at,
        })
    }

    fn list(&self) -> Result<Vec<ObjectSummary>> {
        let output = self.expect_ok(&["ls-files"])?;

        let mut summaries = Vec::new();
        for name in output.lines.iter().filter(|l| !l.trim().is_empty()) {
            // Tracked but locally deleted entries are skipped
            let Ok(meta) = std::fs::metadata(self.root.join(name)) else {
                continue;
            };
            summaries.push(ObjectSummary {
                id: name.clone(),
                name: name.clone(),
                size: meta.len(),
                created_at: meta
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                    .map(|d| d.as_secs()),
            });
        }
        Ok(summaries)
    }

    fn delete(&self, id: &str) -> Result<()> {
        let path = self.path_for(id)?;
        if !path.is_file() {
            return Err(Error::NotFound(id.to_string()));
        }

        std::fs::remove_file(&path)?;
        self.expect_ok(&["rm", "--cached", id])?;
        self.commit_tolerant(&format!("Remove file: {}", id))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcs::MockRunner;
    use std::sync::Arc;
    use tempfile::tempdir;

    struct SharedRunner(Arc<MockRunner>);

    impl CommandRunner for SharedRunner {
        fn run(&self, args: &[&str]) -> Result<CmdOutput> {
            self.0.run(args)
        }
    }

    fn backend() -> (tempfile::TempDir, VcsTreeBackend, Arc<MockRunner>) {
        let dir = tempdir().unwrap();
        let runner = Arc::new(MockRunner::new());
        let backend =
            VcsTreeBackend::open(dir.path().join("repo"), Box::new(SharedRunner(runner.clone())))
                .unwrap();
        (dir, backend, runner)
    }

    #[test]
    fn test_open_initializes_missing_repository() {
        let (dir, _backend, runner) = backend();
        assert_eq!(runner.subcommands(), vec!["init", "config", "config"]);
        assert!(dir.path().join("repo/.gitignore").exists());
    }

    #[test]
    fn test_store_writes_stages_and_commits() {
        let (dir, backend, runner) = backend();

        let receipt = backend
            .store("notes.txt", b"hello tree", "text/plain", Some("notes.txt"))
            .unwrap();
        assert_eq!(receipt.id, "notes.txt");
        assert_eq!(
            std::fs::read(dir.path().join("repo/notes.txt")).unwrap(),
            b"hello tree"
        );

        let calls = runner.calls();
        let add = calls.iter().find(|c| c[0] == "add").unwrap();
        assert_eq!(add[1], "notes.txt");
        let commit = calls.iter().find(|c| c[0] == "commit").unwrap();
        assert_eq!(commit[2], "Add file: notes.txt");
    }

    #[test]
    fn test_nothing_to_commit_is_success() {
        let (_dir, backend, runner) = backend();
        runner.respond(
            "commit",
            CmdOutput::failure(1, vec!["nothing to commit, working tree clean".into()]),
        );

        backend
            .store("notes.txt", b"same bytes", "text/plain", Some("notes.txt"))
            .unwrap();
    }

    #[test]
    fn test_commit_failure_surfaces_as_vcs_error() {
        let (_dir, backend, runner) = backend();
        runner.respond("commit", CmdOutput::failure(128, vec!["fatal: bad object".into()]));

        let err = backend
            .store("notes.txt", b"x", "text/plain", Some("notes.txt"))
            .unwrap_err();
        assert!(matches!(err, Error::VcsCommand(_)));
    }

    #[test]
    fn test_retrieve_round_trip() {
        let (_dir, backend, _runner) = backend();
        backend
            .store("data.json", b"{\"k\":1}", "application/json", Some("data.json"))
            .unwrap();

        let object = backend.retrieve("data.json").unwrap();
        assert_eq!(object.content, b"{\"k\":1}");
        assert_eq!(object.size, 7);
        assert_eq!(object.content_type, "application/json");
        assert!(backend.retrieve("absent.txt").unwrap_err().is_not_found());
    }

    #[test]
    fn test_list_uses_tracked_files_only() {
        let (dir, backend, runner) = backend();
        backend.store("a.txt", b"aa", "text/plain", Some("a.txt")).unwrap();
        // An untracked scratch file in the tree must not appear
        std::fs::write(dir.path().join("repo/scratch.tmp"), b"x").unwrap();

        runner.respond("ls-files", CmdOutput::success(vec!["a.txt".into()]));
        let listing = backend.list().unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].id, "a.txt");
        assert_eq!(listing[0].size, 2);
    }

    #[test]
    fn test_list_skips_tracked_but_deleted_entries() {
        let (_dir, backend, runner) = backend();
        runner.respond(
            "ls-files",
            CmdOutput::success(vec!["gone.txt".into()]),
        );
        assert!(backend.list().unwrap().is_empty());
    }

    #[test]
    fn test_delete_removes_stages_and_commits() {
        let (dir, backend, runner) = backend();
        backend.store("a.txt", b"aa", "text/plain", Some("a.txt")).unwrap();

        backend.delete("a.txt").unwrap();
        assert!(!dir.path().join("repo/a.txt").exists());

        let calls = runner.calls();
        let rm = calls.iter().find(|c| c[0] == "rm").unwrap();
        assert_eq!(rm.last().unwrap(), "a.txt");
        let removal_commit = calls
            .iter()
            .filter(|c| c[0] == "commit")
            .any(|c| c[2] == "Remove file: a.txt");
        assert!(removal_commit);

        // Second delete of the same id fails
        assert!(backend.delete("a.txt").unwrap_err().is_not_found());
    }

    #[test]
    fn test_dotted_and_path_like_ids_are_rejected() {
        let (_dir, backend, _runner) = backend();
        assert!(backend.retrieve(".gitignore").unwrap_err().is_not_found());
        assert!(backend.delete("../outside").unwrap_err().is_not_found());
        assert!(matches!(
            backend.store("a/b.txt", b"x", "text/plain", Some("a/b.txt")),
            Err(Error::InvalidInput(_))
        ));
    }
}
