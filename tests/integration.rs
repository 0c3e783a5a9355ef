//! Integration tests
//!
//! Exercise the assembled service end-to-end: backend selection through the
//! registry, link shortening, activity, and the sync sequence. All git
//! traffic goes through MockRunner; the real binary is never invoked.

use depot::{CmdOutput, CommandRunner, Config, Depot, Error, MockRunner, Result, SyncOutcome};
use std::sync::Arc;
use tempfile::tempdir;

/// Forwards to a shared MockRunner so the test keeps a handle for scripting
struct SharedRunner(Arc<MockRunner>);

impl CommandRunner for SharedRunner {
    fn run(&self, args: &[&str]) -> Result<CmdOutput> {
        self.0.run(args)
    }
}

fn open_depot(root: &std::path::Path) -> (Depot, Arc<MockRunner>, Arc<MockRunner>) {
    let config = Config::with_root(root);
    let vcs_runner = Arc::new(MockRunner::new());
    let sync_runner = Arc::new(MockRunner::new());
    let depot = Depot::open_with_runners(
        config,
        Box::new(SharedRunner(vcs_runner.clone())),
        Box::new(SharedRunner(sync_runner.clone())),
    )
    .unwrap();
    (depot, vcs_runner, sync_runner)
}

#[test]
fn test_round_trip_through_every_backend() {
    let dir = tempdir().unwrap();
    let (depot, vcs_runner, _sync) = open_depot(dir.path());
    let content = b"round trip payload \x00\xff";

    // The vcs backend lists through the runner's ls-files
    vcs_runner.respond("ls-files", CmdOutput::success(vec!["payload.bin".to_string()]));

    for name in depot.backends().names() {
        let backend = depot.backends().get(name).unwrap();
        let receipt = backend
            .store("payload.bin", content, "application/octet-stream", Some("payload.bin"))
            .unwrap();

        let object = backend.retrieve(&receipt.id).unwrap();
        assert_eq!(object.content, content, "backend {}", name);
        assert_eq!(object.size, content.len() as u64, "backend {}", name);

        let listing = backend.list().unwrap();
        assert!(
            listing.iter().any(|s| s.id == receipt.id),
            "stored object visible in {} listing",
            name
        );
    }
}

#[test]
fn test_backends_are_independent_namespaces() {
    let dir = tempdir().unwrap();
    let (depot, _vcs, _sync) = open_depot(dir.path());

    let receipt = depot
        .backends()
        .get("record")
        .unwrap()
        .store("only-here.txt", b"record only", "text/plain", Some("only-here.txt"))
        .unwrap();

    // The other backends never see the record store's id
    let err = depot.backends().get("flat").unwrap().retrieve(&receipt.id);
    assert!(err.unwrap_err().is_not_found());
}

#[test]
fn test_record_delete_lifecycle() {
    let dir = tempdir().unwrap();
    let (depot, _vcs, _sync) = open_depot(dir.path());
    let backend = depot.backends().get("record").unwrap();

    let receipt = backend
        .store("hello.txt", b"hello", "text/plain", Some("hello.txt"))
        .unwrap();
    assert_eq!(backend.retrieve(&receipt.id).unwrap().size, 5);

    backend.delete(&receipt.id).unwrap();
    assert!(backend.retrieve(&receipt.id).unwrap_err().is_not_found());
}

#[test]
fn test_unknown_backend_is_a_typed_error() {
    let dir = tempdir().unwrap();
    let (depot, _vcs, _sync) = open_depot(dir.path());
    assert!(matches!(
        depot.backends().get("cloud"),
        Err(Error::UnknownBackend(_))
    ));
}

#[test]
fn test_mutations_drive_the_sync_sequence() {
    let dir = tempdir().unwrap();
    let (depot, _vcs, sync_runner) = open_depot(dir.path());

    // Fresh system: no watermark yet
    assert!(depot.sync().is_sync_needed());
    assert!(!depot.sync().dirty().is_dirty());

    depot
        .backends()
        .get("record")
        .unwrap()
        .store("a.txt", b"aa", "text/plain", Some("a.txt"))
        .unwrap();
    depot
        .links()
        .shorten("https://example.com/a/b?x=1", None)
        .unwrap();
    assert!(depot.sync().dirty().is_dirty());

    sync_runner.respond(
        "status",
        CmdOutput::success(vec!["M  data/files.db".to_string()]),
    );
    let outcome = depot.sync().perform_sync().unwrap();
    assert!(matches!(outcome, SyncOutcome::Completed { .. }));
    assert_eq!(
        sync_runner.subcommands(),
        vec!["add", "status", "commit", "push"]
    );

    // Watermark advanced and dirty cleared
    assert!(!depot.sync().is_sync_needed());
    assert!(!depot.sync().dirty().is_dirty());

    // Immediately calling again is a safe no-op
    assert_eq!(depot.sync().perform_sync().unwrap(), SyncOutcome::NotNeeded);
    assert_eq!(sync_runner.calls().len(), 4);
}

#[test]
fn test_failed_push_is_retryable_without_losing_state() {
    let dir = tempdir().unwrap();
    let (depot, _vcs, sync_runner) = open_depot(dir.path());

    depot
        .backends()
        .get("record")
        .unwrap()
        .store("a.txt", b"aa", "text/plain", Some("a.txt"))
        .unwrap();

    sync_runner.respond(
        "status",
        CmdOutput::success(vec!["M  data/files.db".to_string()]),
    );
    sync_runner.respond(
        "push",
        CmdOutput::failure(1, vec!["error: failed to push".to_string()]),
    );

    let err = depot.sync().perform_sync().unwrap_err();
    assert!(matches!(err, Error::PushFailure(_)));
    assert_eq!(depot.sync().last_sync(), None);
    assert!(depot.sync().dirty().is_dirty());

    // Next invocation retries from scratch and succeeds
    sync_runner.respond(
        "status",
        CmdOutput::success(vec!["M  data/files.db".to_string()]),
    );
    let outcome = depot.sync().perform_sync().unwrap();
    assert!(matches!(outcome, SyncOutcome::Completed { .. }));
    assert!(depot.sync().last_sync().is_some());
}

#[test]
fn test_shorten_resolve_scenario() {
    let dir = tempdir().unwrap();
    let (depot, _vcs, _sync) = open_depot(dir.path());

    let code = depot
        .links()
        .shorten("https://example.com/a/b?x=1", None)
        .unwrap();
    assert_eq!(code.len(), 6);

    assert_eq!(
        depot.links().resolve(&code).unwrap(),
        "https://example.com/a/b?x=1"
    );
    assert_eq!(depot.links().get(&code).unwrap().clicks, 1);

    depot.links().resolve(&code).unwrap();
    assert_eq!(depot.links().get(&code).unwrap().clicks, 2);
}

#[test]
fn test_activity_trail_spans_components() {
    let dir = tempdir().unwrap();
    let (depot, _vcs, sync_runner) = open_depot(dir.path());

    depot
        .backends()
        .get("record")
        .unwrap()
        .store("a.txt", b"aa", "text/plain", Some("a.txt"))
        .unwrap();
    depot.links().shorten("https://example.com/", None).unwrap();

    sync_runner.respond(
        "status",
        CmdOutput::success(vec!["M  data/links.db".to_string()]),
    );
    depot.sync().perform_sync().unwrap();

    let actions: Vec<String> = depot
        .activity()
        .recent(10)
        .unwrap()
        .into_iter()
        .map(|r| r.action)
        .collect();
    assert_eq!(actions, vec!["sync_complete", "link_create", "file_upload"]);
}

#[test]
fn test_vcs_backend_commits_through_runner() {
    let dir = tempdir().unwrap();
    let (depot, vcs_runner, _sync) = open_depot(dir.path());

    depot
        .backends()
        .get("vcs")
        .unwrap()
        .store("readme.md", b"# hi", "text/plain", Some("readme.md"))
        .unwrap();

    let subcommands = vcs_runner.subcommands();
    assert!(subcommands.contains(&"add".to_string()));
    assert!(subcommands.contains(&"commit".to_string()));
    // The sync runner saw none of this
    assert!(dir.path().join("git-repo/readme.md").exists());
}
