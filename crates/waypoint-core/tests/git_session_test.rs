//! End-to-end session against a real git repository and a local bare remote.

use std::path::Path;
use std::sync::Arc;

use waypoint_core::content::ContentBackend;
use waypoint_core::content::git::GitCli;
use waypoint_core::hosting::NoopHosting;
use waypoint_core::session::SessionEngine;
use waypoint_core::session::checkpoint::CheckpointRequest;
use waypoint_core::session::collapse::CollapseRequest;
use waypoint_core::session::init::InitRequest;
use waypoint_core::session::jump::JumpRequest;
use waypoint_core::storage::duckdb::DuckDbStore;

async fn git(dir: &Path, args: &[&str]) -> String {
    let output = tokio::process::Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .await
        .unwrap();
    assert!(output.status.success(), "git {args:?} failed: {}", String::from_utf8_lossy(&output.stderr));
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

#[tokio::test]
async fn test_session_round_trip_on_git() {
    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path().join("work");
    let remote = dir.path().join("remote.git");
    std::fs::create_dir_all(&repo).unwrap();

    let content = Arc::new(GitCli::new(&repo, "main", "origin").with_identity("Test", "test@example.com"));
    let store = Arc::new(DuckDbStore::open_in_memory().unwrap());
    let engine = SessionEngine::new(store, content.clone(), Arc::new(NoopHosting), repo.clone());

    // Repository with a published primary line
    let init = engine
        .init(InitRequest {
            name: Some("demo".to_string()),
            create_remote: false,
        })
        .await
        .unwrap();
    assert_eq!(init.files_written.len(), 2);
    git(dir.path(), &["init", "--bare", "remote.git"]).await;
    content.add_remote(&remote.to_string_lossy()).await.unwrap();
    content.publish("main").await.unwrap();

    let root = engine.start().await.unwrap().checkpoint;
    assert_eq!(content.current_branch_line().await.unwrap(), root.branch_line);

    let file = repo.join("a.txt");
    std::fs::write(&file, "one").unwrap();
    let one = engine.checkpoint(CheckpointRequest::new("one")).await.unwrap().checkpoint;
    std::fs::write(&file, "two").unwrap();
    let two = engine.checkpoint(CheckpointRequest::new("two")).await.unwrap().checkpoint;
    assert_eq!(two.token, content.current_revision_token().await.unwrap());

    engine.rewind().await.unwrap();
    assert_eq!(std::fs::read_to_string(&file).unwrap(), "one");
    // The session line moved back, but #3 stays pinned
    let pinned = git(&repo, &["rev-parse", "--verify", &format!("refs/waypoint/checkpoints/{}", two.token)]).await;
    assert_eq!(pinned, two.token);

    std::fs::write(repo.join("b.txt"), "fork").unwrap();
    let fork = engine.checkpoint(CheckpointRequest::new("fork")).await.unwrap();
    assert!(fork.forked);
    assert_eq!(fork.checkpoint.parent_id, Some(one.id));
    assert_eq!(content.current_branch_line().await.unwrap(), fork.checkpoint.branch_line);
    assert_eq!(std::fs::read_to_string(&file).unwrap(), "one");

    engine.jump(JumpRequest::new(two.number)).await.unwrap();
    assert_eq!(content.current_branch_line().await.unwrap(), two.branch_line);
    assert_eq!(std::fs::read_to_string(&file).unwrap(), "two");
    assert!(!repo.join("b.txt").exists());

    let collapsed = engine
        .collapse(CollapseRequest {
            title: Some("feature".to_string()),
            body: None,
        })
        .await
        .unwrap();
    assert_eq!(collapsed.collapsed_checkpoints, 4);
    // No hosting token: the review request is left to the user
    assert_eq!(collapsed.warnings.len(), 1);

    assert_eq!(content.current_branch_line().await.unwrap(), "main");
    assert!(!file.exists());
    let heads = git(&repo, &["ls-remote", "--heads", "origin"]).await;
    assert!(heads.contains(&collapsed.review_line));
    let published = git(&repo, &["show", &format!("{}:a.txt", collapsed.token)]).await;
    assert_eq!(published, "two");

    assert!(engine.status().await.unwrap().active.is_none());
    assert!(git(&repo, &["for-each-ref", "refs/waypoint"]).await.is_empty());
}

#[tokio::test]
async fn test_failed_collapse_keeps_content_on_session_line() {
    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path().to_path_buf();

    let content = Arc::new(GitCli::new(&repo, "main", "origin").with_identity("Test", "test@example.com"));
    let store = Arc::new(DuckDbStore::open_in_memory().unwrap());
    let engine = SessionEngine::new(store, content.clone(), Arc::new(NoopHosting), repo.clone());
    engine
        .init(InitRequest {
            name: Some("demo".to_string()),
            create_remote: false,
        })
        .await
        .unwrap();

    engine.start().await.unwrap();
    std::fs::write(repo.join("a.txt"), "one").unwrap();
    let a = engine.checkpoint(CheckpointRequest::new("a")).await.unwrap().checkpoint;

    // No remote configured: the push fails
    assert!(engine.collapse(CollapseRequest::default()).await.is_err());
    assert_eq!(content.current_branch_line().await.unwrap(), a.branch_line);
    assert_eq!(content.current_revision_token().await.unwrap(), a.token);
    assert!(git(&repo, &["branch", "--list", "review-*"]).await.is_empty());
    assert_eq!(engine.status().await.unwrap().active.unwrap().id, a.id);

    std::fs::write(repo.join("a.txt"), "two").unwrap();
    let b = engine.checkpoint(CheckpointRequest::new("b")).await.unwrap().checkpoint;
    assert_eq!(b.parent_id, Some(a.id));
    assert_eq!(content.current_branch_line().await.unwrap(), b.branch_line);
    assert_eq!(content.current_revision_token().await.unwrap(), b.token);
}
