use std::path::PathBuf;

use tracing::debug;

use crate::content::ContentBackend;
use crate::error::{Error, Result};

/// Namespace for refs that pin checkpoint revisions. Rewinding moves a branch
/// line backwards, so later checkpoints on it are reachable only through these.
const CHECKPOINT_REF_PREFIX: &str = "refs/waypoint/checkpoints";

/// [`ContentBackend`] that shells out to the `git` binary inside one repository.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_path: PathBuf,
    primary_line: String,
    remote: String,
    identity: Option<(String, String)>,
}

impl GitCli {
    pub fn new(repo_path: impl Into<PathBuf>, primary_line: impl Into<String>, remote: impl Into<String>) -> Self {
        Self {
            repo_path: repo_path.into(),
            primary_line: primary_line.into(),
            remote: remote.into(),
            identity: None,
        }
    }

    /// Commit as `name <email>` regardless of the user's git configuration.
    pub fn with_identity(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.identity = Some((name.into(), email.into()));
        self
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        let mut cmd = tokio::process::Command::new("git");
        if let Some((name, email)) = &self.identity {
            cmd.arg("-c")
                .arg(format!("user.name={name}"))
                .arg("-c")
                .arg(format!("user.email={email}"));
        }
        cmd.args(args).current_dir(&self.repo_path);

        let start = std::time::Instant::now();
        let output = cmd.output().await?;
        let elapsed = start.elapsed();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!(
                ?args,
                elapsed_ms = elapsed.as_millis(),
                status = %output.status,
                stderr = %stderr.trim(),
                "git command failed"
            );
            return Err(Error::Vcs(format!(
                "git {} failed: {}",
                args.first().copied().unwrap_or_default(),
                stderr.trim()
            )));
        }

        debug!(?args, elapsed_ms = elapsed.as_millis(), "git command completed");
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait::async_trait]
impl ContentBackend for GitCli {
    async fn init(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.repo_path).await?;
        let initial = format!("--initial-branch={}", self.primary_line);
        self.run(&["init", initial.as_str()]).await?;
        Ok(())
    }

    async fn current_revision_token(&self) -> Result<String> {
        self.run(&["rev-parse", "HEAD"]).await
    }

    async fn current_branch_line(&self) -> Result<String> {
        self.run(&["symbolic-ref", "--short", "HEAD"]).await
    }

    async fn create_branch_line(&self, name: &str) -> Result<()> {
        self.run(&["checkout", "-b", name]).await?;
        Ok(())
    }

    async fn switch_branch_line(&self, name: &str) -> Result<()> {
        self.run(&["checkout", name]).await?;
        Ok(())
    }

    async fn reset_to(&self, token: &str) -> Result<()> {
        self.run(&["reset", "--hard", token]).await?;
        Ok(())
    }

    async fn has_pending_changes(&self) -> Result<bool> {
        let status = self.run(&["status", "--porcelain"]).await?;
        Ok(!status.is_empty())
    }

    async fn record_change(&self, label: &str) -> Result<String> {
        self.run(&["add", "-A"]).await?;
        self.run(&["commit", "--allow-empty", "-m", label]).await?;
        self.current_revision_token().await
    }

    async fn move_pending_content_onto_new_branch(&self, name: &str, token: &str) -> Result<()> {
        let stashed = self.has_pending_changes().await?;
        if stashed {
            self.run(&["stash", "push", "--include-untracked", "-m", "waypoint: carry to new line"])
                .await?;
        }
        let switched = self.run(&["checkout", "-b", name, token]).await;
        if stashed {
            // Restore the content even when the new line could not be created
            self.run(&["stash", "pop"]).await?;
        }
        switched.map(|_| ())
    }

    async fn apply_net_change(&self, token: &str) -> Result<()> {
        self.run(&["merge", "--squash", token]).await?;
        Ok(())
    }

    async fn keep_revision(&self, token: &str) -> Result<()> {
        let name = format!("{CHECKPOINT_REF_PREFIX}/{token}");
        self.run(&["update-ref", name.as_str(), token]).await?;
        Ok(())
    }

    async fn release_revision(&self, token: &str) -> Result<()> {
        let name = format!("{CHECKPOINT_REF_PREFIX}/{token}");
        self.run(&["update-ref", "-d", name.as_str()]).await?;
        Ok(())
    }

    async fn publish(&self, branch_line: &str) -> Result<()> {
        self.run(&["push", "-u", self.remote.as_str(), branch_line]).await?;
        Ok(())
    }

    async fn fetch_latest(&self) -> Result<()> {
        if !self.has_remote().await? {
            debug!(remote = %self.remote, "no remote configured, skipping fetch");
            return Ok(());
        }
        self.run(&["pull", "--ff-only", self.remote.as_str(), self.primary_line.as_str()]).await?;
        Ok(())
    }

    async fn discard_local_changes(&self) -> Result<()> {
        self.run(&["reset", "--hard", "HEAD"]).await?;
        self.run(&["clean", "-fd"]).await?;
        Ok(())
    }

    async fn remove_branch_line(&self, name: &str) -> Result<()> {
        self.run(&["branch", "-D", name]).await?;
        Ok(())
    }

    async fn switch_to_primary_line(&self) -> Result<()> {
        self.run(&["checkout", self.primary_line.as_str()]).await?;
        Ok(())
    }

    async fn has_remote(&self) -> Result<bool> {
        let remotes = self.run(&["remote"]).await?;
        Ok(remotes.lines().any(|r| r.trim() == self.remote))
    }

    async fn add_remote(&self, url: &str) -> Result<()> {
        self.run(&["remote", "add", self.remote.as_str(), url]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn init_repo() -> (tempfile::TempDir, GitCli) {
        let dir = tempfile::tempdir().unwrap();
        let git = GitCli::new(dir.path(), "main", "origin").with_identity("Test", "test@example.com");
        git.init().await.unwrap();
        (dir, git)
    }

    #[tokio::test]
    async fn test_record_change_returns_head() {
        let (dir, git) = init_repo().await;
        std::fs::write(dir.path().join("a.txt"), "one").unwrap();
        assert!(git.has_pending_changes().await.unwrap());

        let token = git.record_change("first").await.unwrap();
        assert_eq!(token, git.current_revision_token().await.unwrap());
        assert!(!git.has_pending_changes().await.unwrap());
        assert_eq!(git.current_branch_line().await.unwrap(), "main");
    }

    #[tokio::test]
    async fn test_reset_to_restores_content() {
        let (dir, git) = init_repo().await;
        let file = dir.path().join("a.txt");
        std::fs::write(&file, "one").unwrap();
        let first = git.record_change("first").await.unwrap();
        std::fs::write(&file, "two").unwrap();
        git.record_change("second").await.unwrap();

        git.reset_to(&first).await.unwrap();
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "one");
        assert_eq!(git.current_revision_token().await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_move_pending_content_onto_new_branch() {
        let (dir, git) = init_repo().await;
        let file = dir.path().join("a.txt");
        std::fs::write(&file, "one").unwrap();
        let first = git.record_change("first").await.unwrap();
        std::fs::write(&file, "two").unwrap();
        git.record_change("second").await.unwrap();
        std::fs::write(dir.path().join("b.txt"), "pending").unwrap();

        git.move_pending_content_onto_new_branch("fork-3", &first).await.unwrap();
        assert_eq!(git.current_branch_line().await.unwrap(), "fork-3");
        assert_eq!(git.current_revision_token().await.unwrap(), first);
        assert_eq!(std::fs::read_to_string(dir.path().join("b.txt")).unwrap(), "pending");
        assert!(git.has_pending_changes().await.unwrap());
    }

    #[tokio::test]
    async fn test_kept_revision_survives_reset() {
        let (dir, git) = init_repo().await;
        let file = dir.path().join("a.txt");
        std::fs::write(&file, "one").unwrap();
        let first = git.record_change("first").await.unwrap();
        std::fs::write(&file, "two").unwrap();
        let second = git.record_change("second").await.unwrap();
        git.keep_revision(&second).await.unwrap();

        git.reset_to(&first).await.unwrap();
        let pinned = format!("{CHECKPOINT_REF_PREFIX}/{second}");
        assert_eq!(git.run(&["rev-parse", "--verify", pinned.as_str()]).await.unwrap(), second);

        git.release_revision(&second).await.unwrap();
        assert!(git.run(&["rev-parse", "--verify", pinned.as_str()]).await.is_err());
        assert!(git.run(&["for-each-ref", CHECKPOINT_REF_PREFIX]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_branch_lines() {
        let (dir, git) = init_repo().await;
        std::fs::write(dir.path().join("a.txt"), "one").unwrap();
        git.record_change("first").await.unwrap();

        git.create_branch_line("session-1").await.unwrap();
        assert_eq!(git.current_branch_line().await.unwrap(), "session-1");
        git.switch_to_primary_line().await.unwrap();
        assert_eq!(git.current_branch_line().await.unwrap(), "main");
        git.remove_branch_line("session-1").await.unwrap();
        assert!(git.switch_branch_line("session-1").await.is_err());
    }

    #[tokio::test]
    async fn test_discard_local_changes() {
        let (dir, git) = init_repo().await;
        std::fs::write(dir.path().join("a.txt"), "one").unwrap();
        git.record_change("first").await.unwrap();
        std::fs::write(dir.path().join("a.txt"), "edited").unwrap();
        std::fs::write(dir.path().join("new.txt"), "untracked").unwrap();

        git.discard_local_changes().await.unwrap();
        assert!(!git.has_pending_changes().await.unwrap());
        assert!(!dir.path().join("new.txt").exists());
    }

    #[tokio::test]
    async fn test_fetch_latest_without_remote_is_noop() {
        let (_dir, git) = init_repo().await;
        assert!(!git.has_remote().await.unwrap());
        git.fetch_latest().await.unwrap();
        git.add_remote("https://example.com/repo.git").await.unwrap();
        assert!(git.has_remote().await.unwrap());
    }

    #[tokio::test]
    async fn test_failure_maps_to_vcs_error() {
        let (_dir, git) = init_repo().await;
        let err = git.reset_to("does-not-exist").await.unwrap_err();
        assert!(matches!(err, Error::Vcs(_)));
    }
}
