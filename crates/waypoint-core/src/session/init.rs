use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::hosting::RemoteRepository;
use crate::session::SessionEngine;
use crate::templates::README_FILE;

pub const INITIAL_LABEL: &str = "initial commit";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitRequest {
    /// Project name; defaults to the repository directory name.
    pub name: Option<String>,
    pub create_remote: bool,
}

#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitResponse {
    pub name: String,
    pub token: String,
    pub files_written: Vec<String>,
    pub remote: Option<RemoteRepository>,
}

/// Prepare a repository for sessions. The checkpoint store is not touched.
pub async fn execute(engine: &SessionEngine, request: InitRequest) -> Result<InitResponse> {
    let name = request.name.unwrap_or_else(|| {
        engine
            .repo_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string())
    });

    engine.content.init().await?;

    let mut files_written = Vec::new();
    for (file, text) in [
        (".gitignore", engine.templates.gitignore.clone()),
        (README_FILE, engine.templates.readme_for(&name)),
    ] {
        let path = engine.repo_path.join(file);
        if !tokio::fs::try_exists(&path).await? {
            tokio::fs::write(&path, text).await?;
            files_written.push(file.to_string());
        }
    }

    // A fresh repository has no HEAD yet
    let head = engine.content.current_revision_token().await.ok();
    let pending = engine.content.has_pending_changes().await?;
    let token = match head {
        Some(head) if !pending => head,
        _ => engine.content.record_change(INITIAL_LABEL).await?,
    };

    let remote = if request.create_remote {
        let remote = engine.hosting.create_remote_repository(&name).await?;
        if !engine.content.has_remote().await? {
            engine.content.add_remote(&remote.clone_url).await?;
        }
        engine.content.publish(&engine.primary_line).await?;
        Some(remote)
    } else {
        None
    };

    tracing::info!(name = %name, files = files_written.len(), "repository initialized");
    Ok(InitResponse {
        name,
        token,
        files_written,
        remote,
    })
}
