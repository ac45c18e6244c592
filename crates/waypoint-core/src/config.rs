use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct WaypointConfig {
    pub db_path: PathBuf,
    pub repo_path: PathBuf,
    pub primary_line: String,
    pub remote: String,
    pub github_api_url: String,
    pub github_token: Option<String>,
    pub github_owner: Option<String>,
    pub github_repo: Option<String>,
    pub templates_dir: Option<PathBuf>,
    pub git_user_name: Option<String>,
    pub git_user_email: Option<String>,
}

impl WaypointConfig {
    /// `$HOME/.waypoint/waypoint.db`, or `./waypoint.db` without a home directory.
    pub fn default_db_path() -> PathBuf {
        match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(".waypoint").join("waypoint.db"),
            None => PathBuf::from("waypoint.db"),
        }
    }
}

impl Default for WaypointConfig {
    fn default() -> Self {
        Self {
            db_path: Self::default_db_path(),
            repo_path: PathBuf::from("."),
            primary_line: "main".to_string(),
            remote: "origin".to_string(),
            github_api_url: "https://api.github.com".to_string(),
            github_token: None,
            github_owner: None,
            github_repo: None,
            templates_dir: None,
            git_user_name: None,
            git_user_email: None,
        }
    }
}
