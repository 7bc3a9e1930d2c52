use serde::Deserialize;

fn default_listen_addr() -> String {
    "0.0.0.0:5000".into()
}

fn default_db_name() -> String {
    "devconnect".into()
}

#[derive(Deserialize)]
pub struct AppCfg {
    pub mongo_uri: String,
    #[serde(default = "default_db_name")]
    pub db_name: String,
    pub jwt_secret: String,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Optional GitHub personal access token for the repo-listing proxy;
    /// unauthenticated requests work but are heavily rate limited.
    pub github_token: Option<String>,
}
