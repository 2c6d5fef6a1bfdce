use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct Config {
    /// Path of the SQLite database file.
    pub database_path: String,
    /// Directory pictogram attachments are stored under.
    pub attachments_dir: String,
    /// Acting user when a command does not pass `--user`.
    pub default_user: Option<Uuid>,
    /// Window for `list --planned` when no day count is given.
    pub planned_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "tutela.db".to_string(),
            attachments_dir: "attachments".to_string(),
            default_user: None,
            planned_days: 7,
        }
    }
}

impl Config {
    pub fn new() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("tutela.toml"))
            .merge(Env::prefixed("TUTELA_"))
            .extract()
    }
}
