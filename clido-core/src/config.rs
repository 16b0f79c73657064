use std::path::PathBuf;

use crate::error::{Error, Result};

/// Runtime settings resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
}

impl Config {
    /// Uses `db_path` when given, otherwise `<data dir>/clido/data.db`.
    pub fn resolve(db_path: Option<PathBuf>) -> Result<Self> {
        let db_path = match db_path {
            Some(path) => path,
            None => default_db_path()?,
        };
        Ok(Config { db_path })
    }
}

pub fn default_db_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".local/share")))
        .ok_or_else(|| Error::validation("could not find a data directory for the database"))?;

    Ok(data_dir.join("clido").join("data.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let config = Config::resolve(Some(PathBuf::from("/tmp/clido-test.db"))).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/clido-test.db"));
    }
}
