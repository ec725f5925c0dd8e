use std::path::PathBuf;

/// Environment variable naming the database file. Also read from `.env`.
pub const DB_ENV: &str = "SKILLS_MAPPED_DB";

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub verbose: bool,
}

impl Config {
    /// `--db` wins, then `SKILLS_MAPPED_DB`, then the platform data dir.
    pub fn load(db_flag: Option<PathBuf>, verbose: bool) -> Self {
        let _ = dotenvy::dotenv();
        let from_env = std::env::var_os(DB_ENV).map(PathBuf::from);
        Self {
            db_path: resolve_db_path(db_flag, from_env),
            verbose,
        }
    }
}

fn resolve_db_path(flag: Option<PathBuf>, env: Option<PathBuf>) -> PathBuf {
    flag.or(env)
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    // XDG data directory, or the working directory as a fallback
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "skills-mapped") {
        proj_dirs.data_dir().join("skills-mapped.db")
    } else {
        PathBuf::from("skills-mapped.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_beats_env() {
        let path = resolve_db_path(Some("cli.db".into()), Some("env.db".into()));
        assert_eq!(path, PathBuf::from("cli.db"));
    }

    #[test]
    fn env_used_without_flag() {
        let path = resolve_db_path(None, Some("env.db".into()));
        assert_eq!(path, PathBuf::from("env.db"));
    }

    #[test]
    fn empty_values_fall_back_to_default() {
        assert_eq!(resolve_db_path(None, Some("".into())), default_db_path());
        assert_eq!(resolve_db_path(None, None), default_db_path());
        assert!(default_db_path().ends_with("skills-mapped.db"));
    }
}
