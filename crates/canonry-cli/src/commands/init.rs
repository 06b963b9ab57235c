use crate::support::{print_json, yes_no};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

const STARTER_CONFIG: &str = r#"# Canonry engine configuration. Every section is optional.

[repair]
missing-reference-policy = "suggest-nearest"
max-missing-references = 100

[heuristic]
include-fields = []
opt-out-fields = []

[catalog]
canonical = []

[rename.overrides]
"#;

#[derive(Debug, Clone)]
pub struct InitOutcome {
    pub root: PathBuf,
    pub corpus_dir: PathBuf,
    pub config_path: PathBuf,
    pub created_root: bool,
    pub created_corpus_dir: bool,
    pub created_config: bool,
}

pub fn init_layout(path: impl AsRef<Path>) -> Result<InitOutcome, String> {
    let root = path.as_ref().to_path_buf();

    let mut created_root = false;
    if !root.exists() {
        fs::create_dir_all(&root)
            .map_err(|e| format!("failed to create init path {}: {e}", root.display()))?;
        created_root = true;
    }
    if !root.is_dir() {
        return Err(format!("init path is not a directory: {}", root.display()));
    }

    let corpus_dir = root.join("corpus");
    let mut created_corpus_dir = false;
    if !corpus_dir.exists() {
        fs::create_dir_all(&corpus_dir).map_err(|e| {
            format!(
                "failed to create corpus directory {}: {e}",
                corpus_dir.display()
            )
        })?;
        created_corpus_dir = true;
    }
    if !corpus_dir.is_dir() {
        return Err(format!(
            "corpus path is not a directory: {}",
            corpus_dir.display()
        ));
    }

    let config_path = root.join("canonry.toml");
    if config_path.exists() && !config_path.is_file() {
        return Err(format!(
            "config path exists but is not a file: {}",
            config_path.display()
        ));
    }

    let mut created_config = false;
    if !config_path.exists() {
        fs::write(&config_path, STARTER_CONFIG)
            .map_err(|e| format!("failed to write {}: {e}", config_path.display()))?;
        created_config = true;
    }

    Ok(InitOutcome {
        root,
        corpus_dir,
        config_path,
        created_root,
        created_corpus_dir,
        created_config,
    })
}

pub fn run(path: String, json_output: bool) {
    let outcome = init_layout(&path).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });

    if json_output {
        print_json(&json!({
            "action": "init",
            "root": outcome.root.display().to_string(),
            "corpusDir": outcome.corpus_dir.display().to_string(),
            "configPath": outcome.config_path.display().to_string(),
            "createdRoot": outcome.created_root,
            "createdCorpusDir": outcome.created_corpus_dir,
            "createdConfig": outcome.created_config,
        }));
    } else {
        println!("canonry init {path}");
        println!();
        println!("  root: {}", outcome.root.display());
        println!("  corpus dir: {}", outcome.corpus_dir.display());
        println!("  config path: {}", outcome.config_path.display());
        println!("  created root: {}", yes_no(outcome.created_root));
        println!("  created corpus dir: {}", yes_no(outcome.created_corpus_dir));
        println!("  created config: {}", yes_no(outcome.created_config));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canonry_engine::Config;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "canonry-cli-init-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should exist");
        path
    }

    #[test]
    fn init_layout_scaffolds_corpus_and_config() {
        let root = temp_dir("create");
        let outcome = init_layout(&root).expect("init should succeed");
        assert!(outcome.corpus_dir.is_dir());
        assert!(outcome.config_path.is_file());
        assert!(outcome.created_corpus_dir);
        assert!(outcome.created_config);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn init_layout_is_idempotent() {
        let root = temp_dir("idempotent");
        init_layout(&root).expect("first init should succeed");
        let second = init_layout(&root).expect("second init should succeed");
        assert!(!second.created_root);
        assert!(!second.created_corpus_dir);
        assert!(!second.created_config);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn starter_config_parses() {
        let root = temp_dir("starter");
        let outcome = init_layout(&root).expect("init should succeed");
        let config = Config::load(&outcome.config_path).expect("starter config should parse");
        assert_eq!(config, Config::default());
        let _ = fs::remove_dir_all(&root);
    }
}
