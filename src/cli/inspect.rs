// src/cli/inspect.rs — `stages`, `vocab` and `check` commands

use std::path::Path;

use crate::infra::config::Config;
use crate::predicate::Predicate;
use crate::stages::StageSet;
use crate::vocab::Vocabulary;

pub fn show_stages(path: Option<&Path>, config: &Config) -> anyhow::Result<()> {
    let policy = config.pipeline.missing_predicate;
    let set = match path {
        Some(p) => StageSet::load(p, policy)?,
        None => StageSet::builtin(policy)?,
    };

    for stage in set.stages() {
        println!("Stage {}", stage.index + 1);
        println!("  system:    {}", stage.system_instruction);
        println!("  prompt:    {}", stage.prompt_template);
        match stage.predicate {
            Some(ref p) => println!("  predicate: {p}"),
            None => println!("  predicate: (none, {policy})"),
        }
    }
    Ok(())
}

pub fn show_vocab(path: &Path, top_n: Option<usize>, show: usize) -> anyhow::Result<()> {
    let mut vocab = Vocabulary::load(path)?;
    let total = vocab.len();
    if let Some(n) = top_n {
        vocab.truncate(n);
    }

    println!("{}: {} entries", path.display(), total);
    if vocab.len() != total {
        println!("testing the first {}", vocab.len());
    }
    for entry in vocab.entries().iter().take(show) {
        println!("  {:>8}  {:?}", entry.id, entry.text);
    }
    Ok(())
}

/// Compile and evaluate. Runtime errors are reported, then counted as false.
pub fn check_predicate(source: &str, token: &str, result: &str) -> anyhow::Result<bool> {
    let predicate = Predicate::compile(source)?;
    let verdict = match predicate.eval(token, result) {
        Ok(v) => v,
        Err(e) => {
            println!("runtime error: {e}");
            false
        }
    };
    println!("{verdict}");
    Ok(verdict)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_predicate_verdicts() {
        assert!(check_predicate("token in result", "cat", "a cat").unwrap());
        assert!(!check_predicate("token in result", "dog", "woof").unwrap());
        assert!(!check_predicate("int(result) > 0", "", "nope").unwrap());
    }

    #[test]
    fn test_check_predicate_compile_error() {
        assert!(check_predicate("__import__('os')", "", "").is_err());
    }

    #[test]
    fn test_show_builtin_stages() {
        assert!(show_stages(None, &Config::default()).is_ok());
    }

    #[test]
    fn test_show_vocab_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.csv");
        std::fs::write(&path, "token_id;token\n1;a\n2;b\n").unwrap();
        assert!(show_vocab(&path, Some(1), 5).is_ok());
        assert!(show_vocab(&dir.path().join("tokens.txt"), None, 5).is_err());
    }
}
