// tests/vocab_test.rs — Integration test: vocabulary and stage files on disk

use std::collections::BTreeMap;
use std::path::Path;

use pretty_assertions::assert_eq;

use glitchscan::infra::errors::GlitchError;
use glitchscan::stages::{MissingPredicate, StageSet};
use glitchscan::vocab::Vocabulary;

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn id_map(vocab: &Vocabulary) -> BTreeMap<i64, String> {
    vocab
        .entries()
        .iter()
        .map(|e| (e.id, e.text.clone()))
        .collect()
}

fn expected() -> BTreeMap<i64, String> {
    BTreeMap::from([(1, "Banana".to_string()), (2, "∅".to_string())])
}

#[test]
fn test_csv_and_json_load_the_same_map() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write(dir.path(), "tokens.csv", "token_id;token\n1;Banana\n2;∅\n");
    let json = write(
        dir.path(),
        "tokenizer.json",
        r#"{"version": "1.0", "model": {"type": "BPE", "vocab": {"Banana": 1, "∅": 2}}}"#,
    );

    assert_eq!(id_map(&Vocabulary::load(&csv).unwrap()), expected());
    assert_eq!(id_map(&Vocabulary::load(&json).unwrap()), expected());
}

#[test]
fn test_extension_is_case_insensitive() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "TOKENS.CSV", "token_id;token\n1;Banana\n2;∅\n");
    assert_eq!(id_map(&Vocabulary::load(&path).unwrap()), expected());
}

#[test]
fn test_wrong_extension_is_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "tokens.tsv", "1\tBanana\n");
    assert!(matches!(
        Vocabulary::load(&path),
        Err(GlitchError::Format { .. })
    ));
}

#[test]
fn test_malformed_json_is_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "tokenizer.json", r#"{"model": {"vocab": ["a"]}}"#);
    match Vocabulary::load(&path) {
        Err(GlitchError::Format { path: p, message }) => {
            assert_eq!(p, path);
            assert!(message.contains("model.vocab"));
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_json_with_invalid_utf8_is_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tokenizer.json");
    let mut bytes = br#"{"model": {"vocab": {"a"#.to_vec();
    bytes.extend_from_slice(&[0xff, 0xfe]);
    bytes.extend_from_slice(br#"": 1}}}"#);
    std::fs::write(&path, bytes).unwrap();
    match Vocabulary::load(&path) {
        Err(GlitchError::Format { message, .. }) => assert!(message.contains("UTF-8"), "{message}"),
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        Vocabulary::load(&dir.path().join("absent.csv")),
        Err(GlitchError::Io(_))
    ));
}

#[test]
fn test_top_n_keeps_source_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "tokens.csv",
        "token_id;token\n500;late\n3;early\n42;middle\n",
    );
    let mut vocab = Vocabulary::load(&path).unwrap();
    vocab.truncate(2);
    let texts: Vec<&str> = vocab.entries().iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["late", "early"]);
}

#[test]
fn test_stage_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "prompts.csv",
        "index;system_instruction;prompt_template;predicate\n\
         0;Repeat exactly.;Please repeat '{}';token in result\n\
         1;Be helpful.;\"Say \"\"{}\"\" twice\";result.count(token) >= 2\n",
    );
    // count() is not a helper: compile fails at load time
    let err = StageSet::load(&path, MissingPredicate::RetainAll).unwrap_err();
    assert!(matches!(err, GlitchError::Predicate { stage: 1, .. }), "{err}");

    let path = write(
        dir.path(),
        "prompts.csv",
        "index;system_instruction;prompt_template;predicate\n\
         0;Repeat exactly.;Please repeat '{}';token in result\n\
         1;Be helpful.;\"Say \"\"{}\"\" twice\";\n",
    );
    let set = StageSet::load(&path, MissingPredicate::RetainAll).unwrap();
    assert_eq!(set.len(), 2);
    assert_eq!(set.stages()[1].build_prompt("hi"), "Say \"hi\" twice");
    assert!(set.stages()[1].predicate.is_none());

    assert!(StageSet::load(&path, MissingPredicate::Reject).is_err());
}
