// src/vocab/mod.rs — Vocabulary loading (tokenizer CSV / tokenizer JSON)
//
// Two source shapes are accepted:
//   .csv   semicolon separated, header row, `token_id;token`
//   .json  tokenizer document with a `model.vocab` object of text -> id
// Entries keep source order so `top_n` truncation is positional.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::infra::errors::GlitchError;

const ACCEPTED_SHAPES: &str =
    "expected .csv ([TOKEN_ID;TOKEN]) or .json ({\"model\": {\"vocab\": {\"<token>\": <id>}}})";

/// One tokenizer entry. `text` is kept byte-for-byte, control characters included.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VocabularyEntry {
    pub id: i64,
    pub text: String,
}

impl VocabularyEntry {
    pub fn new(id: i64, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }
}

/// A loaded vocabulary with unique ids, in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vocabulary {
    entries: Vec<VocabularyEntry>,
}

impl Vocabulary {
    /// Build from entries, rejecting duplicate ids.
    pub fn from_entries(entries: Vec<VocabularyEntry>) -> Result<Self, String> {
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !seen.insert(entry.id) {
                return Err(format!("duplicate token id {}", entry.id));
            }
        }
        Ok(Self { entries })
    }

    /// Load a vocabulary file, dispatching on its extension.
    pub fn load(path: &Path) -> Result<Self, GlitchError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let vocab = match ext.as_deref() {
            Some("csv") => {
                let file = std::fs::File::open(path)?;
                Self::from_csv_reader(file).map_err(|m| GlitchError::format(path, m))?
            }
            Some("json") => {
                let bytes = std::fs::read(path)?;
                let content = String::from_utf8(bytes)
                    .map_err(|e| GlitchError::format(path, format!("not valid UTF-8: {e}")))?;
                Self::from_json_str(&content).map_err(|m| GlitchError::format(path, m))?
            }
            _ => return Err(GlitchError::format(path, ACCEPTED_SHAPES)),
        };

        tracing::info!("Loaded {} tokens from {}", vocab.len(), path.display());
        Ok(vocab)
    }

    /// Parse `token_id;token` rows after a header row.
    pub fn from_csv_reader(reader: impl Read) -> Result<Self, String> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let mut entries = Vec::new();
        for (row, record) in rdr.records().enumerate() {
            // +2: one for the header, one for 1-based line numbers
            let line = row + 2;
            let record = record.map_err(|e| format!("row {line}: {e}"))?;
            let id_field = record
                .get(0)
                .ok_or_else(|| format!("row {line}: missing token id"))?;
            let id = id_field
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("row {line}: token id {id_field:?} is not an integer"))?;
            let text = record
                .get(1)
                .ok_or_else(|| format!("row {line}: missing token column"))?;
            entries.push(VocabularyEntry::new(id, text));
        }

        Self::from_entries(entries)
    }

    /// Invert a tokenizer document's `model.vocab` (text -> id) into entries.
    pub fn from_json_str(content: &str) -> Result<Self, String> {
        let doc: serde_json::Value =
            serde_json::from_str(content).map_err(|e| format!("invalid JSON: {e}"))?;
        let vocab = doc
            .get("model")
            .and_then(|m| m.get("vocab"))
            .and_then(|v| v.as_object())
            .ok_or_else(|| "no `model.vocab` object in tokenizer document".to_string())?;

        let entries = vocab
            .iter()
            .map(|(text, id)| {
                id.as_i64()
                    .map(|id| VocabularyEntry::new(id, text.clone()))
                    .ok_or_else(|| format!("id for token {text:?} is not an integer: {id}"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_entries(entries)
    }

    /// Keep only the first `n` entries in source order (not the `n` lowest ids).
    pub fn truncate(&mut self, n: usize) {
        let before = self.entries.len();
        self.entries.truncate(n);
        if self.entries.len() < before {
            tracing::info!("Sliced token set from {} to {} tokens", before, self.entries.len());
        }
    }

    pub fn entries(&self) -> &[VocabularyEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<VocabularyEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

}
