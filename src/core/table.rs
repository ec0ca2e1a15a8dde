// src/core/table.rs — Semicolon-delimited result table (final output and checkpoints)

use std::io::Write;
use std::path::Path;

use super::types::Candidate;
use crate::infra::errors::GlitchError;

/// Rows of `token_id;token;res_1..res_N`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultTable {
    columns: usize,
    rows: Vec<Candidate>,
}

impl ResultTable {
    /// `columns` is the number of `res_*` columns in the header.
    pub fn new(columns: usize, rows: Vec<Candidate>) -> Self {
        Self { columns, rows }
    }

    pub fn header(&self) -> Vec<String> {
        let mut header = vec!["token_id".to_string(), "token".to_string()];
        header.extend((1..=self.columns).map(|i| format!("res_{i}")));
        header
    }

    pub fn rows(&self) -> &[Candidate] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn write_csv(&self, writer: impl Write) -> Result<(), GlitchError> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b';')
            .flexible(true)
            .from_writer(writer);

        wtr.write_record(self.header())?;
        for row in &self.rows {
            let mut record = Vec::with_capacity(2 + row.outputs.len());
            record.push(row.id().to_string());
            record.push(row.text().to_string());
            record.extend(row.outputs.iter().cloned());
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String, GlitchError> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        String::from_utf8(buf).map_err(|e| GlitchError::Other(e.into()))
    }

    /// Write to `path` through a temporary sibling and a rename, so readers
    /// never see a partial file.
    pub fn save(&self, path: &Path) -> Result<(), GlitchError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = std::path::PathBuf::from(tmp);

        let file = std::fs::File::create(&tmp)?;
        self.write_csv(std::io::BufWriter::new(file))?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::VocabularyEntry;
    use pretty_assertions::assert_eq;

    fn row(id: i64, text: &str, outputs: &[&str]) -> Candidate {
        outputs.iter().fold(
            Candidate::new(VocabularyEntry::new(id, text)),
            |c, o| c.survive(o.to_string()),
        )
    }

    #[test]
    fn test_header() {
        let t = ResultTable::new(3, vec![]);
        assert_eq!(t.header(), vec!["token_id", "token", "res_1", "res_2", "res_3"]);
    }

    #[test]
    fn test_csv_output() {
        let t = ResultTable::new(2, vec![row(2, "dog", &["woof", "bark"])]);
        assert_eq!(
            t.to_csv_string().unwrap(),
            "token_id;token;res_1;res_2\n2;dog;woof;bark\n"
        );
    }

    #[test]
    fn test_fields_with_delimiters_are_quoted() {
        let t = ResultTable::new(1, vec![row(1, "a;b", &["line\nbreak"])]);
        assert_eq!(
            t.to_csv_string().unwrap(),
            "token_id;token;res_1\n1;\"a;b\";\"line\nbreak\"\n"
        );
    }

    #[test]
    fn test_empty_table_writes_header_only() {
        let t = ResultTable::new(1, vec![]);
        assert_eq!(t.to_csv_string().unwrap(), "token_id;token;res_1\n");
    }

    #[test]
    fn test_save_creates_parent_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.csv");
        ResultTable::new(1, vec![row(1, "x", &["y"])]).save(&path).unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "token_id;token;res_1\n1;x;y\n"
        );
        let names: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("out.csv")]);
    }
}
