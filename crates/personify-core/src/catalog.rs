//! Persona catalog loading.
//!
//! The catalog is a CSV of `index,sentence,category-label` rows loaded once
//! at startup and treated as read-only shared state for the process lifetime.

use std::collections::HashMap;
use std::path::Path;

use rand::seq::SliceRandom;

use crate::error::PipelineError;

/// A single persona catalog entry: a candidate sentence and its category.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    /// The persona sentence (unique key within the catalog)
    pub sentence: String,
    /// Category label, e.g. a topic tag or the catch-all bucket
    pub label: String,
}

/// The fixed set of candidate persona sentences, in file order.
pub struct PersonaCatalog {
    entries: Vec<CatalogEntry>,
    by_sentence: HashMap<String, usize>,
}

impl PersonaCatalog {
    /// Load the catalog from a CSV file.
    ///
    /// The header row is skipped. Rows with fewer than three comma-separated
    /// fields are skipped with a warning. A missing file is fatal — the
    /// catalog is a required artifact.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path).map_err(|e| PipelineError::Catalog {
            path: path.to_path_buf(),
            message: format!("Failed to read catalog: {e}"),
        })?;

        let mut entries = Vec::new();
        let mut by_sentence = HashMap::new();
        let mut skipped = 0usize;

        for (line_no, line) in content.lines().enumerate() {
            if line_no == 0 || line.trim().is_empty() {
                continue;
            }
            let parts: Vec<&str> = line.split(',').collect();
            if parts.len() < 3 {
                tracing::warn!("Skipping malformed catalog row {}: {:?}", line_no + 1, line);
                skipped += 1;
                continue;
            }
            let sentence = parts[1].trim().to_string();
            let label = parts[2].trim().to_string();
            if by_sentence.contains_key(&sentence) {
                tracing::warn!("Skipping duplicate catalog sentence at row {}", line_no + 1);
                skipped += 1;
                continue;
            }
            by_sentence.insert(sentence.clone(), entries.len());
            entries.push(CatalogEntry { sentence, label });
        }

        if entries.is_empty() {
            return Err(PipelineError::Catalog {
                path: path.to_path_buf(),
                message: "Catalog contains no usable rows".to_string(),
            });
        }

        tracing::info!(
            "Loaded persona catalog: {} entries ({} rows skipped)",
            entries.len(),
            skipped,
        );

        Ok(Self {
            entries,
            by_sentence,
        })
    }

    /// Build a catalog directly from (sentence, label) pairs.
    pub fn from_entries(pairs: Vec<(String, String)>) -> Self {
        let mut entries = Vec::with_capacity(pairs.len());
        let mut by_sentence = HashMap::new();
        for (sentence, label) in pairs {
            if by_sentence.contains_key(&sentence) {
                continue;
            }
            by_sentence.insert(sentence.clone(), entries.len());
            entries.push(CatalogEntry { sentence, label });
        }
        Self {
            entries,
            by_sentence,
        }
    }

    /// All entries in catalog order.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// All persona sentences in catalog order.
    pub fn sentences(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.sentence.clone()).collect()
    }

    /// Number of catalog entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the category label of a persona sentence.
    pub fn label_of(&self, sentence: &str) -> Option<&str> {
        self.by_sentence
            .get(sentence)
            .map(|&i| self.entries[i].label.as_str())
    }

    /// Sample `count` persona sentences uniformly at random without
    /// replacement, bypassing scoring and selection constraints entirely.
    ///
    /// Callers must not assume diversity or non-contradiction hold here.
    /// The count is clamped to the catalog size.
    pub fn sample_random(&self, count: usize) -> Vec<String> {
        let mut rng = rand::thread_rng();
        self.entries
            .choose_multiple(&mut rng, count.min(self.entries.len()))
            .map(|e| e.sentence.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io::Write;

    fn write_catalog(rows: &[&str]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persona_catalog.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "index,sentence,label").unwrap();
        for row in rows {
            writeln!(f, "{}", row).unwrap();
        }
        (dir, path)
    }

    #[test]
    fn test_load_skips_header() {
        let (_dir, path) = write_catalog(&["0,I like dogs.,pets", "1,I live by the sea.,home"]);
        let catalog = PersonaCatalog::load(&path).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.entries()[0].sentence, "I like dogs.");
        assert_eq!(catalog.label_of("I live by the sea."), Some("home"));
    }

    #[test]
    fn test_load_skips_malformed_rows() {
        let (_dir, path) = write_catalog(&["0,I like dogs.,pets", "garbage-row", "2,I cook.,food"]);
        let catalog = PersonaCatalog::load(&path).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.label_of("I cook."), Some("food"));
    }

    #[test]
    fn test_load_missing_file_is_fatal() {
        let result = PersonaCatalog::load(Path::new("/nonexistent/persona_catalog.csv"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_empty_catalog_is_fatal() {
        let (_dir, path) = write_catalog(&[]);
        assert!(PersonaCatalog::load(&path).is_err());
    }

    #[test]
    fn test_preserves_file_order() {
        let (_dir, path) = write_catalog(&["0,B sentence,b", "1,A sentence,a", "2,C sentence,c"]);
        let catalog = PersonaCatalog::load(&path).unwrap();
        let sentences = catalog.sentences();
        assert_eq!(sentences, vec!["B sentence", "A sentence", "C sentence"]);
    }

    #[test]
    fn test_sample_random_length_and_uniqueness() {
        let pairs: Vec<(String, String)> = (0..20)
            .map(|i| (format!("persona {i}"), "other".to_string()))
            .collect();
        let catalog = PersonaCatalog::from_entries(pairs);

        let sample = catalog.sample_random(5);
        assert_eq!(sample.len(), 5);
        let unique: HashSet<&String> = sample.iter().collect();
        assert_eq!(unique.len(), 5);
        for sentence in &sample {
            assert!(catalog.label_of(sentence).is_some());
        }
    }

    #[test]
    fn test_sample_random_clamps_to_catalog_size() {
        let catalog = PersonaCatalog::from_entries(vec![
            ("one".to_string(), "a".to_string()),
            ("two".to_string(), "b".to_string()),
        ]);
        assert_eq!(catalog.sample_random(10).len(), 2);
    }
}
