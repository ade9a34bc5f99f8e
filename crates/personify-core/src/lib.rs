//! Personify Core - Embeddable persona-building library.
//!
//! Personify turns a user-supplied photo into a small set of persona
//! sentences for a chat bot: concepts extracted from the image are scored,
//! expanded with word-vector synonyms, matched against a persona catalog in
//! sentence-embedding space, and greedily filtered for category diversity
//! and mutual consistency.
//!
//! # Architecture
//!
//! ```text
//! Image → Detect → Visual QA → Fuse scores → Semantic search → Select → Personas
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use personify_core::{Config, Personify};
//!
//! fn main() -> personify_core::Result<()> {
//!     let config = Config::load()?;
//!     let personify = Personify::new(config)?;
//!
//!     let selection = personify.persona_list("./photo.jpg".as_ref(), 5)?;
//!     println!("Personas: {:?}", selection.personas);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod catalog;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod fusion;
pub mod math;
pub mod questions;
pub mod search;
pub mod selector;
pub mod synonyms;
pub mod types;

// Re-exports for convenient access
pub use catalog::{CatalogEntry, PersonaCatalog};
pub use collaborators::{Collaborators, Detection, RegionFeatures};
pub use config::Config;
pub use error::{ConfigError, PersonifyError, PipelineError, PipelineResult, Result};
pub use fusion::ScoreFusion;
pub use search::SemanticSearch;
pub use selector::PersonaSelector;
pub use synonyms::SynonymIndex;
pub use types::{NliLabel, PersonaSelection, Provenance, RankedPersona, Term, VqaAnswer};

use std::path::Path;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Persona builder - the main entry point.
///
/// Holds the catalog, question list, optional synonym index, and the model
/// collaborators, all loaded once at construction. Every persona-building
/// call is synchronous and works on per-request state only, so one instance
/// can serve concurrent requests.
pub struct Personify {
    config: Config,
    catalog: PersonaCatalog,
    questions: Vec<String>,
    synonyms: Option<SynonymIndex>,
    collaborators: Collaborators,
    fusion: ScoreFusion,
    search: SemanticSearch,
    selector: PersonaSelector,
}

impl Personify {
    /// Create a new Personify instance, loading the collaborators named in
    /// config along with the catalog, question list, and synonym index.
    pub fn new(config: Config) -> Result<Self> {
        let collaborators = Collaborators::from_config(&config)?;
        Self::with_collaborators(config, collaborators)
    }

    /// Create a Personify instance with pre-built collaborators.
    ///
    /// The catalog and question list are required artifacts: a missing or
    /// empty file fails construction. The synonym index is optional and
    /// fusion degrades to unexpanded scores without it.
    pub fn with_collaborators(config: Config, collaborators: Collaborators) -> Result<Self> {
        tracing::debug!("Initializing Personify v{}", VERSION);

        let catalog = PersonaCatalog::load(&config.catalog_path())?;
        let questions = questions::load_questions(&config.questions_path())?;
        let synonyms = SynonymIndex::try_load(&config.synonyms_dir());

        let fusion = ScoreFusion::new(config.fusion.clone());
        let search = SemanticSearch::new(config.search.clone());
        let selector = PersonaSelector::new(config.selection.clone());

        Ok(Self {
            config,
            catalog,
            questions,
            synonyms,
            collaborators,
            fusion,
            search,
            selector,
        })
    }

    /// Build a persona list from an image.
    ///
    /// Runs the full pipeline: detection, visual QA, score fusion, semantic
    /// search against the catalog, then greedy selection of up to `count`
    /// personas. The result may be shorter than `count` when the ranked
    /// candidate list is exhausted.
    pub fn persona_list(&self, image: &Path, count: usize) -> Result<PersonaSelection> {
        if !image.exists() {
            return Err(PipelineError::FileNotFound(image.to_path_buf()).into());
        }

        let detection = self.collaborators.detector.detect(image)?;
        let answers = self
            .collaborators
            .vqa
            .answer(&detection.regions, &self.questions)?;

        let terms = self
            .fusion
            .fuse(&detection.labels, &answers, self.synonyms.as_ref());

        let ranked = self
            .search
            .search(self.collaborators.encoder.as_ref(), &self.catalog, &terms)?;

        let selection = self.selector.select(
            &ranked,
            &self.catalog,
            self.collaborators.nli.as_ref(),
            count,
        )?;

        tracing::info!(
            "Built {} personas from {:?} ({} terms, {} candidates)",
            selection.len(),
            image,
            terms.len(),
            ranked.len()
        );
        Ok(selection)
    }

    /// Build a persona list with the configured default count.
    pub fn default_persona_list(&self, image: &Path) -> Result<PersonaSelection> {
        self.persona_list(image, self.config.selection.output_count)
    }

    /// Sample `count` personas uniformly at random, for users without an
    /// image. No scoring, diversity, or consistency constraint applies.
    pub fn random_persona_list(&self, count: usize) -> PersonaSelection {
        let personas = self.catalog.sample_random(count);
        let labels = personas
            .iter()
            .map(|s| self.catalog.label_of(s).unwrap_or_default().to_string())
            .collect();
        PersonaSelection { personas, labels }
    }

    /// Run the image stages only and return the fused term scores, sorted
    /// descending. Diagnostic surface for inspecting what the pipeline saw.
    pub fn term_scores(&self, image: &Path) -> Result<Vec<Term>> {
        if !image.exists() {
            return Err(PipelineError::FileNotFound(image.to_path_buf()).into());
        }

        let detection = self.collaborators.detector.detect(image)?;
        let answers = self
            .collaborators
            .vqa
            .answer(&detection.regions, &self.questions)?;

        let terms = self
            .fusion
            .fuse(&detection.labels, &answers, self.synonyms.as_ref());

        let mut sorted: Vec<Term> = terms.into_values().collect();
        sorted.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.text.cmp(&b.text))
        });
        Ok(sorted)
    }

    /// Get a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get a reference to the loaded persona catalog.
    pub fn catalog(&self) -> &PersonaCatalog {
        &self.catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{NliClassifier, ObjectDetector, SentenceEncoder, VisualQa};
    use std::collections::HashMap;
    use std::io::Write;
    use std::path::PathBuf;

    struct FixedDetector {
        labels: Vec<String>,
    }

    impl ObjectDetector for FixedDetector {
        fn detect(&self, _path: &Path) -> std::result::Result<Detection, PipelineError> {
            Ok(Detection {
                labels: self.labels.clone(),
                regions: RegionFeatures {
                    boxes: vec![[0.1, 0.1, 0.5, 0.5]],
                    features: vec![vec![0.0; 8]],
                },
            })
        }
    }

    struct FixedVqa {
        answers: Vec<String>,
    }

    impl VisualQa for FixedVqa {
        fn answer(
            &self,
            _regions: &RegionFeatures,
            questions: &[String],
        ) -> std::result::Result<Vec<VqaAnswer>, PipelineError> {
            Ok(self
                .answers
                .iter()
                .enumerate()
                .map(|(i, a)| VqaAnswer {
                    question: questions.get(i).cloned().unwrap_or_default(),
                    answer: a.clone(),
                    region: None,
                })
                .collect())
        }
    }

    struct TableEncoder(HashMap<String, Vec<f32>>);

    impl SentenceEncoder for TableEncoder {
        fn encode(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, PipelineError> {
            texts
                .iter()
                .map(|t| {
                    self.0.get(t).cloned().ok_or_else(|| PipelineError::Encoding {
                        message: format!("no vector for {t:?}"),
                    })
                })
                .collect()
        }
    }

    struct ScriptedNli {
        contradictions: Vec<(String, String)>,
    }

    impl NliClassifier for ScriptedNli {
        fn classify(
            &self,
            premise: &str,
            hypothesis: &str,
        ) -> std::result::Result<NliLabel, PipelineError> {
            let hit = self
                .contradictions
                .iter()
                .any(|(p, h)| p == premise && h == hypothesis);
            Ok(if hit {
                NliLabel::Contradiction
            } else {
                NliLabel::Neutral
            })
        }
    }

    /// Fixture: catalog + question files in a tempdir, a dummy image, and
    /// an encoder table covering terms and catalog sentences.
    struct Fixture {
        _dir: tempfile::TempDir,
        config: Config,
        image: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        std::fs::create_dir_all(&data_dir).unwrap();

        let mut catalog = std::fs::File::create(data_dir.join("persona_catalog.csv")).unwrap();
        writeln!(catalog, "index,sentence,label").unwrap();
        writeln!(catalog, "0,I like dogs.,pets").unwrap();
        writeln!(catalog, "1,I often walk my dog.,pets").unwrap();
        writeln!(catalog, "2,I play tennis.,sports").unwrap();

        std::fs::write(
            data_dir.join("vqa_questions.txt"),
            "what is in the photo?\n",
        )
        .unwrap();

        let image = dir.path().join("photo.jpg");
        std::fs::write(&image, b"not a real image; fakes never open it").unwrap();

        let mut config = Config::default();
        config.general.data_dir = data_dir;

        Fixture {
            _dir: dir,
            config,
            image,
        }
    }

    fn encoder() -> TableEncoder {
        let table: HashMap<String, Vec<f32>> = [
            ("dog", vec![1.0, 0.0]),
            ("ball", vec![0.0, 1.0]),
            ("I like dogs.", vec![0.9, 0.435_89]),
            ("I often walk my dog.", vec![0.8, 0.6]),
            ("I play tennis.", vec![0.0, 1.0]),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        TableEncoder(table)
    }

    fn personify(fixture: &Fixture, nli: ScriptedNli) -> Personify {
        let collaborators = Collaborators::new(
            Box::new(FixedDetector {
                labels: vec!["dog".to_string()],
            }),
            Box::new(FixedVqa {
                answers: vec!["ball".to_string()],
            }),
            Box::new(encoder()),
            Box::new(nli),
        );
        Personify::with_collaborators(fixture.config.clone(), collaborators).unwrap()
    }

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_persona_list_end_to_end() {
        let fixture = fixture();
        let personify = personify(&fixture, ScriptedNli {
            contradictions: vec![],
        });

        let selection = personify.persona_list(&fixture.image, 2).unwrap();

        // "I like dogs." scores 1.0/1.1 off the detection term; "I play
        // tennis." scores 0.9/1.0 off the VQA term; the second pets
        // sentence loses to the category-diversity rule anyway.
        assert_eq!(selection.personas, vec!["I like dogs.", "I play tennis."]);
        assert_eq!(selection.labels, vec!["pets", "sports"]);
    }

    #[test]
    fn test_persona_list_contradiction_shrinks_result() {
        let fixture = fixture();
        let personify = personify(&fixture, ScriptedNli {
            contradictions: vec![("I like dogs.".to_string(), "I play tennis.".to_string())],
        });

        // Tennis is vetoed and the remaining pets sentence is a category
        // duplicate, so the result is short.
        let selection = personify.persona_list(&fixture.image, 2).unwrap();
        assert_eq!(selection.personas, vec!["I like dogs."]);
    }

    #[test]
    fn test_persona_list_missing_image() {
        let fixture = fixture();
        let personify = personify(&fixture, ScriptedNli {
            contradictions: vec![],
        });

        let err = personify
            .persona_list(Path::new("/nonexistent/photo.jpg"), 2)
            .unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }

    #[test]
    fn test_random_persona_list_covers_catalog() {
        let fixture = fixture();
        let personify = personify(&fixture, ScriptedNli {
            contradictions: vec![],
        });

        let selection = personify.random_persona_list(2);
        assert_eq!(selection.len(), 2);
        for (persona, label) in selection.personas.iter().zip(selection.labels.iter()) {
            assert_eq!(personify.catalog().label_of(persona), Some(label.as_str()));
        }
    }

    #[test]
    fn test_term_scores_sorted_descending() {
        let fixture = fixture();
        let personify = personify(&fixture, ScriptedNli {
            contradictions: vec![],
        });

        let terms = personify.term_scores(&fixture.image).unwrap();
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[0].text, "dog");
        assert_eq!(terms[1].text, "ball");
        assert!(terms[0].score >= terms[1].score);
    }

    #[test]
    fn test_missing_catalog_fails_construction() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.general.data_dir = dir.path().join("empty");

        let collaborators = Collaborators::new(
            Box::new(FixedDetector { labels: vec![] }),
            Box::new(FixedVqa { answers: vec![] }),
            Box::new(encoder()),
            Box::new(ScriptedNli {
                contradictions: vec![],
            }),
        );
        assert!(Personify::with_collaborators(config, collaborators).is_err());
    }
}
