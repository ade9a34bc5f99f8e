//! Probe question loading.
//!
//! Every image is probed with the same flat list of visual-QA questions,
//! read once at startup.

use std::path::Path;

use crate::error::PipelineError;

/// Load the probe question list, one question per line.
///
/// Blank lines and `#` comments are skipped. A missing file is fatal —
/// the question list is a required artifact.
pub fn load_questions(path: &Path) -> Result<Vec<String>, PipelineError> {
    let content = std::fs::read_to_string(path).map_err(|e| PipelineError::Questions {
        path: path.to_path_buf(),
        message: format!("Failed to read question list: {e}"),
    })?;

    let questions: Vec<String> = content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|l| l.to_string())
        .collect();

    if questions.is_empty() {
        return Err(PipelineError::Questions {
            path: path.to_path_buf(),
            message: "Question list contains no questions".to_string(),
        });
    }

    tracing::info!("Loaded {} probe questions", questions.len());
    Ok(questions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_questions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vqa_questions.txt");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "# probe questions").unwrap();
        writeln!(f, "what is this person wearing?").unwrap();
        writeln!(f).unwrap();
        writeln!(f, "  where was this photo taken?  ").unwrap();

        let questions = load_questions(&path).unwrap();
        assert_eq!(
            questions,
            vec![
                "what is this person wearing?",
                "where was this photo taken?"
            ]
        );
    }

    #[test]
    fn test_load_questions_missing_file_is_fatal() {
        assert!(load_questions(Path::new("/nonexistent/questions.txt")).is_err());
    }

    #[test]
    fn test_load_questions_empty_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vqa_questions.txt");
        std::fs::write(&path, "# only a comment\n").unwrap();
        assert!(load_questions(&path).is_err());
    }
}
