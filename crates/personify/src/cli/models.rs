//! The `personify models` command for managing models and data artifacts.

use clap::{Args, Subcommand};
use personify_core::collaborators::detector::OnnxDetector;
use personify_core::collaborators::encoder::OnnxSentenceEncoder;
use personify_core::collaborators::nli::OnnxNliClassifier;
use personify_core::collaborators::vqa::OnnxVisualQa;
use personify_core::Config;
use std::path::Path;

/// Arguments for the `models` command.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: ModelsCommand,
}

/// Subcommands for model management.
#[derive(Subcommand, Debug)]
pub enum ModelsCommand {
    /// Download required models and install bundled data artifacts
    Download,

    /// List installed models and data artifacts
    List,

    /// Show model directory path
    Path,
}

/// Repository hosting the ONNX model exports.
const MODEL_REPO: &str = "personify-ai/personify-models";

/// One downloadable model: its local subdirectory under the model dir and
/// the files it consists of, with optional BLAKE3 pins.
struct ModelArtifact {
    label: &'static str,
    subdir: String,
    files: &'static [ArtifactFile],
}

struct ArtifactFile {
    name: &'static str,
    remote_dir: &'static str,
    blake3: Option<&'static str>,
}

fn artifacts(config: &Config) -> Vec<ModelArtifact> {
    vec![
        ModelArtifact {
            label: "Object detector",
            subdir: config.models.detector.model.clone(),
            files: &[
                ArtifactFile {
                    name: "model.onnx",
                    remote_dir: "detector",
                    blake3: None,
                },
                ArtifactFile {
                    name: "labels.txt",
                    remote_dir: "detector",
                    blake3: None,
                },
            ],
        },
        ModelArtifact {
            label: "Visual QA",
            subdir: config.models.vqa.model.clone(),
            files: &[
                ArtifactFile {
                    name: "model.onnx",
                    remote_dir: "vqa",
                    blake3: None,
                },
                ArtifactFile {
                    name: "tokenizer.json",
                    remote_dir: "vqa",
                    blake3: None,
                },
            ],
        },
        ModelArtifact {
            label: "Sentence encoder",
            subdir: config.models.encoder.model.clone(),
            files: &[
                ArtifactFile {
                    name: "model.onnx",
                    remote_dir: "encoder",
                    blake3: None,
                },
                ArtifactFile {
                    name: "tokenizer.json",
                    remote_dir: "encoder",
                    blake3: None,
                },
            ],
        },
        ModelArtifact {
            label: "NLI classifier",
            subdir: config.models.nli.model.clone(),
            files: &[
                ArtifactFile {
                    name: "model.onnx",
                    remote_dir: "nli",
                    blake3: None,
                },
                ArtifactFile {
                    name: "tokenizer.json",
                    remote_dir: "nli",
                    blake3: None,
                },
            ],
        },
    ]
}

/// Status of each collaborator's files on disk.
pub struct InstalledModels {
    pub detector: bool,
    pub vqa: bool,
    pub encoder: bool,
    pub nli: bool,
    pub data: bool,
}

impl InstalledModels {
    /// Returns true if everything needed for `personify caption` is present.
    pub fn can_caption(&self) -> bool {
        self.detector && self.vqa && self.encoder && self.nli && self.data
    }
}

/// Check which models and data artifacts are currently installed.
pub fn check_installed(config: &Config) -> InstalledModels {
    let model_dir = config.model_dir();
    InstalledModels {
        detector: OnnxDetector::model_exists(&config.models.detector, &model_dir),
        vqa: OnnxVisualQa::model_exists(&config.models.vqa, &model_dir),
        encoder: OnnxSentenceEncoder::model_exists(&config.models.encoder, &model_dir),
        nli: OnnxNliClassifier::model_exists(&config.models.nli, &model_dir),
        data: config.catalog_path().exists() && config.questions_path().exists(),
    }
}

/// Execute the models command.
pub async fn execute(args: ModelsArgs) -> anyhow::Result<()> {
    let config = Config::load()?;

    match args.command {
        ModelsCommand::Download => {
            let client = reqwest::Client::new();
            download_models(&config, &client).await?;
            install_data(&config)?;
            tracing::info!("All downloads complete.");
        }

        ModelsCommand::List => {
            let model_dir = config.model_dir();

            if !model_dir.exists() {
                println!("No models installed.");
                println!("Run `personify models download` to download required models.");
                return Ok(());
            }

            println!("Installed models:");
            println!("  Directory: {}\n", model_dir.display());

            for artifact in artifacts(&config) {
                let ready = artifact
                    .files
                    .iter()
                    .all(|f| model_dir.join(&artifact.subdir).join(f.name).exists());
                let status = if ready { "ready" } else { "not installed" };
                println!("  - {:20} {:30} {}", artifact.label, artifact.subdir, status);
            }

            println!("\n  Data artifacts:");
            for (name, path) in [
                ("persona catalog", config.catalog_path()),
                ("probe questions", config.questions_path()),
            ] {
                let status = if path.exists() { "ready" } else { "not installed" };
                println!("  - {:20} {:30} {}", name, path.display(), status);
            }
            let synonyms = config.synonyms_dir();
            let status = if synonyms.join("terms.txt").exists() {
                "ready"
            } else {
                "not installed (optional)"
            };
            println!("  - {:20} {:30} {}", "synonym index", synonyms.display(), status);
        }

        ModelsCommand::Path => {
            let model_dir = config.model_dir();
            println!("{}", model_dir.display());
        }
    }

    Ok(())
}

/// Download all collaborator models. Skips already-downloaded files.
pub async fn download_models(config: &Config, client: &reqwest::Client) -> anyhow::Result<()> {
    let model_dir = config.model_dir();

    for artifact in artifacts(config) {
        let artifact_dir = model_dir.join(&artifact.subdir);
        for file in artifact.files {
            let dest = artifact_dir.join(file.name);
            if dest.exists() {
                tracing::info!("{} {} already exists at {:?}", artifact.label, file.name, dest);
                continue;
            }

            std::fs::create_dir_all(&artifact_dir)?;

            let url = format!(
                "https://huggingface.co/{}/resolve/main/{}/{}",
                MODEL_REPO, file.remote_dir, file.name
            );

            tracing::info!("Downloading {} ({})...", artifact.label, file.name);
            tracing::info!("  Source: {}", url);
            tracing::info!("  Destination: {:?}", dest);

            download_file(client, &url, &dest, file.blake3).await?;

            let file_size = std::fs::metadata(&dest)?.len();
            tracing::info!(
                "  {} complete ({:.1} MB)",
                file.name,
                file_size as f64 / (1024.0 * 1024.0)
            );
        }
    }

    Ok(())
}

/// Install the bundled persona catalog and probe question list to the data
/// directory. Existing files are left untouched.
pub fn install_data(config: &Config) -> anyhow::Result<()> {
    let catalog_path = config.catalog_path();
    let questions_path = config.questions_path();

    if catalog_path.exists() && questions_path.exists() {
        tracing::info!("Data artifacts already installed under {:?}", config.data_dir());
        return Ok(());
    }

    std::fs::create_dir_all(config.data_dir())?;

    if !catalog_path.exists() {
        let catalog_data = include_str!("../../../../data/persona_catalog.csv");
        std::fs::write(&catalog_path, catalog_data)?;
        tracing::info!("Installed persona catalog to {:?}", catalog_path);
    }

    if !questions_path.exists() {
        let questions_data = include_str!("../../../../data/vqa_questions.txt");
        std::fs::write(&questions_path, questions_data)?;
        tracing::info!("Installed probe questions to {:?}", questions_path);
    }

    Ok(())
}

/// Download a file from a URL to a local path, streaming to disk.
///
/// If `expected_blake3` is provided, the file is verified after download.
/// On checksum mismatch the corrupt file is removed and an error is returned.
async fn download_file(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    expected_blake3: Option<&str>,
) -> anyhow::Result<()> {
    use futures_util::StreamExt;
    use tokio::io::AsyncWriteExt;

    let response = client
        .get(url)
        .send()
        .await?
        .error_for_status()
        .map_err(|e| anyhow::anyhow!("Download failed: {e}"))?;

    let total_size = response.content_length();
    if let Some(size) = total_size {
        tracing::info!("  Size: {:.1} MB", size as f64 / (1024.0 * 1024.0));
    }

    let mut file = tokio::fs::File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;

        if let Some(total) = total_size {
            if downloaded % (50 * 1024 * 1024) < chunk.len() as u64 {
                tracing::info!(
                    "  Progress: {:.0}%",
                    downloaded as f64 / total as f64 * 100.0
                );
            }
        }
    }

    file.flush().await?;

    // Verify checksum if expected hash is provided
    if let Some(expected) = expected_blake3 {
        verify_blake3(dest, expected)?;
    }

    Ok(())
}

/// BLAKE3 hex digest of a file, streamed.
fn content_hash(path: &Path) -> anyhow::Result<String> {
    use std::io::Read;

    let mut hasher = blake3::Hasher::new();
    let mut file = std::fs::File::open(path)?;
    let mut buf = [0u8; 65536];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Verify a downloaded file's BLAKE3 checksum.
///
/// On mismatch, removes the corrupt file so the next run re-downloads.
fn verify_blake3(path: &Path, expected: &str) -> anyhow::Result<()> {
    let actual = content_hash(path)
        .map_err(|e| anyhow::anyhow!("Checksum computation failed for {}: {e}", path.display()))?;

    if actual != expected {
        let _ = std::fs::remove_file(path);
        anyhow::bail!(
            "Checksum mismatch for {}:\n  expected: {}\n  actual:   {}\n\
             Corrupt file removed — try downloading again.",
            path.display(),
            expected,
            actual
        );
    }

    tracing::debug!("  Checksum verified: {}…", &actual[..16]);
    Ok(())
}
