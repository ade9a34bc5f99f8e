//! The `personify caption` command: image in, persona sentences out.

use clap::Args;
use personify_core::{Config, PersonaSelection, Personify};
use std::path::PathBuf;

/// Arguments for the `caption` command.
#[derive(Args, Debug)]
pub struct CaptionArgs {
    /// Image file to build personas from
    #[arg(required_unless_present = "random")]
    pub image: Option<PathBuf>,

    /// Sample personas uniformly at random instead of using an image
    #[arg(long, conflicts_with = "image")]
    pub random: bool,

    /// Number of personas to select (defaults to the configured count)
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// Output the selection as JSON instead of plain text
    #[arg(long)]
    pub json: bool,

    /// Also print the fused term scores the selection was built from
    #[arg(long)]
    pub terms: bool,
}

/// Execute the caption command.
pub async fn execute(args: CaptionArgs) -> anyhow::Result<()> {
    let config = Config::load()?;

    // The whole pipeline is synchronous; keep it off the async runtime.
    let output = tokio::task::spawn_blocking(move || run(args, config)).await??;
    print!("{output}");
    Ok(())
}

fn run(args: CaptionArgs, config: Config) -> anyhow::Result<String> {
    let count = args.count.unwrap_or(config.selection.output_count);
    let personify = Personify::new(config)?;

    let mut output = String::new();

    if args.random {
        let selection = personify.random_persona_list(count);
        render_selection(&mut output, &selection, args.json)?;
        return Ok(output);
    }

    // Safe: clap requires the image unless --random was given.
    let image = args
        .image
        .ok_or_else(|| anyhow::anyhow!("No image path provided"))?;

    if args.terms {
        let terms = personify.term_scores(&image)?;
        if args.json {
            output.push_str(&serde_json::to_string_pretty(&terms)?);
            output.push('\n');
        } else {
            output.push_str("Terms:\n");
            for term in &terms {
                output.push_str(&format!("  {:.3}  {}\n", term.score, term.text));
            }
        }
    }

    let selection = personify.persona_list(&image, count)?;
    if selection.is_empty() {
        tracing::warn!("No personas matched; the image produced no usable concepts");
    }
    render_selection(&mut output, &selection, args.json)?;
    Ok(output)
}

fn render_selection(
    output: &mut String,
    selection: &PersonaSelection,
    json: bool,
) -> anyhow::Result<()> {
    if json {
        output.push_str(&serde_json::to_string_pretty(selection)?);
        output.push('\n');
    } else {
        for (persona, label) in selection.personas.iter().zip(selection.labels.iter()) {
            output.push_str(&format!("[{label}] {persona}\n"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_selection_text() {
        let selection = PersonaSelection {
            personas: vec!["I like dogs.".to_string()],
            labels: vec!["pets".to_string()],
        };
        let mut output = String::new();
        render_selection(&mut output, &selection, false).unwrap();
        assert_eq!(output, "[pets] I like dogs.\n");
    }

    #[test]
    fn test_render_selection_json() {
        let selection = PersonaSelection {
            personas: vec!["I like dogs.".to_string()],
            labels: vec!["pets".to_string()],
        };
        let mut output = String::new();
        render_selection(&mut output, &selection, true).unwrap();
        let parsed: PersonaSelection = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed.personas, selection.personas);
    }
}
