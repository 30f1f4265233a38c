//! `md-block render` command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use md_block::{Environment, Flavor, MarkdownElement, RenderError, RenderHandle, RenderedStatus};
use md_config::Config;
use md_renderer::Provenance;
use serde::Serialize;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Markdown file to render (default: stdin, or nothing when --src is set).
    file: Option<PathBuf>,

    /// Render inline markdown, as `<md-span>` does.
    #[arg(long)]
    span: bool,

    /// Treat the input as page markup: de-indent and unescape `&gt;`.
    #[arg(long)]
    markup: bool,

    /// Sanitize the rendered HTML.
    #[arg(long)]
    untrusted: bool,

    /// Minimum heading level.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u8).range(1..))]
    hmin: Option<u8>,

    /// Link headings to themselves, optionally prefixed with a symbol.
    #[arg(long, value_name = "SYMBOL", num_args = 0..=1, default_missing_value = "")]
    hlinks: Option<String>,

    /// Fetch markdown from this URL, resolved against the configured base URL.
    #[arg(long, value_name = "URL")]
    src: Option<String>,

    /// Path to configuration file (default: auto-discover md-block.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print `{"html", "rendered", "provenance"}` JSON instead of HTML.
    #[arg(long)]
    json: bool,

    /// Enable verbose output (pipeline and capability logs).
    #[arg(short, long)]
    pub verbose: bool,
}

/// Result of a render, as printed with `--json`.
#[derive(Debug, Serialize)]
struct Rendered {
    html: String,
    rendered: Option<RenderedStatus>,
    provenance: Option<Provenance>,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration, input or rendering fails. A failed
    /// `--src` fetch only warns and keeps the input as fallback content.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = Config::load(self.config.as_deref())?;
        let text = self.read_input()?;

        let rendered = self.render(&config, &text, &output).await?;
        if self.json {
            output.document(&serde_json::to_string_pretty(&rendered)?)?;
        } else {
            output.document(&rendered.html)?;
        }
        Ok(())
    }

    fn read_input(&self) -> Result<String, CliError> {
        let text = match &self.file {
            Some(path) => std::fs::read_to_string(path)?,
            None if self.src.is_some() => String::new(),
            None => std::io::read_to_string(std::io::stdin())?,
        };
        Ok(text)
    }

    async fn render(
        &self,
        config: &Config,
        text: &str,
        output: &Output,
    ) -> Result<Rendered, CliError> {
        let env = Arc::new(Environment::from_config(config));
        let flavor = if self.span { Flavor::Span } else { Flavor::Block };

        let element = MarkdownElement::new(flavor, env);
        let element = if self.markup {
            element.with_markup(text)
        } else {
            element.set_content(text);
            element
        };

        // Attributes set before connecting take effect on the first render.
        if self.untrusted {
            element.set_attribute("untrusted", Some(""));
        }
        if let Some(hmin) = self.hmin {
            element.set_attribute("hmin", Some(&hmin.to_string()));
        }
        if let Some(hlinks) = &self.hlinks {
            element.set_attribute("hlinks", Some(hlinks));
        }
        complete(element.connect()).await?;

        if let Some(src) = &self.src {
            match element.set_attribute("src", Some(src)) {
                Some(fetch) => match complete(Some(fetch)).await {
                    Err(CliError::Render(RenderError::Fetch(e))) => {
                        output.warning(&format!("Warning: {e}, keeping fallback content"));
                    }
                    other => other?,
                },
                None => output.warning(&format!("Warning: ignoring invalid src {src:?}")),
            }
        }

        Ok(Rendered {
            html: element.html(),
            rendered: element.rendered(),
            provenance: element.provenance(),
        })
    }
}

/// Wait for a render, if one started.
async fn complete(handle: Option<RenderHandle>) -> Result<(), CliError> {
    let Some(handle) = handle else {
        return Ok(());
    };
    let outcome = handle
        .await
        .map_err(|e| CliError::Task(e.to_string()))??;
    tracing::debug!(?outcome, "Render complete");
    Ok(())
}
