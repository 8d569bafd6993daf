#![warn(clippy::unwrap_used)]

use clap::Parser;
use std::path::PathBuf;

use da2404::{
    configuration::RenderConfiguration,
    error::ContextError,
    form,
    pdf,
    template::{self, DocTemplate},
};

/// Renders DA Form 2404 to a PDF file, or any story of tables and paragraphs given as JSON.
#[derive(Parser, Debug)]
#[command(version, long_about = None)]
struct CliArguments {
    /// The path of the output PDF file.
    #[arg(
        short = 'o',
        long = "output",
        value_name = "output_file",
        required_unless_present = "dump_story_path"
    )]
    output_pdf_path: Option<PathBuf>,
    /// The JSON configuration of the rendering.
    #[arg(short = 'c', long = "configuration", value_name = "json_file")]
    configuration_path: Option<PathBuf>,
    /// Render the story found in this JSON file instead of the form.
    #[arg(short = 's', long = "story", value_name = "json_file")]
    story_path: Option<PathBuf>,
    /// Write the story of the form to this JSON file and exit without rendering.
    #[arg(long = "dump-story", value_name = "json_file")]
    dump_story_path: Option<PathBuf>,
    /// Run the output through ghostscript in order to reduce its size.
    #[arg(long = "optimize-with-gs")]
    optimize_with_gs: bool,
    /// Log everything down to the trace level.
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn main() {
    if let Err(error) = fallible_main() {
        log::error!("{}", error);
        std::process::exit(1);
    }
}

fn fallible_main() -> Result<(), ContextError> {
    let arguments = CliArguments::parse();
    let default_filter = if arguments.verbose { "trace" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
    log::debug!("{:?}", arguments);

    let configuration = match &arguments.configuration_path {
        Some(configuration_path) => RenderConfiguration::from_path(configuration_path)?,
        None => RenderConfiguration::default(),
    };
    log::debug!("{:?}", configuration);

    if let Some(dump_story_path) = &arguments.dump_story_path {
        return template::write_story(&form::story(&configuration), dump_story_path);
    }

    let output_pdf_path = arguments.output_pdf_path.as_deref().ok_or_else(|| {
        ContextError::with_context("The path of the output PDF file is required")
    })?;
    let mut pdf_document = match &arguments.story_path {
        Some(story_path) => {
            let story = template::read_story(story_path)?;
            DocTemplate::letter_form().build(&story, &configuration)?
        }
        None => form::create_2404(&configuration)?,
    };
    pdf_document.save_to_file(output_pdf_path)?;

    if arguments.optimize_with_gs {
        pdf::optimize_pdf_file_with_gs(output_pdf_path)?;
    }

    Ok(())
}
