use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use enrollment_docgen::certificate::{EnrollmentCertificateGenerator, EnrollmentCertificateRequest};
use enrollment_docgen::{DocgenConfig, DocumentFormat, DocumentGenerator, RenderContext};

#[derive(Parser, Debug)]
#[command(name = "docgen")]
#[command(about = "Render university documents to PDF, ODT or DOCX")]
struct Args {
    /// Template root, overrides DOCGEN_TEMPLATE_ROOT
    #[arg(long, global = true, value_name = "DIR")]
    templates: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render <category>/<name> with a JSON context file
    Render {
        category: String,
        name: String,
        /// JSON object with the template variables
        #[arg(long, value_name = "FILE")]
        context: PathBuf,
        #[arg(long, default_value = "pdf")]
        format: String,
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
    /// Render an enrollment certificate from a request JSON file
    Certificate {
        #[arg(value_name = "REQUEST")]
        request: PathBuf,
        #[arg(long, default_value = "pdf")]
        format: String,
        /// Directory the certificate is written into
        #[arg(long, value_name = "DIR", default_value = ".")]
        out_dir: PathBuf,
    },
    /// List the registered output formats
    Formats,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = DocgenConfig::from_env().context("invalid DOCGEN_* configuration")?;
    if let Some(templates) = args.templates {
        config.template_root = templates;
    }
    let documents = Arc::new(DocumentGenerator::new(&config));

    match args.command {
        Command::Render {
            category,
            name,
            context,
            format,
            output,
        } => {
            let raw = fs::read_to_string(&context)
                .with_context(|| format!("failed to read context file {:?}", context))?;
            let context = RenderContext::from_json_str(&raw)
                .with_context(|| format!("invalid context file {:?}", context))?;
            let bytes = documents.generate(&category, &name, &context, &format)?;
            write_output(&output, &bytes)?;
        }
        Command::Certificate {
            request,
            format,
            out_dir,
        } => {
            let raw = fs::read_to_string(&request)
                .with_context(|| format!("failed to read request file {:?}", request))?;
            let request: EnrollmentCertificateRequest = serde_json::from_str(&raw)
                .with_context(|| format!("invalid request file {:?}", request))?;

            let generator = EnrollmentCertificateGenerator::new(Arc::clone(&documents));
            let document = generator.generate(&request, &format)?;
            fs::create_dir_all(&out_dir)
                .with_context(|| format!("failed to create output directory {:?}", out_dir))?;
            let output = out_dir.join(sanitize_filename::sanitize(&document.filename));
            write_output(&output, &document.bytes)?;
            info!("content type: {}", document.content_type);
        }
        Command::Formats => {
            for tag in documents.registry().formats() {
                let content_type = tag
                    .parse::<DocumentFormat>()
                    .map(DocumentFormat::content_type)
                    .unwrap_or("application/octet-stream");
                println!("{:<6}{}", tag, content_type);
            }
        }
    }

    Ok(())
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("failed to write {:?}", path))?;
    info!("wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}
