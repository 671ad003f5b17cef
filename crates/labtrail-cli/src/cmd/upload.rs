//! `lt upload`: attach image files to a sample.
//!
//! Files are uploaded concurrently. Each file reports its own outcome; the
//! command fails if any upload failed.

use crate::cmd::Context;
use crate::output::render_mode;
use anyhow::Context as _;
use clap::Args;
use labtrail_core::api::{ImageUpload, LabApi};
use labtrail_core::model::{Image, SampleState};
use labtrail_core::workspace::SampleWorkspace;
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Sample ID.
    pub sample: String,

    /// Image files to upload.
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
struct UploadResult {
    filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<Image>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct UploadOutput {
    sample: String,
    state: Option<SampleState>,
    uploads: Vec<UploadResult>,
}

fn read_upload(path: &Path) -> anyhow::Result<ImageUpload> {
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("{} is not a file", path.display()))?;
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(ImageUpload::new(filename, bytes))
}

pub async fn run_upload<A: LabApi>(
    ws: &SampleWorkspace<A>,
    args: &UploadArgs,
    ctx: &Context,
) -> anyhow::Result<()> {
    let uploads = args
        .files
        .iter()
        .map(|path| read_upload(path))
        .collect::<anyhow::Result<Vec<_>>>()?;
    super::load(ws, false).await?;

    let outcomes =
        futures::future::join_all(uploads.iter().map(|upload| ws.upload_image(upload))).await;

    let mut first_error = None;
    let mut results = Vec::with_capacity(uploads.len());
    for (upload, outcome) in uploads.iter().zip(outcomes) {
        let (image, error) = match outcome {
            Ok(image) => (Some(image), None),
            Err(err) => {
                let message = err.to_string();
                first_error.get_or_insert(err);
                (None, Some(message))
            }
        };
        results.push(UploadResult {
            filename: upload.filename.clone(),
            image,
            error,
        });
    }

    let output = UploadOutput {
        sample: ws.sample_id().to_string(),
        state: ws.snapshot().map(|view| view.sample.state),
        uploads: results,
    };
    render_mode(ctx.output, &output, render_text, render_pretty)?;

    match first_error {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

fn render_text(out: &UploadOutput, w: &mut dyn Write) -> io::Result<()> {
    for result in &out.uploads {
        match (&result.image, &result.error) {
            (Some(image), _) => writeln!(w, "{}\t{}", image.id, result.filename)?,
            (None, error) => writeln!(
                w,
                "-\t{}\t{}",
                result.filename,
                error.as_deref().unwrap_or_default()
            )?,
        }
    }
    Ok(())
}

fn render_pretty(out: &UploadOutput, w: &mut dyn Write) -> io::Result<()> {
    for result in &out.uploads {
        match (&result.image, &result.error) {
            (Some(image), _) => writeln!(w, "✓ {} ({})", result.filename, image.id)?,
            (None, error) => writeln!(
                w,
                "✗ {}: {}",
                result.filename,
                error.as_deref().unwrap_or("failed")
            )?,
        }
    }
    if let Some(state) = out.state {
        writeln!(w, "State: {state}")?;
    }
    Ok(())
}
