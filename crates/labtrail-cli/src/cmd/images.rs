//! `lt images`: list a sample's images, or delete one.

use crate::cmd::Context;
use crate::output::{pretty_section, render_mode};
use clap::Args;
use labtrail_core::api::LabApi;
use labtrail_core::model::{ImageId, ImageSet};
use labtrail_core::workspace::SampleWorkspace;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct ImagesArgs {
    /// Sample ID.
    pub sample: String,

    /// Delete this image before listing.
    #[arg(long, value_name = "IMAGE_ID")]
    pub delete: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImagesOutput {
    sample: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    deleted: Option<ImageId>,
    images: ImageSet,
}

pub async fn run_images<A: LabApi>(
    ws: &SampleWorkspace<A>,
    args: &ImagesArgs,
    ctx: &Context,
) -> anyhow::Result<()> {
    super::load(ws, false).await?;

    let deleted = match &args.delete {
        Some(raw) => {
            let image_id = ImageId::new(raw.as_str());
            ws.delete_image(&image_id).await?;
            Some(image_id)
        }
        None => None,
    };

    let Some(view) = ws.snapshot() else {
        anyhow::bail!("sample {} did not load", ws.sample_id());
    };
    let output = ImagesOutput {
        sample: ws.sample_id().to_string(),
        deleted,
        images: view.images,
    };
    render_mode(ctx.output, &output, render_text, render_pretty)
}

fn render_text(out: &ImagesOutput, w: &mut dyn Write) -> io::Result<()> {
    for image in &out.images.images {
        let uploaded = image
            .uploaded_at
            .map_or_else(|| "-".to_string(), |at| at.to_rfc3339());
        writeln!(w, "{}\t{}\t{uploaded}", image.id, image.filename)?;
    }
    Ok(())
}

fn render_pretty(out: &ImagesOutput, w: &mut dyn Write) -> io::Result<()> {
    if let Some(deleted) = &out.deleted {
        writeln!(w, "Deleted {deleted}")?;
        writeln!(w)?;
    }
    pretty_section(w, &format!("Images for {}", out.sample))?;
    if out.images.is_empty() {
        writeln!(w, "  (none)")?;
    }
    for image in &out.images.images {
        writeln!(w, "  {:<10} {}", image.id.as_str(), image.filename)?;
    }
    Ok(())
}
