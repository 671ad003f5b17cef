//! `lt notes`: show, replace or clear a sample's notes.

use crate::cmd::Context;
use crate::output::render;
use clap::Args;
use labtrail_core::api::LabApi;
use labtrail_core::workspace::SampleWorkspace;
use serde::Serialize;
use std::io::Write;

#[derive(Args, Debug)]
pub struct NotesArgs {
    /// Sample ID.
    pub sample: String,

    /// New notes. Blank text clears them.
    pub text: Option<String>,

    /// Remove the notes.
    #[arg(long, conflicts_with = "text")]
    pub clear: bool,
}

#[derive(Debug, Serialize)]
struct NotesOutput {
    sample: String,
    notes: Option<String>,
    changed: bool,
}

pub async fn run_notes<A: LabApi>(
    ws: &SampleWorkspace<A>,
    args: &NotesArgs,
    ctx: &Context,
) -> anyhow::Result<()> {
    super::load(ws, false).await?;

    let changed = if args.clear {
        ws.update_notes(None).await?
    } else if let Some(text) = &args.text {
        ws.update_notes(Some(text)).await?
    } else {
        false
    };

    let Some(view) = ws.snapshot() else {
        anyhow::bail!("sample {} did not load", ws.sample_id());
    };
    let output = NotesOutput {
        sample: ws.sample_id().to_string(),
        notes: view.sample.notes,
        changed,
    };
    render(ctx.output, &output, |out, w| {
        writeln!(w, "{}", out.notes.as_deref().unwrap_or("-"))
    })
}
