//! `lt labels`: show or replace a sample's own labels.

use crate::cmd::Context;
use crate::output::{pretty_section, render_mode};
use clap::Args;
use labtrail_core::LabError;
use labtrail_core::api::LabApi;
use labtrail_core::labels::{LabelSelection, ResolvedLabel};
use labtrail_core::model::LabelId;
use labtrail_core::workspace::SampleWorkspace;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct LabelsArgs {
    /// Sample ID.
    pub sample: String,

    /// Label to keep selected (repeatable). Replaces the sample's own labels.
    #[arg(long = "set", value_name = "LABEL_ID")]
    pub set: Vec<String>,

    /// Remove every own label. Labels inherited from the order stay.
    #[arg(long, conflicts_with = "set")]
    pub clear: bool,

    /// Select or deselect one label, keeping the rest (repeatable).
    #[arg(long, value_name = "LABEL_ID", conflicts_with_all = ["set", "clear"])]
    pub toggle: Vec<String>,
}

#[derive(Debug, Serialize)]
struct LabelsOutput {
    sample: String,
    labels: Vec<ResolvedLabel>,
    /// Own label ids sent to the service, when an update was made.
    #[serde(skip_serializing_if = "Option::is_none")]
    submitted: Option<Vec<LabelId>>,
}

pub async fn run_labels<A: LabApi>(
    ws: &SampleWorkspace<A>,
    args: &LabelsArgs,
    ctx: &Context,
) -> anyhow::Result<()> {
    super::load(ws, true).await?;

    let submitted = if !args.toggle.is_empty() {
        let selection = toggled(ws, &args.toggle)?;
        Some(ws.apply_labels(selection.selected_ids()).await?)
    } else if args.clear || !args.set.is_empty() {
        let selected: Vec<LabelId> = args.set.iter().map(LabelId::new).collect();
        Some(ws.apply_labels(&selected).await?)
    } else {
        None
    };

    let Some(view) = ws.snapshot() else {
        anyhow::bail!("sample {} did not load", ws.sample_id());
    };
    let output = LabelsOutput {
        sample: ws.sample_id().to_string(),
        labels: view.labels,
        submitted,
    };
    render_mode(ctx.output, &output, render_text, render_pretty)
}

/// Current own labels with each of `ids` flipped. Inherited labels are locked.
fn toggled<A: LabApi>(ws: &SampleWorkspace<A>, ids: &[String]) -> Result<LabelSelection, LabError> {
    let Some(view) = ws.snapshot() else {
        return Err(LabError::NotLoaded {
            sample: ws.sample_id().to_string(),
        });
    };
    let mut selection = LabelSelection::from_resolved(&view.labels);
    for id in ids.iter().map(LabelId::new) {
        if !selection.toggle(&id) {
            return Err(LabError::validation(format!(
                "label {id} comes from the order and can only be removed there"
            )));
        }
    }
    Ok(selection)
}

const fn origin(entry: &ResolvedLabel) -> &'static str {
    if entry.inherited { "order" } else { "own" }
}

fn render_text(out: &LabelsOutput, w: &mut dyn Write) -> io::Result<()> {
    for entry in &out.labels {
        writeln!(
            w,
            "{}\t{}\t{}\t{}",
            entry.label.id,
            entry.label.name,
            entry.label.color,
            origin(entry)
        )?;
    }
    Ok(())
}

fn render_pretty(out: &LabelsOutput, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &format!("Labels for {}", out.sample))?;
    if out.labels.is_empty() {
        writeln!(w, "  (none)")?;
    }
    for entry in &out.labels {
        let lock = if entry.inherited { "  [from order, locked]" } else { "" };
        writeln!(
            w,
            "  {:<10} {} {}{lock}",
            entry.label.id.as_str(),
            entry.label.color,
            entry.label.name
        )?;
    }
    if let Some(submitted) = &out.submitted {
        writeln!(w)?;
        writeln!(w, "Updated: {} own label(s)", submitted.len())?;
    }
    Ok(())
}
