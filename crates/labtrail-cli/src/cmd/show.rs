//! `lt show`: sample detail with effective labels and offered transitions.

use crate::cmd::Context;
use crate::output::{pretty_kv, pretty_section, render_mode};
use clap::Args;
use labtrail_core::api::LabApi;
use labtrail_core::labels::ResolvedLabel;
use labtrail_core::model::{Assignee, SampleState};
use labtrail_core::workspace::{Notice, SampleView, SampleWorkspace};
use serde::Serialize;
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Sample ID.
    pub sample: String,
}

#[derive(Debug, Serialize)]
struct ShowOutput {
    id: String,
    code: String,
    sample_type: String,
    state: SampleState,
    state_label: &'static str,
    terminal: bool,
    offered: Vec<SampleState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    order_ref: Option<String>,
    labels: Vec<ResolvedLabel>,
    assignees: Vec<Assignee>,
    images: usize,
    events: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    notices: Vec<Notice>,
}

impl ShowOutput {
    fn new(view: SampleView, notices: Vec<Notice>) -> Self {
        Self {
            id: view.sample.id.to_string(),
            code: view.sample.code,
            sample_type: view.sample.sample_type,
            state: view.sample.state,
            state_label: view.state.label,
            terminal: view.state.terminal,
            offered: view.offered,
            notes: view.sample.notes,
            order_ref: view.sample.order_ref,
            labels: view.labels,
            assignees: view.sample.assignees,
            images: view.images.len(),
            events: view.events.len(),
            notices,
        }
    }
}

pub async fn run_show<A: LabApi>(
    ws: &SampleWorkspace<A>,
    _args: &ShowArgs,
    ctx: &Context,
) -> anyhow::Result<()> {
    super::load(ws, true).await?;
    let Some(view) = ws.snapshot() else {
        anyhow::bail!("sample {} did not load", ws.sample_id());
    };
    let output = ShowOutput::new(view, ws.take_notices());
    render_mode(ctx.output, &output, render_text, render_pretty)
}

fn render_text(out: &ShowOutput, w: &mut dyn Write) -> io::Result<()> {
    let labels: Vec<&str> = out.labels.iter().map(|l| l.label.name.as_str()).collect();
    let assignees: Vec<&str> = out.assignees.iter().map(|a| a.id.as_str()).collect();
    writeln!(
        w,
        "{}\t{}\t{}\t{}\t{}\t{}",
        out.id,
        out.code,
        out.sample_type,
        out.state,
        labels.join(","),
        assignees.join(",")
    )
}

fn render_pretty(out: &ShowOutput, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &format!("{} ({})", out.code, out.id))?;
    pretty_kv(w, "Type", &out.sample_type)?;
    let terminal = if out.terminal { " (final)" } else { "" };
    pretty_kv(w, "State", format!("{}{terminal}", out.state_label))?;
    if !out.offered.is_empty() {
        let offered: Vec<&str> = out.offered.iter().copied().map(SampleState::as_str).collect();
        pretty_kv(w, "Can move to", offered.join(", "))?;
    }
    if let Some(order) = &out.order_ref {
        pretty_kv(w, "Order", order)?;
    }
    pretty_kv(w, "Notes", out.notes.as_deref().unwrap_or("-"))?;
    pretty_kv(w, "Images", out.images.to_string())?;
    pretty_kv(w, "Events", out.events.to_string())?;

    writeln!(w)?;
    pretty_section(w, "Labels")?;
    if out.labels.is_empty() {
        writeln!(w, "  (none)")?;
    }
    for entry in &out.labels {
        let origin = if entry.inherited { "  [from order]" } else { "" };
        writeln!(
            w,
            "  {} {}{origin}",
            entry.label.color, entry.label.name
        )?;
    }

    writeln!(w)?;
    pretty_section(w, "Assignees")?;
    if out.assignees.is_empty() {
        writeln!(w, "  (none)")?;
    }
    for assignee in &out.assignees {
        writeln!(w, "  {} ({})", assignee.name, assignee.id)?;
    }

    for notice in &out.notices {
        writeln!(w)?;
        writeln!(w, "note [{}]: {}", notice.code, notice.message)?;
    }
    Ok(())
}
