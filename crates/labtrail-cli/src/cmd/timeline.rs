//! `lt timeline`: human-readable activity history of a sample.

use crate::cmd::Context;
use crate::output::{pretty_section, render_mode};
use clap::Args;
use labtrail_core::api::LabApi;
use labtrail_core::timeline::{Timeline, TimelineEntry};
use labtrail_core::workspace::{Notice, SampleWorkspace};
use serde::Serialize;
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct TimelineArgs {
    /// Sample ID.
    pub sample: String,
}

#[derive(Debug, Serialize)]
struct TimelineOutput {
    sample: String,
    #[serde(flatten)]
    timeline: Timeline,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    notices: Vec<Notice>,
}

pub async fn run_timeline<A: LabApi>(
    ws: &SampleWorkspace<A>,
    _args: &TimelineArgs,
    ctx: &Context,
) -> anyhow::Result<()> {
    super::load(ws, false).await?;
    let Some(view) = ws.snapshot() else {
        anyhow::bail!("sample {} did not load", ws.sample_id());
    };
    let output = TimelineOutput {
        sample: ws.sample_id().to_string(),
        timeline: view.timeline,
        notices: ws.take_notices(),
    };
    render_mode(ctx.output, &output, render_text, render_pretty)
}

fn actor_name(entry: &TimelineEntry) -> &str {
    entry.actor.as_ref().map_or("-", |actor| actor.name.as_str())
}

fn render_text(out: &TimelineOutput, w: &mut dyn Write) -> io::Result<()> {
    for entry in &out.timeline.entries {
        writeln!(
            w,
            "{}\t{}\t{}\t{}",
            entry.at.to_rfc3339(),
            actor_name(entry),
            entry.event_type.as_deref().unwrap_or("-"),
            entry.narrative
        )?;
    }
    Ok(())
}

/// Entries grouped by day; the actor line is printed only where a new
/// actor's run starts.
fn render_pretty(out: &TimelineOutput, w: &mut dyn Write) -> io::Result<()> {
    for (i, group) in out.timeline.by_day().into_iter().enumerate() {
        if i > 0 {
            writeln!(w)?;
        }
        pretty_section(w, &group.day.format("%Y-%m-%d").to_string())?;
        for (j, entry) in group.entries.iter().enumerate() {
            // A day boundary always repeats the actor.
            if !entry.continuation || j == 0 {
                writeln!(w, "{}", actor_name(entry))?;
            }
            let marker = if entry.is_degraded() { " *" } else { "" };
            writeln!(
                w,
                "  {}  {}{marker}",
                entry.at.format("%H:%M"),
                entry.narrative
            )?;
        }
    }
    if out.timeline.synthetic {
        writeln!(w)?;
        writeln!(w, "(no recorded activity yet)")?;
    }
    if out.timeline.degraded_count() > 0 {
        writeln!(w)?;
        writeln!(w, "* event metadata incomplete")?;
    }
    Ok(())
}
