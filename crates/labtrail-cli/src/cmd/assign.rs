//! `lt assign`: replace the set of users assigned to a sample.

use crate::cmd::Context;
use crate::output::{pretty_kv, render_mode};
use clap::Args;
use labtrail_core::LabError;
use labtrail_core::api::LabApi;
use labtrail_core::model::{Assignee, UserId};
use labtrail_core::workspace::SampleWorkspace;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct AssignArgs {
    /// Sample ID.
    pub sample: String,

    /// Users who should end up assigned. Anyone not listed is unassigned.
    #[arg(value_name = "USER_ID")]
    pub users: Vec<String>,

    /// Unassign everyone.
    #[arg(long, conflicts_with = "users")]
    pub clear: bool,
}

#[derive(Debug, Serialize)]
struct AssignOutput {
    sample: String,
    changed: bool,
    added: Vec<UserId>,
    removed: Vec<UserId>,
    assignees: Vec<Assignee>,
}

pub async fn run_assign<A: LabApi>(
    ws: &SampleWorkspace<A>,
    args: &AssignArgs,
    ctx: &Context,
) -> anyhow::Result<()> {
    if args.users.is_empty() && !args.clear {
        return Err(LabError::validation(
            "no users given; pass user ids or --clear to unassign everyone",
        )
        .into());
    }
    super::load(ws, false).await?;

    let selection: Vec<UserId> = args.users.iter().map(UserId::new).collect();
    let delta = ws.apply_assignees(&selection).await?;

    let Some(view) = ws.snapshot() else {
        anyhow::bail!("sample {} did not load", ws.sample_id());
    };
    let output = AssignOutput {
        sample: ws.sample_id().to_string(),
        changed: !delta.is_empty(),
        added: delta.added,
        removed: delta.removed,
        assignees: view.sample.assignees,
    };
    render_mode(ctx.output, &output, render_text, render_pretty)
}

fn render_text(out: &AssignOutput, w: &mut dyn Write) -> io::Result<()> {
    for user in &out.added {
        writeln!(w, "+{user}")?;
    }
    for user in &out.removed {
        writeln!(w, "-{user}")?;
    }
    Ok(())
}

fn render_pretty(out: &AssignOutput, w: &mut dyn Write) -> io::Result<()> {
    if !out.changed {
        writeln!(w, "{}: assignees unchanged", out.sample)?;
    }
    let ids = |users: &[UserId]| {
        users
            .iter()
            .map(UserId::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    };
    if !out.added.is_empty() {
        pretty_kv(w, "Added", ids(&out.added))?;
    }
    if !out.removed.is_empty() {
        pretty_kv(w, "Removed", ids(&out.removed))?;
    }
    let names: Vec<&str> = out.assignees.iter().map(|a| a.name.as_str()).collect();
    let names = if names.is_empty() {
        "-".to_string()
    } else {
        names.join(", ")
    };
    pretty_kv(w, "Assigned", names)
}
