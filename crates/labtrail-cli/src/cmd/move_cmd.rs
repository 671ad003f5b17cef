//! `lt move`: request a lifecycle transition.

use crate::cmd::Context;
use crate::output::render;
use clap::Args;
use labtrail_core::api::LabApi;
use labtrail_core::lifecycle::{StateDisplay, Transition};
use labtrail_core::model::SampleState;
use labtrail_core::workspace::SampleWorkspace;
use serde::Serialize;
use std::io::Write;

#[derive(Args, Debug)]
pub struct MoveArgs {
    /// Sample ID.
    pub sample: String,

    /// Target state: RECEIVED, PROCESSING, READY, DAMAGED or CANCELLED.
    pub state: SampleState,
}

#[derive(Debug, Serialize)]
struct MoveOutput {
    #[serde(flatten)]
    transition: Transition,
    /// State reported by the service after the transition.
    current: SampleState,
    current_label: &'static str,
}

pub async fn run_move<A: LabApi>(
    ws: &SampleWorkspace<A>,
    args: &MoveArgs,
    ctx: &Context,
) -> anyhow::Result<()> {
    super::load(ws, false).await?;
    let transition = ws.request_transition(args.state).await?;

    let current = ws
        .snapshot()
        .map_or(transition.to, |view| view.sample.state);
    let output = MoveOutput {
        transition,
        current,
        current_label: StateDisplay::of(current).label,
    };
    render(ctx.output, &output, |out, w| {
        writeln!(
            w,
            "{}: {} → {}",
            out.transition.sample,
            StateDisplay::of(out.transition.from).label,
            StateDisplay::of(out.transition.to).label
        )
    })
}
