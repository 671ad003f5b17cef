//! `lt users`: list lab users that can be assigned to samples.

use crate::cmd::Context;
use crate::output::render_mode;
use labtrail_core::LabError;
use labtrail_core::api::LabApi;
use labtrail_core::model::Assignee;
use std::io::{self, Write};

pub async fn run_users<A: LabApi>(api: &A, ctx: &Context) -> anyhow::Result<()> {
    let users = api.lab_users().await.map_err(LabError::from)?;
    render_mode(
        ctx.output,
        &users.as_slice(),
        |users, w| {
            for user in *users {
                writeln!(w, "{}\t{}\t{}", user.id, user.name, user.email)?;
            }
            Ok(())
        },
        render_pretty,
    )
}

fn render_pretty(users: &&[Assignee], w: &mut dyn Write) -> io::Result<()> {
    for user in *users {
        if user.email.is_empty() {
            writeln!(w, "{:<10} {}", user.id.as_str(), user.name)?;
        } else {
            writeln!(w, "{:<10} {} <{}>", user.id.as_str(), user.name, user.email)?;
        }
    }
    Ok(())
}
