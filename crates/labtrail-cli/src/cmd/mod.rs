//! One module per `lt` subcommand.
//!
//! Sample commands receive a [`SampleWorkspace`] built for the sample named
//! on the command line; catalog and user commands talk to the service
//! directly.

pub mod assign;
pub mod catalog;
pub mod images;
pub mod labels;
pub mod move_cmd;
pub mod notes;
pub mod show;
pub mod timeline;
pub mod upload;
pub mod users;

use labtrail_core::api::LabApi;
use labtrail_core::timeline::TimelineConfig;
use labtrail_core::workspace::SampleWorkspace;

use crate::output::OutputMode;

/// Settings shared by every command handler.
#[derive(Debug, Clone)]
pub struct Context {
    pub output: OutputMode,
    pub timeline: TimelineConfig,
    /// Color for new catalog labels when `--color` is omitted.
    pub default_color: String,
}

/// Load the sample, and the catalog and users when `reference` is set.
async fn load<A: LabApi>(ws: &SampleWorkspace<A>, reference: bool) -> anyhow::Result<()> {
    if reference {
        futures::try_join!(ws.load(), ws.load_reference_data())?;
    } else {
        ws.load().await?;
    }
    Ok(())
}
