//! `lt catalog`: list the lab's label catalog or add a label to it.

use crate::cmd::Context;
use crate::output::{pretty_section, render, render_mode};
use clap::{Args, Subcommand};
use labtrail_core::api::LabApi;
use labtrail_core::labels::LabelCatalog;
use labtrail_core::model::Label;
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub action: Option<CatalogAction>,
}

#[derive(Subcommand, Debug)]
pub enum CatalogAction {
    /// Create a catalog label.
    Create(CreateLabelArgs),
}

#[derive(Args, Debug)]
pub struct CreateLabelArgs {
    /// Display name, unique within the catalog.
    #[arg(long)]
    pub name: String,

    /// Hex color (`#RGB` or `#RRGGBB`). Defaults to the configured label color.
    #[arg(long)]
    pub color: Option<String>,
}

pub async fn run_catalog<A: LabApi>(api: &A, args: &CatalogArgs, ctx: &Context) -> anyhow::Result<()> {
    let mut catalog = LabelCatalog::load(api).await?;

    match &args.action {
        None => render_mode(ctx.output, &catalog.labels(), render_text, render_pretty),
        Some(CatalogAction::Create(create)) => {
            let color = create.color.as_deref().unwrap_or(&ctx.default_color);
            let label = catalog.create(api, &create.name, Some(color)).await?;
            render(ctx.output, &label, |label, w| {
                writeln!(w, "{}\t{}\t{}", label.id, label.name, label.color)
            })
        }
    }
}

fn render_text(labels: &&[Label], w: &mut dyn Write) -> io::Result<()> {
    for label in *labels {
        writeln!(w, "{}\t{}\t{}", label.id, label.name, label.color)?;
    }
    Ok(())
}

fn render_pretty(labels: &&[Label], w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &format!("Label catalog ({})", labels.len()))?;
    for label in *labels {
        writeln!(w, "  {:<10} {} {}", label.id.as_str(), label.color, label.name)?;
    }
    Ok(())
}
