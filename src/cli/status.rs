//! Status command: offline report on collected data

use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

use super::{Cli, CliError, OutputFormat};
use crate::resume::MatchList;
use crate::store::BundleLayout;

/// Status command arguments
#[derive(Parser, Debug, Clone)]
pub struct StatusArgs {
    /// Directory where match documents and timelines are stored
    #[arg(long, default_value = "data/raw")]
    pub raw_dir: PathBuf,

    /// Match list file to inspect
    #[arg(long, default_value = "matchlist.json")]
    pub matchlist: PathBuf,
}

/// What is on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Ids in the match list
    pub listed: usize,
    /// Listed ids with both documents present
    pub complete: usize,
    /// Listed ids missing at least one document
    pub listed_incomplete: Vec<String>,
    /// Detail documents without a timeline
    pub detail_only: Vec<String>,
}

impl StatusArgs {
    /// Build the report
    ///
    /// # Errors
    /// A corrupt match list or unreadable raw directory.
    pub fn report(&self) -> Result<StatusReport, CliError> {
        let matchlist = MatchList::load(&self.matchlist)?;
        let layout = BundleLayout::new(&self.raw_dir);

        let listed_incomplete: Vec<String> = matchlist
            .ids()
            .iter()
            .filter(|id| !layout.is_complete(id))
            .cloned()
            .collect();
        let detail_only = layout.detail_only_ids()?.into_iter().collect();

        Ok(StatusReport {
            listed: matchlist.len(),
            complete: matchlist.len() - listed_incomplete.len(),
            listed_incomplete,
            detail_only,
        })
    }

    /// Execute the status command
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let report = self.report()?;
        match cli.output_format {
            OutputFormat::Json => {
                let line = serde_json::to_string(&report)
                    .map_err(|e| CliError::InvalidArgument(format!("cannot serialize report: {e}")))?;
                println!("{line}");
            }
            OutputFormat::Human => {
                println!("Match list: {}", self.matchlist.display());
                println!("Listed matches: {}", report.listed);
                println!("Complete bundles: {}", report.complete);
                if !report.listed_incomplete.is_empty() {
                    println!("Listed but incomplete: {}", report.listed_incomplete.len());
                    for id in &report.listed_incomplete {
                        println!("  {id}");
                    }
                }
                println!("Detail-only stubs: {}", report.detail_only.len());
            }
        }
        Ok(())
    }
}
