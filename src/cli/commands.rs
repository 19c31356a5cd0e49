// CLI command definitions

use super::backup::ClusterCommand;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "kbackup",
    version,
    about = "Backup tool for Kubernetes manifests",
    long_about = "A CLI tool that saves the manifests of a cluster into a namespace/kind/name folder tree"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Back up every deployment of a cluster with its related resources
    Cluster(ClusterCommand),
}
