//! Cluster backup command

use super::display::TableRenderer;
use crate::domain::backup::ClusterBackupService;
use crate::domain::config::{BackupConf, BackupConfig};
use crate::infrastructure::constants::CONF_FILE_ENV;
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
pub struct ClusterCommand {
    /// Kubeconfig context of the cluster to back up
    pub context: String,

    /// jq-style expression applied to every manifest before it is written
    /// [default: .]
    #[arg(long, short = 'f', value_name = "EXPR")]
    pub filter: Option<String>,

    /// Namespace to skip (repeatable)
    #[arg(long, short = 'e', value_name = "NAMESPACE")]
    pub exclude: Vec<String>,

    /// Report what would be written without touching the disk
    #[arg(long)]
    pub dry_run: bool,

    /// Output directory [default: ./backup]
    #[arg(long, value_name = "PATH")]
    pub dir: Option<PathBuf>,

    /// Path to kubeconfig file
    /// If not specified, uses default kubeconfig resolution (KUBECONFIG env or ~/.kube/config)
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Path to a TOML file with defaults for the options above
    /// If not specified, reads KBACKUP_CONF_FILE when set
    #[arg(long, value_name = "PATH")]
    pub config_file: Option<String>,
}

impl ClusterCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let file_conf = self.load_file_conf()?;
        let config = self.to_config(&file_conf);

        // Compiles the filter, so a bad expression fails before any API call
        let service = ClusterBackupService::new(config)?;

        println!(
            "Starting backup for cluster context: {}",
            service.config().context
        );
        if service.config().dry_run {
            println!("Dry run: no files will be written");
        }

        let report = service.backup().await?;

        let renderer = TableRenderer::new();
        print!("{}", renderer.render_backup_summary(&report));

        println!("Backup completed successfully!");
        Ok(())
    }

    /// Merges flags with the config file: command line > file > defaults
    pub fn to_config(&self, file_conf: &BackupConf) -> BackupConfig {
        let mut config = BackupConfig::new(&self.context)
            .with_excluded(self.exclude.iter().cloned())
            .with_dry_run(self.dry_run)
            .with_kubeconfig(self.kubeconfig.clone());

        if let Some(filter) = &self.filter {
            config = config.with_filter(filter);
        }
        if let Some(dir) = &self.dir {
            config = config.with_output_dir(dir);
        }

        config.with_file_defaults(&file_conf.backup, self.filter.is_some(), self.dir.is_some())
    }

    fn load_file_conf(&self) -> anyhow::Result<BackupConf> {
        let path = match &self.config_file {
            Some(path) => Some(path.clone()),
            None => std::env::var(CONF_FILE_ENV).ok().filter(|p| !p.is_empty()),
        };

        match path {
            Some(path) => {
                let conf = BackupConf::from(&path)
                    .with_context(|| format!("Failed to load configuration from {}", path))?;
                tracing::info!(path = %path, "Loaded configuration file");
                Ok(conf)
            }
            None => Ok(BackupConf::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::BackupFileConf;

    fn parse(args: &[&str]) -> ClusterCommand {
        let mut argv = vec!["cluster"];
        argv.extend_from_slice(args);
        ClusterCommand::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_parse_flags() {
        let cmd = parse(&[
            "prod",
            "-f",
            "del(.status)",
            "-e",
            "kube-system",
            "--exclude",
            "kube-public",
            "--dry-run",
            "--dir",
            "/tmp/out",
        ]);
        assert_eq!(cmd.context, "prod");
        assert_eq!(cmd.filter.as_deref(), Some("del(.status)"));
        assert_eq!(cmd.exclude, vec!["kube-system", "kube-public"]);
        assert!(cmd.dry_run);
        assert_eq!(cmd.dir, Some(PathBuf::from("/tmp/out")));
    }

    #[test]
    fn test_context_is_required() {
        assert!(ClusterCommand::try_parse_from(["cluster"]).is_err());
    }

    #[test]
    fn test_defaults_without_file() {
        let config = parse(&["prod"]).to_config(&BackupConf::default());
        assert_eq!(config, BackupConfig::new("prod"));
    }

    #[test]
    fn test_cli_overrides_file() {
        let file_conf = BackupConf {
            backup: BackupFileConf {
                filter: Some("del(.status)".to_string()),
                exclude: vec!["kube-public".to_string()],
                dir: Some("/srv/backup".to_string()),
                kubeconfig: None,
            },
        };

        let config = parse(&["prod", "-f", ".spec", "-e", "kube-system"]).to_config(&file_conf);
        assert_eq!(config.filter, ".spec");
        assert_eq!(config.output_dir, PathBuf::from("/srv/backup"));
        assert!(config.is_excluded("kube-system"));
        assert!(config.is_excluded("kube-public"));
    }

    #[test]
    fn test_missing_config_file() {
        let cmd = parse(&["prod", "--config-file", "/nonexistent/kbackup.toml"]);
        let err = cmd.load_file_conf().unwrap_err();
        assert!(err.to_string().contains("/nonexistent/kbackup.toml"));
    }
}
