//! CLI structure and command definitions.

use anyhow::Result;
use boxwiz_core::WizardSettings;
use boxwiz_types::{LogLevel, Platform};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "boxwiz")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "sing-box configuration wizard", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file (defaults to <config dir>/boxwiz/config.yml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Wizard template to use
    #[arg(short, long, global = true)]
    pub template: Option<PathBuf>,

    /// Platform for overlays and rule filtering (linux, darwin, windows, ...)
    #[arg(long, global = true)]
    pub platform: Option<String>,

    /// Directory holding saved wizard states
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the template's sections and rule catalog
    Template {
        /// Also print the effective sections for this platform
        #[arg(short, long)]
        sections: bool,
    },

    /// Recover the parser config from an existing sing-box config
    Import {
        /// Existing config (defaults to the configured config path)
        #[arg(short, long)]
        from: Option<PathBuf>,

        /// Also store the recovered config as the current wizard state
        #[arg(long)]
        save_state: bool,
    },

    /// Rebuild proxy sources from subscription URLs and links
    Reconcile {
        /// File with one URL or link per line ("-" for stdin)
        input: PathBuf,

        /// Start from a saved state instead of the current one
        #[arg(short, long)]
        state: Option<String>,

        /// Store the result back into the state
        #[arg(long)]
        save: bool,
    },

    /// Check subscription URLs and links without applying them
    Check {
        /// File with one URL or link per line ("-" for stdin)
        input: PathBuf,
    },

    /// Build the sing-box config
    Build(BuildArgs),

    /// Manage saved wizard states
    States {
        #[command(subcommand)]
        command: StatesCommand,
    },
}

#[derive(Args)]
pub struct BuildArgs {
    /// Print a preview instead of writing the config
    #[arg(short, long)]
    pub preview: bool,

    /// Rebuild whenever this sources file changes
    #[arg(short, long, value_name = "SOURCES")]
    pub watch: Option<PathBuf>,

    /// Saved state to build from (the current state if omitted)
    #[arg(short, long)]
    pub state: Option<String>,

    /// JSON array of generated outbounds to place between the parser markers
    #[arg(long)]
    pub outbounds: Option<PathBuf>,

    /// Output file (defaults to the configured config path)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Validate the result with `<BIN> check -c <file>` before writing
    #[arg(long, value_name = "BIN")]
    pub check_with: Option<String>,

    /// Enable a catalog rule by label
    #[arg(long, value_name = "LABEL")]
    pub enable: Vec<String>,

    /// Disable a catalog rule by label
    #[arg(long, value_name = "LABEL")]
    pub disable: Vec<String>,

    /// Outbound for route.final
    #[arg(long, value_name = "TAG")]
    pub r#final: Option<String>,

    /// Leave a template section out of the config
    #[arg(long, value_name = "SECTION")]
    pub skip_section: Vec<String>,

    /// Build without TUN-only overlays
    #[arg(long)]
    pub no_tun: bool,
}

#[derive(Subcommand)]
pub enum StatesCommand {
    /// List saved states
    List,

    /// Show a saved state
    Show {
        /// State ID ("current" for the working state)
        id: String,
    },

    /// Copy the current state under a name
    Save {
        /// State ID
        id: String,

        /// Note stored with the state
        #[arg(short = 'm', long, default_value = "")]
        comment: String,
    },

    /// Make a saved state the current one
    Restore {
        /// State ID
        id: String,
    },

    /// Delete a saved state
    Delete {
        /// State ID
        id: String,

        /// Skip confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

impl Cli {
    /// Apply global flags on top of loaded settings.
    pub fn apply_overrides(&self, settings: &mut WizardSettings) {
        if let Some(template) = &self.template {
            settings.template = template.clone();
        }
        if let Some(platform) = &self.platform {
            settings.platform = Platform::new(platform.as_str());
        }
        if let Some(dir) = &self.state_dir {
            settings.state_dir = dir.clone();
        }
        if self.quiet {
            settings.log.level = LogLevel::Error;
        } else if self.debug {
            settings.log.level = LogLevel::Debug;
        } else if self.verbose {
            settings.log.level = LogLevel::Info;
        } else if settings.log.level == LogLevel::Info {
            settings.log.level = LogLevel::Warn;
        }
    }

    pub async fn execute(&self, settings: WizardSettings) -> Result<()> {
        use crate::commands::*;

        let app = App::new(settings);
        match &self.command {
            Commands::Template { sections } => {
                template::execute(&app, *sections).await
            }
            Commands::Import { from, save_state } => {
                import::execute(&app, from.as_deref(), *save_state).await
            }
            Commands::Reconcile { input, state, save } => {
                reconcile::execute(&app, input, state.as_deref(), *save).await
            }
            Commands::Check { input } => {
                check::execute(&app, input).await
            }
            Commands::Build(args) => {
                build::execute(&app, args).await
            }
            Commands::States { command } => match command {
                StatesCommand::List => states::list(&app).await,
                StatesCommand::Show { id } => states::show(&app, id).await,
                StatesCommand::Save { id, comment } => states::save(&app, id, comment).await,
                StatesCommand::Restore { id } => states::restore(&app, id).await,
                StatesCommand::Delete { id, yes } => states::delete(&app, id, *yes).await,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_build_flags() {
        let cli = Cli::try_parse_from([
            "boxwiz", "build", "--preview", "--enable", "Block ads", "--enable", "Direct RU", "--final", "proxy-out",
        ])
        .unwrap();
        let Commands::Build(args) = cli.command else {
            panic!("expected build");
        };
        assert!(args.preview);
        assert_eq!(args.enable, vec!["Block ads", "Direct RU"]);
        assert_eq!(args.r#final.as_deref(), Some("proxy-out"));
        assert!(args.watch.is_none());
    }

    #[test]
    fn test_global_overrides() {
        let cli = Cli::try_parse_from([
            "boxwiz", "states", "list", "--platform", "darwin", "--state-dir", "/tmp/states", "-d",
        ])
        .unwrap();
        let mut settings = WizardSettings::default();
        cli.apply_overrides(&mut settings);
        assert_eq!(settings.platform.as_str(), "darwin");
        assert_eq!(settings.state_dir, PathBuf::from("/tmp/states"));
        assert_eq!(settings.log.level, LogLevel::Debug);
    }

    #[test]
    fn test_quiet_by_default() {
        let cli = Cli::try_parse_from(["boxwiz", "template"]).unwrap();
        let mut settings = WizardSettings::default();
        cli.apply_overrides(&mut settings);
        assert_eq!(settings.log.level, LogLevel::Warn);
    }
}
