use super::app_config::LogLevel;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments.
///
/// The `run` flags are also accepted at the top level, so `okeylink --token
/// <TOKEN>` and `okeylink run --token <TOKEN>` are the same. Flags given after
/// `run` win over top-level ones.
#[derive(Debug, Parser)]
#[command(
    name = "okeylink",
    version,
    about = "Session and realtime connection client for the Okey game server",
    long_about = None
)]
pub struct CliArgs {
    /// Game server endpoint.
    #[arg(long, env = "OKEY_API_URL", value_name = "URL")]
    pub server_url: Option<String>,

    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Log to stderr instead of the log file.
    #[arg(long)]
    pub log_stderr: bool,

    /// Directory holding the persisted session.
    #[arg(long, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    /// Keep the session in memory; nothing is written to disk.
    #[arg(long)]
    pub ephemeral: bool,

    /// Flags of the default `run` command.
    #[command(flatten)]
    pub run: RunArgs,

    /// Subcommand; `run` when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl CliArgs {
    /// The subcommand to execute, `run` when none was given.
    #[must_use]
    pub fn effective_command(&self) -> Command {
        match &self.command {
            None => Command::Run(self.run.clone()),
            Some(Command::Run(run)) => Command::Run(run.clone().or(&self.run)),
            Some(command) => command.clone(),
        }
    }
}

/// Subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Connect and stay online until interrupted (default).
    Run(RunArgs),
    /// Show the stored session.
    Status,
    /// Forget the stored session.
    Logout,
}

/// Flags of the `run` command.
#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Sign in with this token instead of the stored one.
    #[arg(long, env = "OKEY_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Player name to set when signing in.
    #[arg(long)]
    pub name: Option<String>,

    /// Avatar URL to set when signing in.
    #[arg(long, value_name = "URL")]
    pub avatar: Option<String>,
}

impl RunArgs {
    fn or(self, fallback: &Self) -> Self {
        Self {
            token: self.token.or_else(|| fallback.token.clone()),
            name: self.name.or_else(|| fallback.name.clone()),
            avatar: self.avatar.or_else(|| fallback.avatar.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_defaults_to_run() {
        let args = CliArgs::try_parse_from(["okeylink", "--name", "Ada"]).unwrap();
        assert!(args.command.is_none());

        let Command::Run(run) = args.effective_command() else {
            panic!("expected run command");
        };
        assert_eq!(run.name.as_deref(), Some("Ada"));
    }

    #[test]
    fn test_token_without_subcommand() {
        let token = CliArgs::command()
            .get_arguments()
            .find(|arg| arg.get_id() == "token")
            .and_then(|arg| arg.get_env())
            .map(|env| env.to_os_string());
        assert_eq!(token.as_deref(), Some(std::ffi::OsStr::new("OKEY_TOKEN")));

        let args = CliArgs::try_parse_from(["okeylink", "--token", "abc"]).unwrap();
        let Command::Run(run) = args.effective_command() else {
            panic!("expected run command");
        };
        assert_eq!(run.token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_run_flags_after_subcommand_win() {
        let args = CliArgs::try_parse_from([
            "okeylink", "--name", "Ada", "--avatar", "a.png", "run", "--name", "Bob",
        ])
        .unwrap();

        let Command::Run(run) = args.effective_command() else {
            panic!("expected run command");
        };
        assert_eq!(run.name.as_deref(), Some("Bob"));
        assert_eq!(run.avatar.as_deref(), Some("a.png"));
    }

    #[test]
    fn test_run_with_login_fields() {
        let args = CliArgs::try_parse_from([
            "okeylink",
            "--log-stderr",
            "run",
            "--token",
            "abc",
            "--name",
            "Ada",
        ])
        .unwrap();

        assert!(args.log_stderr);
        let Some(Command::Run(run)) = args.command else {
            panic!("expected run command");
        };
        assert_eq!(run.token.as_deref(), Some("abc"));
        assert_eq!(run.name.as_deref(), Some("Ada"));
        assert_eq!(run.avatar, None);
    }

    #[test]
    fn test_status_and_logout() {
        let status = CliArgs::try_parse_from(["okeylink", "status"]).unwrap();
        assert!(matches!(status.command, Some(Command::Status)));

        let logout = CliArgs::try_parse_from(["okeylink", "--ephemeral", "logout"]).unwrap();
        assert!(matches!(logout.command, Some(Command::Logout)));
        assert!(logout.ephemeral);
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        assert!(CliArgs::try_parse_from(["okeylink", "--log-level", "loud"]).is_err());
    }
}
