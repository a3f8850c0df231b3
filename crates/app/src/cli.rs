//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line client for ProHero providers.
#[derive(Debug, Parser)]
#[command(name = "prohero", version, about)]
pub struct Cli {
    /// API base URL.
    #[arg(long, global = true, env = "PROHERO_API_BASE_URL")]
    pub base_url: Option<String>,

    /// Directory holding the session files.
    #[arg(long, global = true, env = "PROHERO_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the session, the signed-in user and the duty status.
    Status,
    /// Sign in with a one-time code sent by SMS.
    Login(LoginArgs),
    /// Show or change the duty status.
    Duty {
        /// `on`, `off` or `toggle`; omit to show the current status.
        #[arg(value_enum)]
        action: Option<DutyAction>,
    },
    /// Show the profile, or update it when any field is given.
    Profile(ProfileArgs),
    /// List bookings.
    Bookings,
    /// Permanently delete the account.
    DeleteAccount {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Sign out and remove the stored session.
    Logout,
}

#[derive(Debug, clap::Args)]
pub struct LoginArgs {
    /// Mobile number, with or without the +91 prefix.
    #[arg(long)]
    pub phone: String,
    /// Full name, used when the number is not registered yet.
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Debug, Default, clap::Args)]
pub struct ProfileArgs {
    /// New first name.
    #[arg(long)]
    pub first_name: Option<String>,
    /// New last name.
    #[arg(long)]
    pub last_name: Option<String>,
    /// New email address.
    #[arg(long)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DutyAction {
    /// Go on duty.
    On,
    /// Go off duty.
    Off,
    /// Flip the current status.
    Toggle,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("prohero").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_login_args() {
        let cli = parse(&["login", "--phone", "+91 98765 43210", "--name", "Asha Rao"]);
        match cli.command {
            Command::Login(args) => {
                assert_eq!(args.phone, "+91 98765 43210");
                assert_eq!(args.name.as_deref(), Some("Asha Rao"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_duty_action() {
        let cli = parse(&["duty", "toggle"]);
        assert!(matches!(
            cli.command,
            Command::Duty {
                action: Some(DutyAction::Toggle)
            }
        ));

        let cli = parse(&["duty"]);
        assert!(matches!(cli.command, Command::Duty { action: None }));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&["status", "--base-url", "http://localhost:3000"]);
        assert_eq!(cli.base_url.as_deref(), Some("http://localhost:3000"));
        assert!(matches!(cli.command, Command::Status));
    }

    #[test]
    fn test_login_requires_phone() {
        assert!(Cli::try_parse_from(["prohero", "login"]).is_err());
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
