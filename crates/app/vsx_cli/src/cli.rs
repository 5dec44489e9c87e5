use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "vsx", version, about = "Open VSX token administration")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the CLI version
    Version,

    /// Apply database migrations
    Migrate,

    /// Inspect or revoke provider tokens
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum TokenCommands {
    /// Show the active token of a user, refreshing it if it expired
    Show {
        #[command(flatten)]
        target: TokenTarget,

        /// Print token values instead of masking them
        #[arg(long)]
        reveal: bool,
    },

    /// Remove the stored token of a user
    Revoke {
        #[command(flatten)]
        target: TokenTarget,
    },
}

#[derive(Args, Debug)]
pub struct TokenTarget {
    /// User id
    #[arg(long)]
    pub user: i64,

    /// Provider id (e.g. github, eclipse)
    #[arg(long)]
    pub provider: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_token_show() {
        let cli = Cli::try_parse_from([
            "vsx", "token", "show", "--user", "7", "--provider", "eclipse", "--reveal",
        ])
        .unwrap();
        match cli.command {
            Commands::Token {
                command: TokenCommands::Show { target, reveal },
            } => {
                assert_eq!(target.user, 7);
                assert_eq!(target.provider, "eclipse");
                assert!(reveal);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_non_numeric_user() {
        assert!(
            Cli::try_parse_from(["vsx", "token", "revoke", "--user", "bob", "--provider", "github"])
                .is_err()
        );
    }
}
