use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "sysmode", version, about = "Query and change device operating-mode states")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Read configuration from this file instead of the default search path.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Override the state file (file store only).
    #[arg(long, global = true)]
    pub store_path: Option<String>,

    /// Print machine readable JSON.
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ModeArg {
    /// Mode name, e.g. DEVICE_OPTIMIZE (case-sensitive).
    pub mode: String,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RequestArgs {
    /// Mode name, e.g. DEVICE_OPTIMIZE (case-sensitive).
    pub mode: String,

    /// State name, e.g. GAME or game.
    pub state: String,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ClientArgs {
    /// Client callsign, e.g. org.rdk.Dummy.
    pub callsign: String,

    /// Mode name, e.g. DEVICE_OPTIMIZE (case-sensitive).
    pub mode: String,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct StatusArgs {
    /// Limit output to one mode.
    pub mode: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the supported modes and their states.
    Modes,
    /// Print the persisted state of a mode.
    Get(ModeArg),
    /// Change the state of a mode and notify its registered clients.
    Request(RequestArgs),
    /// Register a client for a mode.
    Activate(ClientArgs),
    /// Unregister a client from a mode.
    Deactivate(ClientArgs),
    /// Show state, catch-up latch and clients per mode.
    Status(StatusArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_request_with_global_flags() {
        let args = Args::try_parse_from([
            "sysmode",
            "request",
            "DEVICE_OPTIMIZE",
            "GAME",
            "--json",
            "--store-path",
            "/tmp/SystemMode.txt",
        ])
        .unwrap();
        assert!(args.json);
        assert_eq!(args.store_path.as_deref(), Some("/tmp/SystemMode.txt"));
        match args.command {
            Commands::Request(r) => {
                assert_eq!(r.mode, "DEVICE_OPTIMIZE");
                assert_eq!(r.state, "GAME");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_status_mode_is_optional() {
        let args = Args::try_parse_from(["sysmode", "status"]).unwrap();
        assert!(matches!(args.command, Commands::Status(StatusArgs { mode: None })));
    }

    #[test]
    fn test_activate_requires_mode() {
        assert!(Args::try_parse_from(["sysmode", "activate", "org.rdk.Dummy"]).is_err());
    }
}
