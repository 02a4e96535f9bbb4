//! Mode subcommands: every command except `modes` builds a manager from the
//! loaded configuration, runs one operation and shuts the manager down.
use std::fmt::Write as _;

use serde_json::json;
use sysmode_core::api as core_api;
use sysmode_core::api::{
    Activation, AppConfig, BroadcastReport, CatchUpPolicy, CliError, ModeCatalog, ModeError,
    ModeStatus, StateManager,
};

use crate::commands::cli::{ClientArgs, Commands, ModeArg, RequestArgs, StatusArgs};

/// Each command runs in its own process, so the store is the only session
/// there is: registered callsigns are kept and restored, and the catch-up
/// latch comes from the persisted state.
pub fn one_shot_config(mut cfg: AppConfig) -> AppConfig {
    cfg.manager.restore_clients = true;
    cfg.manager.catch_up = CatchUpPolicy::Persisted;
    cfg
}

pub async fn handle(
    cmd: Commands,
    json: bool,
    ctx: &core_api::AppContext,
) -> Result<i32, CliError> {
    tracing::debug!(target: "sysmode.cli", stage = "cli.command", command = ?cmd, json = json);
    if let Commands::Modes = cmd {
        emit(json, modes_json(), render_modes())?;
        return Ok(0);
    }

    let manager = ctx
        .build_manager()
        .await
        .map_err(|e| CliError::Config(format!("{e:#}")))?;
    let result = match cmd {
        Commands::Modes => Ok(0),
        Commands::Get(args) => handle_get(args, json, &manager).await,
        Commands::Request(args) => handle_request(args, json, &manager).await,
        Commands::Activate(args) => handle_activate(args, json, &manager).await,
        Commands::Deactivate(args) => handle_deactivate(args, json, &manager).await,
        Commands::Status(args) => handle_status(args, json, &manager).await,
    };
    manager.shutdown();
    result
}

fn emit(json: bool, value: serde_json::Value, text: String) -> Result<(), CliError> {
    if json {
        let out = serde_json::to_string_pretty(&value).map_err(anyhow::Error::from)?;
        println!("{out}");
    } else {
        print!("{text}");
    }
    Ok(())
}

fn mode_from_arg(name: &str) -> Result<core_api::SystemMode, CliError> {
    ModeCatalog::mode_from_name(name)
        .ok_or_else(|| ModeError::invalid(format!("unknown mode {name:?}")).into())
}

async fn handle_get(
    args: ModeArg,
    json: bool,
    manager: &StateManager,
) -> Result<i32, CliError> {
    let mode = mode_from_arg(&args.mode)?;
    let state = manager.get_state(mode).await?;
    let name = ModeCatalog::state_name(mode, state).unwrap_or_default();
    let display = ModeCatalog::state_display_name(mode, state).unwrap_or_default();
    emit(
        json,
        json!({ "mode": args.mode, "state": name, "display": display }),
        format!("{name}\n"),
    )?;
    Ok(0)
}

async fn handle_request(
    args: RequestArgs,
    json: bool,
    manager: &StateManager,
) -> Result<i32, CliError> {
    let report = manager
        .request_state_by_name(&args.mode, &args.state)
        .await?;
    emit(
        json,
        serde_json::to_value(&report).map_err(anyhow::Error::from)?,
        render_report(&args.mode, &report),
    )?;
    Ok(0)
}

async fn handle_activate(
    args: ClientArgs,
    json: bool,
    manager: &StateManager,
) -> Result<i32, CliError> {
    let activation = manager
        .client_activated(&args.callsign, &args.mode)
        .await?;
    let (outcome, text) = match &activation {
        Activation::Ignored => ("ignored", "empty callsign, nothing to do".to_string()),
        Activation::Unresolved => (
            "unresolved",
            format!("{}: no listener endpoint configured", args.callsign),
        ),
        Activation::Registered { replaced, .. } => (
            "registered",
            format!(
                "{} registered for {}{}",
                args.callsign,
                args.mode,
                if *replaced { " (replaced)" } else { "" }
            ),
        ),
    };
    let caught_up = match activation {
        Activation::Registered { caught_up, .. } => caught_up,
        _ => None,
    };
    emit(
        json,
        json!({
            "callsign": args.callsign,
            "mode": args.mode,
            "outcome": outcome,
            "caught_up": caught_up,
        }),
        format!("{text}\n"),
    )?;
    Ok(0)
}

async fn handle_deactivate(
    args: ClientArgs,
    json: bool,
    manager: &StateManager,
) -> Result<i32, CliError> {
    let found = manager
        .client_deactivated(&args.callsign, &args.mode)
        .await?;
    emit(
        json,
        json!({ "callsign": args.callsign, "mode": args.mode, "found": found }),
        format!("{} deactivated for {}\n", args.callsign, args.mode),
    )?;
    Ok(0)
}

async fn handle_status(
    args: StatusArgs,
    json: bool,
    manager: &StateManager,
) -> Result<i32, CliError> {
    let modes = match args.mode.as_deref() {
        Some(name) => vec![mode_from_arg(name)?],
        None => ModeCatalog::modes().collect(),
    };
    let mut statuses = Vec::with_capacity(modes.len());
    for mode in modes {
        statuses.push(manager.status(mode).await?);
    }
    emit(
        json,
        serde_json::to_value(&statuses).map_err(anyhow::Error::from)?,
        render_status(&statuses),
    )?;
    Ok(0)
}

fn modes_json() -> serde_json::Value {
    let modes: Vec<_> = ModeCatalog::descriptors()
        .iter()
        .map(|d| {
            let states: Vec<_> = d
                .states
                .iter()
                .map(|e| json!({ "name": e.name, "display": e.display, "value": e.state.as_raw() }))
                .collect();
            json!({
                "mode": d.name,
                "value": d.mode.as_raw(),
                "default_state": d.entry(d.default_state).map(|e| e.name),
                "states": states,
            })
        })
        .collect();
    serde_json::Value::Array(modes)
}

fn render_modes() -> String {
    let mut out = String::new();
    for d in ModeCatalog::descriptors() {
        let _ = writeln!(out, "{} ({})", d.name, d.mode.as_raw());
        for e in d.states {
            let default = if e.state == d.default_state {
                " [default]"
            } else {
                ""
            };
            let _ = writeln!(out, "  {} ({}){}", e.name, e.display, default);
        }
    }
    out
}

fn render_report(mode: &str, report: &BroadcastReport) -> String {
    let mut out = format!(
        "{mode} -> {}: delivered {}/{}",
        report.state,
        report.delivered.len(),
        report.attempted()
    );
    if !report.persisted {
        out.push_str(" (not persisted)");
    }
    out.push('\n');
    for f in &report.failed {
        let _ = writeln!(out, "  failed {}: {}", f.callsign, f.error);
    }
    out
}

fn render_status(statuses: &[ModeStatus]) -> String {
    let mut out = String::new();
    for s in statuses {
        let clients = if s.clients.is_empty() {
            "-".to_string()
        } else {
            s.clients.join(", ")
        };
        let _ = writeln!(
            out,
            "{}: {} requested={} clients={}",
            s.mode, s.state_name, s.requested, clients
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_api::{ListenerFailure, State, SystemMode};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_modes_marks_default() {
        assert_eq!(
            render_modes(),
            "DEVICE_OPTIMIZE (1)\n  VIDEO (video) [default]\n  GAME (game)\n"
        );
    }

    #[test]
    fn test_modes_json_shape() {
        let v = modes_json();
        assert_eq!(v[0]["mode"], "DEVICE_OPTIMIZE");
        assert_eq!(v[0]["default_state"], "VIDEO");
        assert_eq!(v[0]["states"][1]["value"], 2);
    }

    #[test]
    fn test_render_report_lists_failures() {
        let report = BroadcastReport {
            state: "GAME".into(),
            ts: String::new(),
            delivered: vec!["a".into()],
            failed: vec![ListenerFailure {
                callsign: "b".into(),
                error: "refused".into(),
            }],
            persisted: false,
        };
        assert_eq!(
            render_report("DEVICE_OPTIMIZE", &report),
            "DEVICE_OPTIMIZE -> GAME: delivered 1/2 (not persisted)\n  failed b: refused\n"
        );
    }

    #[test]
    fn test_render_status() {
        let status = ModeStatus {
            mode: SystemMode::DeviceOptimize,
            state: State::Game,
            state_name: "GAME".into(),
            requested: true,
            clients: vec![],
        };
        assert_eq!(
            render_status(&[status]),
            "DEVICE_OPTIMIZE: GAME requested=true clients=-\n"
        );
    }

    fn file_context(dir: &std::path::Path) -> core_api::AppContext {
        let mut cfg = AppConfig::default();
        cfg.store.provider = core_api::StoreProvider::File(core_api::FileStoreConfig {
            path: dir.join("SystemMode.txt").to_string_lossy().to_string(),
        });
        cfg.listeners
            .endpoints
            .insert("org.rdk.Dummy".into(), "http://127.0.0.1:9".into());
        cfg.listeners.timeout_ms = 500;
        core_api::AppContext::new(
            one_shot_config(cfg),
            Some(std::sync::Arc::new(
                sysmode_plugins::services::PluginServicesFactory,
            )),
        )
    }

    fn client_args() -> ClientArgs {
        ClientArgs {
            callsign: "org.rdk.Dummy".into(),
            mode: "DEVICE_OPTIMIZE".into(),
        }
    }

    #[tokio::test]
    async fn test_read_commands_keep_activated_clients() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = file_context(dir.path());
        let path = dir.path().join("SystemMode.txt");

        handle(Commands::Activate(client_args()), true, &ctx)
            .await
            .unwrap();
        handle(
            Commands::Get(ModeArg {
                mode: "DEVICE_OPTIMIZE".into(),
            }),
            true,
            &ctx,
        )
        .await
        .unwrap();
        handle(Commands::Status(StatusArgs { mode: None }), true, &ctx)
            .await
            .unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.contains("DEVICE_OPTIMIZE.callsign=org.rdk.Dummy"), "{body}");

        handle(Commands::Deactivate(client_args()), true, &ctx)
            .await
            .unwrap();
        let body = std::fs::read_to_string(&path).unwrap();
        assert!(!body.contains("callsign"), "{body}");
    }

    #[test]
    fn test_one_shot_config_keeps_persisted_session() {
        let cfg = one_shot_config(AppConfig::default());
        assert!(cfg.manager.restore_clients);
        assert_eq!(cfg.manager.catch_up, CatchUpPolicy::Persisted);
    }

    #[test]
    fn test_unknown_mode_is_invalid_argument() {
        let err = mode_from_arg("device_optimize").unwrap_err();
        assert!(matches!(err, CliError::Mode(ref m) if m.is_invalid_argument()));
    }
}
