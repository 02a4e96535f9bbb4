use clap::Parser;
use std::sync::Arc;
use sysmode_cli::commands::{cli, mode};
use sysmode_core::api as core_api;
use sysmode_core::api::{AppConfig, CliError, FileStoreConfig, ModeError, StoreProvider};
use sysmode_plugins::services::PluginServicesFactory;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static LOG_GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    std::sync::OnceLock::new();

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            exit_code_for_error(&e)
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> Result<i32, CliError> {
    let args = cli::Args::parse();
    let cfg = load_config(&args).map_err(|e| CliError::Config(format!("{e:#}")))?;
    init_tracing(&cfg.logging).map_err(|e| CliError::Config(format!("logging: {e}")))?;

    let ctx = core_api::AppContext::new(
        mode::one_shot_config(cfg),
        Some(Arc::new(PluginServicesFactory)),
    );
    mode::handle(args.command, args.json, &ctx).await
}

fn load_config(args: &cli::Args) -> anyhow::Result<AppConfig> {
    let mut cfg = match args.config.as_deref() {
        Some(path) => {
            let mut cfg = core_api::load_from(std::path::Path::new(path))?;
            core_api::fill_store_path(&mut cfg, &core_api::get_sysmode_data_dir()?);
            core_api::apply_env_overrides(&mut cfg, |key| std::env::var(key).ok())?;
            cfg
        }
        None => core_api::load_default()?,
    };
    if let Some(path) = args.store_path.as_deref().filter(|p| !p.trim().is_empty()) {
        cfg.store.provider = StoreProvider::File(FileStoreConfig {
            path: path.to_string(),
        });
    }
    Ok(cfg)
}

fn exit_code_for_error(e: &CliError) -> i32 {
    // 0: success
    // 11: config error
    // 20: store / IO error
    // 22: invalid mode or state argument
    // 50: internal/uncategorized
    // logging setup failures are reported as config errors
    match e {
        CliError::Config(_) => 11,
        CliError::Mode(me) => match me {
            ModeError::InvalidArgument(_) => 22,
            ModeError::Store(_) => 20,
        },
        CliError::Io(_) => 20,
        CliError::Command(_) => 50,
        CliError::Anyhow(_) => 50,
    }
}

fn init_tracing(logging: &core_api::LoggingConfig) -> Result<(), String> {
    if !logging.enabled {
        return Ok(());
    }

    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(logging.level.clone()).map_err(|e| e.to_string())?,
    };

    let mut maybe_writer = None;

    if logging.file {
        let dir = match logging
            .directory
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(d) => std::path::PathBuf::from(d),
            None => std::env::temp_dir().join("sysmode"),
        };

        std::fs::create_dir_all(&dir).map_err(|e| format!("create log dir failed: {e}"))?;
        let appender = tracing_appender::rolling::daily(dir, "sysmode.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        maybe_writer = Some(non_blocking);
    }

    if !logging.console && maybe_writer.is_none() {
        return Err("logging disabled for both console and file".to_string());
    }

    let console_layer = logging.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_ansi(atty::is(atty::Stream::Stderr))
    });

    let file_layer = maybe_writer.map(|w| {
        tracing_subscriber::fmt::layer()
            .with_writer(w)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}
