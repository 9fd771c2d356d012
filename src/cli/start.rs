use crate::cli::{actions::Action, commands, dispatch::handler, globals::GlobalArgs};
use anyhow::{anyhow, Result};
use secrecy::SecretString;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// Start the CLI
pub fn start() -> Result<(Action, GlobalArgs)> {
    let matches = commands::new().get_matches();

    let verbosity_level = match matches.get_one::<u8>("verbosity").map_or(0, |&v| v) {
        0 => tracing::Level::ERROR,
        1 => tracing::Level::WARN,
        2 => tracing::Level::INFO,
        3 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    let fmt_layer = fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(false);

    // RUST_LOG=
    let env_filter = EnvFilter::builder()
        .with_default_directive(verbosity_level.into())
        .from_env_lossy();

    let subscriber = Registry::default().with(fmt_layer).with(env_filter);

    tracing::subscriber::set_global_default(subscriber)?;

    let frontend_url = matches
        .get_one::<String>("frontend-url")
        .map(ToString::to_string)
        .ok_or_else(|| anyhow!("missing frontend URL"))?;

    let mut globals = GlobalArgs::new(frontend_url);

    let secret = matches
        .get_one::<String>("jwt-secret")
        .map(|s| SecretString::from(s.as_str()))
        .ok_or_else(|| anyhow!("missing required argument: --jwt-secret"))?;

    globals.set_secret(secret);

    let action = handler(&matches)?;

    Ok((action, globals))
}
