use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, bail};
use tokio::sync::{mpsc, watch};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use okeylink::application::services::SessionStore;
use okeylink::application::{Credentials, ProfileUpdate, Session, SessionCommand};
use okeylink::domain::ports::SessionStoragePort;
use okeylink::domain::{AuthToken, ConnectionState, Notification};
use okeylink::infrastructure::{
    AppConfig, CliArgs, Command, ConfigLoader, FileSessionStorage, MemorySessionStorage, RunArgs,
    WebSocketTransportPort,
};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if config.log_stderr {
        let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(true);
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .init();
    } else if let Some(log_path) = config.effective_log_path() {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry().with(filter).init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let loader = ConfigLoader::new()?;
    let mut config = loader.load(args.config.as_deref())?;
    config.merge_with_args(args);
    Ok(config)
}

fn open_storage(config: &AppConfig) -> Result<Arc<dyn SessionStoragePort>> {
    if config.ephemeral {
        info!("Using in-memory session storage");
        return Ok(Arc::new(MemorySessionStorage::new()));
    }

    let storage = match config.effective_data_dir() {
        Some(dir) => FileSessionStorage::with_dir(dir),
        None => FileSessionStorage::new()?,
    };
    info!(dir = %storage.dir().display(), "Using file session storage");
    Ok(Arc::new(storage))
}

fn print_status(config: &AppConfig, storage: Arc<dyn SessionStoragePort>) {
    let store = SessionStore::load(storage);
    let user = store.user();
    let stats = user.stats();

    println!("player:  {}", user.display_name());
    println!("avatar:  {}", user.avatar());
    println!(
        "stats:   {} wins, {} losses, {} games",
        stats.wins, stats.losses, stats.total_games
    );
    match user.token() {
        Some(token) => println!("token:   {token}"),
        None => println!("token:   none (signed out)"),
    }

    let decision = okeylink::application::services::access_gate::decide(store.has_token(), "/");
    match decision.redirect_target() {
        Some(target) => println!("lobby:   redirected to {target}"),
        None => println!("lobby:   allowed"),
    }

    println!("server:  {}", config.effective_server_url());
    if let Some(path) = config.effective_config_path() {
        println!("config:  {}", path.display());
    }
}

fn logout(storage: Arc<dyn SessionStoragePort>) -> Result<()> {
    let mut store = SessionStore::load(storage);
    store.logout()?;
    println!("Signed out.");
    Ok(())
}

async fn report(
    mut state: watch::Receiver<ConnectionState>,
    mut notification: watch::Receiver<Option<Notification>>,
) {
    loop {
        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    return;
                }
                println!("[connection] {}", *state.borrow_and_update());
            }
            changed = notification.changed() => {
                if changed.is_err() {
                    return;
                }
                if let Some(current) = notification.borrow_and_update().as_ref() {
                    println!("[{:?}] {}", current.kind, current.message);
                }
            }
        }
    }
}

fn parse_command(line: &str) -> Option<SessionCommand> {
    let line = line.trim();
    let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    match word {
        "retry" => Some(SessionCommand::Retry),
        "dismiss" => Some(SessionCommand::DismissNotification),
        "logout" => Some(SessionCommand::Logout),
        "name" if !rest.is_empty() => Some(SessionCommand::UpdateProfile(
            ProfileUpdate::new().with_name(rest),
        )),
        "avatar" if !rest.is_empty() => Some(SessionCommand::UpdateProfile(
            ProfileUpdate::new().with_avatar(rest),
        )),
        "login" if !rest.is_empty() => {
            AuthToken::new(rest).map(|token| SessionCommand::Login(Credentials::new(token)))
        }
        _ => None,
    }
}

/// Reads commands from stdin on a plain thread so a pending read never holds
/// up runtime shutdown.
fn spawn_command_reader(commands: mpsc::UnboundedSender<SessionCommand>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else {
                return;
            };
            match parse_command(&line) {
                Some(command) => {
                    if commands.send(command).is_err() {
                        return;
                    }
                }
                None if line.trim().is_empty() => {}
                None => eprintln!(
                    "commands: retry | dismiss | logout | login <token> | name <name> | avatar <url>"
                ),
            }
        }
    });
}

async fn run(config: &AppConfig, storage: Arc<dyn SessionStoragePort>, args: RunArgs) -> Result<()> {
    let mut session = Session::new(
        storage,
        Arc::new(WebSocketTransportPort::new()),
        config.session_config(),
    );

    tokio::spawn(report(
        session.subscribe_state(),
        session.subscribe_notifications(),
    ));

    match args.token.as_deref().and_then(AuthToken::new) {
        Some(token) => {
            let mut credentials = Credentials::new(token);
            if let Some(name) = args.name {
                credentials = credentials.with_name(name);
            }
            if let Some(avatar) = args.avatar {
                credentials = credentials.with_avatar(avatar);
            }
            // A failed save is already reported as a notification.
            let _ = session.login(credentials);
        }
        None if session.user().is_authenticated() => session.start(),
        None => bail!("no stored session; sign in with `okeylink run --token <TOKEN>`"),
    }

    println!(
        "Signed in as {} on {}. Press Ctrl-C to quit.",
        session.user().display_name(),
        config.effective_server_url()
    );

    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    spawn_command_reader(commands_tx);

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    session.run(commands_rx, shutdown).await;

    info!("Session ended");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let _ = dotenvy::dotenv();

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    init_logging(&config)?;

    info!(
        version = okeylink::VERSION,
        server = %config.effective_server_url(),
        "Starting okeylink"
    );

    let storage = open_storage(&config)?;

    match args.effective_command() {
        Command::Run(run_args) => run(&config, storage, run_args).await,
        Command::Status => {
            print_status(&config, storage);
            Ok(())
        }
        Command::Logout => logout(storage),
    }
}
