use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;

use tradebit_client::api::{BrokerCredentials, Registration};
use tradebit_client::config::{load_config, print_schema};
use tradebit_client::models::Session;
use tradebit_client::startup::build_context;
use tradebit_client::state::AppContext;
use tradebit_client::utils::logger::init_logging;

#[derive(Parser, Debug)]
#[command(name = "tradebit", version, about = "Command-line client for the Tradebit portfolio backend")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, default_value = "./config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with username and password.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored tokens.
    Logout,
    /// Show whether a session can be restored from storage.
    Status,
    /// Create a new account.
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
    },
    /// Store brokerage API credentials.
    Credentials {
        #[arg(long)]
        api_key: String,
        #[arg(long)]
        api_secret: String,
    },
    /// Print the portfolio summary.
    Summary,
    /// Print the synced holdings.
    Holdings,
    /// Print the brokerage login URL to open in a browser.
    Link,
    /// Complete the brokerage link from the URL the brokerage redirected to.
    Callback {
        /// Full redirect URL, including its `request_token` parameter.
        url: String,
    },
    /// Pull holdings from the linked brokerage account.
    Sync,
    /// Print the configuration JSON schema.
    Schema,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Command::Schema = cli.command {
        return match print_schema() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Could not render schema: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration from {}: {}", cli.config.display(), e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    let ctx = match build_context(config) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Startup failed: {}", e);
            eprintln!("Startup failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&ctx, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{}", message);
            ExitCode::FAILURE
        }
    }
}

async fn run(ctx: &AppContext, command: Command) -> Result<(), String> {
    match command {
        Command::Login { username, password } => {
            let session = ctx
                .sign_in(&username, &password)
                .await
                .map_err(|e| format!("Login failed: {}", e))?;
            print_session(&session);
        }
        Command::Logout => {
            ctx.session
                .logout()
                .await
                .map_err(|e| format!("Logout failed: {}", e))?;
            println!("Logged out.");
        }
        Command::Status => {
            ctx.session.reconcile().await;
            print_session(&ctx.session.session().await);
        }
        Command::Register {
            username,
            email,
            password,
            confirm_password,
            first_name,
            last_name,
        } => {
            let registration = Registration {
                username,
                email,
                password,
                password2: confirm_password,
                first_name,
                last_name,
            };
            ctx.api
                .register(&registration)
                .await
                .map_err(|e| format!("Registration failed: {}", e))?;
            println!("Account '{}' created. You can now log in.", registration.username);
        }
        Command::Credentials { api_key, api_secret } => {
            require_session(ctx).await?;
            let message = ctx
                .api
                .save_broker_credentials(&BrokerCredentials { api_key, api_secret })
                .await
                .map_err(|e| format!("Saving credentials failed: {}", e))?;
            println!("{}", message.unwrap_or_else(|| "Credentials saved.".to_string()));
        }
        Command::Summary => {
            require_session(ctx).await?;
            let summary = ctx.api.portfolio_summary().await.map_err(|e| e.to_string())?;
            print_json(&summary)?;
        }
        Command::Holdings => {
            require_session(ctx).await?;
            let holdings = ctx.api.holdings().await.map_err(|e| e.to_string())?;
            print_json(&holdings)?;
        }
        Command::Link => {
            require_session(ctx).await?;
            let page = ctx.link_page(None).map_err(|e| e.to_string())?;
            let mut flow = ctx.broker_link_flow(page);
            let login_url = flow.start_login().await.map_err(|e| e.to_string())?;
            println!("Open this URL to link your brokerage account:\n{}", login_url);
        }
        Command::Callback { url } => {
            require_session(ctx).await?;
            let page = ctx.link_page(Some(&url)).map_err(|e| e.to_string())?;
            let mut flow = ctx.broker_link_flow(page);
            let linked = flow.handle_callback().await.map_err(|e| e.to_string())?;
            if linked {
                println!("Brokerage account linked.");
            } else {
                println!("No request token found in {}", url);
            }
        }
        Command::Sync => {
            require_session(ctx).await?;
            let page = ctx.link_page(None).map_err(|e| e.to_string())?;
            let flow = ctx.broker_link_flow(page);
            let summary = flow.sync_holdings().await.map_err(|e| e.to_string())?;
            println!("Holdings synced. {}", summary);
        }
        Command::Schema => {}
    }
    Ok(())
}

async fn require_session(ctx: &AppContext) -> Result<(), String> {
    if ctx.session.reconcile().await {
        Ok(())
    } else {
        Err("Not logged in. Run `tradebit login` first.".to_string())
    }
}

fn print_session(session: &Session) {
    match session {
        Session::LoggedOut => println!("Logged out."),
        Session::Authenticated(Some(user)) => {
            println!("Logged in as {} (id {}).", user.username, user.id)
        }
        Session::Authenticated(None) => println!("Logged in."),
    }
}

fn print_json(value: &serde_json::Value) -> Result<(), String> {
    let rendered = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{}", rendered);
    Ok(())
}
