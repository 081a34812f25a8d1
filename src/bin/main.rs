use anyhow::{Context, Error};
use blog_client::{
    endpoints::{ProfilePicture, ProfileUpdate},
    AuthenticatedClient, ClientConfig, SessionEvent,
};
use reqwest::StatusCode;
use std::{path::PathBuf, time::Duration};
use structopt::StructOpt;
use tokio::sync::broadcast::{self, error::RecvError};
use url::Url;

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();
    let args = Args::from_args();

    log::debug!("Talking to {}", args.base_url);

    let client = AuthenticatedClient::connect(args.config())?;

    // the transport never navigates anywhere, it just announces that the
    // session is gone and whoever owns the UI decides what to do
    let watcher = tokio::spawn(watch_session(client.session().subscribe()));

    if let (Some(username), Some(password)) = (&args.username, &args.password)
    {
        let user = client
            .login(username, password)
            .await
            .context("Unable to log in")?;
        log::info!("Logged in as {}", user.username);
    } else if client.bootstrap().await.is_none() {
        log::warn!("There is no active session");
    }

    match args.command {
        Command::Whoami => match client.session().current_user() {
            Some(user) => println!("{}", serde_json::to_string_pretty(&user)?),
            None => println!("Not logged in"),
        },
        Command::Login => {},
        Command::UpdateProfile {
            username,
            email,
            picture,
        } => {
            let mut update = ProfileUpdate::new(username, email);

            if let Some(path) = picture {
                let contents = std::fs::read(&path).with_context(|| {
                    format!("Unable to read \"{}\"", path.display())
                })?;
                let file_name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| String::from("profile_picture"));
                let picture =
                    ProfilePicture::from_file_name(file_name, contents);
                update = update.with_picture(picture);
            }

            match client.update_profile(&update).await {
                Ok(updated) => {
                    println!("{}", serde_json::to_string_pretty(&updated)?)
                },
                Err(e) => {
                    for (field, messages) in
                        e.field_errors().unwrap_or_default()
                    {
                        log::error!("{}: {}", field, messages.join(", "));
                    }
                    return Err(e).context("Unable to update the profile");
                },
            }
        },
        Command::Logout => client.logout().await,
    }

    // dropping the client closes the event channel, so the watcher logs
    // whatever is still queued and then stops
    drop(client);
    watcher.await.context("The session watcher panicked")?;

    Ok(())
}

async fn watch_session(mut events: broadcast::Receiver<SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(SessionEvent::Expired { redirect_to }) => {
                log::warn!("Session expired, redirecting to {}", redirect_to)
            },
            Ok(event) => log::debug!("Session event: {:?}", event),
            Err(RecvError::Lagged(skipped)) => {
                log::warn!("Missed {} session events", skipped)
            },
            Err(RecvError::Closed) => break,
        }
    }
}

#[derive(Debug, StructOpt)]
struct Args {
    #[structopt(
        long = "base-url",
        env = "BLOG_API_URL",
        default_value = "http://localhost:8000/",
        help = "The blog API's base URL"
    )]
    base_url: Url,
    #[structopt(
        short = "u",
        long = "username",
        env = "BLOG_USERNAME",
        help = "Log in as this user first"
    )]
    username: Option<String>,
    #[structopt(
        short = "p",
        long = "password",
        env = "BLOG_PASSWORD",
        hide_env_values = true,
        help = "Your password"
    )]
    password: Option<String>,
    #[structopt(
        long = "refresh-status",
        help = "A status code which means the session expired (default: 403)"
    )]
    refresh_statuses: Vec<StatusCode>,
    #[structopt(
        long = "timeout",
        default_value = "30",
        help = "How many seconds to wait for a response"
    )]
    timeout: u64,
    #[structopt(subcommand)]
    command: Command,
}

impl Args {
    fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(self.base_url.clone())
            .with_request_timeout(Duration::from_secs(self.timeout));

        if !self.refresh_statuses.is_empty() {
            config =
                config.with_refresh_statuses(self.refresh_statuses.clone());
        }

        config
    }
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Print the user the current session belongs to.
    Whoami,
    /// Log in and do nothing else.
    Login,
    /// Change your username, email or profile picture.
    UpdateProfile {
        #[structopt(long = "username")]
        username: String,
        #[structopt(long = "email")]
        email: String,
        #[structopt(long = "picture", parse(from_os_str))]
        picture: Option<PathBuf>,
    },
    /// End the current session.
    Logout,
}
