use culinary_client::application_port::*;
use culinary_client::client::*;
use culinary_client::domain_model::*;
use culinary_client::logger::*;
use culinary_client::settings::*;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let settings = parse_settings(cli.settings.as_deref())?;
    debug!(?settings);
    logger.reload_from_config(&LogConfig {
        filter: settings.log.filter.clone(),
    })?;

    let client = Client::try_new(&settings).await?;
    let result = run(&client, cli.command.unwrap_or(Command::Status)).await;

    let shutdown_timeout = Duration::from_secs(5);
    if tokio::time::timeout(shutdown_timeout, client.shutdown()).await.is_err() {
        error!("client shutdown timed out");
    }

    result
}

async fn run(client: &Client, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Status => match client.session() {
            Session::Authenticated(user) => println!("Signed in as {} ({})", user.username, user.id),
            Session::Anonymous => println!("Not signed in"),
        },
        Command::Login { username, password } => {
            let user = client
                .auth()
                .login(LoginInput { username, password })
                .await?;
            println!("Signed in as {}", user.username);
        }
        Command::Register {
            username,
            email,
            password,
            confirm_password,
            recaptcha,
        } => {
            let input = RegisterInput {
                username,
                email,
                password,
                recaptcha,
            };
            let message = client.auth().register(input, &confirm_password).await?;
            println!("{message}");
        }
        Command::Logout => {
            client.auth().logout().await?;
            println!("Signed out");
        }
        Command::Generate { prompt } => {
            let job_id = client.view().generate(&prompt).await?;
            println!("Recipe {job_id} started");
            watch(client, job_id).await?;
        }
        Command::Watch { recipe_id } => watch(client, JobId(recipe_id)).await?,
    }
    Ok(())
}

async fn watch(client: &Client, job_id: JobId) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let ctrl_c = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let mut last = String::new();
    let outcome = client
        .view()
        .watch(&job_id, cancel, |snapshot| {
            let text = render_snapshot(snapshot);
            if text != last {
                println!("{text}");
                last = text;
            }
        })
        .await;
    ctrl_c.abort();

    match outcome? {
        ViewOutcome::Completed(_) => {}
        ViewOutcome::Left(route) => println!("Stopped following {job_id}, now at {route}"),
        ViewOutcome::Cancelled => println!("Stopped following {job_id}"),
    }
    Ok(())
}
