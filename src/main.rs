use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use mandrill_mailer::{
    Config, log_filter,
    email::{EmailError, HtmlBody, Mandrill, Markdown, MergeVar, Recipient, RecipientType},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, default_value = "mandrill.toml", global = true)]
    config: PathBuf,

    /// Overrides `logging.level` from the config file
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send a single message
    Send(SendArgs),

    /// Print the resolved configuration without sending anything
    CheckConfig,
}

#[derive(clap::Args, Debug)]
struct SendArgs {
    /// Recipient, either `user@example.com` or `Name <user@example.com>`
    #[arg(long, required = true)]
    to: Vec<String>,

    #[arg(long)]
    cc: Vec<String>,

    #[arg(long)]
    bcc: Vec<String>,

    #[arg(long)]
    from: Option<String>,

    #[arg(long)]
    from_name: Option<String>,

    #[arg(long)]
    reply_to: Option<String>,

    #[arg(short, long)]
    subject: Option<String>,

    /// Plain-text body
    #[arg(long)]
    text: Option<String>,

    /// Read the plain-text body from a file
    #[arg(long, conflicts_with = "text")]
    text_file: Option<PathBuf>,

    /// Raw HTML body
    #[arg(long)]
    html: Option<String>,

    /// Render a Markdown file as the HTML body
    #[arg(long, conflicts_with = "html")]
    markdown_file: Option<PathBuf>,

    /// Send with a server-side Mandrill template
    #[arg(short, long)]
    template: Option<String>,

    /// Global merge var as NAME=VALUE
    #[arg(long = "global-var")]
    global_vars: Vec<String>,

    /// Per-recipient merge var as EMAIL:NAME=VALUE
    #[arg(long = "merge-var")]
    merge_vars: Vec<String>,

    /// Log the request instead of sending it; no API key is needed
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = if cli.config.exists() {
        Config::load_from_file(&cli.config).await?
    } else {
        Config::default()
    };

    let level_name = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let level = match level_name.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // RUST_LOG takes precedence over the configured level
    let filter = log_filter(level, std::env::var("RUST_LOG").ok().as_deref());
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if cli.config.exists() {
        info!("Configuration loaded from: {:?}", cli.config);
    } else {
        info!("Config file not found at {:?}, using defaults", cli.config);
    }

    match cli.command {
        Commands::CheckConfig => check_config(&config),
        Commands::Send(args) => {
            if args.dry_run {
                config.mandrill = config.mandrill.into_dry_run();
            }
            send(config, args).await
        }
    }
}

fn check_config(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mandrill = Mandrill::from_config(config.mandrill.clone())?;

    println!("API endpoint: {}", mandrill.endpoint("messages/send.json")?);
    println!("Transport:    {}", mandrill.transport_name());
    println!(
        "Sender:       {}",
        config
            .mandrill
            .format_from()
            .unwrap_or_else(|| "(not set)".to_string())
    );
    match config.mandrill.resolve_api_key() {
        Ok(_) => println!("API key:      present"),
        Err(e) => println!("API key:      {}", e),
    }

    Ok(())
}

async fn send(config: Config, args: SendArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut mandrill = Mandrill::from_config(config.mandrill)?;

    for (addresses, kind) in [
        (&args.to, RecipientType::To),
        (&args.cc, RecipientType::Cc),
        (&args.bcc, RecipientType::Bcc),
    ] {
        for address in addresses {
            mandrill = mandrill.add_recipient(parse_recipient(address).with_type(kind));
        }
    }

    if let Some(from) = args.from {
        mandrill = mandrill.with_from(from);
    }
    if let Some(from_name) = args.from_name {
        mandrill = mandrill.with_from_name(from_name);
    }
    if let Some(reply_to) = args.reply_to {
        mandrill = mandrill.with_reply_to(reply_to);
    }
    if let Some(subject) = args.subject {
        mandrill = mandrill.with_subject(subject);
    }

    if let Some(text) = args.text {
        mandrill = mandrill.with_body(text);
    } else if let Some(path) = args.text_file {
        mandrill = mandrill.with_body(tokio::fs::read_to_string(path).await?);
    }

    if let Some(html) = args.html {
        mandrill = mandrill.with_html_body(html);
    } else if let Some(path) = args.markdown_file {
        let markdown = Markdown::new(tokio::fs::read_to_string(path).await?);
        mandrill = mandrill.with_html_body(HtmlBody::rich(&markdown));
    }

    if let Some(template) = args.template {
        mandrill = mandrill.with_template(template);
    }

    if !args.global_vars.is_empty() {
        let vars = args
            .global_vars
            .iter()
            .map(|pair| parse_pair(pair).map(|(name, content)| MergeVar::new(name, content)))
            .collect::<Result<Vec<_>, _>>()?;
        mandrill = mandrill.with_global_merge_vars(vars);
    }

    for entry in &args.merge_vars {
        let (email, pair) = entry.split_once(':').ok_or_else(|| {
            EmailError::ConfigError(format!("merge var must be EMAIL:NAME=VALUE, got {}", entry))
        })?;
        let (name, content) = parse_pair(pair)?;

        let mut vars = mandrill
            .merge_vars()
            .find(|entry| entry.rcpt == email)
            .map(|entry| entry.vars.clone())
            .unwrap_or_default();
        vars.insert(name.to_string(), content.to_string());
        mandrill = mandrill.with_merge_var_for_recipient(email, vars);
    }

    match mandrill.send().await {
        Ok(body) => {
            println!("{}", body);
            Ok(())
        }
        Err(e @ EmailError::Transport(_)) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        Err(EmailError::ProviderRejection { status, body }) => {
            eprintln!("Mandrill returned status {}:\n{}", status, body);
            std::process::exit(2);
        }
        Err(e) => Err(e.into()),
    }
}

fn parse_recipient(input: &str) -> Recipient {
    let input = input.trim();
    match (input.rfind('<'), input.ends_with('>')) {
        (Some(start), true) => {
            let email = &input[start + 1..input.len() - 1];
            let name = input[..start].trim().trim_matches('"');
            let recipient = Recipient::new(email.trim());
            if name.is_empty() {
                recipient
            } else {
                recipient.with_name(name)
            }
        }
        _ => Recipient::new(input),
    }
}

fn parse_pair(input: &str) -> Result<(&str, &str), EmailError> {
    input
        .split_once('=')
        .ok_or_else(|| EmailError::ConfigError(format!("expected NAME=VALUE, got {}", input)))
}
