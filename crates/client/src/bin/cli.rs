use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use client::{http::HttpApi, Session};
use postboard_core::{
    config::{ClientConfig, PostboardConfig},
    mutation::{MutationOutcome, NoticeLevel},
    post::PostDraft,
    query::UsersView,
};

#[derive(Parser)]
#[command(author, version, about, long_about=None)]
struct Cli {
    #[arg(short, long)]
    /// Path to config file; defaults to ~/.postboard/postboard.toml
    config: Option<PathBuf>,

    #[arg(short, long, env = "POSTBOARD_API_URL")]
    /// Base url of the postboard server. For ex, http://localhost:3001
    api_url: Option<String>,

    #[arg(long, global = true)]
    /// Print JSON instead of tables
    json: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Clone, Debug)]
pub enum CliCommand {
    /// Lists one page of users
    Users {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        page_size: Option<u32>,
    },

    /// Lists the posts of a user, newest first
    Posts { user_id: i64 },

    /// Creates a new post for the user with the given `title` and `body`
    NewPost {
        user_id: i64,
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        body: String,
    },

    /// Replaces the title and body of a post
    EditPost {
        user_id: i64,
        post_id: i64,
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        body: String,
    },

    /// Deletes a post of the user
    DeletePost { user_id: i64, post_id: i64 },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = PostboardConfig::load(cli.config.clone())?.client;
    if let Some(api_url) = cli.api_url.clone() {
        config.api_url = api_url;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Unable to start the runtime")?;
    runtime.block_on(run(cli, config))
}

async fn run(cli: Cli, mut config: ClientConfig) -> anyhow::Result<()> {
    if let CliCommand::Users {
        page_size: Some(page_size),
        ..
    } = &cli.command
    {
        config.page_size = (*page_size).max(1);
    }
    let api = HttpApi::from_config(&config)?;
    let mut session = Session::new(Arc::new(api), config);

    match cli.command {
        CliCommand::Users { page, .. } => {
            let mut users = session.users_page();
            let total = users.load_count().await?;
            if page != 1 && !users.go_to(page).await? {
                return Err(anyhow!("Page {page} is out of range, there are {total} pages"));
            }
            if page == 1 {
                users.refresh().await?;
            }
            let view = users
                .view()
                .ok_or_else(|| anyhow!("No users page loaded"))?;
            if let Some(err) = &view.error {
                return Err(anyhow!(err.clone()));
            }
            if cli.json {
                print_users_json(view)?;
            } else {
                print_users(view);
                println!("{}", users.control());
            }
        }

        CliCommand::Posts { user_id } => {
            let posts = session.user_posts(user_id).posts().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&posts)?);
            } else if posts.is_empty() {
                println!("User {user_id} has no posts");
            } else {
                for post in posts.iter() {
                    println!("{post}");
                }
            }
        }

        CliCommand::NewPost {
            user_id,
            title,
            body,
        } => {
            let outcome = session
                .user_posts(user_id)
                .create(PostDraft::new(title, body))
                .await?;
            report(&mut session, &outcome, cli.json)?;
        }

        CliCommand::EditPost {
            user_id,
            post_id,
            title,
            body,
        } => {
            let outcome = session
                .user_posts(user_id)
                .edit(post_id, PostDraft::new(title, body))
                .await?;
            report(&mut session, &outcome, cli.json)?;
        }

        CliCommand::DeletePost { user_id, post_id } => {
            let outcome = session.user_posts(user_id).delete(post_id).await?;
            report(&mut session, &outcome, cli.json)?;
        }
    }
    Ok(())
}

fn print_users(view: &UsersView) {
    println!(
        "{:<4} {:<24} {:<18} {:<28} {:<22} Address",
        "ID", "Name", "Username", "Email", "Phone"
    );
    for user in view.users.iter() {
        println!(
            "{:<4} {:<24} {:<18} {:<28} {:<22} {}",
            user.id,
            user.name,
            user.username,
            user.email,
            user.phone,
            user.address()
        );
    }
    if let Some(count) = view.total_count {
        println!("Page {} of {} ({count} users)", view.page, view.total_pages);
    }
}

fn print_users_json(view: &UsersView) -> anyhow::Result<()> {
    let value = json!({
        "page": view.page,
        "page_size": view.page_size,
        "total_pages": view.total_pages,
        "total_count": view.total_count,
        "users": view.users,
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

/// Print the notices of the mutation; a failed mutation fails the command.
fn report(session: &mut Session, outcome: &MutationOutcome, as_json: bool) -> anyhow::Result<()> {
    for notice in session.drain_notices() {
        match notice.level {
            NoticeLevel::Success if !as_json => println!("{notice}"),
            NoticeLevel::Success => {}
            NoticeLevel::Error => eprintln!("{notice}"),
        }
    }
    if as_json {
        let value = json!({
            "state": outcome.state.to_string(),
            "message": outcome.message,
            "post": outcome.post,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else if let Some(post) = &outcome.post {
        println!("{post}");
    }
    if !outcome.is_committed() {
        return Err(anyhow!(outcome.message.clone()));
    }
    Ok(())
}
