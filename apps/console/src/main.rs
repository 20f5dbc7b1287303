use std::{sync::Arc, time::Duration};

use anyhow::Result;
use clap::{Parser, Subcommand};
use client_core::{
    http::{HttpAuthBackend, HttpTaskBackend},
    TaskFlowClient,
};
use shared::domain::TodoId;

mod config;

#[derive(Parser, Debug)]
#[command(about = "TaskFlow command-line client")]
struct Args {
    #[arg(long)]
    username: String,
    #[arg(long)]
    password: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the account, then exit; sign in with the same credentials.
    Register,
    /// Print the task list and rank summary.
    List,
    /// Add a task.
    Add { text: String },
    /// Toggle a task's completion by id.
    Toggle { id: i64 },
    /// Delete a task by id.
    Delete { id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let settings = config::load_settings();
    let auth_url = config::validate_base_url(&settings.auth_service_url)?;
    let todo_url = config::validate_base_url(&settings.todo_service_url)?;
    let client = TaskFlowClient::new(
        Arc::new(HttpAuthBackend::new(auth_url)),
        Arc::new(HttpTaskBackend::new(todo_url)),
    );

    if let Command::Register = args.command {
        client.show_create().await;
        client.create_account(&args.username, &args.password).await?;
        println!("Account created. Sign in with the same credentials.");
        return Ok(());
    }

    client.show_login().await;
    client.login(&args.username, &args.password).await?;

    match args.command {
        Command::Register => {}
        Command::List => {}
        Command::Add { text } => {
            let task = client.add_task(&text).await?;
            println!("Added #{}: {}", task.todo_id.0, task.task);
        }
        Command::Toggle { id } => {
            client.toggle_task(TodoId(id)).await?;
            if let Some(display) = client.notifications().upgrade().await {
                let upgrade = &display.event;
                println!(
                    "Rank up! {:?} -> {:?} ({})",
                    upgrade.from_rank, upgrade.to_rank, upgrade.rank_info.display_name
                );
                // Let the follow-up rank fetch land before printing the summary.
                tokio::time::sleep(Duration::from_millis(1100)).await;
            }
        }
        Command::Delete { id } => {
            client.delete_task(TodoId(id)).await?;
            println!("Deleted #{id}");
        }
    }

    for task in client.tasks().await {
        let mark = if task.completed { "x" } else { " " };
        println!("[{mark}] #{:<4} {}", task.todo_id.0, task.task);
    }
    let stats = client.stats().await;
    println!("{} total, {} completed, {} pending", stats.total, stats.completed, stats.pending);
    if let (Some(rank), Some(progress)) = (client.rank().await, client.progress_snapshot().await) {
        if progress.is_max_rank {
            println!("Rank: {} ({} completed, max rank)", rank.display_name, rank.total_completed);
        } else {
            println!(
                "Rank: {} ({} completed, {} to next)",
                rank.display_name, rank.total_completed, progress.tasks_to_next
            );
        }
    }

    Ok(())
}
