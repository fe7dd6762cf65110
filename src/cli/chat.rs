//! CLI `chat` command: a line-oriented REPL over `handle_message`.

use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

use memogenius::config::MemoConfig;
use memogenius::server;

pub async fn chat(config: MemoConfig, user: &str) -> Result<()> {
    let state = server::build_state(config).await?;

    println!("Chatting as {user}. Type \\resetintent to start over, Ctrl-D to quit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = state.sessions.handle_message(line, user).await;
        println!("{}\n", reply.text);
    }
    Ok(())
}
