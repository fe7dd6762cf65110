//! CLI `user` commands.

use anyhow::{bail, Result};

use memogenius::config::MemoConfig;
use memogenius::store::{lists, users};

fn open(config: &MemoConfig) -> Result<rusqlite::Connection> {
    memogenius::db::open_database(config.resolved_db_path(), config.embedding.dimensions)
}

fn print_user(user: &users::User) {
    println!("User {}", user.id);
    println!("  Access key:  {}", user.access_key);
    match user.channel_id {
        Some(id) => println!("  Channel id:  {id}"),
        None => println!("  Channel id:  (none)"),
    }
    println!(
        "  Web token:   {}",
        if user.web_token.is_some() { "linked" } else { "(none)" }
    );
    println!("  Created:     {}", user.created_at);
}

/// Create a user (with its two default lists) and print the access key.
pub fn user_create(config: &MemoConfig, channel_id: Option<i64>) -> Result<()> {
    let conn = open(config)?;
    let user = match channel_id {
        Some(id) => users::get_or_create_channel_user(&conn, id)?,
        None => users::create_user(&conn, None)?,
    };
    lists::ensure_lists_exist(&conn, user.id)?;
    print_user(&user);
    Ok(())
}

pub fn user_show(config: &MemoConfig, identifier: &str) -> Result<()> {
    let conn = open(config)?;
    let Some(user) = users::find_user(&conn, identifier)? else {
        bail!("no user matches '{identifier}'");
    };
    print_user(&user);

    for kind in lists::ListKind::ALL {
        let view = lists::get_list_view(&conn, user.id, kind)?;
        println!(
            "  {:<14} {} item(s), {} completed",
            view.list.title, view.item_count, view.completed_count
        );
    }
    Ok(())
}
