//! Offline inspection of the conversation store.
//!
//! These commands read the database directly and never talk to the chat
//! platform, so they are safe to run next to a live relay.

use anyhow::Result;
use chrono::Utc;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;
use relaydesk_core::relay::render::format_age;
use relaydesk_core::repository::conversation::ConversationRepository;
use relaydesk_types::client::ClientId;
use relaydesk_types::message::Direction;

use crate::state::AppState;

/// Longest message preview shown in the history table.
const PREVIEW_CHARS: usize = 80;

/// `relaydesk clients`
pub async fn list_clients(state: &AppState, json: bool) -> Result<()> {
    let clients = state.repository().list_clients().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&clients)?);
        return Ok(());
    }

    if clients.is_empty() {
        println!();
        println!("  {} No clients yet.", style("i").blue().bold());
        println!();
        return Ok(());
    }

    let now = Utc::now();
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("Name").fg(Color::White),
        Cell::new("Last Contact").fg(Color::White),
    ]);

    for client in &clients {
        table.add_row(vec![
            Cell::new(client.id).fg(Color::White),
            Cell::new(&client.display_name).fg(Color::Cyan),
            Cell::new(format_age(client.last_contact_at, now)).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} client{}",
        style(clients.len()).bold(),
        if clients.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

/// `relaydesk history <client_id>`
pub async fn show_history(state: &AppState, client_id: i64, count: u32, json: bool) -> Result<()> {
    let repo = state.repository();
    let client_id = ClientId(client_id);

    if !repo.client_exists(client_id).await? {
        anyhow::bail!("unknown client {client_id}");
    }

    let count = count.clamp(1, state.config.history_max_count.max(1));
    let messages = repo.get_history(client_id, Some(i64::from(count))).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&messages)?);
        return Ok(());
    }

    if messages.is_empty() {
        println!();
        println!(
            "  {} History with client {} is empty.",
            style("i").blue().bold(),
            style(client_id).cyan()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("#").fg(Color::White),
        Cell::new("Time").fg(Color::White),
        Cell::new("From").fg(Color::White),
        Cell::new("Text").fg(Color::White),
    ]);

    for message in &messages {
        let from = match message.direction {
            Direction::Inbound => Cell::new("client").fg(Color::Cyan),
            Direction::Outbound => Cell::new("you").fg(Color::Green),
        };
        table.add_row(vec![
            Cell::new(message.id).fg(Color::DarkGrey),
            Cell::new(message.created_at.format("%Y-%m-%d %H:%M:%S")),
            from,
            Cell::new(preview(&message.text)),
        ]);
    }

    println!();
    println!("{table}");
    println!();

    Ok(())
}

fn preview(text: &str) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() > PREVIEW_CHARS {
        let cut: String = flat.chars().take(PREVIEW_CHARS - 3).collect();
        format!("{cut}...")
    } else {
        flat
    }
}
