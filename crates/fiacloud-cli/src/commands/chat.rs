// AI chat commands

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{anyhow, bail, Result};
use fiacloud_lib::models::MessageRole;
use fiacloud_lib::services::ai::ChatService;
use fiacloud_lib::utils::object_key;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::context::AppContext;

pub struct ChatOptions {
    pub new: bool,
    pub conversation: Option<String>,
    pub context: Vec<String>,
}

fn print_delta(delta: &str) {
    print!("{}", delta);
    let _ = std::io::stdout().flush();
}

/// Pick the conversation to talk in and load context files
async fn prepare(ctx: &AppContext, chat: &ChatService, options: &ChatOptions) -> Result<()> {
    if options.new {
        chat.start_new_conversation()?;
    } else if let Some(id) = &options.conversation {
        if !chat.select_conversation(id)? {
            bail!("No conversation with id {}", id);
        }
    } else if let Some(latest) = chat.conversations().first() {
        chat.select_conversation(&latest.id)?;
    }

    if !options.context.is_empty() {
        let files = ctx.files()?;
        for key in &options.context {
            let content = files
                .get_file_content(key)
                .await
                .map_err(|e| anyhow!(e.to_user_message()))?;
            if !chat.add_context_file(object_key::file_name(key), &content)? {
                log::warn!("[cli] {} is already in the context", key);
            }
        }
    }
    Ok(())
}

/// Send one message and stream the reply; ctrl-c abandons the reply
async fn send(chat: &ChatService, message: &str) -> Result<()> {
    let streamed = AtomicBool::new(false);
    let on_delta = |delta: &str| {
        streamed.store(true, Ordering::Relaxed);
        print_delta(delta);
    };

    tokio::select! {
        reply = chat.send_message_streaming(message, &on_delta) => {
            let reply = reply?;
            // Unconfigured and error replies arrive without deltas
            if !streamed.load(Ordering::Relaxed) {
                print!("{}", reply.content);
            }
            println!();
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\n(interrupted)");
        }
    }
    Ok(())
}

pub async fn chat(ctx: &AppContext, message: Option<String>, options: ChatOptions) -> Result<()> {
    let chat = ctx.chat();
    prepare(ctx, &chat, &options).await?;

    if let Some(message) = message {
        return send(&chat, &message).await;
    }

    println!("Interactive chat. /new starts a new conversation, /exit quits.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "" => continue,
            "/exit" | "/quit" => break,
            "/new" => {
                chat.start_new_conversation()?;
                println!("Started a new conversation");
            }
            text => send(&chat, text).await?,
        }
    }
    Ok(())
}

pub fn list_conversations(ctx: &AppContext) -> Result<()> {
    let conversations = ctx.chat().conversations();
    if conversations.is_empty() {
        println!("No conversations yet");
    }
    for conversation in conversations {
        println!(
            "{}  {:>3} msgs  {}",
            conversation.id,
            conversation.messages.len(),
            conversation.title
        );
    }
    Ok(())
}

pub fn show_conversation(ctx: &AppContext, id: &str) -> Result<()> {
    let conversation = ctx
        .chat()
        .conversations()
        .into_iter()
        .find(|c| c.id == id)
        .ok_or_else(|| anyhow!("No conversation with id {}", id))?;

    println!("# {}", conversation.title);
    for message in &conversation.messages {
        let who = match message.role {
            MessageRole::User => "you",
            MessageRole::Assistant if message.is_edit_card() => "edit",
            MessageRole::Assistant => "ai",
            MessageRole::System => "system",
        };
        println!("\n[{}]\n{}", who, message.content);
    }
    Ok(())
}

pub fn delete_conversation(ctx: &AppContext, id: &str) -> Result<()> {
    if !ctx.chat().delete_conversation(id)? {
        bail!("No conversation with id {}", id);
    }
    println!("Deleted conversation {}", id);
    Ok(())
}
