//! TUI-less "ask" command

use std::error::Error;
use std::io::{self, Write};

use ratatui::style::Style;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::cli::{context_of, load_scan, ScanSource};
use crate::core::chat_stream::{ChatStreamService, StreamMessage, StreamParams};
use crate::core::config::Config;
use crate::core::message::ChatMessage;
use crate::ui::render::render_markup;
use crate::ui::theme::Theme;

pub async fn run_ask(
    config: &Config,
    source: &ScanSource,
    question: Vec<String>,
    plain: bool,
) -> Result<(), Box<dyn Error>> {
    let question = question.join(" ");
    if question.trim().is_empty() {
        return Err("Usage: scanlens ask [--context FILE | --image IMAGE] <question>".into());
    }

    let settings = config.resolve_service()?;
    let client = reqwest::Client::new();
    let scan = load_scan(source, &client, &settings).await?;

    let params = StreamParams {
        client,
        settings,
        messages: vec![ChatMessage::user(question.trim())],
        context: context_of(scan.as_ref()),
        cancel_token: CancellationToken::new(),
        stream_id: 1,
    };

    let (stream_service, mut rx) = ChatStreamService::new();
    stream_service.spawn_stream(params);

    let reply = receive_reply(&mut rx, plain).await?;

    if plain {
        if reply.error.is_none() || !reply.text.is_empty() {
            println!();
        }
    } else {
        // Text that arrived before a failure is still shown.
        let theme = Theme::monochrome();
        for line in render_markup(&reply.text, Style::default(), &theme) {
            println!("{}", line);
        }
    }

    match reply.error {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Reply {
    text: String,
    error: Option<String>,
}

/// Collect one streamed reply, echoing chunks to stdout when `plain`. Stops
/// at the first error or at the end of the stream.
async fn receive_reply(
    rx: &mut mpsc::UnboundedReceiver<(StreamMessage, u64)>,
    plain: bool,
) -> io::Result<Reply> {
    let mut reply = Reply::default();
    while let Some((message, _)) = rx.recv().await {
        match message {
            StreamMessage::Chunk(content) => {
                reply.text.push_str(&content);
                if plain {
                    print!("{}", content);
                    io::stdout().flush()?;
                }
            }
            StreamMessage::Error(err) => {
                reply.error = Some(err);
                break;
            }
            StreamMessage::End => break,
        }
    }
    Ok(reply)
}
