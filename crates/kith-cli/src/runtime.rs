//! Async runtime
//!
//! Event loop that reads stdin and re-renders the chat view on change. Uses
//! `tokio::select!` so incoming traffic is shown while waiting for input.

use std::io;

use kith_app::{Session, SessionError, render::render_view};
use kith_client::{ClientConfig, SystemEnv, http::HttpApi, ws::WsTransport};
use kith_proto::{Conversation, UserId};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};

use crate::commands::{self, Command};

/// Runtime errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// I/O error on stdin or stdout.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The session could not be set up.
    #[error("session error: {0}")]
    Session(#[from] SessionError),
}

/// Terminal session runtime.
pub struct Runtime {
    session: Session<SystemEnv, HttpApi>,
    out: Stdout,
}

impl Runtime {
    /// Build the session for user `me` against the WebSocket and HTTP
    /// endpoints derived from `config`.
    pub fn new(config: &ClientConfig, me: UserId) -> Result<Self, CliError> {
        let transport = config.session.clone().map_or_else(WsTransport::new, WsTransport::with_session);
        let api = HttpApi::new(config.base_url.clone(), config.session.clone());
        let session = Session::new(config, me, transport, api, SystemEnv::new())?;
        Ok(Self { session, out: tokio::io::stdout() })
    }

    /// Run until `/quit` or end of input.
    pub async fn run(mut self) -> Result<(), CliError> {
        self.session.start().await;
        let mut changes = self.session.changes();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        self.render().await?;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    if !self.execute(&line).await? {
                        break;
                    }
                }
                changed = changes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.render().await?;
                }
            }
        }

        self.session.shutdown().await;
        Ok(())
    }

    /// Execute one input line. Returns `false` to quit.
    async fn execute(&mut self, line: &str) -> Result<bool, CliError> {
        let Some(command) = commands::parse(line) else {
            return Ok(true);
        };

        match command {
            Command::Dm(user) => self.session.select(Conversation::Private(user)).await,
            Command::Group(group) => self.session.select(Conversation::Group(group)).await,
            Command::Retry => self.session.retry().await,
            Command::Say(text) => self.session.send(&text).await,
            Command::Online => {
                let users: Vec<String> =
                    self.session.with_view(|v| v.online_users().iter().map(|u| u.to_string()).collect());
                let text = if users.is_empty() { "nobody online".to_string() } else { users.join(", ") };
                self.write_line(&format!("online: {text}")).await?;
            },
            Command::Feed => {
                let feed = self.session.feed();
                if feed.items().is_empty() {
                    self.write_line("no notifications").await?;
                }
                for item in feed.items() {
                    let marker = if item.read { ' ' } else { '*' };
                    self.write_line(&format!("{marker} {}", item.summary())).await?;
                }
            },
            Command::Read => {
                if let Err(error) = self.session.mark_read().await {
                    tracing::warn!(%error, "mark read failed");
                    self.write_line(&format!("! could not mark notifications read: {error}")).await?;
                }
            },
            Command::Quit => return Ok(false),
            Command::Invalid(hint) => self.write_line(&format!("! {hint}")).await?,
        }

        for alert in self.session.take_alerts() {
            self.write_line(&format!("! {alert}")).await?;
        }
        Ok(true)
    }

    async fn render(&mut self) -> Result<(), CliError> {
        let mut lines = self.session.with_view(render_view);
        let unread = self.session.feed().unread_count();
        if unread > 0 {
            lines.push(format!("({unread} unread notifications, /feed to show)"));
        }

        let mut text = lines.join("\n");
        text.push('\n');
        self.out.write_all(text.as_bytes()).await?;
        self.out.flush().await?;
        Ok(())
    }

    async fn write_line(&mut self, line: &str) -> Result<(), CliError> {
        self.out.write_all(line.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await?;
        Ok(())
    }
}
