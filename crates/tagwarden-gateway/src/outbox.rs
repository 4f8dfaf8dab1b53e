//! Directory-backed notification outbox.
//!
//! Each channel is a directory under the outbox root; each published message
//! is one JSON file inside it, prefixed with its sequence number. Useful for
//! local runs where no pub/sub service is wired up, and for auditing what
//! would have been sent.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::GatewayError;
use crate::gateway_traits::*;

/// A message as written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxMessage {
    pub channel: String,
    pub subject: String,
    pub body: String,
    pub published_at: DateTime<Utc>,
}

/// [`NotificationGateway`] writing messages into `<root>/<channel>/`.
#[derive(Debug, Clone)]
pub struct OutboxNotifier {
    root: PathBuf,
}

impl OutboxNotifier {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn channel_dir(&self, name: &str) -> GatewayResult<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(GatewayError::ChannelUnavailable {
                channel: name.to_string(),
                reason: "invalid channel name".to_string(),
            });
        }
        Ok(self.root.join(name))
    }

    /// Messages in a channel, oldest first.
    pub fn messages(&self, channel: &str) -> GatewayResult<Vec<OutboxMessage>> {
        let dir = self.channel_dir(channel)?;
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut paths: Vec<PathBuf> = fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();
        paths
            .iter()
            .map(|p| -> GatewayResult<OutboxMessage> {
                let content = fs::read_to_string(p)?;
                Ok(serde_json::from_str(&content)?)
            })
            .collect()
    }
}

#[async_trait]
impl NotificationGateway for OutboxNotifier {
    async fn ensure_channel(&self, name: &str) -> GatewayResult<ChannelHandle> {
        let dir = self.channel_dir(name)?;
        fs::create_dir_all(&dir)?;
        Ok(ChannelHandle {
            name: name.to_string(),
            address: dir.display().to_string(),
        })
    }

    async fn publish(
        &self,
        channel: &ChannelHandle,
        subject: &str,
        body: &str,
    ) -> GatewayResult<()> {
        let dir = self.channel_dir(&channel.name)?;
        if !dir.is_dir() {
            return Err(GatewayError::ChannelUnavailable {
                channel: channel.name.clone(),
                reason: "channel does not exist".to_string(),
            });
        }
        let message = OutboxMessage {
            channel: channel.name.clone(),
            subject: subject.to_string(),
            body: body.to_string(),
            published_at: Utc::now(),
        };
        let seq = fs::read_dir(&dir)?.count();
        let file_name = format!("{:08}-{}.json", seq, uuid::Uuid::new_v4());
        fs::write(dir.join(&file_name), serde_json::to_vec_pretty(&message)?)?;
        info!(channel = %channel.name, file = %file_name, "message written to outbox");
        Ok(())
    }
}
