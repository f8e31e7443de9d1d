use anyhow::{Context, Result, bail};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use vaarta_core::SignalMessage;
use vaarta_server::{ServerConfig, SignalingService, serve_on};

/// Starts a relay on an ephemeral local port.
pub async fn spawn_server() -> Result<(SocketAddr, SignalingService)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let service = SignalingService::new(&ServerConfig::default());

    tokio::spawn(serve_on(listener, service.clone()));
    Ok((addr, service))
}

pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let (stream, _) = connect_async(format!("ws://{}/ws", addr))
            .await
            .context("WebSocket handshake failed")?;
        Ok(Self { stream })
    }

    pub async fn send(&mut self, msg: &SignalMessage) -> Result<()> {
        self.send_raw(&msg.to_json()?).await
    }

    pub async fn send_raw(&mut self, text: &str) -> Result<()> {
        self.stream.send(Message::text(text)).await?;
        Ok(())
    }

    pub async fn recv(&mut self) -> Result<SignalMessage> {
        loop {
            let frame = tokio::time::timeout(Duration::from_secs(2), self.stream.next())
                .await
                .context("Timeout waiting for frame")?
                .context("Socket closed")??;

            match frame {
                Message::Text(text) => return Ok(SignalMessage::from_json(text.as_str())?),
                Message::Close(_) => bail!("Socket closed by server"),
                _ => continue,
            }
        }
    }

    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}
