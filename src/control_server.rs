use crate::SharedProcessor;
use crate::update::{ControlResponse, PersistenceHook, PrefixRequest};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// One line of JSON from a control client, e.g.
/// `{"command":"advertise","args":{"name":"/ndn/app","cost":10,"flags":1}}`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "command", content = "args", rename_all = "snake_case")]
pub enum ControlCommand {
    Advertise(PrefixRequest),
    Withdraw(PrefixRequest),
    Names,
    Lsdb,
    Help,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlReply {
    pub code: u16,
    pub text: String,
    #[serde(default)]
    pub body: Option<serde_json::Value>,
}

impl ControlReply {
    fn ok(body: serde_json::Value) -> Self {
        Self {
            code: 200,
            text: "OK".to_string(),
            body: Some(body),
        }
    }
}

impl From<ControlResponse> for ControlReply {
    fn from(response: ControlResponse) -> Self {
        Self {
            code: response.code,
            text: response.text,
            body: serde_json::to_value(&response.body).ok(),
        }
    }
}

pub struct ControlServer<H> {
    addr: SocketAddr,
    processor: SharedProcessor<H>,
}

impl<H: PersistenceHook + Send + 'static> ControlServer<H> {
    pub fn new(addr: SocketAddr, processor: SharedProcessor<H>) -> Self {
        Self { addr, processor }
    }

    pub async fn start(&self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        info!("Control server listening on {}", listener.local_addr()?);
        self.serve(listener).await
    }

    pub async fn serve(&self, listener: TcpListener) -> anyhow::Result<()> {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    info!("Control connection from {}", addr);
                    let processor = self.processor.clone();
                    tokio::spawn(async move {
                        if let Err(e) = Self::handle_client(stream, processor).await {
                            error!("Error handling control client {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept control connection: {}", e);
                }
            }
        }
    }

    async fn handle_client(
        mut stream: TcpStream,
        processor: SharedProcessor<H>,
    ) -> anyhow::Result<()> {
        let (reader, mut writer) = stream.split();
        let mut buf_reader = BufReader::new(reader);
        let mut line = String::new();

        loop {
            line.clear();
            if buf_reader.read_line(&mut line).await? == 0 {
                break; // Connection closed
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let reply = match serde_json::from_str::<ControlCommand>(trimmed) {
                Ok(command) => Self::process_command(command, &processor).await,
                Err(e) => ControlReply {
                    code: 400,
                    text: format!("Invalid JSON command: {}", e),
                    body: None,
                },
            };

            let reply_json = serde_json::to_string(&reply)?;
            writer.write_all(format!("{}\n", reply_json).as_bytes()).await?;
            writer.flush().await?;
        }

        Ok(())
    }

    // Each command holds the lock until its response is built, so the
    // rebuilt LSA is installed before the client sees the reply.
    async fn process_command(
        command: ControlCommand,
        processor: &SharedProcessor<H>,
    ) -> ControlReply {
        let mut processor = processor.lock().await;
        match command {
            ControlCommand::Advertise(request) => processor.advertise(request).into(),
            ControlCommand::Withdraw(request) => processor.withdraw(request).into(),
            ControlCommand::Names => {
                let names: Vec<_> = processor.npl().iter().collect();
                ControlReply::ok(serde_json::json!(names))
            }
            ControlCommand::Lsdb => {
                ControlReply::ok(serde_json::Value::String(processor.installer().to_string()))
            }
            ControlCommand::Help => Self::get_help(),
        }
    }

    fn get_help() -> ControlReply {
        let commands = vec![
            ("advertise", "Advertise a prefix (args: name, cost?, flags?; flags=1 saves it)"),
            ("withdraw", "Withdraw a prefix (args: name, flags?; flags=1 saves it)"),
            ("names", "List locally advertised prefixes"),
            ("lsdb", "Dump the link-state database"),
            ("help", "Show this help message"),
        ];
        ControlReply::ok(serde_json::json!(commands))
    }
}
