//! Line-oriented console for driving the gateway by hand.
//!
//! Each input line is one request:
//!
//! ```text
//! ai 0 1 2          read analog inputs 0, 1, 2
//! di 0,1            read digital inputs 0 and 1
//! do 0,1 1,0        drive output 0 high and output 1 low
//! status            print gateway status
//! exit | help | ... anything else goes to the command dispatcher
//! ```
//!
//! Replies are single JSON lines.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::command::{CommandDispatcher, CommandOutcome};
use crate::error::{GatewayError, GatewayResult};
use crate::gateway::Gateway;
use crate::shutdown::ShutdownSignal;

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleRequest {
    /// `ai <channels>`
    ReadAnalog(Vec<u32>),
    /// `di <channels>`
    ReadDigital(Vec<u32>),
    /// `do <channels> <values>`
    WriteDigital {
        /// Output channels
        channels: Vec<u32>,
        /// Values, paired with `channels` by position
        values: Vec<bool>,
    },
    /// `status`
    Status,
    /// Anything else, forwarded to the dispatcher
    Command(String),
}

impl ConsoleRequest {
    /// Parse one line.
    pub fn parse_line(line: &str) -> GatewayResult<Self> {
        let line = line.trim();
        let (verb, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(verb, rest)| (verb, rest.trim()));

        match verb {
            "ai" => Ok(Self::ReadAnalog(parse_channels(rest)?)),
            "di" => Ok(Self::ReadDigital(parse_channels(rest)?)),
            "do" => {
                let (channels, values) = rest.split_once(char::is_whitespace).ok_or_else(|| {
                    GatewayError::InvalidRequest(
                        "usage: do <ch,ch,..> <v,v,..>".to_string(),
                    )
                })?;
                Ok(Self::WriteDigital {
                    channels: parse_channels(channels)?,
                    values: parse_values(values.trim())?,
                })
            }
            "status" if rest.is_empty() => Ok(Self::Status),
            _ => Ok(Self::Command(line.to_string())),
        }
    }
}

fn split_list<'a>(list: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    list.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|item| !item.is_empty())
}

fn parse_channels(list: &str) -> GatewayResult<Vec<u32>> {
    split_list(list)
        .map(|item| {
            item.parse::<u32>().map_err(|_| {
                GatewayError::InvalidRequest(format!("'{item}' is not a channel number"))
            })
        })
        .collect()
}

fn parse_values(list: &str) -> GatewayResult<Vec<bool>> {
    split_list(list)
        .map(|item| match item {
            "1" | "true" | "on" => Ok(true),
            "0" | "false" | "off" => Ok(false),
            other => Err(GatewayError::InvalidRequest(format!(
                "'{other}' is not a digital value"
            ))),
        })
        .collect()
}

/// Executes console requests against a gateway.
#[derive(Debug, Clone)]
pub struct Console {
    gateway: Arc<Gateway>,
    dispatcher: CommandDispatcher,
}

impl Console {
    /// Create a console over `gateway`, routing commands to `dispatcher`.
    pub fn new(gateway: Arc<Gateway>, dispatcher: CommandDispatcher) -> Self {
        Self {
            gateway,
            dispatcher,
        }
    }

    /// Execute one line and return the JSON reply.
    pub fn execute_line(&self, line: &str) -> String {
        match ConsoleRequest::parse_line(line) {
            Ok(request) => self.execute(request),
            Err(e) => error_reply(&e),
        }
    }

    /// Execute one request and return the JSON reply.
    pub fn execute(&self, request: ConsoleRequest) -> String {
        let reply = match request {
            ConsoleRequest::ReadAnalog(channels) => {
                self.gateway.read_analog(&channels).map(|r| to_json(&r))
            }
            ConsoleRequest::ReadDigital(channels) => {
                self.gateway.read_digital(&channels).map(|r| to_json(&r))
            }
            ConsoleRequest::WriteDigital { channels, values } => self
                .gateway
                .write_digital(&channels, &values)
                .map(|r| to_json(&r)),
            ConsoleRequest::Status => Ok(to_json(&self.gateway.status())),
            ConsoleRequest::Command(message) => {
                let outcome = match self.dispatcher.handle(&message) {
                    CommandOutcome::Shutdown => "shutdown",
                    CommandOutcome::Help => "help",
                    CommandOutcome::Ignored => "ignored",
                };
                Ok(json!({ "command": message, "outcome": outcome }))
            }
        };

        match reply {
            Ok(value) => value.to_string(),
            Err(e) => error_reply(&e),
        }
    }

    /// Serve lines from `reader` until EOF or shutdown, writing one reply per line.
    pub async fn run<R, W>(
        &self,
        reader: R,
        mut writer: W,
        shutdown: ShutdownSignal,
    ) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        loop {
            let line = tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                line = lines.next_line() => line?,
            };
            let Some(line) = line else {
                debug!(namespace = self.gateway.namespace(), "Console input closed");
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            let reply = self.execute_line(&line);
            writer.write_all(reply.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        Ok(())
    }
}

fn to_json<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to serialize console reply");
        json!({ "error": e.to_string() })
    })
}

fn error_reply(err: &GatewayError) -> String {
    json!({ "error": err.to_string() }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewaySettings;
    use ifkit_core::DeviceEvent;
    use ifkit_driver_mock::MockInterfaceKit;
    use serde_json::Value;
    use std::time::Duration;

    fn console() -> (Console, Arc<MockInterfaceKit>, ShutdownSignal) {
        let kit = Arc::new(MockInterfaceKit::new());
        let shutdown = ShutdownSignal::new();
        let gateway = Arc::new(Gateway::new(
            kit.clone(),
            GatewaySettings::default(),
            shutdown.clone(),
        ));
        gateway.mark_initialized();
        kit.plug();
        gateway.handle_event(DeviceEvent::Attached);
        let dispatcher = CommandDispatcher::new("/interfacekit", shutdown.clone());
        (Console::new(gateway, dispatcher), kit, shutdown)
    }

    #[test]
    fn test_parse_requests() {
        assert_eq!(
            ConsoleRequest::parse_line("ai 0 1,2").unwrap(),
            ConsoleRequest::ReadAnalog(vec![0, 1, 2])
        );
        assert_eq!(
            ConsoleRequest::parse_line("di").unwrap(),
            ConsoleRequest::ReadDigital(vec![])
        );
        assert_eq!(
            ConsoleRequest::parse_line("do 0,1 1,off").unwrap(),
            ConsoleRequest::WriteDigital {
                channels: vec![0, 1],
                values: vec![true, false],
            }
        );
        assert_eq!(
            ConsoleRequest::parse_line(" status ").unwrap(),
            ConsoleRequest::Status
        );
        assert_eq!(
            ConsoleRequest::parse_line("exit").unwrap(),
            ConsoleRequest::Command("exit".to_string())
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            ConsoleRequest::parse_line("ai zero"),
            Err(GatewayError::InvalidRequest(_))
        ));
        assert!(matches!(
            ConsoleRequest::parse_line("do 0"),
            Err(GatewayError::InvalidRequest(_))
        ));
        assert!(matches!(
            ConsoleRequest::parse_line("do 0 maybe"),
            Err(GatewayError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_analog_reply() {
        let (console, kit, _) = console();
        kit.set_sensor_value(0, 200);
        kit.set_sensor_value(1, 1000);

        let reply: Value = serde_json::from_str(&console.execute_line("ai 0 1")).unwrap();
        assert_eq!(reply["values"], serde_json::json!([1.0, 5.0]));
        assert_eq!(reply["disposition"], "completed");
    }

    #[test]
    fn test_write_mismatch_reply() {
        let (console, kit, _) = console();
        let reply: Value = serde_json::from_str(&console.execute_line("do 0,1 1")).unwrap();
        assert!(reply["error"].as_str().unwrap().contains("Length mismatch"));
        assert!(kit.output_writes().is_empty());
    }

    #[test]
    fn test_exit_then_refused() {
        let (console, _, shutdown) = console();
        let reply: Value = serde_json::from_str(&console.execute_line("exit")).unwrap();
        assert_eq!(reply["outcome"], "shutdown");
        assert!(shutdown.is_triggered());

        let reply: Value = serde_json::from_str(&console.execute_line("di 0")).unwrap();
        assert_eq!(reply["error"], "Gateway is shutting down");
    }

    #[tokio::test]
    async fn test_run_until_eof() {
        let (console, kit, shutdown) = console();
        kit.set_input(2, true);
        let input: &[u8] = b"di 2\n\nstatus\n";
        let mut output = Vec::new();

        console.run(input, &mut output, shutdown).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        let replies: Vec<Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0]["values"], serde_json::json!([true]));
        assert_eq!(replies[1]["attachment"], "attached");
    }

    #[tokio::test]
    async fn test_run_stops_on_exit() {
        let (console, _, shutdown) = console();
        let (client, server) = tokio::io::duplex(1024);
        let (server_read, server_write) = tokio::io::split(server);
        let (mut client_read, mut client_write) = tokio::io::split(client);

        let task = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                console
                    .run(tokio::io::BufReader::new(server_read), server_write, shutdown)
                    .await
            })
        };

        client_write.write_all(b"exit\n").await.unwrap();
        let mut reply = vec![0u8; 256];
        let n = tokio::io::AsyncReadExt::read(&mut client_read, &mut reply)
            .await
            .unwrap();
        assert!(String::from_utf8_lossy(&reply[..n]).contains("shutdown"));

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("console should stop after exit")
            .unwrap()
            .unwrap();
        assert!(shutdown.is_triggered());
    }
}
