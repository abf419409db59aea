//! IPC client implementation

use roster_api::{Caller, Command, Event, Request, Response, ResponseResult};
use std::collections::VecDeque;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use crate::{IpcError, IpcResult};

/// IPC Client for connecting to rosterd
pub struct IpcClient {
    reader: BufReader<tokio::net::unix::OwnedReadHalf>,
    writer: tokio::net::unix::OwnedWriteHalf,
    next_request_id: u64,
    /// Events that arrived while a response was awaited
    pending_events: VecDeque<Event>,
}

impl IpcClient {
    /// Connect to rosterd
    pub async fn connect(socket_path: impl AsRef<Path>) -> IpcResult<Self> {
        let stream = UnixStream::connect(socket_path).await?;
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            next_request_id: 1,
            pending_events: VecDeque::new(),
        })
    }

    /// Send a command without a caller (ping, health, subscriptions)
    pub async fn send(&mut self, command: Command) -> IpcResult<Response> {
        let request = Request::new(self.next_id(), command);
        self.round_trip(request).await
    }

    /// Send a command on behalf of `caller`
    pub async fn send_as(&mut self, caller: &Caller, command: Command) -> IpcResult<Response> {
        let request = Request::new(self.next_id(), command).with_caller(caller.clone());
        self.round_trip(request).await
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_request_id;
        self.next_request_id += 1;
        id
    }

    async fn round_trip(&mut self, request: Request) -> IpcResult<Response> {
        let mut json = serde_json::to_string(&request)?;
        json.push('\n');

        self.writer.write_all(json.as_bytes()).await?;

        let mut line = String::new();
        loop {
            line.clear();
            let n = self.reader.read_line(&mut line).await?;
            if n == 0 {
                return Err(IpcError::ConnectionClosed);
            }

            let response: Response = match serde_json::from_str(line.trim()) {
                Ok(response) => response,
                Err(e) => match serde_json::from_str::<Event>(line.trim()) {
                    // A subscription can start delivering before its reply lands
                    Ok(event) => {
                        self.pending_events.push_back(event);
                        continue;
                    }
                    Err(_) => return Err(e.into()),
                },
            };

            if response.request_id != request.request_id && response.request_id != 0 {
                return Err(IpcError::InvalidMessage(format!(
                    "Response for request {} while waiting for {}",
                    response.request_id, request.request_id
                )));
            }

            return Ok(response);
        }
    }

    /// Subscribe to events and consume this client to return an event stream
    pub async fn subscribe(mut self) -> IpcResult<EventStream> {
        let response = self.send(Command::SubscribeEvents).await?;

        if let ResponseResult::Err(e) = response.result {
            return Err(IpcError::ServerError(e.message));
        }

        Ok(EventStream {
            reader: self.reader,
            _writer: self.writer,
            pending: self.pending_events,
        })
    }
}

/// Stream of ledger events from rosterd
pub struct EventStream {
    reader: BufReader<tokio::net::unix::OwnedReadHalf>,
    // Dropping the write half would shut the connection down
    _writer: tokio::net::unix::OwnedWriteHalf,
    pending: VecDeque<Event>,
}

impl EventStream {
    /// Wait for the next event
    pub async fn next(&mut self) -> IpcResult<Event> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(event);
        }

        let mut line = String::new();
        let n = self.reader.read_line(&mut line).await?;
        if n == 0 {
            return Err(IpcError::ConnectionClosed);
        }

        let event: Event = serde_json::from_str(line.trim())?;
        Ok(event)
    }
}
