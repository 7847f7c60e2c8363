// Copyright (C) 2025 the motorpool authors. This program is free software:
// you can redistribute it and/or modify it under the terms of the GNU General
// Public License as published by the Free Software Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::SinkExt;
use tmq::subscribe::Subscribe;
use tmq::Multipart;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::pubsub_client::reply_recv;
use rpc_common::{
    pack_request, Correlation, Operation, Payload, Request, Response, RpcError, Status,
};

/// How long the attach probe waits for each individual pong.
const ATTACH_PROBE_TIMEOUT: Duration = Duration::from_millis(200);

/// How many pongs go unanswered before attach gives up entirely.
const ATTACH_PROBE_ATTEMPTS: usize = 25;

type PendingCalls = Arc<Mutex<HashMap<Uuid, oneshot::Sender<Response>>>>;

/// A client endpoint for making correlated RPC calls to the daemon.
///
/// Owns a PUSH socket into the shared inbound destination and a SUB socket
/// filtered to this client's private reply topic. Replies are routed back to
/// callers through a pending-call table keyed by correlation id, so calls can
/// be issued concurrently from multiple tasks.
pub struct RpcSendClient {
    client_id: Uuid,
    request_sock: tokio::sync::Mutex<tmq::push::Push>,
    pending: PendingCalls,
    reply_task: tokio::task::JoinHandle<()>,
    call_timeout: Duration,
}

impl std::fmt::Debug for RpcSendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcSendClient")
            .field("client_id", &self.client_id)
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}

impl RpcSendClient {
    /// Connect to the daemon and verify it answers. The first ping doubles as
    /// the PUB/SUB warm-up: until the daemon's PUB socket has seen our
    /// subscription, published replies can be dropped, so the probe is
    /// retried with a short deadline until the first pong arrives.
    pub async fn attach(
        zmq_ctx: &tmq::Context,
        requests_address: &str,
        replies_address: &str,
        call_timeout: Duration,
    ) -> Result<Self, RpcError> {
        let client_id = Uuid::new_v4();

        let request_sock = tmq::push(zmq_ctx)
            .connect(requests_address)
            .map_err(|e| RpcError::CouldNotAttach(e.to_string()))?;

        let replies_sub = tmq::subscribe(zmq_ctx)
            .connect(replies_address)
            .map_err(|e| RpcError::CouldNotAttach(e.to_string()))?
            .subscribe(client_id.as_bytes())
            .map_err(|e| RpcError::CouldNotAttach(e.to_string()))?;

        let pending: PendingCalls = Arc::new(Mutex::new(HashMap::new()));
        let reply_task = tokio::spawn(route_replies(replies_sub, client_id, pending.clone()));

        let client = Self {
            client_id,
            request_sock: tokio::sync::Mutex::new(request_sock),
            pending,
            reply_task,
            call_timeout,
        };

        for attempt in 0..ATTACH_PROBE_ATTEMPTS {
            let ping = Request::new(Operation::Ping, Payload::new());
            match client.call_with_timeout(&ping, ATTACH_PROBE_TIMEOUT).await {
                Ok(response) if response.status == Status::Ok => return Ok(client),
                Ok(response) => {
                    return Err(RpcError::UnexpectedReply(format!(
                        "probe answered with status {}",
                        response.status.code()
                    )));
                }
                Err(RpcError::Timeout) => {
                    debug!(attempt, "no pong yet, retrying attach probe");
                }
                Err(e) => return Err(RpcError::CouldNotAttach(e.to_string())),
            }
        }
        Err(RpcError::CouldNotAttach(format!(
            "daemon did not answer {ATTACH_PROBE_ATTEMPTS} attach probes"
        )))
    }

    /// The private reply destination this client subscribes on.
    pub fn client_id(&self) -> Uuid {
        self.client_id
    }

    /// Issue one request and wait for its correlated reply, up to the
    /// client's configured call timeout.
    pub async fn call(&self, request: &Request) -> Result<Response, RpcError> {
        self.call_with_timeout(request, self.call_timeout).await
    }

    async fn call_with_timeout(
        &self,
        request: &Request,
        timeout: Duration,
    ) -> Result<Response, RpcError> {
        let corr = Correlation::next_for(self.client_id);
        let frames = pack_request(&corr, request)?;

        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap()
            .insert(corr.correlation_id, reply_tx);

        let send_result = {
            let mut sock = self.request_sock.lock().await;
            sock.send(Multipart::from(frames)).await
        };
        if let Err(e) = send_result {
            self.pending.lock().unwrap().remove(&corr.correlation_id);
            return Err(RpcError::CouldNotSend(e.to_string()));
        }

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(RpcError::CouldNotReceive(
                "reply routing task is gone".to_string(),
            )),
            Err(_) => {
                // The waiting is cancelled, not the server-side work; a
                // straggler reply for this id will be dropped by the router.
                self.pending.lock().unwrap().remove(&corr.correlation_id);
                Err(RpcError::Timeout)
            }
        }
    }
}

impl Drop for RpcSendClient {
    fn drop(&mut self) {
        self.reply_task.abort();
    }
}

/// Drains the reply subscription for the client's lifetime, resolving each
/// pending call by its correlation id.
async fn route_replies(mut subscribe: Subscribe, client_id: Uuid, pending: PendingCalls) {
    loop {
        match reply_recv(&mut subscribe).await {
            Ok((corr, response)) => {
                if corr.reply_to != client_id {
                    // The subscription prefix is the full 16-byte topic, so
                    // this means a daemon-side framing bug.
                    warn!(?corr, "reply addressed to another client, dropping");
                    continue;
                }
                let waiter = pending.lock().unwrap().remove(&corr.correlation_id);
                match waiter {
                    Some(reply_tx) => {
                        // The caller may have timed out and gone away; that
                        // is its problem, not ours.
                        let _ = reply_tx.send(response);
                    }
                    None => {
                        debug!(
                            correlation_id = %corr.correlation_id,
                            "reply with no pending call (caller timed out?), dropping"
                        );
                    }
                }
            }
            Err(RpcError::CouldNotDecode(e)) => {
                warn!(error = %e, "undecodable published reply, dropping");
            }
            Err(_) => {
                debug!("reply subscription closed, router exiting");
                return;
            }
        }
    }
}
