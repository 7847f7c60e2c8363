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

//! ZMQ transport layer for the request loop, separated from business logic.
//!
//! The inbound PULL socket fans requests out to a pool of worker threads
//! through an in-process streamer proxy. Each worker runs
//! decode → dispatch → encode → reply for one message at a time; replies go
//! out through the single shared PUB socket, addressed by the reply topic
//! carried on the request.

use eyre::Context;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{error, info, warn};

use rpc_common::{pack_reply, unpack_request, Correlation, RequestDecodeError, Response};

use crate::rpc::message_handler::MessageHandler;

const WORKERS_INPROC: &str = "inproc://rpc-workers";
const PROXY_STEER_INPROC: &str = "inproc://rpc-proxy-steer";

/// ZMQ transport that owns the sockets and the worker pool.
pub struct RpcTransport {
    zmq_context: zmq::Context,
    kill_switch: Arc<AtomicBool>,
    replies_publish: Arc<Mutex<zmq::Socket>>,
}

impl RpcTransport {
    /// Binds the reply PUB socket immediately; an unbindable endpoint is a
    /// bootstrap failure, not a runtime fault.
    pub fn new(
        zmq_context: zmq::Context,
        kill_switch: Arc<AtomicBool>,
        replies_endpoint: &str,
    ) -> eyre::Result<Self> {
        let publish = zmq_context.socket(zmq::PUB)?;
        publish
            .bind(replies_endpoint)
            .with_context(|| format!("Unable to bind reply publisher to {replies_endpoint}"))?;
        Ok(Self {
            zmq_context,
            kill_switch,
            replies_publish: Arc::new(Mutex::new(publish)),
        })
    }

    /// Start the request processing loop. Blocks the calling thread until the
    /// kill switch trips; the proxy and workers run in background threads.
    pub fn start_request_loop<H: MessageHandler + 'static>(
        &self,
        requests_endpoint: String,
        workers_num: usize,
        message_handler: Arc<H>,
    ) -> eyre::Result<()> {
        info!("0mq server listening on {requests_endpoint} with {workers_num} request workers");

        let mut inbound = self.zmq_context.socket(zmq::PULL)?;
        let mut backend = self.zmq_context.socket(zmq::PUSH)?;
        inbound
            .bind(&requests_endpoint)
            .with_context(|| format!("Unable to bind request intake to {requests_endpoint}"))?;
        backend.bind(WORKERS_INPROC)?;

        for i in 0..workers_num {
            let handler = message_handler.clone();
            let kill_switch = self.kill_switch.clone();
            let zmq_context = self.zmq_context.clone();
            let publish = self.replies_publish.clone();

            std::thread::Builder::new()
                .name(format!("motorpool-rpc-srv{i}"))
                .spawn(move || {
                    if let Err(e) =
                        Self::rpc_process_loop(zmq_context, kill_switch, handler, publish)
                    {
                        error!(error = ?e, "RPC process loop failed");
                    }
                })?;
        }

        // The proxy routes inbound messages to whichever worker is free.
        let mut control_socket = self.zmq_context.socket(zmq::REP)?;
        control_socket.bind(PROXY_STEER_INPROC)?;
        std::thread::Builder::new()
            .name("motorpool-rpc-proxy".to_string())
            .spawn(move || {
                zmq::proxy_steerable(&mut inbound, &mut backend, &mut control_socket)
                    .expect("Unable to start proxy");
            })?;

        // Steer the proxy until shutdown.
        let control_socket = self.zmq_context.socket(zmq::REQ)?;
        control_socket.connect(PROXY_STEER_INPROC)?;
        loop {
            if self.kill_switch.load(Ordering::Relaxed) {
                info!("Kill switch activated, exiting");
                control_socket.send("TERMINATE", 0)?;
                return Ok(());
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    fn rpc_process_loop<H: MessageHandler>(
        zmq_context: zmq::Context,
        kill_switch: Arc<AtomicBool>,
        message_handler: Arc<H>,
        publish: Arc<Mutex<zmq::Socket>>,
    ) -> eyre::Result<()> {
        let rpc_socket = zmq_context.socket(zmq::PULL)?;
        rpc_socket.connect(WORKERS_INPROC)?;

        loop {
            if kill_switch.load(Ordering::Relaxed) {
                return Ok(());
            }

            let poll_result = rpc_socket
                .poll(zmq::POLLIN, 100)
                .with_context(|| "Error polling ZMQ socket. Bailing out.")?;
            if poll_result == 0 {
                continue;
            }

            match rpc_socket.recv_multipart(0) {
                Err(_) => {
                    info!("ZMQ socket closed, exiting");
                    return Ok(());
                }
                Ok(request) => {
                    if let Err(e) = Self::process_request(&publish, &message_handler, request) {
                        error!(error = ?e, "Error processing request");
                    }
                }
            }
        }
    }

    /// One pass of the loop's message state machine:
    /// decode → dispatch → encode → reply.
    fn process_request<H: MessageHandler>(
        publish: &Arc<Mutex<zmq::Socket>>,
        message_handler: &Arc<H>,
        frames: Vec<Vec<u8>>,
    ) -> eyre::Result<()> {
        let (corr, request) = match unpack_request(&frames) {
            Ok(decoded) => decoded,
            Err(RequestDecodeError::BadBody(corr, reason)) => {
                // The routing frames survived, so the caller still gets a
                // structured reply instead of silence.
                warn!(reason = %reason, "undecodable request body, replying with fault");
                return Self::publish_reply(publish, &corr, &Response::fault());
            }
            Err(RequestDecodeError::BadFrames(reason)) => {
                // No reply address to be had. The only silent path there is.
                warn!(reason = %reason, "dropping request with unusable frame layout");
                return Ok(());
            }
        };

        let response = message_handler.handle_request(request);
        Self::publish_reply(publish, &corr, &response)
    }

    fn publish_reply(
        publish: &Arc<Mutex<zmq::Socket>>,
        corr: &Correlation,
        response: &Response,
    ) -> eyre::Result<()> {
        let frames =
            pack_reply(corr, response).map_err(|e| eyre::eyre!("Unable to encode reply: {e}"))?;
        let publish = publish.lock().unwrap();
        publish
            .send_multipart(frames, 0)
            .with_context(|| "Unable to publish reply")?;
        Ok(())
    }
}
