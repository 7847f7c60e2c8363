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

//! Reply-side subscription plumbing, for reading correlated replies off the
//! daemon's PUB socket.

use futures_util::StreamExt;
use tmq::subscribe::Subscribe;

use rpc_common::{unpack_reply, Correlation, Response, RpcError};

/// Receive the next reply published on our private topic. The subscription
/// filter already restricts delivery to this client's reply destination; the
/// correlation id still has to be matched by the caller.
pub async fn reply_recv(subscribe: &mut Subscribe) -> Result<(Correlation, Response), RpcError> {
    let Some(Ok(mut inbound)) = subscribe.next().await else {
        return Err(RpcError::CouldNotReceive(
            "unable to receive published reply".to_string(),
        ));
    };

    let mut frames = Vec::with_capacity(inbound.len());
    while let Some(frame) = inbound.pop_front() {
        frames.push(frame.to_vec());
    }
    unpack_reply(&frames)
}
