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

//! Multipart frame layout shared by both directions of the correlation
//! protocol.
//!
//! Requests and replies travel as three frames:
//! `[reply_topic (16 raw UUID bytes), correlation_id (16 raw UUID bytes),
//! body (JSON)]`. On the reply path the first frame doubles as the PUB/SUB
//! subscription topic, so a caller only ever receives frames addressed to its
//! own private reply destination.

use crate::envelope::{Request, Response};
use crate::RpcError;
use thiserror::Error;
use uuid::Uuid;

/// The routing identity of one in-flight call: where the reply goes, and
/// which call it answers. Generated fresh per outbound request; never
/// persisted.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Correlation {
    /// The caller's private reply destination.
    pub reply_to: Uuid,
    /// Fresh per call; echoed verbatim on the matching reply.
    pub correlation_id: Uuid,
}

impl Correlation {
    pub fn next_for(reply_to: Uuid) -> Self {
        Self {
            reply_to,
            correlation_id: Uuid::new_v4(),
        }
    }
}

/// Why an inbound request could not be decoded. `BadBody` retains the routing
/// frames so the server can still address a structured error reply; with
/// `BadFrames` there is nowhere to send one.
#[derive(Debug, Error)]
pub enum RequestDecodeError {
    #[error("unusable frame layout: {0}")]
    BadFrames(String),
    #[error("undecodable request body: {1}")]
    BadBody(Correlation, String),
}

fn frame_uuid(frame: &[u8], what: &str) -> Result<Uuid, String> {
    Uuid::from_slice(frame).map_err(|_| format!("{what} frame is not a 16-byte UUID"))
}

fn unpack_routing(frames: &[Vec<u8>]) -> Result<Correlation, String> {
    if frames.len() != 3 {
        return Err(format!("expected 3 frames, got {}", frames.len()));
    }
    let reply_to = frame_uuid(&frames[0], "reply destination")?;
    let correlation_id = frame_uuid(&frames[1], "correlation id")?;
    Ok(Correlation {
        reply_to,
        correlation_id,
    })
}

pub fn pack_request(corr: &Correlation, request: &Request) -> Result<Vec<Vec<u8>>, RpcError> {
    let body = serde_json::to_vec(request).map_err(|e| RpcError::CouldNotSend(e.to_string()))?;
    Ok(vec![
        corr.reply_to.as_bytes().to_vec(),
        corr.correlation_id.as_bytes().to_vec(),
        body,
    ])
}

pub fn unpack_request(frames: &[Vec<u8>]) -> Result<(Correlation, Request), RequestDecodeError> {
    let corr = unpack_routing(frames).map_err(RequestDecodeError::BadFrames)?;
    let request = serde_json::from_slice(&frames[2])
        .map_err(|e| RequestDecodeError::BadBody(corr, e.to_string()))?;
    Ok((corr, request))
}

pub fn pack_reply(corr: &Correlation, response: &Response) -> Result<Vec<Vec<u8>>, RpcError> {
    let body = serde_json::to_vec(response).map_err(|e| RpcError::CouldNotSend(e.to_string()))?;
    Ok(vec![
        corr.reply_to.as_bytes().to_vec(),
        corr.correlation_id.as_bytes().to_vec(),
        body,
    ])
}

pub fn unpack_reply(frames: &[Vec<u8>]) -> Result<(Correlation, Response), RpcError> {
    let corr = unpack_routing(frames).map_err(RpcError::CouldNotDecode)?;
    let response =
        serde_json::from_slice(&frames[2]).map_err(|e| RpcError::CouldNotDecode(e.to_string()))?;
    Ok((corr, response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{Operation, Payload, Response};
    use pretty_assertions::assert_eq;

    #[test]
    fn request_frames_round_trip() {
        let corr = Correlation::next_for(Uuid::new_v4());
        let request = Request::new(Operation::Ping, Payload::new());
        let frames = pack_request(&corr, &request).unwrap();
        assert_eq!(frames.len(), 3);

        let (decoded_corr, decoded) = unpack_request(&frames).unwrap();
        assert_eq!(decoded_corr, corr);
        assert_eq!(decoded, request);
    }

    #[test]
    fn reply_frames_round_trip_and_lead_with_the_topic() {
        let corr = Correlation::next_for(Uuid::new_v4());
        let response = Response::ok("pong");
        let frames = pack_reply(&corr, &response).unwrap();
        assert_eq!(frames[0], corr.reply_to.as_bytes().to_vec());

        let (decoded_corr, decoded) = unpack_reply(&frames).unwrap();
        assert_eq!(decoded_corr, corr);
        assert_eq!(decoded, response);
    }

    #[test]
    fn wrong_frame_count_has_no_reply_path() {
        let err = unpack_request(&[vec![1, 2, 3]]).unwrap_err();
        assert!(matches!(err, RequestDecodeError::BadFrames(_)));
    }

    #[test]
    fn garbage_body_keeps_the_routing_frames() {
        let corr = Correlation::next_for(Uuid::new_v4());
        let frames = vec![
            corr.reply_to.as_bytes().to_vec(),
            corr.correlation_id.as_bytes().to_vec(),
            b"not json".to_vec(),
        ];
        match unpack_request(&frames).unwrap_err() {
            RequestDecodeError::BadBody(salvaged, _) => assert_eq!(salvaged, corr),
            other => panic!("expected BadBody, got {other:?}"),
        }
    }
}
