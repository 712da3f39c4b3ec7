//! Command handlers, grouped by concern

pub mod channel;
pub mod messaging;
pub mod oper;
pub mod query;
pub mod registration;

use crate::{ClientId, Server};
use std::collections::HashSet;

/// Every other member of every channel in `channels`, each listed once
pub(crate) fn peers_of(server: &Server, id: &ClientId, channels: &HashSet<String>) -> HashSet<ClientId> {
    let map = server.registry().channels();
    let mut peers = HashSet::new();
    for key in channels {
        if let Some(channel) = map.get(key) {
            let channel = channel.lock();
            peers.extend(channel.members().iter().copied().filter(|member| member != id));
        }
    }
    peers
}
