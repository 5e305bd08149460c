// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Channel-backed attachment to the bus transport.

use tokio::sync::mpsc;

use crate::telegram::Telegram;

/// The bridge's end of a bus transport.
///
/// The transport layer (a KNX/IP tunnel, a test harness, ...) owns the
/// other end: it feeds received telegrams into `incoming` and drains
/// `outgoing` onto the wire. Dropping the transport side closes the
/// incoming channel and ends the bridge's pump task.
#[derive(Debug)]
pub struct BusLink {
    /// Telegrams received from the bus.
    pub incoming: mpsc::Receiver<Telegram>,
    /// Telegrams to put on the bus.
    pub outgoing: mpsc::Sender<Telegram>,
}

/// The transport's end of a [`BusLink`] pair.
#[derive(Debug)]
pub struct BusPeer {
    /// Feeds telegrams into the bridge as bus traffic.
    pub incoming: mpsc::Sender<Telegram>,
    /// Receives the telegrams the bridge puts on the bus.
    pub outgoing: mpsc::Receiver<Telegram>,
}

impl BusLink {
    /// Creates a link from existing channel halves.
    #[must_use]
    pub fn new(incoming: mpsc::Receiver<Telegram>, outgoing: mpsc::Sender<Telegram>) -> Self {
        Self { incoming, outgoing }
    }

    /// Creates a connected link/peer pair with the given channel
    /// capacity.
    #[must_use]
    pub fn pair(capacity: usize) -> (Self, BusPeer) {
        let (incoming_tx, incoming_rx) = mpsc::channel(capacity);
        let (outgoing_tx, outgoing_rx) = mpsc::channel(capacity);
        (
            Self::new(incoming_rx, outgoing_tx),
            BusPeer {
                incoming: incoming_tx,
                outgoing: outgoing_rx,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::telegram::TelegramValue;

    use super::*;

    #[tokio::test]
    async fn pair_is_cross_connected() {
        let (mut link, mut peer) = BusLink::pair(4);

        let inbound = Telegram::write(
            "1.1.4".parse().unwrap(),
            "1/2/3".parse().unwrap(),
            TelegramValue::Bit(1),
        );
        peer.incoming.send(inbound.clone()).await.unwrap();
        assert_eq!(link.incoming.recv().await.unwrap(), inbound);

        let outbound = Telegram::read("1.0.250".parse().unwrap(), "1/2/4".parse().unwrap());
        link.outgoing.send(outbound.clone()).await.unwrap();
        assert_eq!(peer.outgoing.recv().await.unwrap(), outbound);
    }
}
