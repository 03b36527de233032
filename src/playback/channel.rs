// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use crossbeam_channel::{Receiver, Sender};
use tracing::error;

use super::{PlayInstruction, SampleEngine};

/// Forwards play instructions to an audio thread over a channel, so the
/// dispatcher never waits on the mixer.
#[derive(Debug, Clone)]
pub struct ChannelSampleEngine {
    tx: Sender<PlayInstruction>,
}

impl ChannelSampleEngine {
    /// Creates an engine and the receiving end for the audio thread.
    pub fn new() -> (ChannelSampleEngine, Receiver<PlayInstruction>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (ChannelSampleEngine { tx }, rx)
    }
}

impl SampleEngine for ChannelSampleEngine {
    fn play(&self, instruction: PlayInstruction) {
        if let Err(e) = self.tx.send(instruction) {
            let instruction = e.into_inner();
            error!(key = %instruction.key, "Failed to send play instruction, receiver is gone");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cells::SampleKey;

    fn instruction(key: &str) -> PlayInstruction {
        PlayInstruction {
            key: SampleKey::new(key),
            scheduled_time: 0.5,
            start_offset: 0.0,
            duration: 1.0,
            rate: 1.0,
            gain_db: 0.0,
        }
    }

    #[test]
    fn test_forwards_instructions() {
        let (engine, rx) = ChannelSampleEngine::new();
        engine.play(instruction("a"));
        engine.play(instruction("s"));
        let received: Vec<String> = rx.try_iter().map(|i| i.key.to_string()).collect();
        assert_eq!(received, vec!["a", "s"]);
    }

    #[test]
    fn test_dropped_receiver_does_not_panic() {
        let (engine, rx) = ChannelSampleEngine::new();
        drop(rx);
        engine.play(instruction("a"));
    }
}
