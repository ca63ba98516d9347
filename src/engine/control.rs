//! Control messages crossing into the render thread
//!
//! Producers clone a [`ControlSender`]. The engine owns the matching
//! [`ControlQueue`] and drains it with `try_recv` only between blocks, so a
//! chain rebuild never lands in the middle of a render.

use crossbeam_channel::{Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};

use super::system::XgSlot;
use crate::error::{Result, WavemixError};

/// One parameter change or voice command
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    /// Select the GS insertion effect type
    SetGsInsertion { msb: u8, lsb: u8 },
    /// Change one of the 20 GS insertion parameters
    SetGsInsertionParam { index: usize, value: i8 },
    /// Select the type of an XG effect block
    SetXgEffect { slot: XgSlot, msb: u8, lsb: u8 },
    SetReverbMacro { value: u8 },
    /// GM2 reverb type (0..=4, 8)
    SetReverbMacroGm2 { value: u8 },
    SetChorusMacro { value: u8 },
    SetDelayMacro { value: u8 },
    SetMultiEqType { value: u8 },
    /// Set a channel's send levels; `None` leaves a level unchanged
    SetChannelSends {
        channel: usize,
        reverb: Option<u8>,
        chorus: Option<u8>,
        delay: Option<u8>,
    },
    /// Cut a voice with a short ramp
    CutVoice { voice: usize },
    /// Move a voice into its release stage
    ReleaseVoice { voice: usize },
    /// Reset every system effect to its power-on state
    ResetEffects,
}

impl ControlMessage {
    /// Parse a message from its JSON form
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Producer side of the control boundary
#[derive(Clone, Debug)]
pub struct ControlSender {
    tx: Sender<ControlMessage>,
}

impl ControlSender {
    /// Queue a message without blocking
    pub fn send(&self, msg: ControlMessage) -> Result<()> {
        self.tx.try_send(msg).map_err(|e| match e {
            TrySendError::Full(msg) => {
                log::warn!("control queue full, dropping {msg:?}");
                WavemixError::QueueFull
            }
            TrySendError::Disconnected(_) => WavemixError::Disconnected,
        })
    }
}

/// Consumer side, owned by the engine
#[derive(Debug)]
pub struct ControlQueue {
    rx: Receiver<ControlMessage>,
    tx: Sender<ControlMessage>,
}

impl ControlQueue {
    /// A queue holding at most `capacity` pending messages
    pub fn bounded(capacity: usize) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        Self { rx, tx }
    }

    /// A new producer handle
    pub fn sender(&self) -> ControlSender {
        ControlSender { tx: self.tx.clone() }
    }

    /// Next pending message, if any
    pub fn try_recv(&self) -> Option<ControlMessage> {
        self.rx.try_recv().ok()
    }
}

impl Default for ControlQueue {
    fn default() -> Self {
        Self::bounded(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_arrive_in_order() {
        let queue = ControlQueue::default();
        let sender = queue.sender();
        sender.send(ControlMessage::SetReverbMacro { value: 4 }).unwrap();
        sender.send(ControlMessage::CutVoice { voice: 3 }).unwrap();
        let got: Vec<_> = std::iter::from_fn(|| queue.try_recv()).collect();
        assert_eq!(
            got,
            vec![ControlMessage::SetReverbMacro { value: 4 }, ControlMessage::CutVoice { voice: 3 }]
        );
        assert!(queue.try_recv().is_none(), "the queue is empty once drained");
    }

    #[test]
    fn test_full_queue_rejects() {
        let queue = ControlQueue::bounded(1);
        let sender = queue.sender();
        sender.send(ControlMessage::ResetEffects).unwrap();
        assert!(matches!(sender.send(ControlMessage::ResetEffects), Err(WavemixError::QueueFull)));
    }

    #[test]
    fn test_json_form() {
        let msg = ControlMessage::from_json(
            r#"{ "type": "set_xg_effect", "slot": { "insertion": 1 }, "msb": 73, "lsb": 0 }"#,
        )
        .expect("valid message");
        assert_eq!(msg, ControlMessage::SetXgEffect { slot: XgSlot::Insertion(1), msb: 0x49, lsb: 0 });
        let text = serde_json::to_string(&ControlMessage::SetGsInsertion { msb: 1, lsb: 0x10 }).unwrap();
        assert!(text.contains(r#""type":"set_gs_insertion""#), "got {text}");
    }
}
