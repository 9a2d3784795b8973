use std::{
    sync::{Condvar, Mutex, MutexGuard},
    time::Duration,
};

use crate::types::Frame;

#[derive(Default)]
struct Slot {
    frame: Option<Frame>,
    seq: u64,
}

/// Single-slot, last-write-wins frame cell.
///
/// The producer overwrites the slot and never waits; every reader gets its own
/// copy. Readers polling faster than the producer see repeats, slower readers
/// skip frames. There is no queue and no backpressure.
#[derive(Default)]
pub struct LatestFrameChannel {
    slot: Mutex<Slot>,
    published: Condvar,
}

impl LatestFrameChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, frame: Frame) {
        {
            let mut slot = self.lock();
            slot.frame = Some(frame);
            slot.seq = slot.seq.wrapping_add(1);
        }
        self.published.notify_all();
    }

    /// Copy of the most recent frame, if any.
    pub fn take(&self) -> Option<Frame> {
        self.lock().frame.clone()
    }

    /// Drop the held frame so readers see "no frame" until the next publish.
    pub fn clear(&self) {
        self.lock().frame = None;
    }

    /// Sequence number of the last publish; 0 before the first one.
    pub fn seq(&self) -> u64 {
        self.lock().seq
    }

    /// Wait at most `timeout` for a frame newer than `seen`.
    ///
    /// Returns the frame with its sequence number, or `None` on timeout. A
    /// cleared channel counts as having nothing newer.
    pub fn wait_newer(&self, seen: u64, timeout: Duration) -> Option<(u64, Frame)> {
        let guard = self.lock();
        let (slot, _) = self
            .published
            .wait_timeout_while(guard, timeout, |slot| {
                slot.seq == seen || slot.frame.is_none()
            })
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.seq == seen {
            return None;
        }
        slot.frame.clone().map(|frame| (slot.seq, frame))
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        // A panicking reader cannot leave a half-written frame behind.
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    fn frame(tag: u8) -> Frame {
        Frame::new(vec![tag; 12], 2, 2)
    }

    #[test]
    fn empty_until_first_publish() {
        let channel = LatestFrameChannel::new();
        assert!(channel.take().is_none());
        assert_eq!(channel.seq(), 0);
    }

    #[test]
    fn last_write_wins() {
        let channel = LatestFrameChannel::new();
        channel.publish(frame(1));
        channel.publish(frame(2));
        let got = channel.take().expect("frame");
        assert_eq!(got.rgb, vec![2; 12]);
        assert_eq!(channel.seq(), 2);
    }

    #[test]
    fn take_repeats_without_new_publish() {
        let channel = LatestFrameChannel::new();
        channel.publish(frame(7));
        assert_eq!(channel.take().unwrap().rgb, channel.take().unwrap().rgb);
    }

    #[test]
    fn readers_hold_independent_copies() {
        let channel = LatestFrameChannel::new();
        channel.publish(frame(3));
        let mut mine = channel.take().unwrap();
        mine.rgb[0] = 99;
        assert_eq!(channel.take().unwrap().rgb[0], 3);
    }

    #[test]
    fn clear_reports_no_frame() {
        let channel = LatestFrameChannel::new();
        channel.publish(frame(1));
        channel.clear();
        assert!(channel.take().is_none());
    }

    #[test]
    fn wait_newer_times_out_without_publish() {
        let channel = LatestFrameChannel::new();
        channel.publish(frame(1));
        let seen = channel.seq();
        assert!(channel.wait_newer(seen, Duration::from_millis(10)).is_none());
    }

    #[test]
    fn wait_newer_ignores_cleared_channel() {
        let channel = LatestFrameChannel::new();
        channel.publish(frame(1));
        channel.clear();
        assert!(channel.wait_newer(0, Duration::from_millis(10)).is_none());
    }

    #[test]
    fn wait_newer_wakes_on_publish() {
        let channel = Arc::new(LatestFrameChannel::new());
        let producer = {
            let channel = channel.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                channel.publish(frame(5));
            })
        };
        let (seq, got) = channel
            .wait_newer(0, Duration::from_secs(5))
            .expect("published frame");
        producer.join().unwrap();
        assert_eq!(seq, 1);
        assert_eq!(got.rgb, vec![5; 12]);
    }
}
