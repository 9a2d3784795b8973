use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use super::{CaptureSource, LatestFrameChannel};

/// Whether the capture device is currently delivering frames.
#[derive(Clone, Debug, Default)]
pub struct CaptureStatus {
    online: Arc<AtomicBool>,
}

impl CaptureStatus {
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }

    fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Relaxed);
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BroadcasterConfig {
    /// Wait after a failed open before trying again.
    pub open_retry: Duration,
    /// Wait after a failed read before reopening the device.
    pub read_retry: Duration,
}

impl Default for BroadcasterConfig {
    fn default() -> Self {
        Self {
            open_retry: Duration::from_secs(2),
            read_retry: Duration::from_secs(1),
        }
    }
}

/// Handle to the capture thread. Dropping it stops and joins the thread.
#[derive(Debug)]
pub struct FrameBroadcaster {
    stop: Arc<AtomicBool>,
    status: CaptureStatus,
    handle: Option<thread::JoinHandle<()>>,
}

impl FrameBroadcaster {
    /// Spawn the capture loop. `make_source` runs on the capture thread, so the
    /// device handle never has to cross threads.
    pub fn spawn<S, F>(
        make_source: F,
        channels: Vec<Arc<LatestFrameChannel>>,
        config: BroadcasterConfig,
    ) -> Self
    where
        S: CaptureSource,
        F: FnOnce() -> S + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let status = CaptureStatus::default();

        let stop_flag = stop.clone();
        let thread_status = status.clone();
        let handle = thread::Builder::new()
            .name("frame-broadcaster".into())
            .spawn(move || {
                let mut source = make_source();
                run_capture_loop(&mut source, &channels, &thread_status, &stop_flag, config);
                source.release();
                thread_status.set_online(false);
            })
            .ok();

        if handle.is_none() {
            log::error!("failed to spawn frame broadcaster thread");
        }

        Self {
            stop,
            status,
            handle,
        }
    }

    pub fn status(&self) -> CaptureStatus {
        self.status.clone()
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for FrameBroadcaster {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_capture_loop<S: CaptureSource>(
    source: &mut S,
    channels: &[Arc<LatestFrameChannel>],
    status: &CaptureStatus,
    stop: &AtomicBool,
    config: BroadcasterConfig,
) {
    let mut announced_wait = false;

    while !stop.load(Ordering::Relaxed) {
        if !source.is_open() {
            match source.open() {
                Ok(()) => {
                    log::info!("capture device ready");
                    announced_wait = false;
                    status.set_online(true);
                }
                Err(err) => {
                    if !announced_wait {
                        log::warn!("waiting for camera: {err}");
                        announced_wait = true;
                    } else {
                        log::debug!("camera still unavailable: {err}");
                    }
                    sleep_unless_stopped(stop, config.open_retry);
                    continue;
                }
            }
        }

        match source.read() {
            Ok(frame) => {
                for channel in channels {
                    channel.publish(frame.clone());
                }
            }
            Err(err) => {
                log::warn!("failed to read frame, reinitialising camera: {err}");
                source.release();
                status.set_online(false);
                for channel in channels {
                    channel.clear();
                }
                sleep_unless_stopped(stop, config.read_retry);
            }
        }
    }

    log::info!("frame broadcaster stopped");
}

fn sleep_unless_stopped(stop: &AtomicBool, total: Duration) {
    const SLICE: Duration = Duration::from_millis(50);
    let mut remaining = total;
    while !remaining.is_zero() && !stop.load(Ordering::Relaxed) {
        let nap = remaining.min(SLICE);
        thread::sleep(nap);
        remaining -= nap;
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::Mutex,
        time::Instant,
    };

    use super::*;
    use crate::{pipeline::CaptureError, types::Frame};

    #[derive(Clone, Copy, Debug)]
    enum Step {
        OpenFails,
        Frame(u8),
        ReadFails,
    }

    struct ScriptedSource {
        script: VecDeque<Step>,
        open: bool,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl CaptureSource for ScriptedSource {
        fn open(&mut self) -> Result<(), CaptureError> {
            if let Some(Step::OpenFails) = self.script.front() {
                self.script.pop_front();
                self.log.lock().unwrap().push("open-failed");
                return Err(CaptureError::Unavailable("busy".into()));
            }
            self.log.lock().unwrap().push("open");
            self.open = true;
            Ok(())
        }

        fn is_open(&self) -> bool {
            self.open
        }

        fn read(&mut self) -> Result<Frame, CaptureError> {
            match self.script.pop_front() {
                Some(Step::Frame(tag)) => Ok(Frame::new(vec![tag; 3], 1, 1)),
                Some(Step::ReadFails) => Err(CaptureError::Read("unplugged".into())),
                // Script exhausted: keep the last frame flowing.
                Some(Step::OpenFails) | None => {
                    thread::sleep(Duration::from_millis(1));
                    Ok(Frame::new(vec![255; 3], 1, 1))
                }
            }
        }

        fn release(&mut self) {
            if self.open {
                self.log.lock().unwrap().push("release");
            }
            self.open = false;
        }
    }

    fn fast() -> BroadcasterConfig {
        BroadcasterConfig {
            open_retry: Duration::from_millis(5),
            read_retry: Duration::from_millis(5),
        }
    }

    fn wait_for(mut cond: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond() {
            assert!(Instant::now() < deadline, "condition not reached");
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn publishes_same_frame_to_every_channel_after_open_retries() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let channels: Vec<_> = (0..3).map(|_| Arc::new(LatestFrameChannel::new())).collect();
        let source = ScriptedSource {
            script: VecDeque::from([Step::OpenFails, Step::OpenFails, Step::Frame(9)]),
            open: false,
            log: log.clone(),
        };

        let broadcaster = FrameBroadcaster::spawn(move || source, channels.clone(), fast());
        wait_for(|| channels.iter().all(|c| c.take().is_some()));
        assert!(broadcaster.status().is_online());
        broadcaster.stop();

        let log = log.lock().unwrap();
        assert_eq!(&log[..3], &["open-failed", "open-failed", "open"]);
        let first: Vec<_> = channels.iter().map(|c| c.take().unwrap().rgb).collect();
        assert!(first.iter().all(|rgb| rgb == &first[0]));
    }

    #[test]
    fn read_failure_releases_and_reopens() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let channel = Arc::new(LatestFrameChannel::new());
        let source = ScriptedSource {
            script: VecDeque::from([Step::Frame(1), Step::ReadFails, Step::Frame(2)]),
            open: false,
            log: log.clone(),
        };

        let broadcaster = FrameBroadcaster::spawn(move || source, vec![channel.clone()], fast());
        wait_for(|| log.lock().unwrap().iter().filter(|e| **e == "open").count() >= 2);
        wait_for(|| channel.take().is_some());
        broadcaster.stop();

        let log = log.lock().unwrap();
        assert_eq!(&log[..3], &["open", "release", "open"]);
    }

    #[test]
    fn stop_ends_loop_while_waiting_for_device() {
        let source = ScriptedSource {
            script: VecDeque::from(vec![Step::OpenFails; 1_000]),
            open: false,
            log: Arc::new(Mutex::new(Vec::new())),
        };
        let channel = Arc::new(LatestFrameChannel::new());
        let broadcaster = FrameBroadcaster::spawn(
            move || source,
            vec![channel.clone()],
            BroadcasterConfig {
                open_retry: Duration::from_secs(60),
                read_retry: Duration::from_secs(60),
            },
        );
        thread::sleep(Duration::from_millis(20));
        assert!(!broadcaster.status().is_online());
        let started = Instant::now();
        broadcaster.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(channel.take().is_none());
    }
}
