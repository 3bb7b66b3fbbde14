//! Frame indexing and the producer/render-thread handshake.
//!
//! The renderer runs on exactly two threads. The producer records frame
//! `N + 1` while the render thread executes frame `N`; every double buffer in
//! the crate is indexed by one shared [`FrameIndex`]:
//!
//! | Side | Index | Owner |
//! |------|-------|-------|
//! | write | `frame & 1` | producer (enqueues commands, records actions) |
//! | read | `1 - write` | render thread (processes commands, draws) |
//!
//! The index flips exactly once per frame, inside
//! [`Renderer::post_frame_sync`](crate::Renderer::post_frame_sync), while the
//! render thread is parked. The handshake has two suspension points per
//! frame, one per thread:
//!
//! ```text
//!  producer                              render thread
//!  --------                              -------------
//!  record frame N
//!  wait(render_done) <------------------ set(render_done)
//!  retire read side, flip                wait(frame_signal)
//!  set(frame_signal) ------------------> process commands, draw frame N
//!  record frame N + 1                    set(render_done)
//! ```
//!
//! A render-thread failure is parked in the handshake and re-raised on the
//! producer the next time it waits, so the producer never blocks on a thread
//! that is gone.

mod sync;

pub use sync::{Event, EventStatus};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

/// Shared frame counter selecting the write and read side of every double buffer.
///
/// Cloning is cheap and shares the counter.
#[derive(Debug, Clone, Default)]
pub struct FrameIndex {
    frame: Arc<AtomicUsize>,
}

impl FrameIndex {
    /// Create a counter at frame 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of flips so far.
    pub fn frame(&self) -> usize {
        self.frame.load(Ordering::Acquire)
    }

    /// Side the producer writes to.
    pub fn write(&self) -> usize {
        self.frame() & 1
    }

    /// Side the render thread reads from.
    pub fn read(&self) -> usize {
        1 - self.write()
    }

    /// Swap sides. Only the producer calls this, while the render thread is parked.
    pub fn flip(&self) {
        let previous = self.frame.fetch_add(1, Ordering::AcqRel);
        log::trace!("FrameIndex: flipped to frame {}", previous + 1);
    }
}

/// The two auto-reset events coordinating producer and render thread.
#[derive(Debug)]
pub struct FrameHandshake {
    frame_signal: Event,
    render_done: Event,
    shutdown: AtomicBool,
    failure: Mutex<Option<String>>,
}

impl FrameHandshake {
    /// Create a handshake with "render done" already set, so the first
    /// producer sync does not wait.
    pub fn new() -> Self {
        Self {
            frame_signal: Event::new(false),
            render_done: Event::new(true),
            shutdown: AtomicBool::new(false),
            failure: Mutex::new(None),
        }
    }

    /// Producer: hand the flipped frame to the render thread.
    pub fn signal_frame(&self) {
        self.frame_signal.set();
    }

    /// Render thread: block until a frame is ready.
    ///
    /// Returns `false` once shutdown was requested.
    pub fn wait_for_frame(&self) -> bool {
        self.frame_signal.wait();
        !self.shutdown.load(Ordering::Acquire)
    }

    /// Render thread: report the frame as finished.
    pub fn signal_render_done(&self) {
        self.render_done.set();
    }

    /// Producer: block until the render thread finished its frame.
    ///
    /// # Panics
    ///
    /// Panics with the render thread's failure message if the render thread
    /// reported a fatal error.
    pub fn wait_render_done(&self) {
        self.raise_failure();
        self.render_done.wait();
        self.raise_failure();
    }

    fn raise_failure(&self) {
        if let Some(message) = self.failure.lock().clone() {
            panic!("render thread failed: {message}");
        }
    }

    /// Render thread: park a fatal error for the producer.
    pub fn report_failure(&self, message: String) {
        log::error!("Render thread failed: {message}");
        self.failure.lock().get_or_insert(message);
    }

    /// Whether the render thread reported a fatal error.
    pub fn has_failed(&self) -> bool {
        self.failure.lock().is_some()
    }

    /// Ask the render thread to exit after its current frame.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.frame_signal.set();
    }

    /// Whether shutdown was requested.
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

impl Default for FrameHandshake {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(FrameIndex: Send, Sync);
static_assertions::assert_impl_all!(FrameHandshake: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_index_sides() {
        let index = FrameIndex::new();
        assert_eq!((index.write(), index.read()), (0, 1));

        let shared = index.clone();
        shared.flip();
        assert_eq!(index.frame(), 1);
        assert_eq!((index.write(), index.read()), (1, 0));

        index.flip();
        assert_eq!((shared.write(), shared.read()), (0, 1));
    }

    #[test]
    fn test_first_sync_does_not_block() {
        let handshake = FrameHandshake::new();
        handshake.wait_render_done();
    }

    #[test]
    fn test_ping_pong() {
        let handshake = Arc::new(FrameHandshake::new());
        let frames = Arc::new(AtomicUsize::new(0));

        let render = {
            let handshake = handshake.clone();
            let frames = frames.clone();
            std::thread::spawn(move || {
                while handshake.wait_for_frame() {
                    frames.fetch_add(1, Ordering::SeqCst);
                    handshake.signal_render_done();
                }
            })
        };

        for _ in 0..10 {
            handshake.wait_render_done();
            handshake.signal_frame();
        }
        handshake.wait_render_done();
        assert_eq!(frames.load(Ordering::SeqCst), 10);

        handshake.request_shutdown();
        render.join().unwrap();
    }

    #[test]
    #[should_panic(expected = "render thread failed: device lost")]
    fn test_failure_raised_on_producer() {
        let handshake = FrameHandshake::new();
        handshake.wait_render_done();
        handshake.report_failure("device lost".to_string());
        handshake.signal_render_done();
        handshake.wait_render_done();
    }

    #[test]
    fn test_first_failure_wins() {
        let handshake = FrameHandshake::new();
        handshake.report_failure("first".to_string());
        handshake.report_failure("second".to_string());
        assert_eq!(handshake.failure.lock().as_deref(), Some("first"));
        assert!(handshake.has_failed());
    }
}
