//! Capture and delivery failures must leave the session unmutated.

use async_trait::async_trait;
use std::sync::Arc;
use touchline::{
    ArtifactSink, BoardGeometry, BoardSnapshot, BufferBackend, CaptureBackend, CaptureError,
    CapturePipeline, ImageData, MatchPhase, MatchSession, MemorySink, Point, RasterizeOptions,
    RgbaImage, SessionError,
};

/// Backend whose rasterization always fails, standing in for a host whose
/// screen capture threw.
struct FailingBackend;

#[async_trait]
impl CaptureBackend for FailingBackend {
    async fn rasterize(
        &self,
        _snapshot: &BoardSnapshot,
        _options: &RasterizeOptions,
    ) -> Result<ImageData, CaptureError> {
        Err(CaptureError::RasterizeFailed("canvas unavailable".into()))
    }

    async fn decode(&self, _image: &ImageData) -> Result<RgbaImage, CaptureError> {
        Err(CaptureError::DecodeFailed("canvas unavailable".into()))
    }
}

/// Sink that refuses every delivery.
struct RefusingSink;

impl ArtifactSink for RefusingSink {
    fn deliver(&self, filename: &str, _image: &RgbaImage) -> Result<(), CaptureError> {
        Err(CaptureError::SinkFailed(format!("{filename}: disk full")))
    }
}

fn geometry() -> BoardGeometry {
    BoardGeometry {
        origin: Point::default(),
        court_width: 330.0,
        court_height: 480.0,
        bench_width: 330.0,
        bench_origin_y: 420.0,
    }
}

fn session_with(backend: Box<dyn CaptureBackend>, sink: Box<dyn ArtifactSink>) -> MatchSession {
    let mut session = MatchSession::new(CapturePipeline::new(backend, sink));
    session.set_geometry(geometry());
    session.open_add_player();
    session.confirm_add_player("Aoi").expect("player");
    session
}

#[tokio::test]
async fn failed_kickoff_capture_does_not_start_the_match() {
    let mut session = session_with(Box::new(FailingBackend), Box::new(MemorySink::new()));

    session.start_match().expect("workflow");
    session.confirm_ally_name("Reds").expect("ally");
    let err = session
        .confirm_opponent_name("Blues")
        .await
        .expect_err("capture must fail");

    assert!(matches!(
        err,
        SessionError::Capture(CaptureError::RasterizeFailed(_))
    ));
    assert_eq!(session.phase(), MatchPhase::Before);
    assert!(session.log().is_empty());
    // The confirmed names survive the failed capture.
    assert_eq!(session.ally_name(), "Reds");
    assert_eq!(session.opponent_name(), "Blues");
}

#[tokio::test]
async fn refused_delivery_keeps_the_log_and_the_phase() {
    let mut session = session_with(Box::new(BufferBackend::new()), Box::new(RefusingSink));

    session.start_match().expect("workflow");
    session.confirm_ally_name("Reds").expect("ally");
    session.confirm_opponent_name("Blues").await.expect("kickoff");
    session.end_first_half().await.expect("half time");
    session
        .confirm_second_half_start()
        .await
        .expect("second half");
    let entries_before = session.log().len();

    let err = session.end_match().await.expect_err("delivery must fail");
    assert!(matches!(
        err,
        SessionError::Capture(CaptureError::SinkFailed(_))
    ));

    // Still in the second half; nothing was discarded. The attempted final
    // capture stays in the timeline and a retry may succeed.
    assert_eq!(session.phase(), MatchPhase::SecondHalf);
    assert_eq!(session.log().len(), entries_before + 1);
}

#[tokio::test]
async fn export_retry_succeeds_after_a_transient_sink_failure() {
    // Sink that fails once, then accepts.
    struct FlakySink {
        inner: MemorySink,
        failed: std::sync::atomic::AtomicBool,
    }

    impl ArtifactSink for FlakySink {
        fn deliver(&self, filename: &str, image: &RgbaImage) -> Result<(), CaptureError> {
            if !self.failed.swap(true, std::sync::atomic::Ordering::SeqCst) {
                return Err(CaptureError::SinkFailed("transient".into()));
            }
            self.inner.deliver(filename, image)
        }
    }

    let sink = Arc::new(FlakySink {
        inner: MemorySink::new(),
        failed: std::sync::atomic::AtomicBool::new(false),
    });
    let mut session = MatchSession::new(CapturePipeline::new(
        Box::new(BufferBackend::new()),
        Box::new(Arc::clone(&sink)),
    ));
    session.set_geometry(geometry());
    session.open_add_player();
    session.confirm_add_player("Aoi").expect("player");

    session.start_match().expect("workflow");
    session.confirm_ally_name("Reds").expect("ally");
    session.confirm_opponent_name("Blues").await.expect("kickoff");
    session.end_first_half().await.expect("half time");
    session
        .confirm_second_half_start()
        .await
        .expect("second half");

    session.end_match().await.expect_err("first attempt fails");
    assert_eq!(session.phase(), MatchPhase::SecondHalf);
    let after_failure = session.log().len();
    assert_eq!(after_failure, 4, "kickoff, half end, second half, final");

    session.end_match().await.expect("retry succeeds");
    assert_eq!(session.phase(), MatchPhase::Ended);
    assert!(session.log().is_empty());

    // The retry reused the committed final capture: the composite holds
    // exactly the sections logged after the failed attempt (each image
    // 960 px tall at 2x over the 480 px court), no duplicate final band.
    let delivered = sink.inner.delivered();
    assert_eq!(delivered.len(), 1);
    let expected_height = 50 + 960 + (after_failure as u32 - 1) * (40 + 960);
    assert_eq!(delivered[0].1.height(), expected_height);
}
