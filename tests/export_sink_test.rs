//! File delivery of the exported match record.

use touchline::{
    BoardGeometry, BufferBackend, CapturePipeline, FileSink, MatchSession, Point,
};

#[tokio::test]
async fn exported_record_lands_in_the_output_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = CapturePipeline::new(
        Box::new(BufferBackend::new()),
        Box::new(FileSink::new(dir.path())),
    );
    let mut session = MatchSession::new(pipeline);
    session.set_geometry(BoardGeometry {
        origin: Point::default(),
        court_width: 330.0,
        court_height: 480.0,
        bench_width: 330.0,
        bench_origin_y: 420.0,
    });
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
    let filename = session.end_match().await.expect("export");

    let path = dir.path().join(&filename);
    let bytes = std::fs::read(&path).expect("artifact on disk");
    assert!(bytes.starts_with(b"P6\n"), "binary PPM header");
    assert!(bytes.len() > 64);
}

#[tokio::test]
async fn missing_output_directory_is_a_sink_error() {
    let pipeline = CapturePipeline::new(
        Box::new(BufferBackend::new()),
        Box::new(FileSink::new("/nonexistent/touchline-out")),
    );
    let mut session = MatchSession::new(pipeline);
    session.set_geometry(BoardGeometry {
        origin: Point::default(),
        court_width: 330.0,
        court_height: 480.0,
        bench_width: 330.0,
        bench_origin_y: 420.0,
    });
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

    assert!(session.end_match().await.is_err());
}
