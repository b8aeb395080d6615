use super::mock::MockCameraLink;
use super::*;
use crate::error::CameraError;
use crate::parser::ScanOutcome;
use std::sync::atomic::Ordering;
use std::time::Duration;

const CAPTURE_TIMEOUT: Duration = Duration::from_millis(5000);

fn create_test_session() -> (
    CameraSession<MockCameraLink>,
    MockCameraLink,
    tokio::sync::mpsc::UnboundedReceiver<LinkEvent>,
) {
    let link = MockCameraLink::new();
    let (session, events) = CameraSession::new(link.clone(), CAPTURE_TIMEOUT);
    (session, link, events)
}

#[tokio::test]
async fn test_session_starts_disconnected() {
    let (session, link, _events) = create_test_session();

    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(!session.aim_state());
    assert!(session.watchdog_deadline().is_none());
    assert!(link.sent_commands().is_empty());
}

#[tokio::test]
async fn test_connect_transitions_to_idle() {
    let (mut session, link, _events) = create_test_session();

    session.connect().await.unwrap();
    session.connect().await.unwrap();

    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(link.opens.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_connect_failure_is_surfaced() {
    let (mut session, link, _events) = create_test_session();
    link.refuse_connect.store(true, Ordering::SeqCst);

    let result = session.connect().await;

    assert!(matches!(result, Err(CameraError::Connect { .. })));
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn test_trigger_capture_sends_once_while_pending() {
    let (mut session, link, _events) = create_test_session();

    assert!(session.trigger_capture().await.unwrap());
    assert!(!session.trigger_capture().await.unwrap());

    assert_eq!(link.count(CameraCommand::Trigger), 1);
    assert_eq!(session.state(), SessionState::AwaitingResult);
    assert_eq!(session.pending_capture().unwrap().attempt, 1);
}

#[tokio::test]
async fn test_trigger_capture_failure_leaves_no_pending_request() {
    let (mut session, link, _events) = create_test_session();
    link.refuse_connect.store(true, Ordering::SeqCst);

    assert!(session.trigger_capture().await.is_err());
    assert!(session.pending_capture().is_none());

    link.refuse_connect.store(false, Ordering::SeqCst);
    assert!(session.trigger_capture().await.unwrap());
    assert_eq!(link.count(CameraCommand::Trigger), 1);
}

#[tokio::test]
async fn test_aim_indicator_is_idempotent() {
    let (mut session, link, _events) = create_test_session();

    assert!(!session.set_aim_indicator(false).await.unwrap());
    assert!(link.sent_commands().is_empty());
    assert!(!session.is_connected());

    assert!(session.set_aim_indicator(true).await.unwrap());
    assert!(!session.set_aim_indicator(true).await.unwrap());
    assert!(session.set_aim_indicator(false).await.unwrap());

    assert_eq!(
        link.sent_commands(),
        vec![CameraCommand::AimOn, CameraCommand::AimOff]
    );
}

#[tokio::test]
async fn test_aim_indicator_suppressed_while_capture_pending() {
    let (mut session, link, _events) = create_test_session();

    session.trigger_capture().await.unwrap();
    assert!(!session.set_aim_indicator(true).await.unwrap());

    assert!(!session.aim_state());
    assert_eq!(link.sent_commands(), vec![CameraCommand::Trigger]);
}

#[tokio::test(start_paused = true)]
async fn test_watchdog_resends_once_per_timeout() {
    let (mut session, link, _events) = create_test_session();
    session.trigger_capture().await.unwrap();

    for expected_attempt in 2..=5u32 {
        tokio::time::advance(CAPTURE_TIMEOUT - Duration::from_millis(1)).await;
        assert_eq!(session.on_watchdog_expired().await.unwrap(), None);
        assert_eq!(
            link.count(CameraCommand::Trigger),
            expected_attempt as usize - 1
        );

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(
            session.on_watchdog_expired().await.unwrap(),
            Some(expected_attempt)
        );
        assert_eq!(link.count(CameraCommand::Trigger), expected_attempt as usize);
    }

    assert_eq!(session.stats().watchdog_retries, 4);
    assert_eq!(session.pending_capture().unwrap().attempt, 5);
}

#[tokio::test(start_paused = true)]
async fn test_watchdog_without_pending_capture_is_noop() {
    let (mut session, link, _events) = create_test_session();

    tokio::time::advance(CAPTURE_TIMEOUT * 2).await;

    assert_eq!(session.on_watchdog_expired().await.unwrap(), None);
    assert!(link.sent_commands().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_watchdog_rearms_when_resend_fails() {
    let (mut session, link, _events) = create_test_session();
    session.trigger_capture().await.unwrap();

    session.on_connection_closed(1);
    link.refuse_connect.store(true, Ordering::SeqCst);

    tokio::time::advance(CAPTURE_TIMEOUT).await;
    assert!(session.on_watchdog_expired().await.is_err());
    assert_eq!(session.pending_capture().unwrap().attempt, 2);

    link.refuse_connect.store(false, Ordering::SeqCst);
    tokio::time::advance(CAPTURE_TIMEOUT).await;
    assert_eq!(session.on_watchdog_expired().await.unwrap(), Some(3));

    assert_eq!(link.count(CameraCommand::Trigger), 2);
    assert_eq!(link.opens.load(Ordering::SeqCst), 2);
    assert_eq!(session.state(), SessionState::AwaitingResult);
}

#[tokio::test]
async fn test_data_received_clears_pending_and_turns_aim_off() {
    let (mut session, link, _events) = create_test_session();

    session.set_aim_indicator(true).await.unwrap();
    session.trigger_capture().await.unwrap();

    let result = session
        .on_data_received(b"1P1234\x1dQ10\r\n".to_vec())
        .await;

    assert_eq!(result.outcome(), ScanOutcome::Identified);
    assert_eq!(result.fields().mfg_pn.as_deref(), Some("1234"));
    assert!(session.pending_capture().is_none());
    assert!(!session.aim_state());
    assert_eq!(
        link.sent_commands(),
        vec![
            CameraCommand::AimOn,
            CameraCommand::Trigger,
            CameraCommand::AimOff
        ]
    );
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_failed_decode_still_turns_aim_off() {
    let (mut session, link, _events) = create_test_session();

    session.set_aim_indicator(true).await.unwrap();
    session.trigger_capture().await.unwrap();
    let result = session.on_data_received(b"NOREAD\r\n".to_vec()).await;

    assert_eq!(result.outcome(), ScanOutcome::Failed);
    assert_eq!(link.count(CameraCommand::AimOff), 1);
}

#[tokio::test]
async fn test_link_events_flow_through_receiver() {
    let (mut session, link, mut events) = create_test_session();
    session.trigger_capture().await.unwrap();

    link.deliver(b"1Pabc\r\n");
    let event = events.recv().await.unwrap();
    let result = session.handle_link_event(event).await.unwrap();

    assert_eq!(result.fields().mfg_pn.as_deref(), Some("abc"));
    assert_eq!(session.stats().results_received, 1);
    assert_eq!(session.stats().unsolicited_results, 0);
}

#[tokio::test]
async fn test_connection_closed_keeps_pending_capture() {
    let (mut session, link, mut events) = create_test_session();
    session.trigger_capture().await.unwrap();

    link.hang_up();
    let event = events.recv().await.unwrap();
    assert!(session.handle_link_event(event).await.is_none());

    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(session.pending_capture().is_some());
    assert!(!link.is_open());
}

#[tokio::test]
async fn test_stale_connection_close_is_ignored() {
    let (mut session, _link, _events) = create_test_session();
    session.connect().await.unwrap();
    session.on_connection_closed(1);
    session.connect().await.unwrap();

    session.on_connection_closed(1);

    assert!(session.is_connected());
}

#[tokio::test]
async fn test_send_failure_forces_reconnect() {
    let (mut session, link, _events) = create_test_session();
    session.connect().await.unwrap();

    link.fail_send.store(true, Ordering::SeqCst);
    assert!(matches!(
        session.set_aim_indicator(true).await,
        Err(CameraError::Send { .. })
    ));
    assert!(!session.is_connected());
    assert!(!session.aim_state());

    link.fail_send.store(false, Ordering::SeqCst);
    assert!(session.set_aim_indicator(true).await.unwrap());
    assert_eq!(link.opens.load(Ordering::SeqCst), 2);
}

async fn next_frame(events: &mut tokio::sync::mpsc::UnboundedReceiver<LinkEvent>) -> Vec<u8> {
    match tokio::time::timeout(Duration::from_secs(2), events.recv()).await {
        Ok(Some(LinkEvent::DataReceived { frame, .. })) => frame,
        other => panic!("expected a result frame, got {:?}", other),
    }
}

#[tokio::test]
async fn test_tcp_link_delivers_untrailed_result() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let camera = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut command = [0u8; 5];
        socket.read_exact(&mut command).await.unwrap();
        assert_eq!(&command, b"< >\r\n");
        socket.write_all(b"1P1234\x1d1Vacme").await.unwrap();
        // hold the connection open
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let link = TcpCameraLink::new(address, Duration::from_secs(1));
    let (mut session, mut events) = CameraSession::new(link, CAPTURE_TIMEOUT);
    session.trigger_capture().await.unwrap();

    let frame = next_frame(&mut events).await;
    let result = session.on_data_received(frame).await;

    assert_eq!(result.fields().mfg_pn.as_deref(), Some("1234"));
    assert_eq!(result.fields().manufacturer.as_deref(), Some("acme"));
    assert!(session.pending_capture().is_none());
    camera.abort();
}

#[tokio::test]
async fn test_reader_flushes_frames_without_line_end() {
    use tokio::io::AsyncWriteExt;

    for raw in [&b"NOREAD\r"[..], &b"1PX\x1dQ3\x1e"[..], &b"1P1234\x1d1Vacme"[..]] {
        let (mut camera, reader) = tokio::io::duplex(256);
        let (tx, mut events) = tokio::sync::mpsc::unbounded_channel();
        let task = tokio::spawn(TcpCameraLink::read_loop(7, reader, tx));

        camera.write_all(raw).await.unwrap();

        assert_eq!(next_frame(&mut events).await, raw.to_vec());
        drop(camera);
        task.await.unwrap();
        assert_eq!(
            events.recv().await,
            Some(LinkEvent::ConnectionClosed { connection: 7 })
        );
    }
}

#[tokio::test]
async fn test_reader_splits_terminated_frames_in_one_chunk() {
    use tokio::io::AsyncWriteExt;

    let (mut camera, reader) = tokio::io::duplex(256);
    let (tx, mut events) = tokio::sync::mpsc::unbounded_channel();
    tokio::spawn(TcpCameraLink::read_loop(1, reader, tx));

    camera.write_all(b"1PA\r\n\x04NOREAD\r\n1PB").await.unwrap();

    assert_eq!(next_frame(&mut events).await, b"1PA\r\n".to_vec());
    assert_eq!(next_frame(&mut events).await, b"NOREAD\r\n".to_vec());
    assert_eq!(next_frame(&mut events).await, b"1PB".to_vec());
}

#[tokio::test]
async fn test_reader_joins_result_split_across_writes() {
    use tokio::io::AsyncWriteExt;

    let (mut camera, reader) = tokio::io::duplex(256);
    let (tx, mut events) = tokio::sync::mpsc::unbounded_channel();
    tokio::spawn(TcpCameraLink::read_loop(1, reader, tx));

    camera.write_all(b"1P12").await.unwrap();
    tokio::time::sleep(super::link::IDLE_FLUSH / 5).await;
    camera.write_all(b"34\x1dQ9").await.unwrap();

    assert_eq!(next_frame(&mut events).await, b"1P1234\x1dQ9".to_vec());
}
