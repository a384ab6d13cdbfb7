//! Integration tests: session lifecycle, reply delivery and error
//! scenarios against a scripted daemon on an in-memory pipe.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use dnssd_core::protocol::{
    AddRecordRequest, BrowseReply, BrowseRequest, RegisterRecordRequest, RegisterReply,
    RegisterServiceRequest, ResolvePayload, ResolveRequest, UpdateRecordRequest,
};
use dnssd_core::{
    DnssdError, Frame, FrameCodec, Op, Reactor, ReactorEvent, Reply, Request, ServiceError,
    ServiceFlags, Session, TxtRecord, memory_pair,
};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio_util::codec::Framed;

type Daemon = Framed<DuplexStream, FrameCodec>;
type Seen = Arc<Mutex<Vec<Result<Reply, String>>>>;

// ── Helpers ──────────────────────────────────────────────────────

/// Start a session against a daemon that answers the request with
/// `ack_error`. Returns the session result, what the callback saw and
/// the daemon end of the pipe.
async fn start(request: Request, ack_error: i32) -> (Result<Session, DnssdError>, Seen, Daemon) {
    let (client, mut daemon) = memory_pair(64 * 1024);
    let server = tokio::spawn(async move {
        let req = daemon.next().await.unwrap().unwrap();
        daemon.send(Frame::ack(ack_error)).await.unwrap();
        (req, daemon)
    });

    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let session = Session::start(
        client,
        request,
        Some(Box::new(move |r: Result<Reply, DnssdError>| {
            sink.lock().unwrap().push(r.map_err(|e| e.to_string()));
        })),
    )
    .await;

    let (_req, daemon) = server.await.unwrap();
    (session, seen, daemon)
}

fn browse_request() -> Request {
    Request::Browse(BrowseRequest::new("_http._tcp"))
}

fn instance(name: &str, flags: ServiceFlags) -> Frame {
    let body = BrowseReply {
        name: name.into(),
        regtype: "_http._tcp.".into(),
        domain: "local.".into(),
        ..Default::default()
    };
    Frame::reply(Op::BrowseReply, flags, 0, &body).unwrap()
}

fn browse_names(seen: &Seen) -> Vec<(String, bool)> {
    seen.lock()
        .unwrap()
        .iter()
        .filter_map(|r| match r {
            Ok(Reply::Browse(b)) => Some((b.name.clone(), b.is_add())),
            _ => None,
        })
        .collect()
}

async fn within<F: std::future::Future>(f: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), f)
        .await
        .expect("timeout")
}

// ── Start ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_start_accepted() {
    let (session, seen, _daemon) = start(browse_request(), 0).await;
    let session = session.unwrap();
    assert!(session.is_active());
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_start_rejected_never_invokes_callback() {
    let (session, seen, mut daemon) = start(browse_request(), ServiceError::Refused.code()).await;
    let err = session.unwrap_err();
    assert_eq!(err.service_error(), Some(ServiceError::Refused));
    assert!(seen.lock().unwrap().is_empty());
    // rejected sessions release their transport
    assert!(within(daemon.next()).await.is_none());
}

#[tokio::test]
async fn test_start_without_daemon_reply() {
    let (client, daemon) = memory_pair(1024);
    drop(daemon);
    let err = Session::start(client, browse_request(), Some(Box::new(|_| {})))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DnssdError::Connection(_) | DnssdError::Service(ServiceError::ServiceNotRunning)
    ));
}

#[tokio::test]
async fn test_request_payload_on_the_wire() {
    let (client, mut daemon) = memory_pair(64 * 1024);
    let mut txt = TxtRecord::create(0);
    txt.set_value("path", Some(b"/")).unwrap();
    let request = RegisterServiceRequest::new("_http._tcp", 8080)
        .named("Web")
        .with_txt(&txt);

    let server = tokio::spawn(async move {
        let frame = daemon.next().await.unwrap().unwrap();
        daemon.send(Frame::ack(0)).await.unwrap();
        (frame, daemon)
    });
    let _session = Session::start(client, Request::RegisterService(request), None)
        .await
        .unwrap();
    let (frame, _daemon) = server.await.unwrap();

    assert_eq!(frame.op(), Op::RegisterService);
    let sent: RegisterServiceRequest = frame.decode().unwrap();
    assert_eq!(sent.name.as_deref(), Some("Web"));
    assert_eq!(sent.port, 8080);
    assert_eq!(sent.txt, txt.serialize().to_vec());
}

// ── Replies ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_browse_add_remove_sequence() {
    let (session, seen, mut daemon) = start(browse_request(), 0).await;
    let mut session = session.unwrap();

    daemon.send(instance("A", ServiceFlags::ADD)).await.unwrap();
    daemon.send(instance("B", ServiceFlags::ADD)).await.unwrap();
    daemon.send(instance("A", ServiceFlags::empty())).await.unwrap();

    for _ in 0..3 {
        within(session.process_result()).await.unwrap();
    }
    assert_eq!(
        browse_names(&seen),
        vec![("A".into(), true), ("B".into(), true), ("A".into(), false)]
    );

    session.teardown();
    daemon.send(instance("C", ServiceFlags::ADD)).await.ok();
    assert!(matches!(
        session.process_result().await,
        Err(DnssdError::InvalidState(_))
    ));
    assert_eq!(browse_names(&seen).len(), 3);
}

#[tokio::test]
async fn test_more_coming_drains_without_waiting() {
    let (session, seen, mut daemon) = start(browse_request(), 0).await;
    let mut session = session.unwrap();

    let batch = ServiceFlags::ADD | ServiceFlags::MORE_COMING;
    daemon.send(instance("one", batch)).await.unwrap();
    daemon.send(instance("two", batch)).await.unwrap();
    daemon.send(instance("three", ServiceFlags::ADD)).await.unwrap();

    within(session.process_result()).await.unwrap();
    assert!(session.more_coming());
    while session.more_coming() {
        assert!(session.try_process_result().unwrap());
    }
    assert_eq!(browse_names(&seen).len(), 3);

    // nothing queued: no callback, no waiting
    assert!(!session.try_process_result().unwrap());
    assert_eq!(seen.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_resolve_reply_carries_txt() {
    let request = Request::Resolve(ResolveRequest::new("Web", "_http._tcp", "local."));
    let (session, seen, mut daemon) = start(request, 0).await;
    let mut session = session.unwrap();

    let mut txt = TxtRecord::create(0);
    txt.set_value("path", Some(b"/index.html")).unwrap();
    txt.set_value("secure", None).unwrap();
    let body = ResolvePayload {
        fullname: "Web._http._tcp.local.".into(),
        host: "web.local.".into(),
        port: 8080,
        txt: txt.serialize().to_vec(),
        ..Default::default()
    };
    daemon
        .send(Frame::reply(Op::ResolveReply, ServiceFlags::empty(), 0, &body).unwrap())
        .await
        .unwrap();
    within(session.process_result()).await.unwrap();

    let seen = seen.lock().unwrap();
    let Some(Ok(Reply::Resolve(r))) = seen.first() else {
        panic!("expected resolve reply, got {seen:?}");
    };
    assert_eq!(r.port, 8080);
    assert_eq!(r.txt.get_value("PATH"), Some(&b"/index.html"[..]));
    assert!(r.txt.contains_key("secure"));
    assert_eq!(r.txt.get_value("secure"), None);
}

// ── Error delivery ───────────────────────────────────────────────

#[tokio::test]
async fn test_corrupt_payload_reported_session_survives() {
    let (session, seen, mut daemon) = start(browse_request(), 0).await;
    let mut session = session.unwrap();

    // valid header, payload bytes flipped after the checksum was taken
    let good = instance("X", ServiceFlags::ADD);
    let mut payload = good.payload().to_vec();
    payload[0] ^= 0xff;
    let stream = daemon.get_mut();
    stream.write_all(&good.header().to_bytes()).await.unwrap();
    stream.write_all(&payload).await.unwrap();

    within(session.process_result()).await.unwrap();
    assert!(session.is_active());
    {
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].as_ref().unwrap_err().contains("checksum"));
    }

    daemon.send(instance("Y", ServiceFlags::ADD)).await.unwrap();
    within(session.process_result()).await.unwrap();
    assert_eq!(browse_names(&seen), vec![("Y".into(), true)]);
}

#[tokio::test]
async fn test_unexpected_op_reported_session_survives() {
    let (session, seen, mut daemon) = start(browse_request(), 0).await;
    let mut session = session.unwrap();

    let stray = Frame::reply(Op::QueryReply, ServiceFlags::ADD, 0, &()).unwrap();
    daemon.send(stray).await.unwrap();
    within(session.process_result()).await.unwrap();

    assert!(session.is_active());
    assert!(seen.lock().unwrap()[0].is_err());
}

#[tokio::test]
async fn test_daemon_exit_terminates_session() {
    let (session, seen, daemon) = start(browse_request(), 0).await;
    let mut session = session.unwrap();
    drop(daemon);

    let err = within(session.process_result()).await.unwrap_err();
    assert_eq!(err.service_error(), Some(ServiceError::ServiceNotRunning));
    assert!(session.phase().is_terminated());
    {
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].is_err());
    }

    // terminated: further processing fails without reaching the callback
    assert!(session.process_result().await.is_err());
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_resolve_error_terminates_one_shot() {
    let request = Request::Resolve(ResolveRequest::new("Gone", "_http._tcp", "local."));
    let (session, seen, mut daemon) = start(request, 0).await;
    let mut session = session.unwrap();

    daemon
        .send(Frame::error(
            Op::ResolveReply,
            ServiceFlags::empty(),
            0,
            ServiceError::NoSuchName.code(),
        ))
        .await
        .unwrap();
    within(session.process_result()).await.unwrap();

    assert!(session.phase().is_terminated());
    assert!(seen.lock().unwrap()[0].is_err());
}

#[tokio::test]
async fn test_browse_error_keeps_session() {
    let (session, seen, mut daemon) = start(browse_request(), 0).await;
    let mut session = session.unwrap();

    daemon
        .send(Frame::error(
            Op::BrowseReply,
            ServiceFlags::empty(),
            0,
            ServiceError::Transient.code(),
        ))
        .await
        .unwrap();
    within(session.process_result()).await.unwrap();

    assert!(session.is_active());
    assert_eq!(seen.lock().unwrap().len(), 1);
}

// ── Sub-registrations ────────────────────────────────────────────

#[tokio::test]
async fn test_service_records_add_update_remove() {
    let request = Request::RegisterService(RegisterServiceRequest::new("_http._tcp", 80));
    let (session, _seen, mut daemon) = start(request, 0).await;
    let mut session = session.unwrap();

    let record = session.add_record(10, b"\x04null", 120).await.unwrap();
    let frame = within(daemon.next()).await.unwrap().unwrap();
    assert_eq!(frame.op(), Op::AddRecord);
    assert_eq!(frame.reg_index(), record.id().0);
    let added: AddRecordRequest = frame.decode().unwrap();
    assert_eq!(added.rrtype, 10);

    session.update_record(Some(&record), b"\x04NULL", 60).await.unwrap();
    let frame = within(daemon.next()).await.unwrap().unwrap();
    assert_eq!(frame.op(), Op::UpdateRecord);
    assert_eq!(frame.reg_index(), record.id().0);

    // primary TXT record
    session.update_record(None, b"\x03a=b", 0).await.unwrap();
    let frame = within(daemon.next()).await.unwrap().unwrap();
    assert_eq!(frame.reg_index(), 0);
    let update: UpdateRecordRequest = frame.decode().unwrap();
    assert_eq!(update.rdata, b"\x03a=b");

    session.remove_record(record).await.unwrap();
    let frame = within(daemon.next()).await.unwrap().unwrap();
    assert_eq!(frame.op(), Op::RemoveRecord);
    assert_eq!(session.record_count(), 0);
}

#[tokio::test]
async fn test_records_invalid_after_teardown() {
    let request = Request::RegisterService(RegisterServiceRequest::new("_http._tcp", 80));
    let (session, _seen, _daemon) = start(request, 0).await;
    let mut session = session.unwrap();

    let record = session.add_record(16, b"\x00", 120).await.unwrap();
    session.teardown();

    assert!(matches!(
        session.update_record(Some(&record), b"\x00", 0).await,
        Err(DnssdError::InvalidState(_))
    ));
    assert!(matches!(
        session.remove_record(record).await,
        Err(DnssdError::InvalidState(_))
    ));
    assert!(matches!(
        session.add_record(16, b"\x00", 0).await,
        Err(DnssdError::InvalidState(_))
    ));
}

#[tokio::test]
async fn test_foreign_record_is_bad_reference() {
    let request = || Request::RegisterService(RegisterServiceRequest::new("_http._tcp", 80));
    let (first, _s1, _d1) = start(request(), 0).await;
    let (second, _s2, _d2) = start(request(), 0).await;
    let mut first = first.unwrap();
    let mut second = second.unwrap();

    let theirs = second.add_record(16, b"\x00", 0).await.unwrap();
    let err = first.remove_record(theirs).await.unwrap_err();
    assert_eq!(err.service_error(), Some(ServiceError::BadReference));
    // the owner still tracks it
    assert_eq!(second.record_count(), 1);
}

#[tokio::test]
async fn test_connection_register_record_ack() {
    let (session, seen, mut daemon) = start(Request::CreateConnection, 0).await;
    let mut session = session.unwrap();

    let params = RegisterRecordRequest {
        flags: ServiceFlags::UNIQUE,
        fullname: "host.local.".into(),
        rrtype: 1,
        rrclass: 1,
        rdata: vec![192, 168, 1, 10],
        ttl: 120,
        ..Default::default()
    };
    let record = session.register_record(params.clone()).await.unwrap();
    let frame = within(daemon.next()).await.unwrap().unwrap();
    assert_eq!(frame.op(), Op::RegisterRecord);
    assert!(frame.flags().contains(ServiceFlags::UNIQUE));

    daemon
        .send(Frame::reply(Op::RegisterRecordReply, ServiceFlags::ADD, frame.reg_index(), &()).unwrap())
        .await
        .unwrap();
    within(session.process_result()).await.unwrap();
    match &seen.lock().unwrap()[0] {
        Ok(Reply::Record(r)) => assert_eq!(r.record, record.id()),
        other => panic!("unexpected {other:?}"),
    }

    let mut both = params;
    both.flags |= ServiceFlags::SHARED;
    let err = session.register_record(both).await.unwrap_err();
    assert_eq!(err.service_error(), Some(ServiceError::BadFlags));
}

#[tokio::test]
async fn test_connection_record_rejection_names_record() {
    let (session, seen, mut daemon) = start(Request::CreateConnection, 0).await;
    let mut session = session.unwrap();

    let params = RegisterRecordRequest {
        flags: ServiceFlags::UNIQUE,
        fullname: "printer.local.".into(),
        rrtype: 1,
        rrclass: 1,
        rdata: vec![10, 0, 0, 7],
        ttl: 120,
        ..Default::default()
    };
    let rejected = session.register_record(params.clone()).await.unwrap();
    let kept = session.register_record(params).await.unwrap();
    within(daemon.next()).await.unwrap().unwrap();
    within(daemon.next()).await.unwrap().unwrap();
    assert_eq!(session.record_count(), 2);

    daemon
        .send(Frame::error(
            Op::RegisterRecordReply,
            ServiceFlags::empty(),
            rejected.id().0,
            ServiceError::NameConflict.code(),
        ))
        .await
        .unwrap();
    within(session.process_result()).await.unwrap();

    {
        let seen = seen.lock().unwrap();
        let err = seen[0].as_ref().unwrap_err();
        assert!(err.contains(&format!("record {} rejected", rejected.id())));
        assert!(err.contains("NameConflict"));
    }
    assert!(session.is_active());
    assert_eq!(session.record_count(), 1);

    let err = session.remove_record(rejected).await.unwrap_err();
    assert_eq!(err.service_error(), Some(ServiceError::BadReference));
    session.remove_record(kept).await.unwrap();
}

#[tokio::test]
async fn test_service_record_rejection_drops_record() {
    let request = Request::RegisterService(RegisterServiceRequest::new("_http._tcp", 80));
    let (session, seen, mut daemon) = start(request, 0).await;
    let mut session = session.unwrap();

    let record = session.add_record(16, b"\x03a=b", 120).await.unwrap();
    within(daemon.next()).await.unwrap().unwrap();

    daemon
        .send(Frame::error(
            Op::RegisterServiceReply,
            ServiceFlags::empty(),
            record.id().0,
            ServiceError::BadParam.code(),
        ))
        .await
        .unwrap();
    within(session.process_result()).await.unwrap();

    assert!(seen.lock().unwrap()[0]
        .as_ref()
        .is_err_and(|e| e.contains(&format!("record {} rejected", record.id()))));
    assert!(session.is_active());
    assert_eq!(session.record_count(), 0);
    let err = session
        .update_record(Some(&record), b"\x03a=c", 120)
        .await
        .unwrap_err();
    assert_eq!(err.service_error(), Some(ServiceError::BadReference));

    // an error for the service itself is not a record rejection
    daemon
        .send(Frame::error(
            Op::RegisterServiceReply,
            ServiceFlags::empty(),
            0,
            ServiceError::NameConflict.code(),
        ))
        .await
        .unwrap();
    within(session.process_result()).await.unwrap();
    assert!(seen.lock().unwrap()[1]
        .as_ref()
        .is_err_and(|e| !e.contains("record")));
}

#[tokio::test]
async fn test_register_reports_name() {
    let request = Request::RegisterService(RegisterServiceRequest::new("_http._tcp", 80));
    let (session, seen, mut daemon) = start(request, 0).await;
    let mut session = session.unwrap();

    let body = RegisterReply {
        name: "Web (2)".into(),
        regtype: "_http._tcp.".into(),
        domain: "local.".into(),
        ..Default::default()
    };
    daemon
        .send(Frame::reply(Op::RegisterServiceReply, ServiceFlags::ADD, 0, &body).unwrap())
        .await
        .unwrap();
    within(session.process_result()).await.unwrap();
    match &seen.lock().unwrap()[0] {
        Ok(Reply::Registered(r)) => assert_eq!(r.name, "Web (2)"),
        other => panic!("unexpected {other:?}"),
    }
}

// ── Reactor ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_reactor_drives_until_unregistered() {
    let (session, seen, mut daemon) = start(browse_request(), 0).await;
    let (mut reactor, mut events) = Reactor::new();
    let descriptor = reactor.register(session.unwrap(), None).unwrap();

    daemon.send(instance("A", ServiceFlags::ADD)).await.unwrap();
    within(async {
        while browse_names(&seen).is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;

    assert!(reactor.unregister(descriptor).await);
    match within(events.recv()).await {
        Some(ReactorEvent::Unregistered(d)) => assert_eq!(d, descriptor),
        other => panic!("unexpected {other:?}"),
    }

    // torn down: nothing more reaches the callback
    daemon.send(instance("B", ServiceFlags::ADD)).await.ok();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(browse_names(&seen), vec![("A".into(), true)]);
}

#[tokio::test]
async fn test_reactor_deadline() {
    let (session, _seen, _daemon) = start(browse_request(), 0).await;
    let (mut reactor, mut events) = Reactor::new();
    let descriptor = reactor
        .register(session.unwrap(), Some(Duration::from_millis(30)))
        .unwrap();

    match within(events.recv()).await {
        Some(ReactorEvent::Expired(d)) => assert_eq!(d, descriptor),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_reactor_shutdown() {
    let (a, _sa, _da) = start(browse_request(), 0).await;
    let (b, _sb, _db) = start(browse_request(), 0).await;
    let (mut reactor, mut events) = Reactor::new();
    reactor.register(a.unwrap(), None).unwrap();
    reactor.register(b.unwrap(), None).unwrap();
    assert_eq!(reactor.active_count(), 2);

    reactor.shutdown().await;
    assert_eq!(reactor.active_count(), 0);
    for _ in 0..2 {
        assert!(matches!(
            within(events.recv()).await,
            Some(ReactorEvent::Unregistered(_))
        ));
    }
}
