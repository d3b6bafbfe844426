// tests/integration.rs

use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::time::sleep;

use frame_rpc::{
    //
    create_memory_transport_pair,
    EventStream,
    Frame,
    FrameTransport,
    Result,
    RpcClient,
    RpcConfig,
    RpcError,
    RpcServer,
    TransportEvent,
};

#[cfg(feature = "logging")]
fn init_logging() {
    // ---
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

/// Connected client/server over an in-memory pair.
async fn start_pair(config: RpcConfig) -> Result<(RpcClient, RpcServer)> {
    // ---
    let (client_end, server_end) = create_memory_transport_pair();

    let server = RpcServer::with_transport(server_end).await?;
    let client = RpcClient::with_transport(client_end, config).await?;

    Ok((client, server))
}

/// Next inbound frame on a raw transport end, skipping lifecycle events.
async fn next_frame(stream: &mut EventStream) -> String {
    // ---
    loop {
        let event = tokio::time::timeout(Duration::from_secs(1), stream.inbox.recv())
            .await
            .expect("timed out waiting for frame")
            .expect("event stream closed unexpectedly");

        match event {
            TransportEvent::Frame(text) => return text,
            TransportEvent::Opened => continue,
            other => panic!("unexpected transport event: {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_call_and_wait_round_trip() -> Result<()> {
    // ---
    #[cfg(feature = "logging")]
    init_logging();

    let (client, server) = start_pair(RpcConfig::new()).await?;

    server.expose("hello", |_args| async move { Ok(json!("world")) });

    let greeting = client.call_and_wait("hello", vec![]).await?;
    assert_eq!(greeting, json!("world"));

    client.close().await?;
    server.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_positional_args_arrive_in_order() -> Result<()> {
    // ---
    let (client, server) = start_pair(RpcConfig::new()).await?;

    server.expose("concat", |args: Vec<Value>| async move {
        let joined: String = args.iter().filter_map(Value::as_str).collect();
        Ok(json!(joined))
    });

    let joined = client
        .call_and_wait("concat", vec![json!("a"), json!("b"), json!("c")])
        .await?;

    assert_eq!(joined, json!("abc"));
    Ok(())
}

#[tokio::test]
async fn test_unknown_method_times_out() -> Result<()> {
    // ---
    let timeout = Duration::from_millis(50);
    let (client, _server) = start_pair(RpcConfig::new().with_call_timeout(timeout)).await?;

    let started = Instant::now();
    let err = client.call_and_wait("no_such_method", vec![]).await.unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, RpcError::Timeout));
    assert!(elapsed >= timeout, "failed early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "failed late: {elapsed:?}");
    Ok(())
}

#[tokio::test]
async fn test_raising_timeout_converts_failure_into_success() -> Result<()> {
    // ---
    #[cfg(feature = "logging")]
    init_logging();

    // Client default of 50ms, handler latency of 100ms.
    let (client, server) = start_pair(
        RpcConfig::new().with_call_timeout(Duration::from_millis(50)),
    )
    .await?;

    server.expose("sleep", |_args| async move {
        sleep(Duration::from_millis(100)).await;
        Ok(json!("well rested"))
    });

    let err = client.call_and_wait("sleep", vec![]).await.unwrap_err();
    assert!(matches!(err, RpcError::Timeout));

    // Same call with a per-call timeout beyond the handler's latency.
    let result = client
        .call_and_wait_with_timeout("sleep", vec![], Duration::from_millis(500))
        .await?;

    assert_eq!(result, json!("well rested"));
    Ok(())
}

#[tokio::test]
async fn test_fire_and_forget_returns_without_waiting() -> Result<()> {
    // ---
    let (client, server) = start_pair(RpcConfig::new()).await?;

    let (done_tx, mut done_rx) = mpsc::channel(1);

    server.expose("enqueue", move |args: Vec<Value>| {
        let done_tx = done_tx.clone();
        async move {
            sleep(Duration::from_millis(300)).await;
            let _ = done_tx.send(args).await;
            Ok(Value::Null)
        }
    });

    let started = Instant::now();
    client.call("enqueue", vec![json!("job-1")]).await?;

    // The send is acknowledged long before the handler finishes.
    assert!(started.elapsed() < Duration::from_millis(200));

    // The handler still ran to completion with the right arguments.
    let delivered = tokio::time::timeout(Duration::from_secs(2), done_rx.recv())
        .await
        .expect("handler never ran")
        .expect("handler channel closed");
    assert_eq!(delivered, vec![json!("job-1")]);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_calls_settle_independently() -> Result<()> {
    // ---
    let (client, server) = start_pair(
        RpcConfig::new().with_call_timeout(Duration::from_secs(1)),
    )
    .await?;

    server.expose("slow", |_args| async move {
        sleep(Duration::from_millis(150)).await;
        Ok(json!("slow-result"))
    });
    server.expose("fast", |_args| async move {
        sleep(Duration::from_millis(20)).await;
        Ok(json!("fast-result"))
    });

    // The first call issued resolves last; responses arrive out of order
    // and must be matched by id, not send order.
    let (slow, fast) = tokio::join!(
        client.call_and_wait("slow", vec![]),
        client.call_and_wait("fast", vec![]),
    );

    assert_eq!(slow?, json!("slow-result"));
    assert_eq!(fast?, json!("fast-result"));
    Ok(())
}

#[tokio::test]
async fn test_falsy_results_are_valid_settlements() -> Result<()> {
    // ---
    let (client, server) = start_pair(RpcConfig::new()).await?;

    server.expose("zero", |_args| async move { Ok(json!(0)) });
    server.expose("no", |_args| async move { Ok(json!(false)) });
    server.expose("blank", |_args| async move { Ok(json!("")) });
    server.expose("void", |_args| async move { Ok(Value::Null) });

    assert_eq!(client.call_and_wait("zero", vec![]).await?, json!(0));
    assert_eq!(client.call_and_wait("no", vec![]).await?, json!(false));
    assert_eq!(client.call_and_wait("blank", vec![]).await?, json!(""));
    assert_eq!(client.call_and_wait("void", vec![]).await?, Value::Null);
    Ok(())
}

#[tokio::test]
async fn test_handler_failure_surfaces_as_timeout() -> Result<()> {
    // ---
    let (client, server) = start_pair(
        RpcConfig::new().with_call_timeout(Duration::from_millis(50)),
    )
    .await?;

    server.expose("explode", |_args| async move {
        Err::<Value, _>(RpcError::Handler("kaboom".into()))
    });

    // The failure stays on the server; no error frame crosses the wire.
    let err = client.call_and_wait("explode", vec![]).await.unwrap_err();
    assert!(matches!(err, RpcError::Timeout));
    Ok(())
}

#[tokio::test]
async fn test_revoked_handler_stops_responding() -> Result<()> {
    // ---
    let (client, server) = start_pair(
        RpcConfig::new().with_call_timeout(Duration::from_millis(50)),
    )
    .await?;

    server.expose("ping", |_args| async move { Ok(json!("pong")) });
    assert_eq!(client.call_and_wait("ping", vec![]).await?, json!("pong"));

    // Lookup happens per request, so the revocation is effective at once.
    assert!(server.revoke("ping"));
    let err = client.call_and_wait("ping", vec![]).await.unwrap_err();
    assert!(matches!(err, RpcError::Timeout));

    assert!(!server.revoke("ping"));
    Ok(())
}

#[tokio::test]
async fn test_expose_overwrites_existing_handler() -> Result<()> {
    // ---
    let (client, server) = start_pair(RpcConfig::new()).await?;

    server.expose("version", |_args| async move { Ok(json!(1)) });
    assert_eq!(client.call_and_wait("version", vec![]).await?, json!(1));

    server.expose("version", |_args| async move { Ok(json!(2)) });
    assert_eq!(client.call_and_wait("version", vec![]).await?, json!(2));
    Ok(())
}

#[tokio::test]
async fn test_calls_after_close_fail_at_send() -> Result<()> {
    // ---
    let (client, server) = start_pair(RpcConfig::new()).await?;

    server.expose("hello", |_args| async move { Ok(json!("world")) });

    client.close().await?;

    let err = client.call("hello", vec![]).await.unwrap_err();
    assert!(matches!(err, RpcError::Closed));

    let err = client.call_and_wait("hello", vec![]).await.unwrap_err();
    assert!(matches!(err, RpcError::Closed));
    Ok(())
}

#[tokio::test]
async fn test_late_response_is_dropped_silently() -> Result<()> {
    // ---
    #[cfg(feature = "logging")]
    init_logging();

    // Raw peer instead of an RpcServer, so response timing is ours.
    let (client_end, peer_end) = create_memory_transport_pair();

    let client = RpcClient::with_transport(
        client_end,
        RpcConfig::new().with_call_timeout(Duration::from_millis(50)),
    )
    .await?;

    let mut peer_events = peer_end.events().await?;

    let pending = tokio::spawn({
        let client = client.clone();
        async move { client.call_and_wait("job", vec![]).await }
    });

    let request = match frame_rpc::decode(&next_frame(&mut peer_events).await)? {
        Frame::Request(request) => request,
        Frame::Response(resp) => panic!("expected a request, got response {resp:?}"),
    };
    assert_eq!(request.method, "job");

    // Answer well past the client's timeout.
    sleep(Duration::from_millis(150)).await;
    peer_end
        .send(frame_rpc::encode_response(request.id, json!("too late"))?)
        .await?;

    let result = pending.await.expect("call task panicked");
    assert!(matches!(result, Err(RpcError::Timeout)));

    // The stale response left no trace; a fresh call settles normally.
    let pending = tokio::spawn({
        let client = client.clone();
        async move { client.call_and_wait("job", vec![]).await }
    });

    let request = match frame_rpc::decode(&next_frame(&mut peer_events).await)? {
        Frame::Request(request) => request,
        Frame::Response(resp) => panic!("expected a request, got response {resp:?}"),
    };
    peer_end
        .send(frame_rpc::encode_response(request.id, json!("on time"))?)
        .await?;

    let result = pending.await.expect("call task panicked")?;
    assert_eq!(result, json!("on time"));
    Ok(())
}

#[tokio::test]
async fn test_malformed_frames_do_not_disturb_pending_calls() -> Result<()> {
    // ---
    let (client_end, peer_end) = create_memory_transport_pair();

    let client = RpcClient::with_transport(
        client_end,
        RpcConfig::new().with_call_timeout(Duration::from_millis(500)),
    )
    .await?;

    let mut peer_events = peer_end.events().await?;

    let pending = tokio::spawn({
        let client = client.clone();
        async move { client.call_and_wait("job", vec![]).await }
    });

    let request = match frame_rpc::decode(&next_frame(&mut peer_events).await)? {
        Frame::Request(request) => request,
        Frame::Response(resp) => panic!("expected a request, got response {resp:?}"),
    };

    // Garbage, a response with no id, and a response for an id that was
    // never issued: all dropped without affecting the in-flight call.
    peer_end.send("not json at all".into()).await?;
    peer_end.send(r#"{"result": "orphan"}"#.into()).await?;
    peer_end
        .send(frame_rpc::encode_response(999_999.into(), json!("stray"))?)
        .await?;

    peer_end
        .send(frame_rpc::encode_response(request.id, json!("intact"))?)
        .await?;

    let result = pending.await.expect("call task panicked")?;
    assert_eq!(result, json!("intact"));
    Ok(())
}

#[tokio::test]
async fn test_clients_on_separate_connections_are_independent() -> Result<()> {
    // ---
    let (alpha_client, alpha_server) = start_pair(RpcConfig::new()).await?;
    let (beta_client, beta_server) = start_pair(RpcConfig::new()).await?;

    alpha_server.expose("whoami", |_args| async move { Ok(json!("alpha")) });
    beta_server.expose("whoami", |_args| async move { Ok(json!("beta")) });

    // Both clients started their id counters at 1; correlation is scoped
    // to the connection, so neither sees the other's traffic.
    assert_eq!(alpha_client.call_and_wait("whoami", vec![]).await?, json!("alpha"));
    assert_eq!(beta_client.call_and_wait("whoami", vec![]).await?, json!("beta"));
    Ok(())
}
