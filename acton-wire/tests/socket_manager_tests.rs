/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::time::Duration;

use acton_wire::prelude::*;
use acton_wire_test::prelude::*;
use bytes::Bytes;

use crate::setup::*;

mod setup;

type Endpoint<'a> = (&'a str, Pattern, &'a str, Mode);

fn manager_with(
    transport: &ScriptedTransport,
    endpoints: &[Endpoint<'_>],
) -> anyhow::Result<SocketManager> {
    let mut manager = SocketManager::new("scripted", transport.clone());
    for (name, pattern, address, mode) in endpoints {
        manager.register(EndpointDescriptor::new(*name, *pattern, *address, *mode)?)?;
    }
    Ok(manager)
}

fn is_unsupported(result: &Result<(), WireError>) -> bool {
    matches!(result, Err(WireError::Transport(e)) if e.kind() == TransportErrorKind::Unsupported)
}

/// A manager with a single endpoint.
fn manager_on(
    transport: &ScriptedTransport,
    name: &str,
    pattern: Pattern,
    address: &str,
    mode: Mode,
) -> anyhow::Result<SocketManager> {
    manager_with(transport, &[(name, pattern, address, mode)])
}

#[wire_test]
async fn test_open_all_follows_registration_order() -> anyhow::Result<()> {
    initialize_tracing();
    let transport = ScriptedTransport::new();
    let mut manager = manager_with(
        &transport,
        &[
            ("a", Pattern::Publish, "inproc://a", Mode::Bind),
            ("b", Pattern::Pull, "inproc://b", Mode::Bind),
            ("c", Pattern::Subscribe, "inproc://c", Mode::Connect),
        ],
    )?;
    assert!(transport.calls().is_empty(), "register must not touch the transport");

    manager.open_all().await?;
    assert_eq!(manager.state(), ManagerState::Open);
    assert_eq!(manager.live_endpoints(), ["a", "b", "c"]);
    assert_eq!(
        transport.calls(),
        vec![
            Call::CreateContext,
            Call::Bind("inproc://a".into()),
            Call::Bind("inproc://b".into()),
            Call::Connect("inproc://c".into()),
            Call::Subscribe("inproc://c".into(), String::new()),
        ]
    );

    manager.close_all().await;
    Ok(())
}

#[wire_test]
async fn test_failed_open_rolls_back_everything() -> anyhow::Result<()> {
    initialize_tracing();
    let transport = ScriptedTransport::new().fail_bind_at(2);
    let mut manager = manager_with(
        &transport,
        &[
            ("first", Pattern::Push, "inproc://first", Mode::Bind),
            ("second", Pattern::Push, "inproc://second", Mode::Bind),
            ("third", Pattern::Pull, "inproc://third", Mode::Bind),
        ],
    )?;

    let err = manager.open_all().await.unwrap_err();
    match &err {
        WireError::EndpointOpen { name, source } => {
            assert_eq!(name, "second");
            assert_eq!(source.kind(), TransportErrorKind::AddressInUse);
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(manager.state(), ManagerState::Closed);
    assert!(manager.live_endpoints().is_empty());
    assert_eq!(transport.attached(), 0);
    assert_eq!(
        transport.calls(),
        vec![
            Call::CreateContext,
            Call::Bind("inproc://first".into()),
            Call::Close("inproc://first".into()),
            Call::Terminate,
        ]
    );
    Ok(())
}

#[wire_test]
async fn test_rollback_closes_in_reverse_order() -> anyhow::Result<()> {
    initialize_tracing();
    let transport = ScriptedTransport::new().fail_bind_at(3);
    let mut manager = manager_with(
        &transport,
        &[
            ("one", Pattern::Push, "inproc://one", Mode::Bind),
            ("two", Pattern::Push, "inproc://two", Mode::Bind),
            ("three", Pattern::Push, "inproc://three", Mode::Bind),
        ],
    )?;

    assert!(manager.open_all().await.is_err());
    let closes: Vec<Call> = transport
        .calls()
        .into_iter()
        .filter(|call| matches!(call, Call::Close(_)))
        .collect();
    assert_eq!(
        closes,
        vec![Call::Close("inproc://two".into()), Call::Close("inproc://one".into())]
    );
    Ok(())
}

#[wire_test]
async fn test_close_all_is_idempotent() -> anyhow::Result<()> {
    initialize_tracing();
    let transport = ScriptedTransport::new();
    let mut manager = manager_with(
        &transport,
        &[
            ("x", Pattern::Push, "inproc://x", Mode::Bind),
            ("y", Pattern::Pull, "inproc://y", Mode::Bind),
        ],
    )?;
    manager.open_all().await?;

    manager.close_all().await;
    let after_first = transport.calls();
    manager.close_all().await;
    manager.close_all().await;

    assert_eq!(transport.calls(), after_first);
    assert_eq!(transport.count(|c| *c == Call::Terminate), 1);
    assert_eq!(transport.count(|c| matches!(c, Call::Close(_))), 2);
    assert_eq!(manager.state(), ManagerState::Closed);
    Ok(())
}

#[wire_test]
async fn test_zero_endpoints_open_without_context() -> anyhow::Result<()> {
    let transport = ScriptedTransport::new();
    let mut manager = SocketManager::new("empty", transport.clone());
    manager.open_all().await?;
    assert!(manager.is_open());
    manager.close_all().await;
    assert!(transport.calls().is_empty());
    Ok(())
}

#[wire_test]
async fn test_registration_errors() -> anyhow::Result<()> {
    let transport = ScriptedTransport::new();
    let mut manager = SocketManager::new("dupes", transport.clone());
    let handle = manager.register(EndpointDescriptor::bind("out", Pattern::Push, "inproc://out")?)?;
    assert_eq!(handle.name(), "out");
    assert_eq!(handle.manager(), "dupes");
    assert_eq!(handle.index(), 0);

    let other = EndpointDescriptor::bind("out", Pattern::Push, "inproc://other")?;
    let duplicate = manager.register(other);
    assert!(matches!(duplicate, Err(WireError::DuplicateEndpoint { name }) if name == "out"));

    manager.open_all().await?;
    let late = manager.register(EndpointDescriptor::bind("late", Pattern::Push, "inproc://late")?);
    assert!(matches!(late, Err(WireError::Lifecycle { .. })));
    assert!(matches!(manager.open_all().await, Err(WireError::Lifecycle { .. })));

    manager.close_all().await;
    assert!(matches!(manager.open_all().await, Err(WireError::Lifecycle { .. })));
    Ok(())
}

#[wire_test]
async fn test_unknown_endpoint_fails_without_blocking() -> anyhow::Result<()> {
    let transport = ScriptedTransport::new();
    let mut manager = manager_on(&transport, "in", Pattern::Pull, "inproc://in", Mode::Bind)?;
    let limit = Duration::from_secs(1);

    let before_open = tokio::time::timeout(limit, manager.receive::<u32>("in")).await?;
    assert!(matches!(before_open, Err(WireError::UnknownEndpoint { .. })));

    manager.open_all().await?;
    let missing = tokio::time::timeout(limit, manager.receive::<u32>("missing")).await?;
    assert!(matches!(missing, Err(WireError::UnknownEndpoint { name }) if name == "missing"));

    let send = manager.send("missing", &1_u32).await;
    assert!(matches!(send, Err(WireError::UnknownEndpoint { .. })));

    manager.close_all().await;
    Ok(())
}

#[wire_test]
async fn test_send_and_receive_in_memory() -> anyhow::Result<()> {
    initialize_tracing();
    let transport = ScriptedTransport::new();
    let mut producer = manager_on(&transport, "out", Pattern::Push, "inproc://work", Mode::Bind)?
        .with_codec(Codec::MessagePack);
    let mut consumer = manager_on(&transport, "in", Pattern::Pull, "inproc://work", Mode::Connect)?
        .with_codec(Codec::MessagePack);
    producer.open_all().await?;
    consumer.open_all().await?;

    producer.send("out", &vec!["a".to_string(), "b".to_string()]).await?;
    let received: Vec<String> = consumer.receive("in").await?;
    assert_eq!(received, ["a", "b"]);

    producer.close_all().await;
    consumer.close_all().await;
    Ok(())
}

#[wire_test]
async fn test_malformed_message_is_dropped_and_next_is_read() -> anyhow::Result<()> {
    initialize_tracing();
    let transport = ScriptedTransport::new();
    let mut manager = manager_on(&transport, "in", Pattern::Pull, "inproc://in", Mode::Bind)?;
    manager.open_all().await?;

    transport.inject("inproc://in", vec![Bytes::from_static(b"not json")]);
    transport.inject("inproc://in", vec![Bytes::from_static(b"{\"k\":1}")]);

    let first = manager.receive::<serde_json::Value>("in").await;
    assert!(matches!(first, Err(WireError::Serialization { codec: Codec::Json, .. })));
    assert!(manager.is_open());

    let second: serde_json::Value = manager.receive("in").await?;
    assert_eq!(second, serde_json::json!({"k": 1}));

    manager.close_all().await;
    Ok(())
}

#[wire_test]
async fn test_direction_is_enforced() -> anyhow::Result<()> {
    let transport = ScriptedTransport::new();
    let mut manager = manager_with(
        &transport,
        &[
            ("pub", Pattern::Publish, "inproc://pub", Mode::Bind),
            ("pull", Pattern::Pull, "inproc://pull", Mode::Bind),
        ],
    )?;
    manager.open_all().await?;

    let send = manager.send("pull", &1_u8).await;
    assert!(is_unsupported(&send));
    let recv = manager.receive::<u8>("pub").await.map(|_| ());
    assert!(is_unsupported(&recv));

    manager.close_all().await;
    Ok(())
}

#[wire_test]
async fn test_publish_prepends_empty_topic() -> anyhow::Result<()> {
    let transport = ScriptedTransport::new();
    let mut publisher =
        manager_on(&transport, "pub", Pattern::Publish, "inproc://feed", Mode::Bind)?;
    let mut subscriber =
        manager_on(&transport, "sub", Pattern::Subscribe, "inproc://feed", Mode::Connect)?;
    publisher.open_all().await?;
    subscriber.open_all().await?;

    publisher.send("pub", &"hello").await?;
    let (envelope, payload) = subscriber.receive_bytes("sub").await?;
    assert_eq!(envelope.topic_frame().map(|t| t.len()), Some(0));
    assert_eq!(&payload[..], b"\"hello\"");

    publisher
        .send_event("pub", Event::on_topic("prices", 3_u8))
        .await?;
    let event: Event<u8> = subscriber.receive_event("sub").await?;
    assert_eq!(event.envelope.topic_frame().map(|t| &t[..]), Some(&b"prices"[..]));
    assert_eq!(event.payload, 3);

    publisher.close_all().await;
    subscriber.close_all().await;
    Ok(())
}

#[wire_test]
async fn test_subscriptions_are_tracked() -> anyhow::Result<()> {
    let transport = ScriptedTransport::new();
    let mut manager = SocketManager::new("subs", transport.clone());
    let feed = EndpointDescriptor::connect("sub", Pattern::Subscribe, "inproc://feed")?;
    manager.register(feed.with_subscription("a")?)?;
    manager.register(EndpointDescriptor::bind("push", Pattern::Push, "inproc://push")?)?;
    manager.open_all().await?;

    assert!(!manager.subscribe("sub", "a").await?);
    assert!(manager.subscribe("sub", "b").await?);
    assert!(manager.unsubscribe("sub", "a").await?);
    assert!(!manager.unsubscribe("sub", "a").await?);
    assert!(matches!(manager.subscribe("push", "a").await, Err(WireError::Transport(_))));
    assert_eq!(
        transport.count(|c| matches!(c, Call::Subscribe(_, _))),
        2,
        "initial 'a' plus 'b'"
    );

    manager.close_all().await;
    Ok(())
}

#[wire_test]
async fn test_close_wakes_suspended_receive() -> anyhow::Result<()> {
    let transport = ScriptedTransport::new();
    let mut manager = manager_on(&transport, "in", Pattern::Pull, "inproc://in", Mode::Bind)?;
    manager.open_all().await?;

    let closing = manager.closing_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        closing.cancel();
    });
    let result =
        tokio::time::timeout(Duration::from_secs(2), manager.receive::<u32>("in")).await?;
    assert!(matches!(result, Err(WireError::Closing { manager }) if manager == "scripted"));

    manager.close_all().await;
    Ok(())
}

#[wire_test]
async fn test_connect_timeout_rolls_back() -> anyhow::Result<()> {
    let transport = ScriptedTransport::new().stall_connects();
    let mut manager = manager_with(
        &transport,
        &[
            ("out", Pattern::Push, "inproc://out", Mode::Bind),
            ("peer", Pattern::Dealer, "tcp://127.0.0.1:6000", Mode::Connect),
        ],
    )?
    .with_connect_timeout(Duration::from_millis(50));

    let err = manager.open_all().await.unwrap_err();
    assert!(matches!(
        &err,
        WireError::EndpointOpen { name, source }
            if name == "peer" && source.kind() == TransportErrorKind::ConnectTimeout
    ));
    assert_eq!(transport.attached(), 0);
    assert_eq!(transport.count(|c| *c == Call::Terminate), 1);
    Ok(())
}

#[wire_test]
async fn test_pair_is_reported_as_endpoint_open_error() -> anyhow::Result<()> {
    let transport = ScriptedTransport::new();
    let mut manager = manager_on(&transport, "pair", Pattern::Pair, "inproc://pair", Mode::Bind)?;
    let err = manager.open_all().await.unwrap_err();
    assert!(matches!(
        err,
        WireError::EndpointOpen { source, .. } if source.kind() == TransportErrorKind::Unsupported
    ));
    Ok(())
}

#[wire_test]
async fn test_detach_closes_one_endpoint() -> anyhow::Result<()> {
    initialize_tracing();
    let transport = ScriptedTransport::new();
    let mut manager = manager_with(
        &transport,
        &[
            ("a", Pattern::Push, "inproc://a", Mode::Bind),
            ("b", Pattern::Push, "inproc://b", Mode::Bind),
            ("c", Pattern::Pull, "inproc://c", Mode::Connect),
        ],
    )?;
    manager.open_all().await?;

    manager.detach("b").await?;
    assert_eq!(manager.live_endpoints(), ["a", "c"]);
    assert_eq!(manager.registered().len(), 3);
    assert!(manager.is_open());
    assert!(matches!(
        manager.send("b", &1_u8).await,
        Err(WireError::UnknownEndpoint { name }) if name == "b"
    ));
    assert!(matches!(
        manager.detach("b").await,
        Err(WireError::UnknownEndpoint { .. })
    ));

    manager.send("a", &1_u8).await?;
    manager.close_all().await;

    let closes: Vec<Call> = transport
        .calls()
        .into_iter()
        .filter(|call| matches!(call, Call::Close(_)))
        .collect();
    assert_eq!(
        closes,
        vec![
            Call::Close("inproc://b".into()),
            Call::Close("inproc://c".into()),
            Call::Close("inproc://a".into()),
        ]
    );
    assert_eq!(transport.count(|c| *c == Call::Terminate), 1);
    assert_eq!(transport.attached(), 0);
    Ok(())
}
