// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use localize_app::{
    Attributor, MachineTranslation, SaveCoordinator, SaveValue, SegmentId,
    TranslationBackend,
};
use localize_client::Client;
use localize_testkit::SCENARIO_SNAPSHOT_JSON;
use serde_json::{Value, json};
use std::io::Read;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tiny_http::{Header, Method, Response, Server};

struct Exchange {
    method: Method,
    url: &'static str,
    status: u16,
    body: &'static str,
}

/// Serves the given exchanges in order and returns the request bodies seen.
fn mock_server(exchanges: Vec<Exchange>) -> Result<(String, JoinHandle<Vec<Value>>)> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/admin", server.server_addr());

    let handle = thread::spawn(move || {
        let mut bodies = Vec::new();
        for exchange in exchanges {
            let mut request = server.recv().expect("request expected");
            assert_eq!(request.method(), &exchange.method);
            assert_eq!(request.url(), exchange.url);

            let mut raw = String::new();
            request
                .as_reader()
                .read_to_string(&mut raw)
                .expect("request body should be readable");
            if !raw.is_empty() {
                bodies.push(serde_json::from_str(&raw).expect("request body is json"));
            }

            let response = Response::from_string(exchange.body)
                .with_status_code(exchange.status)
                .with_header(
                    Header::from_bytes("Content-Type", "application/json")
                        .expect("valid content type header"),
                );
            request.respond(response).expect("response should succeed");
        }
        bodies
    });

    Ok((addr, handle))
}

#[test]
fn save_string_posts_value_and_reads_attribution() -> Result<()> {
    let (addr, handle) = mock_server(vec![Exchange {
        method: Method::Post,
        url: "/admin/translate/7/strings/1/edit/",
        status: 200,
        body: r#"{"data": "Bonjour", "comment": null, "last_translated_by": {"full_name": "Camille", "avatar_url": "/a.png"}}"#,
    }])?;

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let committed = client.save_string("translate/7/strings/1/edit/", "Bonjour ")?;
    assert_eq!(committed.value, "Bonjour");
    assert_eq!(
        committed.translated_by,
        Some(Attributor {
            full_name: "Camille".to_owned(),
            avatar_url: Some("/a.png".to_owned()),
        })
    );

    let bodies = handle.join().expect("server thread should join");
    assert_eq!(bodies, vec![json!({"value": "Bonjour "})]);
    Ok(())
}

#[test]
fn save_string_surfaces_structured_errors() -> Result<()> {
    let (addr, handle) = mock_server(vec![
        Exchange {
            method: Method::Post,
            url: "/admin/translate/7/strings/2/edit/",
            status: 400,
            body: r#"{"error": "Translation contains unbalanced tags"}"#,
        },
        Exchange {
            method: Method::Post,
            url: "/admin/translate/7/strings/2/edit/",
            status: 200,
            body: r#"{"data": "x", "error": "Locked by another translator"}"#,
        },
    ])?;

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let rejected = client
        .save_string("translate/7/strings/2/edit/", "<b>x")
        .expect_err("400 should fail");
    assert_eq!(rejected.to_string(), "Translation contains unbalanced tags");

    let locked = client
        .save_string("translate/7/strings/2/edit/", "x")
        .expect_err("error in body should fail");
    assert_eq!(locked.to_string(), "Locked by another translator");

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn save_override_echoes_when_server_omits_data() -> Result<()> {
    let (addr, handle) = mock_server(vec![Exchange {
        method: Method::Post,
        url: "/admin/translate/7/overrides/3/edit/",
        status: 200,
        body: "{}",
    }])?;

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let saved = client.save_override("translate/7/overrides/3/edit/", &json!({"id": 12}))?;
    assert_eq!(saved, json!({"id": 12}));

    let bodies = handle.join().expect("server thread should join");
    assert_eq!(bodies, vec![json!({"value": {"id": 12}})]);
    Ok(())
}

#[test]
fn machine_translate_maps_rows() -> Result<()> {
    let (addr, handle) = mock_server(vec![Exchange {
        method: Method::Post,
        url: "/admin/translate/7/machine_translate/",
        status: 200,
        body: r#"{"translations": [
            {"segment_id": 1, "data": "Bonjour"},
            {"segment_id": 2, "error": "Unsupported language pair"}
        ]}"#,
    }])?;

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let translations = client.machine_translate(
        "translate/7/machine_translate/",
        &[SegmentId::new(1), SegmentId::new(2)],
    )?;
    assert_eq!(
        translations,
        vec![
            MachineTranslation::Translated {
                segment_id: SegmentId::new(1),
                value: "Bonjour".to_owned(),
            },
            MachineTranslation::Failed {
                segment_id: SegmentId::new(2),
                message: "Unsupported language pair".to_owned(),
            },
        ]
    );

    let bodies = handle.join().expect("server thread should join");
    assert_eq!(bodies, vec![json!({"segment_ids": [1, 2]})]);
    Ok(())
}

#[test]
fn fetch_snapshot_decodes_document() -> Result<()> {
    let (addr, handle) = mock_server(vec![Exchange {
        method: Method::Get,
        url: "/admin/translate/7/snapshot/",
        status: 200,
        body: SCENARIO_SNAPSHOT_JSON,
    }])?;

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let snapshot = client.fetch_snapshot("translate/7/snapshot/")?;
    assert_eq!(snapshot.segments.len(), 3);

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn unreachable_server_becomes_segment_error() -> Result<()> {
    let client = Client::new("http://127.0.0.1:1/admin", Duration::from_millis(200))?;
    let mut session = localize_testkit::scenario_session()?;
    let mut coordinator = SaveCoordinator::new(Arc::new(client));

    coordinator.request_save(
        &mut session,
        SegmentId::new(1),
        SaveValue::String("Bonjour".to_owned()),
    );
    coordinator.drain(&mut session, Duration::from_secs(5))?;

    let message = session
        .state()
        .translation(SegmentId::new(1))
        .and_then(|translation| translation.error_message())
        .expect("save should have failed");
    assert!(message.starts_with("Network error"));
    assert_eq!(session.tabs().total_errors(), 1);
    assert!(session.state().translation(SegmentId::new(2)).is_none());
    Ok(())
}
