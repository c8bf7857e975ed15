// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use daybook_api::Client;
use daybook_app::{Bill, BillId, BillPatch, ListQuery, Note, NoteId, NotePatch, Sport};
use daybook_sync::{AutoSaver, SaveBackend, SavePolicy, SaveError, SaveRequest, SaveTicket};
use daybook_testkit::DaybookFaker;
use std::thread;
use std::time::{Duration, Instant};
use tiny_http::{Header, Method, Response, Server};

fn json_header() -> Header {
    Header::from_bytes("Content-Type", "application/json").expect("valid content type header")
}

fn mock_server() -> Result<(Server, String)> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());
    Ok((server, addr))
}

#[test]
fn unreachable_server_error_names_the_setting_to_check() -> Result<()> {
    let client = Client::new("http://127.0.0.1:1", None, Duration::from_millis(50))?;
    let error = client.ping().expect_err("ping should fail for unreachable server");
    assert!(error.to_string().contains("server.base_url"));
    Ok(())
}

#[test]
fn empty_base_url_is_rejected() {
    assert!(Client::new("  ", None, Duration::from_secs(1)).is_err());
    assert!(Client::new("not a url", None, Duration::from_secs(1)).is_err());
}

#[test]
fn list_sends_query_and_session_cookie() -> Result<()> {
    let (server, addr) = mock_server()?;
    let bills = DaybookFaker::new(8).bills(3);
    let payload = serde_json::to_string(&bills)?;

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.method(), &Method::Get);
        assert_eq!(request.url(), "/api/bill/list?start=20260301&end=20260331");
        let cookie = request
            .headers()
            .iter()
            .find(|header| header.field.equiv("Cookie"))
            .map(|header| header.value.as_str().to_owned());
        assert_eq!(cookie.as_deref(), Some("diarygo_session=secret"));
        let response = Response::from_string(payload).with_header(json_header());
        request.respond(response).expect("response should succeed");
    });

    let client = Client::new(&addr, Some("secret"), Duration::from_secs(2))?;
    let listed: Vec<Bill> = client.list(&ListQuery::Bill {
        start: 20260301,
        end: 20260331,
    })?;
    assert_eq!(listed, bills);

    handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    Ok(())
}

#[test]
fn null_list_reads_as_empty() -> Result<()> {
    let (server, addr) = mock_server()?;
    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/api/sport/list");
        let response = Response::from_string("null").with_header(json_header());
        request.respond(response).expect("response should succeed");
    });

    let client = Client::new(&addr, None, Duration::from_secs(2))?;
    let listed: Vec<Sport> = client.list(&ListQuery::Sport)?;
    assert!(listed.is_empty());

    handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    Ok(())
}

#[test]
fn mismatched_query_is_refused_before_sending() -> Result<()> {
    let client = Client::new("http://127.0.0.1:1", None, Duration::from_millis(50))?;
    let result: Result<Vec<Note>> = client.list(&ListQuery::Sport);
    assert!(result.is_err());
    Ok(())
}

#[test]
fn saver_requests_post_only_changed_fields() -> Result<()> {
    let (server, addr) = mock_server()?;
    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("request expected");
        assert_eq!(request.method(), &Method::Post);
        assert_eq!(request.url(), "/api/bill/update");
        let mut body = String::new();
        request
            .as_reader()
            .read_to_string(&mut body)
            .expect("body should read");
        let parsed: serde_json::Value = serde_json::from_str(&body).expect("json body");
        assert_eq!(parsed, serde_json::json!({"id": 1, "amount": 4242.5}));
        let response = Response::from_string(r#"{"status":"ok"}"#).with_header(json_header());
        request.respond(response).expect("response should succeed");
    });

    let start = Instant::now();
    let records = DaybookFaker::new(2).bills(1);
    let mut saver = AutoSaver::with_records(SavePolicy::default(), records);
    saver.update(
        BillId::new(1),
        &BillPatch {
            amount: Some(4242.5),
            ..BillPatch::default()
        },
        start,
    );
    let request = saver.flush(start).remove(0);

    let client = Client::new(&addr, None, Duration::from_secs(2))?;
    client.save(&request)?;

    handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    Ok(())
}

#[test]
fn http_status_maps_to_save_errors() -> Result<()> {
    let (server, addr) = mock_server()?;
    let handle = thread::spawn(move || {
        let first = server.recv().expect("request expected");
        first
            .respond(Response::from_string("unauthorized\n").with_status_code(401))
            .expect("response should succeed");
        let second = server.recv().expect("request expected");
        second
            .respond(Response::from_string("invalid id\n").with_status_code(400))
            .expect("response should succeed");
    });

    let request = SaveRequest {
        ticket: SaveTicket {
            id: NoteId::new(3),
            seq: 1,
        },
        patch: NotePatch {
            process: Some(100),
            ..NotePatch::default()
        },
        record: DaybookFaker::new(1).note(3),
        attempt: 1,
    };
    let client = Client::new(&addr, None, Duration::from_secs(2))?;
    assert_eq!(client.save(&request), Err(SaveError::Unauthorized));
    assert_eq!(
        client.save(&request),
        Err(SaveError::Server {
            status: 400,
            message: "invalid id".to_owned()
        })
    );

    handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    Ok(())
}

#[test]
fn delete_passes_the_id_in_the_query() -> Result<()> {
    let (server, addr) = mock_server()?;
    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.method(), &Method::Delete);
        assert_eq!(request.url(), "/api/note/delete?id=9");
        request
            .respond(Response::from_string(r#"{"status":"ok"}"#).with_header(json_header()))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, None, Duration::from_secs(2))?;
    client.delete::<Note>(NoteId::new(9))?;

    handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    Ok(())
}
