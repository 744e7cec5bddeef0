mod common;

use std::fs;
use std::sync::Arc;
use std::thread;

use dossia_oauth1::{
    ApiCall, AuthorizationCallback, CallOutput, Error, HandshakeState, ProtocolError,
    SessionAccessor, SessionClient, StatusCode, TransportError, TransportResponse, Url,
};

use common::*;

const BASE: &str = "https://provider.test";

fn handshake(client: &SessionClient<FakeTransport>) -> SessionAccessor {
    let mut session = client.request_token().unwrap();
    let callback = AuthorizationCallback::new(REQUEST_TOKEN, Some("verifier-1".to_string()));
    session.authorize(&callback).unwrap();
    client.exchange_access_token(&mut session).unwrap();
    session
}

#[test]
fn full_handshake_reaches_access_token() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(FakeTransport::provider());
    let client = SessionClient::new(config(BASE, dir.path()), Arc::clone(&transport));

    let mut session = client.request_token().unwrap();
    assert_eq!(session.state(), HandshakeState::RequestTokenObtained);
    assert_eq!(session.request_token().unwrap().token(), REQUEST_TOKEN);
    assert_eq!(session.request_token().unwrap().secret(), REQUEST_SECRET);

    let redirect = Url::parse(
        "https://app.test/records?operation=accessToken&oauth_token=req+token%2F1&oauth_verifier=pin",
    )
    .unwrap();
    session
        .authorize(&AuthorizationCallback::from_url(&redirect).unwrap())
        .unwrap();
    assert_eq!(session.state(), HandshakeState::UserAuthorized);
    assert_eq!(session.verifier(), Some("pin"));

    client.exchange_access_token(&mut session).unwrap();
    assert_eq!(session.state(), HandshakeState::AccessTokenObtained);
    assert_eq!(session.access_token().unwrap().token(), ACCESS_TOKEN);
    assert_eq!(session.access_token().unwrap().secret(), ACCESS_SECRET);
    assert!(session.request_token().is_none());

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    let exchange = requests[1].authorization().unwrap();
    assert!(exchange.contains("oauth_token=\"req%20token%2F1\""));
    assert!(exchange.contains("oauth_verifier=\"pin\""));
}

#[test]
fn exchange_before_request_token_is_rejected_without_network() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(FakeTransport::provider());
    let client = SessionClient::new(config(BASE, dir.path()), Arc::clone(&transport));

    let mut session = SessionAccessor::new();
    match client.exchange_access_token(&mut session) {
        Err(Error::InvalidState(err)) => {
            assert_eq!(err.expected, HandshakeState::UserAuthorized);
            assert_eq!(err.actual, HandshakeState::Unauthenticated);
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(transport.calls(), 0);
    assert_eq!(session.state(), HandshakeState::Unauthenticated);
}

#[test]
fn exchange_before_user_authorization_is_rejected_without_network() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(FakeTransport::provider());
    let client = SessionClient::new(config(BASE, dir.path()), Arc::clone(&transport));

    let mut session = client.request_token().unwrap();
    assert_eq!(transport.calls(), 1);

    let err = client.exchange_access_token(&mut session).unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
    assert!(!err.is_retryable());
    assert_eq!(transport.calls(), 1);
    assert_eq!(session.state(), HandshakeState::RequestTokenObtained);
}

#[test]
fn api_call_requires_access_token() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(FakeTransport::provider());
    let client = SessionClient::new(config(BASE, dir.path()), Arc::clone(&transport));

    let session = client.request_token().unwrap();
    let result = client.execute_call(&session, ApiCall::get(api_url(BASE, "/xml")));
    assert!(matches!(result, Err(Error::InvalidState(_))));
    assert_eq!(transport.calls(), 1);
}

#[test]
fn authorization_url_carries_one_escaped_token() {
    let dir = tempfile::tempdir().unwrap();
    let mut endpoints = endpoints(BASE);
    endpoints.authorize =
        Url::parse("https://provider.test/oauth/authorize?oauth_token=stale&lang=en").unwrap();
    let config = config(BASE, dir.path()).endpoints(endpoints);
    let client = SessionClient::new(config, FakeTransport::provider());

    let session = client.request_token().unwrap();
    let callback = Url::parse("https://app.test/records?operation=accessToken").unwrap();
    let url = client.authorization_url(&session, &callback).unwrap();

    let tokens: Vec<String> = url
        .query_pairs()
        .filter(|(k, _)| k == "oauth_token")
        .map(|(_, v)| v.into_owned())
        .collect();
    assert_eq!(tokens, vec![REQUEST_TOKEN.to_string()]);
    assert!(url.query().unwrap().contains("oauth_token=req+token%2F1"));
    assert!(url
        .query_pairs()
        .any(|(k, v)| k == "oauth_callback" && v == callback.as_str()));
    assert!(url.query_pairs().any(|(k, v)| k == "lang" && v == "en"));
    assert_eq!(session.state(), HandshakeState::RequestTokenObtained);
}

#[test]
fn callback_for_another_token_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let client = SessionClient::new(config(BASE, dir.path()), FakeTransport::provider());

    let mut session = client.request_token().unwrap();
    let err = session
        .authorize(&AuthorizationCallback::new("someone-else", None))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Protocol(ProtocolError::CallbackTokenMismatch { .. })
    ));
    assert_eq!(session.state(), HandshakeState::RequestTokenObtained);
}

#[test]
fn xml_response_is_returned_as_text() {
    let dir = tempfile::tempdir().unwrap();
    let client = SessionClient::new(config(BASE, dir.path()), FakeTransport::provider());
    let session = handshake(&client);

    let output = client
        .execute_call(&session, ApiCall::get(api_url(BASE, "/xml")))
        .unwrap();
    assert_eq!(output, CallOutput::Text("<records/>".to_string()));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn png_response_is_downloaded_byte_for_byte() {
    let dir = tempfile::tempdir().unwrap();
    let client = SessionClient::new(config(BASE, dir.path()), FakeTransport::provider());
    let session = handshake(&client);

    let output = client
        .execute_call(&session, ApiCall::get(api_url(BASE, "/png")))
        .unwrap();
    let path = output.as_path().unwrap();
    assert!(path.starts_with(dir.path()));
    assert_eq!(path.extension().unwrap(), "png");
    assert!(path
        .file_name()
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("download"));
    assert_eq!(fs::read(path).unwrap(), PNG_BYTES);
}

#[test]
fn rejected_call_asks_for_reauthentication() {
    let dir = tempfile::tempdir().unwrap();
    let transport = FakeTransport::new(|request| {
        if request.url.path() == "/records" {
            Ok(TransportResponse::from_bytes(
                StatusCode::UNAUTHORIZED,
                Some("text/plain"),
                b"oauth_problem=token_expired".to_vec(),
            ))
        } else {
            Ok(provider_response(request))
        }
    });
    let client = SessionClient::new(config(BASE, dir.path()), transport);
    let session = handshake(&client);

    let err = client
        .execute_call(&session, ApiCall::get(api_url(BASE, "/records")))
        .unwrap_err();
    assert!(err.requires_reauthentication());
    match err {
        Error::Protocol(ProtocolError::Rejected { status, body }) => {
            assert_eq!(status, 401);
            assert_eq!(body, "oauth_problem=token_expired");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn transport_failure_is_retryable() {
    let dir = tempfile::tempdir().unwrap();
    let transport = FakeTransport::new(|_| {
        Err(TransportError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        )))
    });
    let client = SessionClient::new(config(BASE, dir.path()), transport);

    let err = client.request_token().unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
    assert!(err.is_retryable());
}

#[test]
fn sessions_on_separate_threads_stay_apart() {
    let dir = tempfile::tempdir().unwrap();
    let transport = FakeTransport::new(|request| {
        let path = request.url.path().to_string();
        if path.starts_with("/whoami") {
            let token = request
                .authorization()
                .and_then(|auth| auth.split("oauth_token=\"").nth(1))
                .and_then(|rest| rest.split('"').next())
                .unwrap_or_default()
                .to_string();
            Ok(TransportResponse::from_bytes(
                StatusCode::OK,
                Some("text/plain"),
                token.into_bytes(),
            ))
        } else {
            Ok(provider_response(request))
        }
    });
    let client = Arc::new(SessionClient::new(config(BASE, dir.path()), transport));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let client = Arc::clone(&client);
            thread::spawn(move || {
                let token = format!("user-{}", i);
                let session = SessionAccessor::with_access_token(token.clone(), "secret");
                for _ in 0..10 {
                    let output = client
                        .execute_call(&session, ApiCall::get(api_url(BASE, "/whoami")))
                        .unwrap();
                    assert_eq!(output.as_text(), Some(token.as_str()));
                    assert_eq!(session.state(), HandshakeState::AccessTokenObtained);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}
