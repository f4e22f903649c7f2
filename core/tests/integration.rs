//! End-to-end run against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives every endpoint
//! through `TodoApi` over real HTTP, with the router consulted the way a
//! front-end would between calls.

use std::time::Duration;

use mock_server::Envelope;
use todo_client::{
    ApiError, ClientConfig, LoginUser, Navigation, NewTodo, RegisterUser, Route, Router, SessionContext, TodoApi,
};

fn start_server(envelope: Envelope) -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run_with(listener, envelope).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn api_for(base_url: String) -> TodoApi {
    TodoApi::from_config(&ClientConfig {
        base_url,
        timeout: Duration::from_secs(5),
    })
}

fn lifecycle(envelope: Envelope) {
    let api = api_for(start_server(envelope));
    let router = Router::new();
    let mut session = SessionContext::in_memory();

    // Step 1: anonymous users are sent to the login view.
    let nav = router.navigate("/", &session).unwrap();
    assert_eq!(nav, Navigation::Redirect(Route::Login));

    // Step 2: register, which signs the session in.
    let registered = api
        .register(
            &mut session,
            &RegisterUser {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                password: "secret".to_string(),
            },
        )
        .unwrap();
    assert!(registered.token.is_some());
    assert!(session.is_authenticated());
    assert_eq!(router.navigate("/register", &session).unwrap(), Navigation::Redirect(Route::Dashboard));

    // Step 3: log out and back in.
    assert!(api.logout(&mut session).unwrap());
    let err = api
        .login(&mut session, &LoginUser { email: "ada@example.com".to_string(), password: "wrong".to_string() })
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.server_message(), Some("Invalid credentials"));

    api.login(&mut session, &LoginUser { email: "ada@example.com".to_string(), password: "secret".to_string() })
        .unwrap();
    assert_eq!(router.navigate("/", &session).unwrap(), Navigation::Allow(Route::Dashboard));

    // Step 4: list, which should be empty.
    let todos = api.get_todos(&mut session, None).unwrap();
    assert!(todos.is_empty(), "expected empty list");

    // Step 5: create two todos.
    let mut first = api
        .create_todo(&mut session, &NewTodo { title: "Integration test".to_string(), completed: false }, None)
        .unwrap();
    assert_eq!(first.title(), Some("Integration test"));
    assert!(!first.completed);
    api.create_todo(&mut session, &NewTodo { title: "Second".to_string(), completed: false }, None)
        .unwrap();
    assert_eq!(api.get_todos(&mut session, None).unwrap().len(), 2);

    // Step 6: complete the first one.
    first.completed = true;
    let updated = api.update_todo(&mut session, &mut first).unwrap();
    assert!(updated.completed);
    assert!(updated.completed_time.is_some());
    assert_eq!(updated.title(), Some("Integration test"));

    // Step 7: reopen it.
    first.completed = false;
    let updated = api.update_todo(&mut session, &mut first).unwrap();
    assert!(!updated.completed);
    assert!(updated.completed_time.is_none());

    // Step 8: delete it, then again; the second time is a 404.
    api.delete_todo(&mut session, &first.id).unwrap();
    let err = api.delete_todo(&mut session, &first.id).unwrap_err();
    assert!(matches!(err, ApiError::Server { status: 404, .. }));
    assert!(session.is_authenticated());

    // Step 9: delete everything that is left.
    api.delete_all_todos(&mut session, None).unwrap();
    assert!(api.get_todos(&mut session, None).unwrap().is_empty());
}

#[test]
fn lifecycle_with_wrapped_responses() {
    lifecycle(Envelope::Wrapped);
}

#[test]
fn lifecycle_with_legacy_responses() {
    lifecycle(Envelope::Legacy);
}

#[test]
fn rejected_token_signs_out_and_redirects() {
    let api = api_for(start_server(Envelope::Wrapped));
    let mut session = SessionContext::in_memory();
    session
        .sign_in(serde_json::from_str(r#"{"token":"forged","userId":"u1"}"#).unwrap())
        .unwrap();

    let err = api.get_todos(&mut session, None).unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized { .. }));
    assert_eq!(err.redirect(), Some(Route::Login));
    assert!(!session.is_authenticated());
    assert_eq!(Router::new().navigate("/", &session).unwrap(), Navigation::Redirect(Route::Login));
}

#[test]
fn unreachable_server_is_a_transport_error() {
    // bind then drop to get a port nothing listens on
    let port = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
    let api = api_for(format!("http://127.0.0.1:{port}"));
    let mut session = SessionContext::in_memory();

    let err = api
        .login(&mut session, &LoginUser { email: "a@b.c".to_string(), password: "pw".to_string() })
        .unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
    assert_eq!(err.redirect(), None);
}
