use switchback::dispatch::{
    cancellation, handler_fn, Context, Handler, HandlerTree, Interrupt, IntoHandlers, Outcome,
    SharedHandler, DEBUG_HEADER,
};
use switchback::{Config, DispatchError, Method, Mode, Request, Response, Router};

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;

fn request(method: Method, uri: &str) -> Request {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .body(Bytes::new())
        .unwrap()
}

fn get(uri: &str) -> Request {
    request(Method::GET, uri)
}

fn respond(body: &'static str) -> impl Handler {
    handler_fn(move |_, _| Box::pin(async move { Outcome::text(body) }))
}

fn fail(msg: &'static str) -> impl Handler {
    handler_fn(move |_, _| Box::pin(async move { Outcome::fail(msg) }))
}

fn development() -> Router {
    Router::with_config(Config::default().with_mode(Mode::Development))
}

#[derive(Clone)]
struct Trail(Vec<&'static str>);

fn tag(name: &'static str) -> SharedHandler {
    Arc::new(handler_fn(move |cx, _| {
        Box::pin(async move {
            match cx.locals_mut().get_mut::<Trail>() {
                Some(trail) => trail.0.push(name),
                None => {
                    cx.locals_mut().insert(Trail(vec![name]));
                }
            }
            Outcome::Continue
        })
    }))
}

fn render_trail() -> impl Handler {
    handler_fn(|cx, _| {
        Box::pin(async move {
            let trail = cx.locals().get::<Trail>().map(|t| t.0.join(","));
            Outcome::text(trail.unwrap_or_default())
        })
    })
}

fn boom() -> Outcome {
    panic!("boom")
}

#[tokio::test]
async fn responds_with_param() {
    let mut router = Router::new();
    router.get(
        "/users/:id",
        handler_fn(|cx, _| {
            Box::pin(async move { Outcome::text(cx.param("id").unwrap_or_default().to_owned()) })
        }),
    );
    let dispatcher = router.build();

    let res = dispatcher.handle(get("/users/1337")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.body(), "1337");
}

#[tokio::test]
async fn not_found_in_production() {
    let dispatcher = Router::new().build();

    let res = dispatcher.handle(get("/anything")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.body(), "404 Not Found");
    assert_eq!(res.headers()[CONTENT_TYPE], "text/plain");
    assert!(res.headers().get(DEBUG_HEADER).is_none());
}

#[tokio::test]
async fn fault_without_error_handlers() {
    let mut router = Router::new();
    router.get("/", fail("Oops"));
    let dispatcher = router.build();

    let res = dispatcher.handle(get("/")).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.body(), "500 Server Error");
    assert_eq!(res.headers()[CONTENT_TYPE], "text/plain");
}

#[tokio::test]
async fn middleware_post_processes() {
    let mut router = Router::new();
    router.middleware(handler_fn(|cx, next| {
        Box::pin(async move {
            let mut out = next.run(cx).await;
            if let Some(res) = out.response_mut() {
                res.headers_mut()
                    .insert("x-powered-by", HeaderValue::from_static("switchback"));
            }
            out
        })
    }));
    router.get("/", respond("Hi"));
    let dispatcher = router.build();

    let res = dispatcher.handle(get("/")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.body(), "Hi");
    assert_eq!(res.headers()["x-powered-by"], "switchback");
}

#[tokio::test]
async fn first_response_stops_the_chain() {
    let hits = Arc::new(AtomicUsize::new(0));

    let mut router = Router::new();
    router.middleware(respond("blanket"));
    router.get("/", {
        let hits = Arc::clone(&hits);
        handler_fn(move |_, _| {
            hits.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Outcome::text("specific") })
        })
    });
    let dispatcher = router.build();

    assert_eq!(dispatcher.find(&Method::GET, "/").len(), 2);
    let res = dispatcher.handle(get("/")).await;
    assert_eq!(res.body(), "blanket");
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn continue_shares_locals_and_resets_params() {
    #[derive(Clone)]
    struct Seen(String);

    let mut router = Router::new();
    router.all(
        "/users/*",
        handler_fn(|cx, _| {
            Box::pin(async move {
                let rest = cx.param("0").unwrap_or_default().to_owned();
                cx.locals_mut().insert(Seen(rest));
                Outcome::Continue
            })
        }),
    );
    router.get(
        "/users/:id",
        handler_fn(|cx, _| {
            Box::pin(async move {
                let seen = cx.locals().get::<Seen>().map(|s| s.0.clone());
                Outcome::text(format!(
                    "{} {} {:?}",
                    seen.unwrap_or_default(),
                    cx.param("id").unwrap_or_default(),
                    cx.param("0"),
                ))
            })
        }),
    );
    let dispatcher = router.build();

    let res = dispatcher.handle(get("/users/42")).await;
    assert_eq!(res.body(), "42 42 None");
}

#[tokio::test]
async fn method_mismatch_is_not_found() {
    let mut router = Router::new();
    router.post("/items", respond("created"));
    let dispatcher = router.build();

    let res = dispatcher.handle(get("/items")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = dispatcher.handle(request(Method::POST, "/items")).await;
    assert_eq!(res.body(), "created");
}

#[tokio::test]
async fn query_string_is_ignored() {
    let mut router = Router::new();
    router.get("/search", respond("results"));
    let dispatcher = router.build();

    let res = dispatcher.handle(get("/search?q=rust")).await;
    assert_eq!(res.body(), "results");
    let res = dispatcher.handle(get("/search?q=other")).await;
    assert_eq!(res.body(), "results");

    let stats = dispatcher.cache_stats();
    assert_eq!((stats.hits, stats.misses), (1, 1));
}

#[tokio::test]
async fn nested_handlers_flatten_in_order() {
    let mut router = Router::new();
    router.get(
        "/",
        vec![
            HandlerTree::Leaf(tag("a")),
            HandlerTree::Group(vec![tag("b").into_tree(), vec![tag("c")].into_tree()]),
            tag("d").into_tree(),
        ],
    );
    router.get("/", render_trail());
    assert_eq!(router.routes().len(), 5);
    let dispatcher = router.build();

    let res = dispatcher.handle(get("/")).await;
    assert_eq!(res.body(), "a,b,c,d");
}

#[tokio::test]
async fn not_found_chain() {
    let mut router = Router::new();
    router.get("/", handler_fn(|_, _| Box::pin(async { Outcome::Continue })));
    router.on_not_found([tag("nf"), tag("handler")]);
    router.on_not_found(handler_fn(|cx, _| {
        Box::pin(async move {
            let trail = cx.locals().get::<Trail>().map(|t| t.0.join(" "));
            Outcome::status(
                StatusCode::NOT_FOUND,
                format!("{} for {}", trail.unwrap_or_default(), cx.path()),
            )
        })
    }));
    let dispatcher = router.build();

    let res = dispatcher.handle(get("/missing")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.body(), "nf handler for /missing");

    let res = dispatcher.handle(get("/")).await;
    assert_eq!(res.body(), "nf handler for /");
}

#[tokio::test]
async fn interrupt_short_circuits() {
    async fn load(cx: &Context) -> Result<u32, Interrupt> {
        let id: u32 = cx.param("id").unwrap_or_default().parse()?;
        if id == 0 {
            let res: Response = http::Response::builder()
                .status(StatusCode::BAD_REQUEST)
                .body(Bytes::from_static(b"bad id"))
                .unwrap();
            return Err(Interrupt::respond(res));
        }
        Ok(id)
    }

    let mut router = Router::new();
    router.get(
        "/users/:id",
        handler_fn(|cx, _| {
            Box::pin(async move {
                let id = load(cx).await;
                Outcome::from(id.map(|id| Outcome::text(id.to_string())))
            })
        }),
    );
    router.on_error(handler_fn(|cx, _| {
        Box::pin(async move {
            let msg = cx.error().map(|e| e.to_string()).unwrap_or_default();
            Outcome::status(StatusCode::UNPROCESSABLE_ENTITY, msg)
        })
    }));
    let dispatcher = router.build();

    let res = dispatcher.handle(get("/users/5")).await;
    assert_eq!(res.body(), "5");

    let res = dispatcher.handle(get("/users/0")).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.body(), "bad id");

    let res = dispatcher.handle(get("/users/x")).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.body(), "invalid digit found in string");
}

#[tokio::test]
async fn errors_chain_through_error_handlers() {
    let mut router = Router::new();
    router.get("/", fail("first"));
    router.on_error(handler_fn(|cx, _| {
        Box::pin(async move {
            let seen = cx.error().map(|e| e.to_string()).unwrap_or_default();
            Outcome::fail(format!("{} then second", seen))
        })
    }));
    router.on_error(handler_fn(|cx, next| {
        Box::pin(async move {
            let mut out = next.run(cx).await;
            if let Some(res) = out.response_mut() {
                res.headers_mut()
                    .insert("x-wrapped", HeaderValue::from_static("yes"));
            }
            out
        })
    }));
    router.on_error(handler_fn(|cx, _| {
        Box::pin(async move {
            let msg = cx.error().map(|e| e.to_string()).unwrap_or_default();
            Outcome::status(StatusCode::SERVICE_UNAVAILABLE, msg)
        })
    }));
    let dispatcher = router.build();

    let res = dispatcher.handle(get("/")).await;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.body(), "first then second");
    assert_eq!(res.headers()["x-wrapped"], "yes");
}

#[tokio::test]
async fn exhausted_error_chain_falls_back() {
    let mut router = Router::new();
    router.get("/", fail("first"));
    router.on_error(handler_fn(|_, _| Box::pin(async { Outcome::Continue })));
    router.on_error(fail("second"));
    let dispatcher = router.build();

    let res = dispatcher.handle(get("/")).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.body(), "500 Server Error");
}

#[tokio::test]
async fn panics_become_faults() {
    let mut router = Router::new();
    router.get("/", handler_fn(|_, _| Box::pin(async { boom() })));
    router.on_error(handler_fn(|cx, _| {
        Box::pin(async move {
            let panicked = matches!(
                cx.error().and_then(|e| e.downcast_ref::<DispatchError>()),
                Some(DispatchError::Panicked(msg)) if msg == "boom"
            );
            Outcome::text(panicked.to_string())
        })
    }));
    let dispatcher = router.build();

    let res = dispatcher.handle(get("/")).await;
    assert_eq!(res.body(), "true");

    let res = dispatcher.handle(get("/")).await;
    assert_eq!(res.body(), "true");
}

#[tokio::test]
async fn continue_after_next_is_a_fault() {
    let mut router = Router::new();
    router.middleware(handler_fn(|cx, next| {
        Box::pin(async move {
            let _ = next.run(cx).await;
            Outcome::Continue
        })
    }));
    router.get("/", respond("lost"));
    router.on_error(handler_fn(|cx, _| {
        Box::pin(async move {
            let dropped = matches!(
                cx.error().and_then(|e| e.downcast_ref::<DispatchError>()),
                Some(DispatchError::ResponseDropped)
            );
            Outcome::text(dropped.to_string())
        })
    }));
    let dispatcher = router.build();

    let res = dispatcher.handle(get("/")).await;
    assert_eq!(res.body(), "true");
}

#[tokio::test]
async fn development_not_found_page() {
    let dispatcher = development().build();

    let res = dispatcher.handle(request(Method::DELETE, "/missing/page")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.headers()[CONTENT_TYPE], "text/html; charset=utf-8");
    assert_eq!(res.headers()[DEBUG_HEADER], "not-found");

    let body = std::str::from_utf8(res.body()).unwrap();
    assert!(body.contains("DELETE /missing/page"));
}

#[tokio::test]
async fn development_error_page() {
    #[derive(Debug, thiserror::Error)]
    #[error("could not load profile")]
    struct LoadError(#[source] io::Error);

    let mut router = development();
    router.get(
        "/profile",
        handler_fn(|_, _| {
            Box::pin(async {
                let cause = io::Error::new(io::ErrorKind::NotFound, "profile.toml <missing>");
                Outcome::fail(LoadError(cause))
            })
        }),
    );
    let dispatcher = router.build();

    let res = dispatcher.handle(get("/profile")).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.headers()[DEBUG_HEADER], "server-error");

    let body = std::str::from_utf8(res.body()).unwrap();
    assert!(body.contains("could not load profile"));
    assert!(body.contains("Caused by"));
    assert!(body.contains("profile.toml &lt;missing&gt;"));
    assert!(!body.contains("<missing>"));
}

#[tokio::test]
async fn ranked_mounting() {
    let mut router = Router::new();
    router.mount_ranked(vec![
        (Method::GET, "/users/*".to_owned(), respond("rest")),
        (Method::GET, "/users/:id".to_owned(), respond("show")),
        (Method::GET, "/users/new".to_owned(), respond("new")),
    ]);
    let patterns: Vec<&str> = router.routes().iter().map(|r| r.pattern()).collect();
    assert_eq!(patterns, ["/users/new", "/users/:id", "/users/*"]);
    let dispatcher = router.build();

    assert_eq!(dispatcher.handle(get("/users/new")).await.body(), "new");
    assert_eq!(dispatcher.handle(get("/users/7")).await.body(), "show");
    assert_eq!(dispatcher.handle(get("/users/7.json")).await.body(), "rest");
}

#[tokio::test]
async fn invalid_and_unsafe_patterns() {
    let mut router = Router::new();
    assert!(router
        .try_on(Method::GET, "/bad/(:id", respond("never"))
        .is_err());
    assert!(router.routes().is_empty());

    router.get("/(a+)+/x", respond("slow"));
    router.get("/fine/:id", respond("fine"));
    let findings = router.validate();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].pattern, "/(a+)+/x");

    let dispatcher = router.build();
    assert_eq!(dispatcher.handle(get("/aa/x")).await.body(), "slow");
}

#[test]
#[should_panic(expected = "invalid pattern")]
fn on_panics_on_invalid_pattern() {
    Router::new().get("/bad/(:id", respond("never"));
}

#[tokio::test]
async fn observes_cancellation() {
    let mut router = Router::new();
    router.get(
        "/slow",
        handler_fn(|cx, _| {
            Box::pin(async move {
                cx.cancellation().cancelled().await;
                Outcome::text(cx.is_cancelled().to_string())
            })
        }),
    );
    let dispatcher = Arc::new(router.build());

    let (handle, cancel) = cancellation();
    let task = tokio::spawn({
        let dispatcher = Arc::clone(&dispatcher);
        async move { dispatcher.handle_with(get("/slow"), cancel).await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!task.is_finished());

    handle.cancel();
    let res = task.await.unwrap();
    assert_eq!(res.body(), "true");
}

#[tokio::test]
async fn cancel_guard() {
    let (handle, cancel) = cancellation();
    drop(handle.cancel_on_drop());
    assert!(cancel.is_cancelled());

    let (handle, cancel) = cancellation();
    handle.cancel_on_drop().disarm();
    assert!(!cancel.is_cancelled());

    let never = switchback::dispatch::Cancellation::never();
    assert!(!never.is_cancelled());
    let waited = tokio::time::timeout(Duration::from_millis(20), never.cancelled()).await;
    assert!(waited.is_err());
}

#[tokio::test]
async fn error_handlers_run_once_after_next() {
    let hits = Arc::new(AtomicUsize::new(0));

    let mut router = Router::new();
    router.get("/", fail("first"));
    router.on_error(handler_fn(|cx, next| {
        Box::pin(async move {
            let _ = next.run(cx).await;
            Outcome::fail("wrapper failed")
        })
    }));
    router.on_error({
        let hits = Arc::clone(&hits);
        handler_fn(move |_, _| {
            hits.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Outcome::status(StatusCode::SERVICE_UNAVAILABLE, "unavailable") })
        })
    });
    let dispatcher = router.build();

    let res = dispatcher.handle(get("/")).await;
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.body(), "500 Server Error");
}

#[tokio::test]
async fn middleware_sees_error_responses() {
    let errors = Arc::new(AtomicUsize::new(0));

    let stamp = || {
        handler_fn(|cx, next| {
            Box::pin(async move {
                let mut out = next.run(cx).await;
                if let Some(res) = out.response_mut() {
                    res.headers_mut()
                        .append("x-mw", HeaderValue::from_static("seen"));
                }
                out
            })
        })
    };

    let mut router = Router::new();
    router.middleware(stamp());
    router.middleware(stamp());
    router.get("/", fail("Oops"));
    router.get("/handled", fail("Oops"));
    router.on_error({
        let errors = Arc::clone(&errors);
        handler_fn(move |cx, _| {
            errors.fetch_add(1, Ordering::SeqCst);
            let handled = cx.path() == "/handled";
            Box::pin(async move {
                if handled {
                    Outcome::status(StatusCode::SERVICE_UNAVAILABLE, "handled")
                } else {
                    Outcome::Continue
                }
            })
        })
    });
    let dispatcher = router.build();

    let res = dispatcher.handle(get("/")).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.body(), "500 Server Error");
    assert_eq!(res.headers().get_all("x-mw").iter().count(), 2);

    let res = dispatcher.handle(get("/handled")).await;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.headers().get_all("x-mw").iter().count(), 2);

    assert_eq!(errors.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn cancellation_reaches_spawned_work() {
    let fired = Arc::new(tokio::sync::Notify::new());

    let mut router = Router::new();
    router.get("/stream", {
        let fired = Arc::clone(&fired);
        handler_fn(move |cx, _| {
            let fired = Arc::clone(&fired);
            let cancel = cx.cancellation().clone();
            Box::pin(async move {
                tokio::spawn(async move {
                    cancel.cancelled().await;
                    fired.notify_one();
                });
                std::future::pending::<()>().await;
                Outcome::Continue
            })
        })
    });
    let dispatcher = router.build();

    let (handle, cancel) = cancellation();
    let serve = async {
        let guard = handle.cancel_on_drop();
        let res = dispatcher.handle_with(get("/stream"), cancel).await;
        guard.disarm();
        res
    };
    let served = tokio::time::timeout(Duration::from_millis(20), serve).await;
    assert!(served.is_err());

    let observed = tokio::time::timeout(Duration::from_secs(5), fired.notified()).await;
    assert!(observed.is_ok());
}
