use switchback::dispatch::{handler_fn, Outcome};
use switchback::{router, Config, DispatchService};

use std::net::SocketAddr;
use std::time::Instant;

use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "switchback=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let timing = handler_fn(|cx, next| {
        Box::pin(async move {
            let start = Instant::now();
            let mut out = next.run(cx).await;
            if let Some(res) = out.response_mut() {
                let took = format!("{}us", start.elapsed().as_micros());
                if let Ok(value) = took.parse() {
                    res.headers_mut().insert("x-response-time", value);
                }
            }
            out
        })
    });

    let hello = handler_fn(|cx, _| {
        Box::pin(async move {
            let name = cx.param("name").unwrap_or("world");
            Outcome::text(format!("hello, {}!", name))
        })
    });

    let file = handler_fn(|cx, _| {
        Box::pin(async move {
            let path = cx.param("0").unwrap_or_default();
            Outcome::text(format!("access file: {}", path))
        })
    });

    let broken = handler_fn(|_, _| Box::pin(async { Outcome::fail("this route always fails") }));

    let mut router = router! {
        USE => timing,
        GET "/hello/:name" => hello,
        GET "/api/v1/file/*" => file,
        GET "/broken" => broken,
    };
    *router.config_mut() = Config::from_env()?;
    for found in router.validate() {
        tracing::warn!("{}", found);
    }
    let service = DispatchService::new(router.build());

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    let listener = TcpListener::bind(addr).await?;

    println!("Server is listening on: http://{}", addr);
    println!("hello: http://{}/hello/world", addr);
    println!("api: http://{}/api/v1/file/path/to/public/file", addr);
    println!("500: http://{}/broken", addr);
    println!("404: http://{}/other/path", addr);
    println!();

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let service = service.clone();

        tokio::spawn(async move {
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                tracing::error!("error serving connection: {:?}", err);
            }
        });
    }
}
