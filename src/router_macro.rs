/// Builds a [`Router`](crate::Router) from `METHOD pattern => handlers` entries.
///
/// `ALL` registers for every method, `USE` is middleware for every path,
/// `404` and `500` extend the not-found and error chains.
#[macro_export]
macro_rules! router {
    {@entry $router:expr, USE, [], $data:expr} => {
        $router.middleware($data)
    };
    {@entry $router:expr, 404, [], $data:expr} => {
        $router.on_not_found($data)
    };
    {@entry $router:expr, 500, [], $data:expr} => {
        $router.on_error($data)
    };
    {@entry $router:expr, ALL, [$pattern:expr], $data:expr} => {
        $router.all($pattern, $data)
    };
    {@entry $router:expr, GET, [$pattern:expr], $data:expr} => {
        $router.on($crate::Method::GET, $pattern, $data)
    };
    {@entry $router:expr, POST, [$pattern:expr], $data:expr} => {
        $router.on($crate::Method::POST, $pattern, $data)
    };
    {@entry $router:expr, PUT, [$pattern:expr], $data:expr} => {
        $router.on($crate::Method::PUT, $pattern, $data)
    };
    {@entry $router:expr, DELETE, [$pattern:expr], $data:expr} => {
        $router.on($crate::Method::DELETE, $pattern, $data)
    };
    {@entry $router:expr, HEAD, [$pattern:expr], $data:expr} => {
        $router.on($crate::Method::HEAD, $pattern, $data)
    };
    {@entry $router:expr, OPTIONS, [$pattern:expr], $data:expr} => {
        $router.on($crate::Method::OPTIONS, $pattern, $data)
    };
    {@entry $router:expr, CONNECT, [$pattern:expr], $data:expr} => {
        $router.on($crate::Method::CONNECT, $pattern, $data)
    };
    {@entry $router:expr, PATCH, [$pattern:expr], $data:expr} => {
        $router.on($crate::Method::PATCH, $pattern, $data)
    };
    {@entry $router:expr, TRACE, [$pattern:expr], $data:expr} => {
        $router.on($crate::Method::TRACE, $pattern, $data)
    };

    {$($method:tt $($pattern:expr)? => $data:expr),+ $(,)?} => {{
        let mut __router = $crate::Router::new();
        $($crate::router!(@entry __router, $method, [$($pattern)?], $data);)+
        __router
    }};
}
