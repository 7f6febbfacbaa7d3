use bytes::Bytes;
use criterion::{Criterion, criterion_group, criterion_main};
use http::{Method, Request, StatusCode};
use lattice_web::handler::handler_fn;
use lattice_web::middleware::{Flow, middleware_fn};
use lattice_web::router::{get, matcher, post};
use lattice_web::{Dispatcher, Router};
use std::hint::black_box;

const PATTERN: &str = "/users/[id]/posts/[post_id]";
const PATH: &str = "/users/42/posts/7";

fn router(extra_routes: usize) -> Router {
    let mut builder = Router::builder();
    for i in 0..extra_routes {
        let section = get(|| handler_fn(|_req, resp| Ok(resp.text(StatusCode::OK, "section")?)));
        builder = builder.route(format!("/section-{i}/[slug]"), section);
    }

    builder
        .route(
            PATTERN,
            get(|| handler_fn(|req, resp| Ok(resp.text(StatusCode::OK, req.param("post_id").unwrap_or_default())?))),
        )
        .route(
            "/login",
            post(|| handler_fn(|_req, resp| Ok(resp.text(StatusCode::OK, "welcome")?)))
                .with(|| middleware_fn(|_req, _resp| Ok(Flow::Continue))),
        )
        .build()
}

fn bench_matcher(c: &mut Criterion) {
    let mut group = c.benchmark_group("matcher");

    group.bench_function("literal", |b| {
        b.iter(|| matcher::matches(black_box("/about/team"), black_box("/about/team")));
    });
    group.bench_function("params", |b| b.iter(|| matcher::matches(black_box(PATTERN), black_box(PATH))));
    group.bench_function("capture", |b| b.iter(|| matcher::capture(black_box(PATTERN), black_box(PATH))));
    group.bench_function("mismatch", |b| {
        b.iter(|| matcher::matches(black_box("/users/[id]"), black_box("/users/42/extra")));
    });

    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");

    for extra_routes in [0, 50] {
        let dispatcher = Dispatcher::new(router(extra_routes));

        group.bench_function(format!("matched/{extra_routes}"), |b| {
            b.iter(|| {
                let request = Request::builder().method(Method::GET).uri(PATH).body(Bytes::new()).unwrap();
                black_box(dispatcher.dispatch(request).unwrap())
            });
        });

        group.bench_function(format!("not_found/{extra_routes}"), |b| {
            b.iter(|| {
                let request = Request::builder().method(Method::GET).uri("/missing").body(Bytes::new()).unwrap();
                black_box(dispatcher.dispatch(request).unwrap())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_matcher, bench_dispatch);
criterion_main!(benches);
