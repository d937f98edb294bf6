use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::Arc;

use micropost_auth::identity::{Persistence, RequestContext, VisitorId};
use micropost_auth::routes::Route;
use micropost_auth::storage::{MemoryStore, NewUser};
use micropost_auth::{AuthConfig, RequestGate};

// Seeding hashes one password per user, so keep n small.
fn seed(n: usize) -> (RequestGate, Vec<RequestContext>, Vec<Route>) {
    let store = Arc::new(MemoryStore::new());
    let users: Vec<_> = (0..n)
        .map(|i| store.create_user(NewUser::new(&format!("User {i}"), &format!("user{i}@example.com"), "pw")).unwrap())
        .collect();
    let gate = RequestGate::new(store, AuthConfig::default());
    let ctxs = users
        .iter()
        .map(|u| {
            let s = gate.sessions().create_session(u, Persistence::Ephemeral).unwrap();
            RequestContext::with_token(VisitorId::new(), s.token)
        })
        .collect();
    let mut rng = StdRng::seed_from_u64(0xBEEF_CAFE);
    let routes = (0..1_000)
        .map(|_| {
            let u = users[rng.gen_range(0..n)].id;
            match rng.gen_range(0..4) {
                0 => Route::EditUser(u),
                1 => Route::UpdateUser(u),
                2 => Route::Followers(u),
                _ => Route::UsersIndex,
            }
        })
        .collect();
    (gate, ctxs, routes)
}

fn bench_gate(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_gate");
    for &n in &[4usize, 32] {
        let (gate, ctxs, routes) = seed(n);
        group.throughput(Throughput::Elements(routes.len() as u64));
        group.bench_with_input(BenchmarkId::new("handle", n), &n, |b, _| {
            b.iter(|| {
                for (i, r) in routes.iter().enumerate() {
                    let out = gate.handle(&ctxs[i % ctxs.len()], r).unwrap();
                    criterion::black_box(out);
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_gate);
criterion_main!(benches);
