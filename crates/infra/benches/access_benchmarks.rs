use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::{Duration, Utc};
use callgrid_auth::navigation::ROUTE_PERMISSIONS;
use callgrid_auth::{AccessGate, Identity, OrganizationStatus, Role, accessible_routes};
use callgrid_core::{EmailAddress, UserId};
use callgrid_infra::{InMemoryBackend, OrganizationBackend};
use callgrid_org::{Invite, InviteRequest, InviteToken, NewOrganization};

fn identity(email: &str) -> Identity {
    Identity::new(UserId::new(), EmailAddress::parse(email).unwrap())
}

fn bench_gate_decision(c: &mut Criterion) {
    let mut group = c.benchmark_group("gate_decision");
    let gate = AccessGate::default();
    let user = identity("bench@acme.io");

    for role in Role::ALL {
        group.bench_with_input(BenchmarkId::new("all_routes", role.as_str()), &role, |b, &role| {
            b.iter(|| {
                for (path, _) in ROUTE_PERMISSIONS {
                    black_box(gate.decide(Some(&user), Some(role), OrganizationStatus::Present, path));
                }
            });
        });
    }

    group.finish();
}

fn bench_navigation_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("navigation_filter");

    for size in [7usize, 70, 700].iter() {
        let items: Vec<&str> = ROUTE_PERMISSIONS
            .iter()
            .map(|(path, _)| *path)
            .cycle()
            .take(*size)
            .collect();
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("agent", size), &items, |b, items| {
            b.iter(|| accessible_routes(Some(Role::Agent), items.iter().copied(), |p| *p));
        });
    }

    group.finish();
}

fn bench_invite_acceptance(c: &mut Criterion) {
    let mut group = c.benchmark_group("invite_acceptance");

    group.bench_function("transactional_accept", |b| {
        b.iter_batched(
            || {
                let backend = InMemoryBackend::new();
                let founder = identity("owner@acme.io");
                backend.ensure_profile(&founder).unwrap();
                let organization = NewOrganization::new("Acme", None, None).unwrap();
                let organization_id = backend
                    .create_organization_with_founding_admin(&organization, founder.user_id, Utc::now())
                    .unwrap();

                let request = InviteRequest {
                    organization_id,
                    email: "agent@acme.io".to_string(),
                    role: Role::Agent,
                    created_by: founder.user_id,
                    ttl: Duration::days(7),
                };
                let invite = Invite::issue(&request, Utc::now()).unwrap();
                let token: InviteToken = invite.token.clone();
                backend.insert_invite(invite).unwrap();

                let invitee = identity("agent@acme.io");
                backend.ensure_profile(&invitee).unwrap();
                (backend, token, invitee.user_id)
            },
            |(backend, token, user_id)| {
                black_box(
                    backend
                        .transactionally_accept_invite(&token, user_id, Utc::now())
                        .unwrap(),
                )
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_gate_decision,
    bench_navigation_filter,
    bench_invite_acceptance
);
criterion_main!(benches);
