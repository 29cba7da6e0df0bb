//! Shared fixtures for the rs-it-crypto test suites.

use rs_it_crypto::{AccessLog, AuthenticatedUser, InMemoryResolver, RemoteUser};

/// Users covering the three protocol roles. Keys and certificates are
/// fresh per call; the ids are fixed so tests can assert on them.
pub struct TestUserSet {
    pub monitor: AuthenticatedUser,
    pub owner: AuthenticatedUser,
    pub receiver: AuthenticatedUser,
}

pub fn get_test_user_set() -> TestUserSet {
    let mut monitor = AuthenticatedUser::generate()
        .expect("generating monitor keys failed")
        .as_monitor();
    monitor.id = "monitor".to_string();
    let mut owner = AuthenticatedUser::generate().expect("generating owner keys failed");
    owner.id = "owner".to_string();
    let mut receiver = AuthenticatedUser::generate().expect("generating receiver keys failed");
    receiver.id = "receiver".to_string();
    TestUserSet {
        monitor,
        owner,
        receiver,
    }
}

/// Resolver knowing exactly the given users.
pub fn resolver_for(users: &[&AuthenticatedUser]) -> InMemoryResolver {
    let mut resolver = InMemoryResolver::new();
    for user in users {
        resolver.insert(RemoteUser::from(*user));
    }
    resolver
}

/// An access log of `monitor` about `owner` with the given justification.
pub fn example_access_log(
    monitor: &AuthenticatedUser,
    owner: &AuthenticatedUser,
    justification: &str,
) -> AccessLog {
    AccessLog::new(
        &monitor.id,
        &owner.id,
        "cloud-dashboard",
        justification,
        "direct",
        vec!["email".to_string(), "address".to_string()],
    )
}
