//! The stateful `ItCrypto` facade.

use rs_it_crypto::{Error, ItCrypto, RemoteUser, Result};
use utilities::{example_access_log, get_test_user_set, resolver_for, TestUserSet};

#[tokio::test]
async fn facade_requires_login_test() {
    let it_crypto = ItCrypto::new();
    let TestUserSet { monitor, owner, .. } = get_test_user_set();
    let log = example_access_log(&monitor, &owner, "x");
    assert!(matches!(
        it_crypto.sign_access_log(&log),
        Err(Error::NotAuthenticated)
    ));
}

#[tokio::test]
async fn facade_signs_shares_and_decrypts_test() -> Result<()> {
    // Arrange
    let TestUserSet {
        monitor,
        owner,
        receiver,
    } = get_test_user_set();
    let resolver = resolver_for(&[&monitor, &owner, &receiver]);
    let log = example_access_log(&monitor, &owner, "facade run");

    let mut monitor_session = ItCrypto::new();
    monitor_session.login_user(monitor.clone());
    let mut owner_session = ItCrypto::new();
    owner_session.login_user(owner.clone());

    // Act: monitor delivers to the owner, the owner reshares.
    let signed = monitor_session.sign_access_log(&log)?;
    let delivery = monitor_session
        .encrypt_log(&signed, &[RemoteUser::from(&owner)])
        .await?;
    let received = owner_session.decrypt_log(&delivery, &resolver).await?;
    let reshared = owner_session
        .encrypt_log(&received, &[RemoteUser::from(&receiver)])
        .await?;
    let mut receiver_session = ItCrypto::new();
    receiver_session.login_user(receiver.clone());
    let at_receiver = receiver_session.decrypt_log(&reshared, &resolver).await?;

    // Assert
    assert_eq!(at_receiver.extract(), log);
    Ok(())
}
