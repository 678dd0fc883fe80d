use super::*;

#[test]
fn no_expiry_is_always_usable() {
    let cred = Credential::builder().build();
    assert!(cred.is_usable(Utc::now()));
}

#[test]
fn expired_credential_is_not_usable() {
    let now = Utc::now();
    let cred = Credential::builder().expires_at(now - chrono::Duration::hours(1)).build();
    assert!(!cred.is_usable(now));
}

#[test]
fn not_yet_expired_is_usable() {
    let now = Utc::now();
    let cred = Credential::builder().expires_at(now + chrono::Duration::hours(1)).build();
    assert!(cred.is_usable(now));
}
