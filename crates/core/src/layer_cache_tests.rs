use super::*;

fn pkg(name: &str, version: &str) -> PackageSpec {
    PackageSpec { name: name.into(), version: version.into(), extras: vec![] }
}

#[test]
fn identical_inputs_produce_identical_cache_keys() {
    let a = compute_cache_key("3.12", &[pkg("requests", "2.31.0")]);
    let b = compute_cache_key("3.12", &[pkg("requests", "2.31.0")]);
    assert_eq!(a, b);
}

#[test]
fn differing_python_version_changes_the_key() {
    let a = compute_cache_key("3.12", &[pkg("requests", "2.31.0")]);
    let b = compute_cache_key("3.11", &[pkg("requests", "2.31.0")]);
    assert_ne!(a, b);
}

#[test]
fn differing_package_version_changes_the_key() {
    let a = compute_cache_key("3.12", &[pkg("requests", "2.31.0")]);
    let b = compute_cache_key("3.12", &[pkg("requests", "2.30.0")]);
    assert_ne!(a, b);
}

#[test]
fn package_name_case_is_normalised() {
    let a = compute_cache_key("3.12", &[pkg("Requests", "2.31.0")]);
    let b = compute_cache_key("3.12", &[pkg("requests", "2.31.0")]);
    assert_eq!(a, b);
}

#[test]
fn package_order_does_not_affect_the_key() {
    let a = compute_cache_key("3.12", &[pkg("requests", "2.31.0"), pkg("numpy", "1.26.0")]);
    let b = compute_cache_key("3.12", &[pkg("numpy", "1.26.0"), pkg("requests", "2.31.0")]);
    assert_eq!(a, b);
}

#[test]
fn extras_are_part_of_the_key() {
    let mut with_extra = pkg("requests", "2.31.0");
    with_extra.extras = vec!["socks".into()];
    let a = compute_cache_key("3.12", &[with_extra]);
    let b = compute_cache_key("3.12", &[pkg("requests", "2.31.0")]);
    assert_ne!(a, b);
}

#[test]
fn record_use_increments_count_and_bumps_last_used() {
    let mut entry = LayerCacheEntry::builder().use_count(1).build();
    let later = entry.last_used_at + chrono::Duration::hours(1);
    entry.record_use(later);
    assert_eq!(entry.use_count, 2);
    assert_eq!(entry.last_used_at, later);
}
