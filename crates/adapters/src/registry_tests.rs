use super::*;
use fake::FakeRegistry;

#[tokio::test]
async fn fake_registry_records_pushed_tags() {
    let registry = FakeRegistry::new();
    registry.push("mellea-prog-a:latest", &RegistryCredentials::default()).await.unwrap();
    registry.push("mellea-prog-b:latest", &RegistryCredentials::default()).await.unwrap();
    assert_eq!(
        *registry.pushed.lock(),
        vec!["mellea-prog-a:latest".to_string(), "mellea-prog-b:latest".to_string()]
    );
}
