use super::*;
use fake::StaticCredentialService;
use pg_core::CredentialId;

#[tokio::test]
async fn kube_service_derives_secret_name_from_short_id() {
    let svc = KubeCredentialService::new("programs-playground-credentials");
    let id = CredentialId::new();
    let secret = svc.resolve_to_secret_name(id).await.unwrap();
    assert_eq!(secret, SecretName(format!("cred-{}", id.short())));
}

#[tokio::test]
async fn static_service_returns_none_for_unregistered_credential() {
    let svc = StaticCredentialService::new();
    assert!(svc.resolve_to_secret_name(CredentialId::new()).await.is_none());
}

#[tokio::test]
async fn static_service_returns_registered_secret() {
    let svc = StaticCredentialService::new();
    let id = CredentialId::new();
    svc.register(id, "openai-secret");
    let secret = svc.resolve_to_secret_name(id).await.unwrap();
    assert_eq!(secret.0, "openai-secret");
}
