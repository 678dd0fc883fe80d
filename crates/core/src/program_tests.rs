use super::*;

#[test]
fn builder_defaults_to_pending_build() {
    let program = Program::builder().build();
    assert_eq!(program.image_build_status, ImageBuildStatus::Pending);
    assert!(program.image_tag.is_none());
}

#[test]
fn workspace_subpath_is_keyed_by_id() {
    let program = Program::builder().build();
    assert_eq!(program.workspace_subpath(), format!("workspaces/{}", program.id));
}

#[test]
fn serde_roundtrip_preserves_dependencies() {
    let program = Program::builder()
        .dependencies(Dependencies {
            source: DependencySource::Requirements,
            packages: vec![PackageSpec {
                name: "requests".into(),
                version: "2.31.0".into(),
                extras: vec![],
            }],
            python_version: "3.12".into(),
            lockfile_hash: Some("abc".into()),
        })
        .build();

    let json = serde_json::to_string(&program).unwrap();
    let back: Program = serde_json::from_str(&json).unwrap();
    assert_eq!(back.dependencies, program.dependencies);
    assert_eq!(back.id, program.id);
}
