#![allow(clippy::unwrap_used, clippy::expect_used)]

use omnigen::catalog::Catalog;
use omnigen::generator::llm::{ChatRequest, Endpoint};
use omnigen::generator::{ChatClient, GenerateError, Generator, LlmError, UnitOutcome};
use omnigen::introspect::Connection;
use std::fs;
use std::path::Path;

/// Never reached unless a test asks for the LLM path.
struct OfflineClient;

impl ChatClient for OfflineClient {
    fn complete(&self, _endpoint: &Endpoint, _request: &ChatRequest) -> Result<String, LlmError> {
        Err(LlmError::Request("offline".to_string()))
    }
}

const ENTITY_TEMPLATE: &str = "\
package com.example.entity;

/** {{ comment }} */
public class {{ TableName }} {
{%- for col in columns %}
    private {{ col.type|to_java_type }} {{ col.name|to_camel_case }};
{%- endfor %}
}
";

/// Write a catalog with one group whose templates live in separate files.
fn write_workspace(root: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let templates = root.join("templates");
    fs::create_dir_all(&templates).unwrap();
    fs::write(templates.join("entity.java.jinja2"), ENTITY_TEMPLATE).unwrap();
    fs::write(
        templates.join("entity.prompt"),
        "Write a JPA entity.\n{{ schema_text }}",
    )
    .unwrap();

    let out = root.join("out");
    let catalog = root.join("catalog.yaml");
    fs::write(
        &catalog,
        format!(
            r#"
groups:
  - id: 1
    name: spring-boot
    templates:
      - id: 10
        name: entity.java.jinja2
        display_name: Entity
        content_file: templates/entity.java.jinja2
        prompt_file: templates/entity.prompt
        root_path: {out}/src/main/java
        relative_path: "com/example/{{{{ TableName|to_kebab_case }}}}/{{{{ TableName }}}}.java"
      - id: 11
        name: routes.ts.jinja2
        content: "export const {{{{ table_name|to_camel_case }}}}Path = '/{{{{ TableName|to_kebab_case }}}}';"
        root_path: {out}/web/
        relative_path: "{{{{ Unknown }}}}.ts"
providers:
  - id: 1
    name: Local Ollama
    provider: ollama
    base_url: http://127.0.0.1:9/v1
    model_name: llama3
    active: true
"#,
            out = out.display()
        ),
    )
    .unwrap();

    let schemas = root.join("schemas");
    fs::create_dir_all(&schemas).unwrap();
    fs::write(
        schemas.join("user_account.yaml"),
        "comment: Registered users\n\
         primary_keys: [id]\n\
         columns:\n\
         \x20 - {name: id, type: BIGINT, nullable: false}\n\
         \x20 - {name: user_name, type: VARCHAR(64)}\n\
         \x20 - {name: created_at, type: DATETIME}\n",
    )
    .unwrap();
    (catalog, schemas)
}

#[test]
fn test_generate_from_catalog_and_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    let (catalog_path, schemas) = write_workspace(dir.path());
    let catalog = Catalog::load(&catalog_path).unwrap();
    let source = Connection::parse(&schemas.display().to_string()).open().unwrap();

    let batch = Generator::new(&catalog, &catalog, &OfflineClient)
        .generate(source.as_ref(), &["user_account".to_string()], 1, false)
        .unwrap();

    let files = &batch.results[0].files;
    assert_eq!(files.len(), 2);

    let entity = &files[0];
    assert_eq!(entity.template_name, "Entity");
    assert_eq!(entity.relative_path, "com/example/user-account/UserAccount.java");
    let expected = "\
package com.example.entity;

/** Registered users */
public class UserAccount {
    private Long id;
    private String userName;
    private LocalDateTime createdAt;
}";
    assert_eq!(entity.code(), Some(expected));
    let on_disk = fs::read_to_string(&entity.path).unwrap();
    assert_eq!(on_disk, expected);
    assert!(entity
        .path
        .ends_with("out/src/main/java/com/example/user-account/UserAccount.java"));

    // The path pattern references an unknown variable and is used as written.
    let routes = &files[1];
    assert_eq!(routes.template_name, "routes.ts.jinja2");
    assert_eq!(routes.relative_path, "{{ Unknown }}.ts");
    assert_eq!(
        routes.code(),
        Some("export const userAccountPath = '/user-account';")
    );
    assert!(dir.path().join("out/web/{{ Unknown }}.ts").is_file());
}

#[test]
fn test_llm_failure_is_local_to_the_unit() {
    let dir = tempfile::tempdir().unwrap();
    let (catalog_path, schemas) = write_workspace(dir.path());
    let catalog = Catalog::load(&catalog_path).unwrap();
    let source = Connection::parse(&schemas.display().to_string()).open().unwrap();

    let batch = Generator::new(&catalog, &catalog, &OfflineClient)
        .generate(source.as_ref(), &["user_account".to_string()], 1, true)
        .unwrap();

    let files = &batch.results[0].files;
    assert_eq!(
        files[0].outcome,
        UnitOutcome::Failed {
            error: "LLM Call Failed: offline".to_string()
        }
    );
    // No prompt on the second template, so it renders normally.
    assert!(files[1].code().is_some());
    assert_eq!(batch.failed_units(), 1);
}

#[test]
fn test_missing_table_fails_the_request() {
    let dir = tempfile::tempdir().unwrap();
    let (catalog_path, schemas) = write_workspace(dir.path());
    let catalog = Catalog::load(&catalog_path).unwrap();
    let source = Connection::parse(&schemas.display().to_string()).open().unwrap();

    let err = Generator::new(&catalog, &catalog, &OfflineClient)
        .generate(
            source.as_ref(),
            &["user_account".to_string(), "orders".to_string()],
            1,
            false,
        )
        .unwrap_err();
    assert!(matches!(err, GenerateError::Introspection(_)));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_no_tables_yields_empty_batch() {
    let dir = tempfile::tempdir().unwrap();
    let (catalog_path, schemas) = write_workspace(dir.path());
    let catalog = Catalog::load(&catalog_path).unwrap();
    let source = Connection::parse(&schemas.display().to_string()).open().unwrap();

    let batch = Generator::new(&catalog, &catalog, &OfflineClient)
        .generate(source.as_ref(), &[], 1, false)
        .unwrap();
    assert!(batch.results.is_empty());
}
