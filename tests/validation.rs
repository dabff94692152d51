//! Compile-and-repair loop through the facade.

mod common;

use std::sync::Arc;

use common::{offline_config, MarkerToolchain, BROKEN};
use pagewright::adapters::completion::{ScriptedCompletionService, ScriptedReply};
use pagewright::adapters::storage::InMemoryPatternStore;
use pagewright::adapters::toolchain::CommandToolchain;
use pagewright::{DomainError, Pagewright, ValidationError};

fn facade(
    max_retries: u32,
    completion: Arc<ScriptedCompletionService>,
    toolchain: Arc<dyn pagewright::Toolchain>,
) -> Pagewright {
    let mut config = offline_config();
    config.validation.max_retries = max_retries;
    Pagewright::builder(config)
        .with_completion(completion)
        .with_pattern_store(Arc::new(InMemoryPatternStore::new()))
        .with_toolchain(toolchain)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_repair_ceiling_bounds_compiles() {
    for max_retries in [0, 1, 3] {
        let completion = Arc::new(
            ScriptedCompletionService::new()
                .on("Compiler output", ScriptedReply::text(format!("```tsx\nconst still = {BROKEN};\n```"))),
        );
        let toolchain = Arc::new(MarkerToolchain::default());
        let pagewright = facade(max_retries, completion.clone(), toolchain.clone());

        let err = pagewright
            .validate_and_fix(&format!("const x = {BROKEN};"))
            .await
            .unwrap_err();

        match err {
            DomainError::Validation(ValidationError::UnrepairableArtifact { attempts, last_error }) => {
                assert_eq!(attempts, max_retries + 1);
                assert!(last_error.contains("TS2304"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(toolchain.compiles(), (max_retries + 1) as usize);
        assert_eq!(completion.calls_matching("Compiler output"), max_retries as usize);
    }
}

#[tokio::test]
async fn test_repair_sees_diagnostics_and_previous_code() {
    let completion = Arc::new(
        ScriptedCompletionService::new()
            .on("Compiler output", ScriptedReply::text("```tsx\nconst fixed = 1;\n```")),
    );
    let toolchain = Arc::new(MarkerToolchain::default());
    let pagewright = facade(2, completion.clone(), toolchain.clone());

    let report = pagewright
        .validate_and_fix_report(&format!("const x = {BROKEN};"))
        .await
        .unwrap();
    assert_eq!(report.code, "const fixed = 1;");
    assert_eq!(report.attempts, 2);
    assert!(report.repaired);

    let repair = &completion.calls()[0];
    assert!(repair.user_prompt.contains(&format!("const x = {BROKEN};")));
    assert!(repair.user_prompt.contains("TS2304"));
}

#[tokio::test]
async fn test_valid_code_is_untouched() {
    let completion = Arc::new(ScriptedCompletionService::new());
    let toolchain = Arc::new(MarkerToolchain::default());
    let pagewright = facade(2, completion.clone(), toolchain.clone());

    let code = "export default function Ok() { return null; }";
    assert_eq!(pagewright.validate_and_fix(code).await.unwrap(), code);
    assert_eq!(toolchain.compiles(), 1);
    assert_eq!(completion.call_count(), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn test_command_toolchain_drives_repair() {
    let checker = CommandToolchain::new(
        "sh",
        vec![
            "-c".to_string(),
            "if grep -q BROKEN \"$0\"; then echo \"$0: error TS2304\" >&2; exit 2; fi".to_string(),
            "{file}".to_string(),
        ],
    );
    let completion = Arc::new(
        ScriptedCompletionService::new()
            .on("Compiler output", ScriptedReply::text("```tsx\nconst fixed = 2;\n```")),
    );
    let pagewright = facade(1, completion.clone(), Arc::new(checker));

    let report = pagewright
        .validate_and_fix_report(&format!("const x = {BROKEN};"))
        .await
        .unwrap();
    assert_eq!(report.code, "const fixed = 2;");
    assert_eq!(report.attempts, 2);
    assert!(completion.calls()[0].user_prompt.contains("error TS2304"));
}

#[tokio::test]
async fn test_missing_toolchain_is_not_repaired() {
    let completion = Arc::new(ScriptedCompletionService::new());
    let checker = CommandToolchain::new("pagewright-no-such-compiler", vec![]);
    let pagewright = facade(2, completion.clone(), Arc::new(checker));

    let err = pagewright.validate_and_fix("const x = 1;").await.unwrap_err();
    assert!(matches!(
        err,
        DomainError::Validation(ValidationError::ToolchainUnavailable(_))
    ));
    assert_eq!(completion.call_count(), 0);
}
