//! Standard benchmark tests and suite digests.

use fleet_state::{BenchmarkCategory, BenchmarkTest, Difficulty, JsonMap, StorageError, TestCatalog};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::domain::Result;

fn input(value: Value) -> JsonMap {
    match value {
        Value::Object(map) => map,
        _ => JsonMap::new(),
    }
}

#[allow(clippy::too_many_arguments)]
fn catalog_test(
    id: &str,
    name: &str,
    category: BenchmarkCategory,
    description: &str,
    input_data: Value,
    expected_output: Option<&str>,
    criteria: &[&str],
    difficulty: Difficulty,
) -> BenchmarkTest {
    BenchmarkTest {
        id: id.to_string(),
        name: name.to_string(),
        category,
        description: description.to_string(),
        input_data: input(input_data),
        expected_output: expected_output.map(str::to_string),
        evaluation_criteria: criteria.iter().map(|c| c.to_string()).collect(),
        difficulty,
        max_score: 1.0,
    }
}

/// The six tests every catalog starts with: three code generation, two QA
/// and one reasoning, in that order.
pub fn standard_tests() -> Vec<BenchmarkTest> {
    use BenchmarkCategory::*;

    vec![
        catalog_test(
            "code_001",
            "Python Hello World",
            CodeGeneration,
            "Generate a Python hello world program",
            json!({"language": "python", "task": "hello world"}),
            None,
            &["valid syntax", "correct output"],
            Difficulty::Easy,
        ),
        catalog_test(
            "code_002",
            "Quicksort implementation",
            CodeGeneration,
            "Implement the quicksort algorithm",
            json!({"language": "python", "algorithm": "quick sort"}),
            None,
            &["correct algorithm", "O(n log n) time complexity", "readable code"],
            Difficulty::Medium,
        ),
        catalog_test(
            "code_003",
            "Binary tree traversal",
            CodeGeneration,
            "Implement inorder traversal of a binary tree",
            json!({"data_structure": "binary tree", "traversal": "inorder"}),
            None,
            &["correct algorithm", "recursive implementation", "handles edge cases"],
            Difficulty::Medium,
        ),
        catalog_test(
            "qa_001",
            "Basic question answering",
            Qa,
            "Answer a simple general-knowledge question",
            json!({"question": "Paris is the capital of which country?"}),
            Some("France"),
            &["accurate answer", "clear wording"],
            Difficulty::Easy,
        ),
        catalog_test(
            "qa_002",
            "Arithmetic",
            Qa,
            "Solve a multiplication problem",
            json!({"question": "Compute 123 × 456"}),
            Some("56088"),
            &["correct result", "clear steps"],
            Difficulty::Medium,
        ),
        catalog_test(
            "reason_001",
            "Logical reasoning",
            Reasoning,
            "Transitive ordering puzzle",
            json!({"problem": "If A > B and B > C, how do A and C relate?"}),
            None,
            &["correct inference", "sound logic"],
            Difficulty::Easy,
        ),
    ]
}

/// Register [`standard_tests`] into `catalog`, skipping ids already present.
///
/// Returns how many tests were newly registered.
pub async fn seed_standard_tests(catalog: &dyn TestCatalog) -> Result<usize> {
    let mut added = 0;
    for test in standard_tests() {
        match catalog.register_test(test).await {
            Ok(()) => added += 1,
            Err(StorageError::DuplicateTest { test_id }) => {
                debug!(test_id = %test_id, "standard test already registered");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(added)
}

/// SHA-256 hex digest of the canonical JSON of a test list.
///
/// Object keys serialize in sorted order, so the digest depends only on the
/// test definitions and their order.
pub fn suite_digest(tests: &[BenchmarkTest]) -> Result<String> {
    let value = serde_json::to_value(tests)?;
    let canonical = serde_json::to_vec(&value)?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_state::fakes::MemoryTestCatalog;

    #[test]
    fn standard_suite_shape() {
        let tests = standard_tests();
        assert_eq!(tests.len(), 6);
        let code = tests
            .iter()
            .filter(|t| t.category == BenchmarkCategory::CodeGeneration)
            .count();
        assert_eq!(code, 3);
        assert_eq!(tests[3].expected_output.as_deref(), Some("France"));
        assert_eq!(tests[4].expected_output.as_deref(), Some("56088"));
        assert_eq!(tests[5].id, "reason_001");
    }

    #[tokio::test]
    async fn seeding_twice_is_harmless() {
        let catalog = MemoryTestCatalog::new();
        assert_eq!(seed_standard_tests(&catalog).await.unwrap(), 6);
        assert_eq!(seed_standard_tests(&catalog).await.unwrap(), 0);
        assert_eq!(catalog.list_tests(None).await.unwrap().len(), 6);
    }

    #[test]
    fn digest_is_stable_and_order_sensitive() {
        let tests = standard_tests();
        let d1 = suite_digest(&tests).unwrap();
        let d2 = suite_digest(&standard_tests()).unwrap();
        assert_eq!(d1, d2);
        assert_eq!(d1.len(), 64);

        let mut reversed = tests.clone();
        reversed.reverse();
        assert_ne!(suite_digest(&reversed).unwrap(), d1);
        assert_ne!(suite_digest(&tests[..2]).unwrap(), d1);
    }
}
