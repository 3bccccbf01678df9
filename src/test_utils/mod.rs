//! Shared test utilities for skillcheck.

pub mod echo;
pub mod fixtures;

pub use echo::{EchoSkill, Recorded};
pub use fixtures::ScriptFixture;

/// Table-driven test case structure.
#[derive(Debug, Clone)]
pub struct TestCase<I, E> {
    pub name: &'static str,
    pub input: I,
    pub expected: E,
}

/// Run table-driven tests, reporting the first case whose result differs.
pub fn run_table_tests<I, E, F>(cases: Vec<TestCase<I, E>>, test_fn: F) -> Result<(), String>
where
    I: std::fmt::Debug,
    E: std::fmt::Debug + PartialEq,
    F: Fn(&I) -> E,
{
    for case in cases {
        let actual = test_fn(&case.input);
        if actual != case.expected {
            return Err(format!(
                "case '{}' failed for input {:?}: expected {:?}, got {:?}",
                case.name, case.input, case.expected, actual
            ));
        }
    }
    Ok(())
}
