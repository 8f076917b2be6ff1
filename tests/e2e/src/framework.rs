//! Core E2E testing framework

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Runs scenarios and collects their results
pub struct TestFramework {
    config: TestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestConfig {
    /// Run the keeper's invariant checks during settlement
    pub invariant_checks: bool,

    /// Stop at the first failing scenario
    pub fail_fast: bool,

    /// Enable detailed logging
    pub verbose: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            invariant_checks: true,
            fail_fast: false,
            verbose: false,
        }
    }
}

/// Test scenario trait
pub trait TestScenario {
    fn name(&self) -> &str;
    fn description(&self) -> &str;

    /// Drive the scenario to completion; `Err` means the run itself broke,
    /// failed checks are reported through [`TestResult::validation_results`]
    fn execute(&self, config: &TestConfig) -> Result<TestResult>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub scenario_name: String,
    pub success: bool,
    pub duration: Duration,
    pub error_message: Option<String>,
    pub metrics: TestMetrics,
    pub validation_results: Vec<ValidationResult>,
}

impl TestResult {
    /// Result whose success is decided by its validations
    pub fn from_validations(
        scenario_name: &str,
        metrics: TestMetrics,
        validation_results: Vec<ValidationResult>,
    ) -> Self {
        let success = validation_results.iter().all(ValidationResult::is_acceptable);
        Self {
            scenario_name: scenario_name.to_string(),
            success,
            duration: Duration::ZERO,
            error_message: None,
            metrics,
            validation_results,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &ValidationResult> {
        self.validation_results
            .iter()
            .filter(|v| !v.is_acceptable())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestMetrics {
    pub blocks_processed: u64,
    pub messages_delivered: u64,
    pub messages_rejected: u64,
    pub batches_executed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub validator: String,
    pub passed: bool,
    pub message: String,
    pub severity: ValidationSeverity,
    pub details: Option<serde_json::Value>,
}

impl ValidationResult {
    pub fn pass(validator: &str, message: impl Into<String>) -> Self {
        Self {
            validator: validator.to_string(),
            passed: true,
            message: message.into(),
            severity: ValidationSeverity::Info,
            details: None,
        }
    }

    pub fn fail(validator: &str, message: impl Into<String>) -> Self {
        Self {
            validator: validator.to_string(),
            passed: false,
            message: message.into(),
            severity: ValidationSeverity::Error,
            details: None,
        }
    }

    /// Pass when `expected == actual`, otherwise an error carrying both values
    pub fn expect_eq<T>(validator: &str, expected: T, actual: T) -> Self
    where
        T: PartialEq + std::fmt::Debug + Serialize,
    {
        if expected == actual {
            return Self::pass(validator, format!("{actual:?}"));
        }
        let mut result = Self::fail(
            validator,
            format!("expected {expected:?}, got {actual:?}"),
        );
        result.details = serde_json::to_value((&expected, &actual)).ok();
        result
    }

    pub fn check(validator: &str, passed: bool, message: impl Into<String>) -> Self {
        if passed {
            Self::pass(validator, message)
        } else {
            Self::fail(validator, message)
        }
    }

    pub fn with_severity(mut self, severity: ValidationSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// Warnings do not fail a scenario
    pub fn is_acceptable(&self) -> bool {
        self.passed || matches!(self.severity, ValidationSeverity::Info | ValidationSeverity::Warning)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl TestFramework {
    pub fn new(config: TestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TestConfig {
        &self.config
    }

    /// Run one scenario, timing it and turning a broken run into a failed result
    pub fn run_scenario<S: TestScenario + ?Sized>(&self, scenario: &S) -> TestResult {
        info!(scenario = scenario.name(), "{}", scenario.description());
        let start = Instant::now();

        let mut result = match scenario.execute(&self.config) {
            Ok(result) => result,
            Err(err) => {
                error!(scenario = scenario.name(), error = %err, "scenario aborted");
                TestResult {
                    scenario_name: scenario.name().to_string(),
                    success: false,
                    duration: Duration::ZERO,
                    error_message: Some(format!("{err:#}")),
                    metrics: TestMetrics::default(),
                    validation_results: Vec::new(),
                }
            }
        };
        result.duration = start.elapsed();

        for failure in result.failures() {
            warn!(
                scenario = scenario.name(),
                validator = %failure.validator,
                "{}",
                failure.message
            );
        }
        info!(
            scenario = scenario.name(),
            success = result.success,
            blocks = result.metrics.blocks_processed,
            duration_ms = result.duration.as_millis() as u64,
            "scenario finished"
        );
        result
    }

    /// Run scenarios in order, honoring `fail_fast`
    pub fn run_all(&self, scenarios: &[Box<dyn TestScenario>]) -> Vec<TestResult> {
        let mut results = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            let result = self.run_scenario(scenario.as_ref());
            let failed = !result.success;
            results.push(result);
            if failed && self.config.fail_fast {
                break;
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_do_not_fail_a_result() {
        let results = vec![
            ValidationResult::pass("a", "ok"),
            ValidationResult::fail("b", "slow").with_severity(ValidationSeverity::Warning),
        ];
        let result = TestResult::from_validations("mixed", TestMetrics::default(), results);
        assert!(result.success);
        assert_eq!(result.failures().count(), 0);
    }

    #[test]
    fn mismatch_carries_both_values() {
        let result = ValidationResult::expect_eq("supply", 5u64, 6u64);
        assert!(!result.passed);
        assert_eq!(result.details, Some(serde_json::json!([5, 6])));
    }
}
