//! Declarative macros for generating CLI parsing and output tests.
//!
//! Instead of writing repetitive test functions, declare the test cases and
//! let the macro generate the actual test code.

// =============================================================================
// CLI Test Macros
// =============================================================================

/// Generate a single CLI option test.
#[macro_export]
macro_rules! cli_option_test {
    (
        command: $cmd:literal,
        variant: $variant:ident,
        test_name: $test_name:ident,
        args: [$($arg:literal),+],
        field: $field:ident,
        expected: $expected:expr $(,)?
    ) => {
        #[rstest]
        fn $test_name() {
            let args = Args::try_parse_from([
                "dbmapper",
                $cmd,
                $($arg),+
            ]).unwrap();
            match args.command {
                crate::commands::Command::$variant(cmd) => {
                    assert_eq!(cmd.$field, $expected,
                        concat!("Field ", stringify!($field), " mismatch"));
                }
                _ => panic!(concat!("Expected ", stringify!($variant), " command")),
            }
        }
    };
}

/// Generate a test that verifies a command fails without its required argument.
#[macro_export]
macro_rules! cli_required_arg_test {
    (
        command: $cmd:literal,
        test_name: $test_name:ident,
        required_arg: $arg:literal $(,)?
    ) => {
        #[rstest]
        fn $test_name() {
            let result = Args::try_parse_from(["dbmapper", $cmd]);
            assert!(result.is_err(), concat!("Command should require ", $arg));
            assert!(
                result.unwrap_err().to_string().contains($arg),
                concat!("Error should mention ", $arg)
            );
        }
    };
}

/// Generate a test that verifies parsing fails with specific invalid args.
#[macro_export]
macro_rules! cli_error_test {
    (
        command: $cmd:literal,
        test_name: $test_name:ident,
        args: [$($arg:literal),+] $(,)?
    ) => {
        #[rstest]
        fn $test_name() {
            let result = Args::try_parse_from([
                "dbmapper",
                $cmd,
                $($arg),+
            ]);
            assert!(result.is_err());
        }
    };
}

// =============================================================================
// Execute Test Macros
// =============================================================================

/// Generate a test that executes a command against a configuration and
/// checks its result.
#[macro_export]
macro_rules! execute_test {
    (
        test_name: $test_name:ident,
        config: $config:expr,
        cmd: $cmd:expr,
        assertions: |$result:ident| $body:block $(,)?
    ) => {
        #[rstest]
        fn $test_name() {
            use crate::commands::Execute;
            let config: crate::config::ConfigFile = $config;
            let $result = $cmd.execute(&config).expect("Execute should succeed");
            $body
        }
    };
}

/// Generate a test that verifies command execution fails with a message.
#[macro_export]
macro_rules! execute_error_test {
    (
        test_name: $test_name:ident,
        config: $config:expr,
        cmd: $cmd:expr,
        message_contains: $needle:literal $(,)?
    ) => {
        #[rstest]
        fn $test_name() {
            use crate::commands::Execute;
            let config: crate::config::ConfigFile = $config;
            let err = $cmd.execute(&config).expect_err("Execute should fail");
            assert!(
                err.to_string().contains($needle),
                "Error {:?} should contain {:?}", err.to_string(), $needle
            );
        }
    };
}

// =============================================================================
// Output Test Macros
// =============================================================================

/// Generate a test that verifies table output matches expected string.
#[macro_export]
macro_rules! output_table_test {
    (
        test_name: $test_name:ident,
        fixture: $fixture:ident,
        fixture_type: $fixture_type:ty,
        expected: $expected:expr $(,)?
    ) => {
        #[rstest]
        fn $test_name($fixture: $fixture_type) {
            use crate::output::Outputable;
            assert_eq!($fixture.to_table(), $expected);
        }
    };
}

/// Generate a test that verifies JSON output is valid and contains expected fields.
#[macro_export]
macro_rules! output_json_test {
    (
        test_name: $test_name:ident,
        fixture: $fixture:ident,
        fixture_type: $fixture_type:ty,
        assertions: { $($field:literal : $expected:expr),* $(,)? } $(,)?
    ) => {
        #[rstest]
        fn $test_name($fixture: $fixture_type) {
            use crate::output::{Outputable, OutputFormat};
            let output = $fixture.format(OutputFormat::Json);
            let parsed: serde_json::Value = serde_json::from_str(&output)
                .expect("Should produce valid JSON");
            $(
                assert_eq!(parsed[$field], $expected, concat!("JSON field mismatch: ", $field));
            )*
        }
    };
}

/// Generate a test that verifies Toon output contains expected strings.
#[macro_export]
macro_rules! output_toon_test {
    (
        test_name: $test_name:ident,
        fixture: $fixture:ident,
        fixture_type: $fixture_type:ty,
        contains: [$($needle:literal),* $(,)?] $(,)?
    ) => {
        #[rstest]
        fn $test_name($fixture: $fixture_type) {
            use crate::output::{Outputable, OutputFormat};
            let output = $fixture.format(OutputFormat::Toon);
            $(
                assert!(output.contains($needle), concat!("Toon output should contain: ", $needle));
            )*
        }
    };
}
