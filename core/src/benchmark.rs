//! Summation workload benchmark
//!
//! Runs the `demos/loop.js` driver under the interpreter and checks the
//! printed value against native Rust versions of the same functions.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};

use crate::config::VmConfig;
use crate::interpreter::types::{format_number, Expr, Program, Stmt};
use crate::interpreter::{parse, Interpreter};

/// The workload script, with its driver
pub const LOOP_SCRIPT: &str = include_str!("../demos/loop.js");

/// Input the script's driver uses
pub const DEFAULT_N: u64 = 30_000_000;

/* ===================== Native Reference ===================== */

/// Sum of `i` in `[0, n)` with `i < n / 2`
pub fn sum_numbers(n: u64) -> u64 {
    let mut sum = 0;
    let mut i = 0;
    while i < n {
        // i < n / 2 with real division
        if 2 * i < n {
            sum += i;
        }
        i += 1;
    }
    sum
}

/// Sum of `i` in `[0, n)` with `i` not a multiple of 3
pub fn sum_numbers_bridge(n: u64) -> u64 {
    let mut sum = 0;
    let mut i = 0;
    while i < n {
        if i % 3 != 0 {
            sum += i;
        }
        i += 1;
    }
    sum
}

pub fn sum_numbers_bridge_2(n: u64) -> u64 {
    sum_numbers(n)
}

/// Closed form of `sum_numbers`: `0 + 1 + ... + (k - 1)` with `k = ceil(n / 2)`
///
/// `None` when the sum does not fit in a `u64`.
pub fn sum_numbers_closed(n: u64) -> Option<u64> {
    triangle(n.div_ceil(2))
}

/// Closed form of `sum_numbers_bridge`: everything below `n` minus the
/// multiples of 3
pub fn sum_numbers_bridge_closed(n: u64) -> Option<u64> {
    let multiples = triangle(n.div_ceil(3))?.checked_mul(3)?;
    triangle(n)?.checked_sub(multiples)
}

/// `0 + 1 + ... + (k - 1)`
fn triangle(k: u64) -> Option<u64> {
    if k == 0 {
        return Some(0);
    }
    if k % 2 == 0 {
        (k / 2).checked_mul(k - 1)
    } else {
        k.checked_mul((k - 1) / 2)
    }
}

/* ===================== Driver ===================== */

/// Parse a workload script and point its driver at `n`
///
/// The last top-level assignment to `x` is the driver's input; it is
/// replaced with `n`.
pub fn driver_program(source: &str, n: u64) -> Result<Program> {
    let mut program = parse(source).context("Failed to parse workload script")?;
    let input = program
        .body
        .iter_mut()
        .rev()
        .find_map(|stmt| match stmt {
            Stmt::Assign { name, expr } if name == "x" => Some(expr),
            _ => None,
        })
        .ok_or_else(|| anyhow!("Workload script has no top-level assignment to x"))?;
    *input = Expr::num(n as f64);
    Ok(program)
}

/* ===================== Benchmark ===================== */

pub struct BenchmarkParams {
    pub n: u64,
    pub runs: usize,
    /// Script to run instead of the built-in loop.js
    pub script: Option<PathBuf>,
}

impl Default for BenchmarkParams {
    fn default() -> Self {
        Self {
            n: DEFAULT_N,
            runs: 1,
            script: None,
        }
    }
}

#[derive(Debug)]
pub struct BenchmarkReport {
    pub n: u64,
    /// What the script printed, trimmed
    pub output: String,
    pub expected: u64,
    pub interpreted: Vec<Duration>,
    pub native: Duration,
}

impl BenchmarkReport {
    pub fn best(&self) -> Duration {
        self.interpreted.iter().copied().min().unwrap_or_default()
    }

    pub fn mean(&self) -> Duration {
        if self.interpreted.is_empty() {
            return Duration::ZERO;
        }
        self.interpreted.iter().sum::<Duration>() / self.interpreted.len() as u32
    }
}

/// Time the interpreted driver and verify it against the native reference
pub fn measure(params: &BenchmarkParams, config: &VmConfig) -> Result<BenchmarkReport> {
    validate_params(params)?;

    let source = match &params.script {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => LOOP_SCRIPT.to_string(),
    };
    let program = driver_program(&source, params.n)?;

    let mut interpreted = Vec::with_capacity(params.runs);
    let mut output = String::new();
    for run in 0..params.runs {
        let mut interpreter = Interpreter::new(Vec::new(), config);
        let start = Instant::now();
        interpreter
            .run_program(&program)
            .with_context(|| format!("Run {} failed", run + 1))?;
        let elapsed = start.elapsed();
        tracing::debug!(run = run + 1, elapsed_ms = elapsed.as_millis() as u64, "interpreted run");

        interpreted.push(elapsed);
        output = String::from_utf8_lossy(interpreter.output()).trim().to_string();
    }

    let start = Instant::now();
    let native_result = sum_numbers_bridge(params.n);
    let native = start.elapsed();

    let expected = sum_numbers_bridge_closed(params.n)
        .ok_or_else(|| anyhow!("Expected sum for N = {} overflows u64", params.n))?;
    if native_result != expected {
        bail!(
            "Native loop gave {} but the closed form gives {}",
            native_result,
            expected
        );
    }
    if output != format_number(expected as f64) {
        bail!(
            "Interpreter printed {:?}, expected {}",
            output,
            format_number(expected as f64)
        );
    }

    Ok(BenchmarkReport {
        n: params.n,
        output,
        expected,
        interpreted,
        native,
    })
}

pub fn run_benchmark(params: BenchmarkParams, config: &VmConfig) -> Result<()> {
    println!("🚀 Starting jss Benchmark");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("\n📋 Configuration:");
    println!("   N: {}", params.n);
    println!("   Runs: {}", params.runs);
    match &params.script {
        Some(path) => println!("   Script: {}", path.display()),
        None => println!("   Script: demos/loop.js (built in)"),
    }

    let report = measure(&params, config)?;
    display_report(&report);
    Ok(())
}

fn validate_params(params: &BenchmarkParams) -> Result<()> {
    if params.runs == 0 {
        bail!("Must have at least 1 run");
    }
    // keeps every intermediate sum exact in an f64
    if params.n > 100_000_000 {
        bail!("N must be at most 100000000, got {}", params.n);
    }
    Ok(())
}

fn display_report(report: &BenchmarkReport) {
    let best = report.best().as_secs_f64();
    let native = report.native.as_secs_f64();

    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📊 Benchmark Results");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!("✓ Output: {} (expected {})", report.output, report.expected);
    println!();
    println!("⏱️  Interpreted: best {:.3}s, mean {:.3}s", best, report.mean().as_secs_f64());
    println!("⏱️  Native:      {:.6}s", native);
    if native > 0.0 {
        println!("🐢 Slowdown: {:.0}x", best / native);
    }
    if best > 0.0 {
        println!("🚀 Throughput: {:.1} M iterations/sec", report.n as f64 / best / 1e6);
    }
    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_concrete_cases() {
        assert_eq!(sum_numbers(0), 0);
        assert_eq!(sum_numbers(10), 10);
        assert_eq!(sum_numbers_bridge(10), 27);
        assert_eq!(sum_numbers_bridge_closed(DEFAULT_N), Some(300_000_000_000_000));
    }

    #[test]
    fn test_closed_forms_match_loops() {
        for n in 0..200 {
            assert_eq!(sum_numbers_closed(n), Some(sum_numbers(n)), "sum_numbers({})", n);
            assert_eq!(
                sum_numbers_bridge_closed(n),
                Some(sum_numbers_bridge(n)),
                "sum_numbers_bridge({})",
                n
            );
            assert_eq!(sum_numbers_bridge_2(n), sum_numbers(n));
        }
    }

    #[test]
    fn test_closed_forms_report_overflow() {
        assert_eq!(sum_numbers_closed(u64::MAX), None);
        assert_eq!(sum_numbers_bridge_closed(u64::MAX), None);
        assert_eq!(sum_numbers_bridge_closed(10_000_000_000), None);
        assert_eq!(sum_numbers_closed(6_000_000_000), Some(4_499_999_998_500_000_000));
    }

    #[test]
    fn test_driver_program_replaces_input() {
        let program = driver_program(LOOP_SCRIPT, 42).unwrap();
        let inputs: Vec<&Expr> = program
            .body
            .iter()
            .filter_map(|stmt| match stmt {
                Stmt::Assign { name, expr } if name == "x" => Some(expr),
                _ => None,
            })
            .collect();

        // the first assignment stays, the one the driver reads is replaced
        assert_eq!(inputs, vec![&Expr::num(3000.0), &Expr::num(42.0)]);
    }

    #[test]
    fn test_driver_program_requires_input() {
        let err = driver_program("print(1);", 5).unwrap_err();
        assert!(err.to_string().contains("assignment to x"));
    }

    #[test]
    fn test_measure_small_n() {
        let params = BenchmarkParams {
            n: 1000,
            runs: 2,
            script: None,
        };
        let report = measure(&params, &VmConfig::default()).unwrap();

        assert_eq!(report.output, "332667");
        assert_eq!(report.expected, 332_667);
        assert_eq!(report.interpreted.len(), 2);
        assert!(report.best() <= report.mean());
    }

    #[test]
    fn test_measure_detects_wrong_output() {
        let mut script = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut script, b"x = 1; print(x);").unwrap();

        let params = BenchmarkParams {
            n: 10,
            runs: 1,
            script: Some(script.path().to_path_buf()),
        };
        let err = measure(&params, &VmConfig::default()).unwrap_err();
        assert!(err.to_string().contains("expected 27"), "{}", err);
    }

    #[test]
    fn test_zero_runs_rejected() {
        let params = BenchmarkParams {
            runs: 0,
            ..BenchmarkParams::default()
        };
        assert!(measure(&params, &VmConfig::default()).is_err());
    }
}
